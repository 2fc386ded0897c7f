//! Checkpoint I/O for trained populations.
//!
//! Parameters travel as a flat [`StateDict`] keyed by dotted paths
//! (`senders.0.fc.0.weight`, `vision.sender.fc.0.bias`, ...). A [`Checkpoint`]
//! wraps the state dict with the epoch it was taken at and is written with
//! bincode.

use ndarray::{Array, ArrayD, Dimension};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{EmcomError, Result};

/// Flat mapping from parameter path to tensor
pub type StateDict = BTreeMap<String, ArrayD<f32>>;

/// A saved training state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: usize,
    pub model_state_dict: StateDict,
}

impl Checkpoint {
    pub fn new(epoch: usize, model_state_dict: StateDict) -> Self {
        Checkpoint { epoch, model_state_dict }
    }

    /// Serialize the checkpoint to `path`, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = bincode::serialize(self)?;
        let mut file = fs::File::create(path)?;
        file.write_all(&serialized)?;
        info!(path = %path.display(), epoch = self.epoch, tensors = self.model_state_dict.len(), "saved checkpoint");
        Ok(())
    }

    /// Load a checkpoint previously written by [`Checkpoint::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = fs::File::open(path).map_err(|e| {
            EmcomError::configuration("checkpoint_path", format!("cannot open {}: {}", path.display(), e))
        })?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        let checkpoint: Checkpoint = bincode::deserialize(&buffer)?;
        debug!(path = %path.display(), epoch = checkpoint.epoch, "loaded checkpoint");
        Ok(checkpoint)
    }
}

/// Store `value` under `key`.
pub fn put_param<D: Dimension>(state: &mut StateDict, key: String, value: &Array<f32, D>) {
    state.insert(key, value.clone().into_dyn());
}

/// Fetch the entry `key` and check it has exactly the shape of `like`.
pub fn take_param<D: Dimension>(state: &StateDict, key: &str, like: &Array<f32, D>) -> Result<Array<f32, D>> {
    let entry = state.get(key).ok_or_else(|| {
        EmcomError::configuration("model_state_dict", format!("missing entry '{}'", key))
    })?;
    if entry.shape() != like.shape() {
        return Err(EmcomError::dimension_mismatch(
            format!("{} with shape {:?}", key, like.shape()),
            format!("shape {:?}", entry.shape()),
        ));
    }
    entry
        .clone()
        .into_dimensionality::<D>()
        .map_err(|e| EmcomError::dimension_mismatch(format!("{} as {}-d tensor", key, like.ndim()), e.to_string()))
}

/// Select the entries under `prefix` and strip it from their keys.
pub fn sub_state(state: &StateDict, prefix: &str) -> StateDict {
    state
        .iter()
        .filter_map(|(k, v)| k.strip_prefix(prefix).map(|rest| (rest.to_string(), v.clone())))
        .collect()
}

/// Copy all entries of `inner` into `state` with `prefix` prepended.
pub fn extend_prefixed(state: &mut StateDict, prefix: &str, inner: StateDict) {
    for (k, v) in inner {
        state.insert(format!("{}{}", prefix, k), v);
    }
}

/// Total number of scalars stored in a state dict
pub fn num_parameters(state: &StateDict) -> usize {
    state.values().map(|t| t.len()).sum()
}
