use ndarray::{Array2, ArrayView2};

use crate::checkpoint::StateDict;
use crate::error::Result;

/// Trait defining the interface for forward-only network layers
pub trait Layer: Send {
    /// Perform forward propagation for a batch of inputs
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Switch between training and evaluation behaviour
    fn set_training(&mut self, _training: bool) {}

    /// Width of the produced features, if fixed by the layer
    fn output_size(&self) -> Option<usize>;

    /// Append this layer's parameters under `prefix`
    fn state_dict(&self, _prefix: &str, _state: &mut StateDict) {}

    /// Restore this layer's parameters from entries under `prefix`
    fn load_state_dict(&mut self, _prefix: &str, _state: &StateDict) -> Result<()> {
        Ok(())
    }
}
