//! # Evaluation
//!
//! Drives a trained population over a fixed dataset and merges every
//! per-pair interaction into one aggregate record.
//!
//! Each batch is played `n_senders * n_recvs` times. In
//! [`EvaluationMode::Exhaustive`] the pairs are enumerated row-major
//! (sender-major), so every combination is covered exactly once per batch. In
//! [`EvaluationMode::Sampled`] every play draws its pair from the population
//! sampler, so full coverage is only likely.

use ndarray::{Array3, Array4, ArrayD, Axis};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::agents::sender::argmax;
use crate::data::Batch;
use crate::error::{EmcomError, Result};
use crate::game::{Game, PairwiseGame};
use crate::interaction::Interaction;
use crate::population::{RECV_IDX_KEY, SENDER_IDX_KEY};

/// File written by [`save_interaction`]
pub const INTERACTION_FILE: &str = "interactions_test_set.bin";

/// How sender/receiver pairs are chosen during evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    /// Draw each pair from the population sampler
    Sampled,
    /// Enumerate every (sender, receiver) pair once per batch
    #[default]
    Exhaustive,
}

impl std::str::FromStr for EvaluationMode {
    type Err = EmcomError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sampled" => Ok(EvaluationMode::Sampled),
            "exhaustive" => Ok(EvaluationMode::Exhaustive),
            other => Err(EmcomError::configuration("mode", format!("unknown evaluation mode '{}'", other))),
        }
    }
}

/// Run the game over every batch and return the mean loss with the merged
/// interaction.
///
/// `n_senders` and `n_recvs` must match the game's pools. The game is
/// switched to evaluation mode first. The first failing play
/// aborts the whole evaluation and its error is returned as is.
pub fn evaluate<G, I>(
    game: &mut G,
    data: I,
    n_senders: usize,
    n_recvs: usize,
    mode: EvaluationMode,
) -> Result<(f32, Interaction)>
where
    G: PairwiseGame + ?Sized,
    I: IntoIterator<Item = Batch>,
{
    if n_senders == 0 || n_recvs == 0 {
        return Err(EmcomError::configuration(
            "population",
            format!("cannot evaluate {} senders against {} receivers", n_senders, n_recvs),
        ));
    }
    if n_senders != game.n_senders() || n_recvs != game.n_receivers() {
        return Err(EmcomError::configuration(
            "population",
            format!(
                "asked for {}x{} pairs but the population has {} senders and {} receivers",
                n_senders,
                n_recvs,
                game.n_senders(),
                game.n_receivers()
            ),
        ));
    }

    game.eval();
    let mut total_loss = 0.0f64;
    let mut interactions = Vec::new();
    let mut n_batches = 0usize;

    for batch in data {
        match mode {
            EvaluationMode::Sampled => {
                for _ in 0..n_senders * n_recvs {
                    let (loss, interaction) = game.forward(&batch)?;
                    total_loss += loss as f64;
                    interactions.push(interaction);
                }
            }
            EvaluationMode::Exhaustive => {
                for sender_idx in 0..n_senders {
                    for recv_idx in 0..n_recvs {
                        let (loss, interaction) = game.forward_pair(sender_idx, recv_idx, &batch)?;
                        total_loss += loss as f64;
                        interactions.push(interaction);
                    }
                }
            }
        }
        n_batches += 1;
        debug!(batch = n_batches, size = batch.size(), "evaluated batch");
    }

    if n_batches == 0 {
        return Err(EmcomError::configuration("dataset", "no batches to evaluate"));
    }

    let plays = n_batches * n_senders * n_recvs;
    let mean_loss = (total_loss / plays as f64) as f32;
    let full_interaction = Interaction::from_iterable(interactions)?;
    info!(batches = n_batches, plays, examples = full_interaction.size(), mean_loss, "evaluation finished");
    Ok((mean_loss, full_interaction))
}

/// Add `reshaped_receiver_output` (batches × pairs × batch_size × output
/// width) and `reshaped_message` (batches × pairs × batch_size symbol ids)
/// to the aux of an aggregate produced by [`evaluate`].
pub fn add_reshaped_interaction_fields(
    interaction: &mut Interaction,
    n_senders: usize,
    n_recvs: usize,
    batch_size: usize,
) -> Result<()> {
    let pairs = n_senders * n_recvs;
    let block = pairs * batch_size;
    let total = interaction.size();
    if block == 0 || total % block != 0 {
        return Err(EmcomError::configuration(
            "interaction",
            format!("{} examples do not split into blocks of {} pairs x {} rows", total, pairs, batch_size),
        ));
    }
    let n_batches = total / block;

    let output = interaction.receiver_output.as_ref().ok_or_else(|| {
        EmcomError::configuration("interaction", "missing required field 'receiver_output'")
    })?;
    let message = interaction.message.as_ref().ok_or_else(|| {
        EmcomError::configuration("interaction", "missing required field 'message'")
    })?;

    let width = output.ncols();
    let reshaped_output: Array4<f32> = output
        .as_standard_layout()
        .into_owned()
        .into_shape((n_batches, pairs, batch_size, width))
        .map_err(|e| EmcomError::dimension_mismatch("contiguous receiver output".to_string(), e.to_string()))?;

    let symbols: Vec<f32> = message
        .axis_iter(Axis(0))
        .map(|row| argmax(row.iter().copied()).unwrap_or(0) as f32)
        .collect();
    let reshaped_message = Array3::from_shape_vec((n_batches, pairs, batch_size), symbols)
        .map_err(|e| EmcomError::dimension_mismatch(format!("{} symbols", total), e.to_string()))?;

    interaction.aux.insert("reshaped_receiver_output".to_string(), reshaped_output.into_dyn());
    interaction.aux.insert("reshaped_message".to_string(), reshaped_message.into_dyn());
    Ok(())
}

/// Mean `acc` for every (sender, receiver) pair present in the interaction
pub fn pair_accuracy(interaction: &Interaction) -> Result<BTreeMap<(usize, usize), f32>> {
    let acc = interaction.aux_field("acc")?;
    let senders = interaction.aux_field(SENDER_IDX_KEY)?;
    let receivers = interaction.aux_field(RECV_IDX_KEY)?;
    if acc.len() != senders.len() || acc.len() != receivers.len() {
        return Err(EmcomError::dimension_mismatch(
            format!("{} pair tags", acc.len()),
            format!("{} sender and {} receiver tags", senders.len(), receivers.len()),
        ));
    }

    let mut sums: BTreeMap<(usize, usize), (f32, usize)> = BTreeMap::new();
    for ((a, s), r) in flat(acc).zip(flat(senders)).zip(flat(receivers)) {
        let entry = sums.entry((s as usize, r as usize)).or_insert((0.0, 0));
        entry.0 += a;
        entry.1 += 1;
    }
    Ok(sums.into_iter().map(|(pair, (sum, n))| (pair, sum / n as f32)).collect())
}

fn flat(values: &ArrayD<f32>) -> impl Iterator<Item = f32> + '_ {
    values.iter().copied()
}

/// Write the interaction to `interactions_test_set.bin` inside `dir`,
/// creating the directory when needed.
pub fn save_interaction<P: AsRef<Path>>(interaction: &Interaction, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(INTERACTION_FILE);
    let serialized = bincode::serialize(interaction)?;
    let mut file = fs::File::create(&path)?;
    file.write_all(&serialized)?;
    info!(path = %path.display(), examples = interaction.size(), "saved interaction");
    Ok(path)
}

/// Read back an interaction written by [`save_interaction`]
pub fn load_interaction<P: AsRef<Path>>(path: P) -> Result<Interaction> {
    let mut file = fs::File::open(path.as_ref())?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(bincode::deserialize(&buffer)?)
}
