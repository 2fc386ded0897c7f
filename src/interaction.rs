//! Batch-aligned records of what happened during a forward pass.

use ndarray::{concatenate, Array, Array1, Array2, ArrayD, Axis, RemoveAxis};
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::error::{EmcomError, Result};

/// Auxiliary per-example metrics keyed by name; axis 0 is the batch axis.
pub type Aux = BTreeMap<String, ArrayD<f32>>;

/// Inputs, messages, outputs and metrics of one or more forward passes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub sender_input: Option<Array2<f32>>,
    pub receiver_input: Option<Array2<f32>>,
    pub labels: Option<Array1<usize>>,
    pub message: Option<Array2<f32>>,
    pub receiver_output: Option<Array2<f32>>,
    pub message_length: Option<Array1<f32>>,
    pub aux: Aux,
}

impl Interaction {
    /// Number of examples in the record
    pub fn size(&self) -> usize {
        let candidates = [
            self.sender_input.as_ref().map(|a| a.nrows()),
            self.receiver_input.as_ref().map(|a| a.nrows()),
            self.labels.as_ref().map(|a| a.len()),
            self.message.as_ref().map(|a| a.nrows()),
            self.receiver_output.as_ref().map(|a| a.nrows()),
            self.message_length.as_ref().map(|a| a.len()),
        ];
        candidates
            .into_iter()
            .flatten()
            .next()
            .or_else(|| self.aux.values().next().and_then(|a| a.shape().first().copied()))
            .unwrap_or(0)
    }

    /// Fetch an aux entry, failing when it was never recorded
    pub fn aux_field(&self, key: &str) -> Result<&ArrayD<f32>> {
        self.aux.get(key).ok_or_else(|| {
            EmcomError::configuration("interaction.aux", format!("missing required field '{}'", key))
        })
    }

    /// Mean over every element of an aux entry
    pub fn aux_mean(&self, key: &str) -> Result<f32> {
        self.aux_field(key)?.mean().ok_or_else(|| {
            EmcomError::configuration("interaction.aux", format!("field '{}' is empty", key))
        })
    }

    /// Merge records along the batch axis, preserving their order.
    ///
    /// A field must be present in every record or in none of them, and all
    /// records must carry the same aux keys.
    pub fn from_iterable<I>(interactions: I) -> Result<Interaction>
    where
        I: IntoIterator<Item = Interaction>,
    {
        let parts: Vec<Interaction> = interactions.into_iter().collect();
        if parts.is_empty() {
            return Err(EmcomError::configuration("interactions", "no interactions to merge"));
        }

        let keys: Vec<&String> = parts[0].aux.keys().collect();
        for (i, part) in parts.iter().enumerate().skip(1) {
            if part.aux.keys().collect::<Vec<_>>() != keys {
                return Err(EmcomError::configuration(
                    "interactions",
                    format!("record {} has aux keys {:?}, expected {:?}", i, part.aux.keys().collect::<Vec<_>>(), keys),
                ));
            }
        }

        let mut aux = Aux::new();
        for key in &keys {
            let views: Vec<_> = parts.iter().map(|p| p.aux[key.as_str()].view()).collect();
            let merged = concatenate(Axis(0), &views)
                .map_err(|e| EmcomError::dimension_mismatch(format!("compatible shapes for aux '{}'", key), e.to_string()))?;
            aux.insert((*key).clone(), merged);
        }

        Ok(Interaction {
            sender_input: merge_field("sender_input", parts.iter().map(|p| p.sender_input.as_ref()))?,
            receiver_input: merge_field("receiver_input", parts.iter().map(|p| p.receiver_input.as_ref()))?,
            labels: merge_field("labels", parts.iter().map(|p| p.labels.as_ref()))?,
            message: merge_field("message", parts.iter().map(|p| p.message.as_ref()))?,
            receiver_output: merge_field("receiver_output", parts.iter().map(|p| p.receiver_output.as_ref()))?,
            message_length: merge_field("message_length", parts.iter().map(|p| p.message_length.as_ref()))?,
            aux,
        })
    }
}

fn merge_field<'a, A, D, I>(name: &str, parts: I) -> Result<Option<Array<A, D>>>
where
    A: Clone + 'a,
    D: RemoveAxis + 'a,
    I: Iterator<Item = Option<&'a Array<A, D>>>,
{
    let parts: Vec<_> = parts.collect();
    let present = parts.iter().filter(|p| p.is_some()).count();
    if present == 0 {
        return Ok(None);
    }
    if present != parts.len() {
        return Err(EmcomError::configuration(
            "interactions",
            format!("field '{}' is present in {} of {} records", name, present, parts.len()),
        ));
    }
    let views: Vec<_> = parts.into_iter().flatten().map(|a| a.view()).collect();
    concatenate(Axis(0), &views)
        .map(Some)
        .map_err(|e| EmcomError::dimension_mismatch(format!("compatible shapes for '{}'", name), e.to_string()))
}

/// Which parts of a forward pass are kept in the returned [`Interaction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingStrategy {
    pub store_sender_input: bool,
    pub store_receiver_input: bool,
    pub store_labels: bool,
    pub store_message: bool,
    pub store_receiver_output: bool,
    pub store_message_length: bool,
}

impl Default for LoggingStrategy {
    fn default() -> Self {
        LoggingStrategy {
            store_sender_input: true,
            store_receiver_input: true,
            store_labels: true,
            store_message: true,
            store_receiver_output: true,
            store_message_length: true,
        }
    }
}

impl LoggingStrategy {
    /// Keep labels, messages and receiver outputs only
    pub fn population_game() -> Self {
        LoggingStrategy {
            store_sender_input: false,
            store_receiver_input: false,
            store_labels: true,
            store_message: true,
            store_receiver_output: true,
            store_message_length: false,
        }
    }

    pub fn filtered_interaction(&self, full: Interaction) -> Interaction {
        Interaction {
            sender_input: full.sender_input.filter(|_| self.store_sender_input),
            receiver_input: full.receiver_input.filter(|_| self.store_receiver_input),
            labels: full.labels.filter(|_| self.store_labels),
            message: full.message.filter(|_| self.store_message),
            receiver_output: full.receiver_output.filter(|_| self.store_receiver_output),
            message_length: full.message_length.filter(|_| self.store_message_length),
            aux: full.aux,
        }
    }
}
