//! # Population Module
//!
//! Pools of senders, receivers and losses, the uniform sampler that picks a
//! (sender, receiver, loss) triple for every step, and the game wrapper that
//! plays each step with the sampled triple.
//!
//! ## Core Concepts
//!
//! - **Population**: fixed, non-empty pools of agents and losses
//! - **Uniform sampling**: independent draws with replacement from each pool,
//!   driven by an explicitly seeded random source
//! - **Pair tagging**: every interaction records which sender and receiver
//!   produced it, under the `sender_idx` and `recv_idx` aux keys

pub mod sampler;
pub mod game;

pub use sampler::{AgentDraw, Sample, UniformAgentSampler};
pub use game::{PopulationGame, RECV_IDX_KEY, SENDER_IDX_KEY};

use crate::agents::{Receiver, Sender};
use crate::checkpoint::{extend_prefixed, sub_state, StateDict};
use crate::error::{EmcomError, Result};
use crate::loss::Loss;

/// Fixed pools of senders, receivers and losses
pub struct Population {
    senders: Vec<Box<dyn Sender>>,
    receivers: Vec<Box<dyn Receiver>>,
    losses: Vec<Box<dyn Loss>>,
}

impl Population {
    pub fn new(
        senders: Vec<Box<dyn Sender>>,
        receivers: Vec<Box<dyn Receiver>>,
        losses: Vec<Box<dyn Loss>>,
    ) -> Result<Self> {
        if senders.is_empty() {
            return Err(EmcomError::configuration("senders", "sender pool is empty"));
        }
        if receivers.is_empty() {
            return Err(EmcomError::configuration("receivers", "receiver pool is empty"));
        }
        if losses.is_empty() {
            return Err(EmcomError::configuration("losses", "loss pool is empty"));
        }
        Ok(Population { senders, receivers, losses })
    }

    pub fn n_senders(&self) -> usize {
        self.senders.len()
    }

    pub fn n_receivers(&self) -> usize {
        self.receivers.len()
    }

    pub fn n_losses(&self) -> usize {
        self.losses.len()
    }

    pub fn sender(&self, idx: usize) -> Option<&dyn Sender> {
        self.senders.get(idx).map(|s| s.as_ref())
    }

    pub fn sender_mut(&mut self, idx: usize) -> Option<&mut (dyn Sender + 'static)> {
        self.senders.get_mut(idx).map(|s| s.as_mut())
    }

    pub fn receiver(&self, idx: usize) -> Option<&dyn Receiver> {
        self.receivers.get(idx).map(|r| r.as_ref())
    }

    /// Borrow the triple at the given positions
    pub fn select(&mut self, draw: AgentDraw) -> Result<Sample<'_>> {
        let n_senders = self.senders.len();
        let n_receivers = self.receivers.len();
        let n_losses = self.losses.len();
        let sender = self.senders.get_mut(draw.sender_idx).ok_or_else(|| {
            EmcomError::configuration("senders", format!("index {} out of {} senders", draw.sender_idx, n_senders))
        })?;
        let receiver = self.receivers.get_mut(draw.recv_idx).ok_or_else(|| {
            EmcomError::configuration("receivers", format!("index {} out of {} receivers", draw.recv_idx, n_receivers))
        })?;
        let loss = self.losses.get(draw.loss_idx).ok_or_else(|| {
            EmcomError::configuration("losses", format!("index {} out of {} losses", draw.loss_idx, n_losses))
        })?;
        Ok(Sample {
            sender_idx: draw.sender_idx,
            recv_idx: draw.recv_idx,
            loss_idx: draw.loss_idx,
            sender: sender.as_mut(),
            receiver: receiver.as_mut(),
            loss: loss.as_ref(),
        })
    }

    pub fn set_training(&mut self, training: bool) {
        for sender in &mut self.senders {
            sender.set_training(training);
        }
        for receiver in &mut self.receivers {
            receiver.set_training(training);
        }
    }

    /// Agent parameters under `senders.{i}.` and `receivers.{i}.`
    pub fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for (i, sender) in self.senders.iter().enumerate() {
            extend_prefixed(&mut state, &format!("senders.{}.", i), sender.state_dict());
        }
        for (i, receiver) in self.receivers.iter().enumerate() {
            extend_prefixed(&mut state, &format!("receivers.{}.", i), receiver.state_dict());
        }
        state
    }

    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        for (i, sender) in self.senders.iter_mut().enumerate() {
            sender.load_state_dict(&sub_state(state, &format!("senders.{}.", i)))?;
        }
        for (i, receiver) in self.receivers.iter_mut().enumerate() {
            receiver.load_state_dict(&sub_state(state, &format!("receivers.{}.", i)))?;
        }
        Ok(())
    }
}
