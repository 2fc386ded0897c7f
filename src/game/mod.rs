//! # Games
//!
//! A [`CommunicationGame`] plays one round between an explicitly supplied
//! sender, receiver and loss. A [`Game`] is what a training or evaluation
//! driver calls: it owns its agents and only needs a batch.

pub mod symbol;
pub mod vision;

pub use symbol::SymbolGame;
pub use vision::VisionGame;

use crate::agents::{Receiver, Sender};
use crate::checkpoint::StateDict;
use crate::data::Batch;
use crate::error::Result;
use crate::interaction::Interaction;
use crate::loss::Loss;

/// Two-player round with injected participants
pub trait CommunicationGame {
    /// Message generation by the sender, consumption by the receiver, then
    /// loss evaluation. Returns the scalar loss and the logged interaction.
    fn play(
        &mut self,
        sender: &mut dyn Sender,
        receiver: &mut dyn Receiver,
        loss: &dyn Loss,
        batch: &Batch,
    ) -> Result<(f32, Interaction)>;

    fn set_training(&mut self, training: bool);

    /// Parameters owned by the game itself, not by the agents
    fn state_dict(&self) -> StateDict {
        StateDict::new()
    }

    fn load_state_dict(&mut self, _state: &StateDict) -> Result<()> {
        Ok(())
    }
}

/// A game that owns its participants
pub trait Game {
    fn forward(&mut self, batch: &Batch) -> Result<(f32, Interaction)>;

    /// Put every component in training mode
    fn train(&mut self);

    /// Put every component in evaluation mode
    fn eval(&mut self);
}

/// A game whose sender/receiver pairing can be chosen by the caller
pub trait PairwiseGame: Game {
    fn n_senders(&self) -> usize;

    fn n_receivers(&self) -> usize;

    fn forward_pair(&mut self, sender_idx: usize, recv_idx: usize, batch: &Batch) -> Result<(f32, Interaction)>;
}
