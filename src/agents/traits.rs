use ndarray::{Array2, ArrayView2};

use crate::checkpoint::StateDict;
use crate::error::Result;

/// Capability of agents whose output sharpness is controlled by a temperature
/// that can be annealed during training.
pub trait Annealable {
    fn temperature(&self) -> f32;

    fn set_temperature(&mut self, temperature: f32);
}

/// An agent that turns an input representation into a message
pub trait Sender {
    fn send(&mut self, input: ArrayView2<f32>) -> Result<Array2<f32>>;

    /// Switch between training and evaluation behaviour
    fn set_training(&mut self, _training: bool) {}

    /// The annealing capability, when the agent declares it
    fn as_annealable(&self) -> Option<&dyn Annealable> {
        None
    }

    fn as_annealable_mut(&mut self) -> Option<&mut dyn Annealable> {
        None
    }

    fn state_dict(&self) -> StateDict {
        StateDict::new()
    }

    fn load_state_dict(&mut self, _state: &StateDict) -> Result<()> {
        Ok(())
    }
}

/// An agent that consumes a message together with its own view of the input
pub trait Receiver {
    fn receive(&mut self, message: ArrayView2<f32>, receiver_input: ArrayView2<f32>) -> Result<Array2<f32>>;

    fn set_training(&mut self, _training: bool) {}

    fn state_dict(&self) -> StateDict {
        StateDict::new()
    }

    fn load_state_dict(&mut self, _state: &StateDict) -> Result<()> {
        Ok(())
    }
}
