use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::checkpoint::StateDict;
use crate::error::{EmcomError, Result};
use crate::network::Mlp;
use super::traits::Receiver;

/// Receiver projecting its own view of every candidate image into message
/// space. Scoring the projections against the message is left to the loss.
pub struct ProjectionReceiver {
    fc: Mlp,
    output_dim: usize,
}

impl ProjectionReceiver {
    pub fn new(input_dim: usize, hidden_dim: usize, output_dim: usize, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let fc = Mlp::projection_head(input_dim, hidden_dim, output_dim, false, false, &mut rng)?;
        Ok(ProjectionReceiver { fc, output_dim })
    }
}

impl Receiver for ProjectionReceiver {
    fn receive(&mut self, message: ArrayView2<f32>, receiver_input: ArrayView2<f32>) -> Result<Array2<f32>> {
        if message.ncols() != self.output_dim {
            return Err(EmcomError::dimension_mismatch(
                format!("message of width {}", self.output_dim),
                format!("message of width {}", message.ncols()),
            ));
        }
        if message.nrows() != receiver_input.nrows() {
            return Err(EmcomError::dimension_mismatch(
                format!("{} candidates", message.nrows()),
                format!("{} candidates", receiver_input.nrows()),
            ));
        }
        self.fc.forward(receiver_input)
    }

    fn set_training(&mut self, training: bool) {
        self.fc.set_training(training);
    }

    fn state_dict(&self) -> StateDict {
        self.fc.state_dict()
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        self.fc.load_state_dict(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_projects_candidates() {
        let mut r = ProjectionReceiver::new(6, 8, 4, 3).unwrap();
        let out = r.receive(Array2::zeros((5, 4)).view(), Array2::ones((5, 6)).view()).unwrap();
        assert_eq!(out.dim(), (5, 4));
    }

    #[test]
    fn test_receive_checks_message_shape() {
        let mut r = ProjectionReceiver::new(6, 8, 4, 3).unwrap();
        assert!(r.receive(Array2::zeros((5, 3)).view(), Array2::ones((5, 6)).view()).is_err());
        assert!(r.receive(Array2::zeros((2, 4)).view(), Array2::ones((5, 6)).view()).is_err());
    }

    #[test]
    fn test_projection_head_has_no_final_bias() {
        let r = ProjectionReceiver::new(6, 8, 4, 3).unwrap();
        let state = r.state_dict();
        assert!(state.contains_key("fc.3.weight"));
        assert!(!state.contains_key("fc.3.bias"));
    }
}
