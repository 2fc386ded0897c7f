use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::checkpoint::{put_param, take_param, StateDict};
use crate::error::{EmcomError, Result};
use super::initialization::WeightInit;
use super::traits::Layer as LayerTrait;

/// A fully connected (dense) layer
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DenseLayer {
    pub weights: Array2<f32>,
    pub biases: Option<Array1<f32>>,
    pub activation: Activation,
}

impl DenseLayer {
    /// Create a new dense layer with Xavier-uniform weights drawn from `rng`
    /// and zero biases.
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, activation: Activation, rng: &mut R) -> Result<Self> {
        Self::with_init(input_size, output_size, activation, WeightInit::XavierUniform, rng)
    }

    pub fn with_init<R: Rng + ?Sized>(
        input_size: usize,
        output_size: usize,
        activation: Activation,
        init: WeightInit,
        rng: &mut R,
    ) -> Result<Self> {
        let weights = init.initialize_weights((input_size, output_size), rng)?;
        let biases = Some(init.initialize_biases(output_size));
        Ok(DenseLayer { weights, biases, activation })
    }

    /// Drop the bias term
    pub fn without_bias(mut self) -> Self {
        self.biases = None;
        self
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }
}

impl LayerTrait for DenseLayer {
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if inputs.ncols() != self.input_size() {
            return Err(EmcomError::dimension_mismatch(
                format!("{} input features", self.input_size()),
                format!("{} input features", inputs.ncols()),
            ));
        }
        let mut outputs = inputs.dot(&self.weights);
        if let Some(biases) = &self.biases {
            outputs += &biases.view().insert_axis(Axis(0));
        }
        self.activation.apply_batch(&mut outputs);
        Ok(outputs)
    }

    fn output_size(&self) -> Option<usize> {
        Some(self.weights.shape()[1])
    }

    fn state_dict(&self, prefix: &str, state: &mut StateDict) {
        put_param(state, format!("{}weight", prefix), &self.weights);
        if let Some(biases) = &self.biases {
            put_param(state, format!("{}bias", prefix), biases);
        }
    }

    fn load_state_dict(&mut self, prefix: &str, state: &StateDict) -> Result<()> {
        self.weights = take_param(state, &format!("{}weight", prefix), &self.weights)?;
        if let Some(biases) = &self.biases {
            self.biases = Some(take_param(state, &format!("{}bias", prefix), biases)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_dense_forward_with_known_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = DenseLayer::new(2, 2, Activation::Linear, &mut rng).unwrap();
        layer.weights = array![[1.0, 0.0], [0.0, 2.0]];
        layer.biases = Some(array![0.5, -1.0]);

        let out = layer.forward_batch(array![[1.0, 1.0], [2.0, 3.0]].view()).unwrap();
        assert_eq!(out, array![[1.5, 1.0], [2.5, 5.0]]);
    }

    #[test]
    fn test_dense_rejects_wrong_width() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut layer = DenseLayer::new(3, 2, Activation::Relu, &mut rng).unwrap();
        let err = layer.forward_batch(Array2::zeros((4, 5)).view()).unwrap_err();
        assert!(matches!(err, EmcomError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_dense_state_dict_without_bias() {
        let mut rng = StdRng::seed_from_u64(1);
        let layer = DenseLayer::new(3, 2, Activation::Linear, &mut rng).unwrap().without_bias();
        let mut state = StateDict::new();
        layer.state_dict("fc.3.", &mut state);
        assert_eq!(state.keys().collect::<Vec<_>>(), vec!["fc.3.weight"]);

        let mut other = DenseLayer::new(3, 2, Activation::Linear, &mut rng).unwrap().without_bias();
        other.load_state_dict("fc.3.", &state).unwrap();
        assert_eq!(other.weights, layer.weights);
    }
}
