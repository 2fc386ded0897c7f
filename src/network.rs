use ndarray::{Array2, ArrayView2};
use rand::Rng;

use crate::activations::Activation;
use crate::checkpoint::StateDict;
use crate::error::{EmcomError, Result};
use crate::layers::{BatchNormLayer, DenseLayer, LayerTrait};

const BN_MOMENTUM: f32 = 0.1;
const BN_EPSILON: f32 = 1e-5;

/// A stack of layers applied in order, used for projection heads and
/// vision encoders. Parameters are exposed as `fc.{i}.{name}`.
pub struct Mlp {
    pub layers: Vec<Box<dyn LayerTrait>>,
}

impl Mlp {
    pub fn new(layers: Vec<Box<dyn LayerTrait>>) -> Self {
        Mlp { layers }
    }

    /// Linear → BatchNorm → ReLU → Linear, optionally followed by a
    /// non-affine BatchNorm. The last linear layer has no bias when
    /// `final_bias` is false.
    pub fn projection_head<R: Rng + ?Sized>(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        final_bias: bool,
        final_norm: bool,
        rng: &mut R,
    ) -> Result<Self> {
        let mut last = DenseLayer::new(hidden_dim, output_dim, Activation::Linear, rng)?;
        if !final_bias {
            last = last.without_bias();
        }

        let mut layers: Vec<Box<dyn LayerTrait>> = vec![
            Box::new(DenseLayer::new(input_dim, hidden_dim, Activation::Linear, rng)?),
            Box::new(BatchNormLayer::new(hidden_dim, BN_MOMENTUM, BN_EPSILON)),
            Box::new(Activation::Relu),
            Box::new(last),
        ];
        if final_norm {
            layers.push(Box::new(BatchNormLayer::non_affine(output_dim, BN_MOMENTUM, BN_EPSILON)));
        }
        Ok(Mlp { layers })
    }

    /// Perform a forward pass for a batch of input vectors.
    pub fn forward(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut iter = self.layers.iter_mut();
        let first = iter
            .next()
            .ok_or_else(|| EmcomError::configuration("mlp", "network has no layers"))?;
        let mut current = first.forward_batch(inputs)?;
        for layer in iter {
            current = layer.forward_batch(current.view())?;
        }
        Ok(current)
    }

    pub fn set_training(&mut self, training: bool) {
        for layer in &mut self.layers {
            layer.set_training(training);
        }
    }

    /// Width of the final features
    pub fn output_size(&self) -> Option<usize> {
        self.layers.iter().rev().find_map(|l| l.output_size())
    }

    pub fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for (i, layer) in self.layers.iter().enumerate() {
            layer.state_dict(&format!("fc.{}.", i), &mut state);
        }
        state
    }

    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        for (i, layer) in self.layers.iter_mut().enumerate() {
            layer.load_state_dict(&format!("fc.{}.", i), state)?;
        }
        Ok(())
    }
}
