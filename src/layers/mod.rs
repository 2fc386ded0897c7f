pub mod traits;
pub mod dense;
pub mod batch_norm;
pub mod initialization;

pub use traits::Layer as LayerTrait;
pub use dense::DenseLayer;
pub use batch_norm::BatchNormLayer;
pub use initialization::WeightInit;

use ndarray::{Array2, ArrayView2};
use crate::activations::Activation;
use crate::error::Result;

/// Activations slot into a layer stack as parameter-free layers
impl LayerTrait for Activation {
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut outputs = inputs.to_owned();
        self.apply_batch(&mut outputs);
        Ok(outputs)
    }

    fn output_size(&self) -> Option<usize> {
        None
    }
}
