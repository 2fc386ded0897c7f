use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::Rng;

use crate::error::{EmcomError, Result};

/// Weight initialization strategies
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WeightInit {
    /// Xavier/Glorot uniform initialization
    #[default]
    XavierUniform,

    /// He/Kaiming uniform initialization (for ReLU)
    HeUniform,
}

impl WeightInit {
    /// Initialize a `(fan_in, fan_out)` weight matrix from the given random source
    pub fn initialize_weights<R: Rng + ?Sized>(&self, shape: (usize, usize), rng: &mut R) -> Result<Array2<f32>> {
        let (fan_in, fan_out) = shape;
        if fan_in == 0 || fan_out == 0 {
            return Err(EmcomError::configuration(
                "layer",
                format!("cannot initialize a {}x{} weight matrix", fan_in, fan_out),
            ));
        }

        let limit = match *self {
            WeightInit::XavierUniform => (6.0 / (fan_in + fan_out) as f32).sqrt(),
            WeightInit::HeUniform => (6.0 / fan_in as f32).sqrt(),
        };
        Ok(Array2::random_using(shape, Uniform::new(-limit, limit), rng))
    }

    /// Biases always start at zero
    pub fn initialize_biases(&self, size: usize) -> Array1<f32> {
        Array1::zeros(size)
    }
}
