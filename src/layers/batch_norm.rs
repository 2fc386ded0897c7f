use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Serialize, Deserialize};

use crate::checkpoint::{put_param, take_param, StateDict};
use crate::error::{EmcomError, Result};
use super::traits::Layer as LayerTrait;

/// Batch Normalization Layer
///
/// Normalizes the inputs across the batch dimension to have mean 0 and variance 1,
/// then optionally scales and shifts using gamma and beta. In training mode the
/// batch statistics are used and folded into the running estimates; in evaluation
/// mode the running estimates are used.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BatchNormLayer {
    /// Scale parameter (gamma), absent for non-affine normalization
    pub gamma: Option<Array1<f32>>,

    /// Shift parameter (beta), absent for non-affine normalization
    pub beta: Option<Array1<f32>>,

    pub running_mean: Array1<f32>,
    pub running_var: Array1<f32>,
    pub momentum: f32,
    pub epsilon: f32,
    pub training: bool,
}

impl BatchNormLayer {
    pub fn new(num_features: usize, momentum: f32, epsilon: f32) -> Self {
        BatchNormLayer {
            gamma: Some(Array1::ones(num_features)),
            beta: Some(Array1::zeros(num_features)),
            running_mean: Array1::zeros(num_features),
            running_var: Array1::ones(num_features),
            momentum,
            epsilon,
            training: true,
        }
    }

    /// Normalization without learnable scale and shift
    pub fn non_affine(num_features: usize, momentum: f32, epsilon: f32) -> Self {
        BatchNormLayer {
            gamma: None,
            beta: None,
            ..Self::new(num_features, momentum, epsilon)
        }
    }

    pub fn num_features(&self) -> usize {
        self.running_mean.len()
    }
}

impl LayerTrait for BatchNormLayer {
    fn forward_batch(&mut self, inputs: ArrayView2<f32>) -> Result<Array2<f32>> {
        if inputs.ncols() != self.num_features() {
            return Err(EmcomError::dimension_mismatch(
                format!("{} features", self.num_features()),
                format!("{} features", inputs.ncols()),
            ));
        }

        // a single example carries no batch statistics
        let (mean, var) = if self.training && inputs.nrows() > 1 {
            let mean = inputs.mean_axis(Axis(0)).ok_or_else(|| {
                EmcomError::Computation("batch norm over an empty batch".to_string())
            })?;
            let var = inputs.var_axis(Axis(0), 0.0);
            self.running_mean = &self.running_mean * (1.0 - self.momentum) + &mean * self.momentum;
            self.running_var = &self.running_var * (1.0 - self.momentum) + &var * self.momentum;
            (mean, var)
        } else {
            (self.running_mean.clone(), self.running_var.clone())
        };

        let std = var.mapv(|v| (v + self.epsilon).sqrt());
        let mut output = (&inputs - &mean.insert_axis(Axis(0))) / &std.insert_axis(Axis(0));
        if let Some(gamma) = &self.gamma {
            output *= &gamma.view().insert_axis(Axis(0));
        }
        if let Some(beta) = &self.beta {
            output += &beta.view().insert_axis(Axis(0));
        }
        Ok(output)
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn output_size(&self) -> Option<usize> {
        Some(self.num_features())
    }

    fn state_dict(&self, prefix: &str, state: &mut StateDict) {
        if let Some(gamma) = &self.gamma {
            put_param(state, format!("{}weight", prefix), gamma);
        }
        if let Some(beta) = &self.beta {
            put_param(state, format!("{}bias", prefix), beta);
        }
        put_param(state, format!("{}running_mean", prefix), &self.running_mean);
        put_param(state, format!("{}running_var", prefix), &self.running_var);
    }

    fn load_state_dict(&mut self, prefix: &str, state: &StateDict) -> Result<()> {
        if let Some(gamma) = &self.gamma {
            self.gamma = Some(take_param(state, &format!("{}weight", prefix), gamma)?);
        }
        if let Some(beta) = &self.beta {
            self.beta = Some(take_param(state, &format!("{}bias", prefix), beta)?);
        }
        self.running_mean = take_param(state, &format!("{}running_mean", prefix), &self.running_mean)?;
        self.running_var = take_param(state, &format!("{}running_var", prefix), &self.running_var)?;
        Ok(())
    }
}
