use ndarray::{Array2, Axis};
use serde::{Serialize, Deserialize};

/// An enumeration of the activation functions available to projection heads.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum Activation {
    #[default]
    Relu,
    Linear,
}

impl Activation {
    /// Apply the activation function to a batch of input arrays in-place.
    pub fn apply_batch(&self, inputs: &mut Array2<f32>) {
        match self {
            Activation::Relu => {
                inputs.mapv_inplace(|v| v.max(0.0));
            }
            Activation::Linear => {}
        }
    }
}

/// Row-wise numerically stable softmax.
pub fn softmax_rows(logits: &Array2<f32>) -> Array2<f32> {
    let mut out = logits.clone();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_relu_batch() {
        let mut x = array![[-1.0, 2.0], [0.5, -0.5]];
        Activation::Relu.apply_batch(&mut x);
        assert_eq!(x, array![[0.0, 2.0], [0.5, 0.0]]);
    }

    #[test]
    fn test_linear_is_identity() {
        let mut x = array![[-2.0, 3.0]];
        Activation::Linear.apply_batch(&mut x);
        assert_eq!(x, array![[-2.0, 3.0]]);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let logits = array![[1.0, 2.0, 3.0], [1000.0, 1000.0, -1000.0]];
        let probs = softmax_rows(&logits);
        for row in probs.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.0).abs() < 1e-5);
            assert!(row.iter().all(|p| p.is_finite()));
        }
        assert!((probs[[1, 0]] - 0.5).abs() < 1e-5);
    }
}
