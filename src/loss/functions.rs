use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Serialize, Deserialize};

use crate::agents::sender::argmax;
use crate::error::{EmcomError, Result};
use crate::interaction::Aux;

/// Trait defining the interface for game losses
pub trait Loss {
    /// Score one forward pass, returning the scalar loss and per-example
    /// auxiliary metrics
    fn compute(
        &self,
        sender_input: ArrayView2<f32>,
        message: ArrayView2<f32>,
        receiver_input: ArrayView2<f32>,
        receiver_output: ArrayView2<f32>,
        labels: ArrayView1<usize>,
    ) -> Result<(f32, Aux)>;
}

/// How messages are compared with receiver outputs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    #[default]
    Cosine,
    Dot,
}

impl Similarity {
    /// `(n, m)` matrix of similarities between the rows of `a` and `b`
    pub fn matrix(&self, a: ArrayView2<f32>, b: ArrayView2<f32>) -> Array2<f32> {
        match self {
            Similarity::Dot => a.dot(&b.t()),
            Similarity::Cosine => {
                let eps = 1e-8;
                let a_norm = row_norms(a).mapv(|n| n.max(eps));
                let b_norm = row_norms(b).mapv(|n| n.max(eps));
                let mut sim = a.dot(&b.t());
                sim /= &a_norm.insert_axis(Axis(1));
                sim /= &b_norm.insert_axis(Axis(0));
                sim
            }
        }
    }
}

fn row_norms(x: ArrayView2<f32>) -> Array1<f32> {
    x.map_axis(Axis(1), |row| row.dot(&row).sqrt())
}

/// Cross-entropy over the candidate set: example `i` is correct when its
/// message is most similar to receiver output `i`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct XEntLoss {
    pub temperature: f32,
    pub similarity: Similarity,
}

impl XEntLoss {
    pub fn new(temperature: f32, similarity: Similarity) -> Result<Self> {
        if temperature <= 0.0 {
            return Err(EmcomError::configuration("loss_temperature", "temperature must be positive"));
        }
        Ok(XEntLoss { temperature, similarity })
    }
}

impl Loss for XEntLoss {
    fn compute(
        &self,
        _sender_input: ArrayView2<f32>,
        message: ArrayView2<f32>,
        _receiver_input: ArrayView2<f32>,
        receiver_output: ArrayView2<f32>,
        _labels: ArrayView1<usize>,
    ) -> Result<(f32, Aux)> {
        if message.dim() != receiver_output.dim() {
            return Err(EmcomError::dimension_mismatch(
                format!("receiver output of shape {:?}", message.dim()),
                format!("{:?}", receiver_output.dim()),
            ));
        }
        let batch_size = message.nrows();
        if batch_size == 0 {
            return Err(EmcomError::Computation("loss over an empty batch".to_string()));
        }

        let guesses = self.similarity.matrix(message, receiver_output) / self.temperature;

        let mut total = 0.0;
        let mut acc = Array1::<f32>::zeros(batch_size);
        for (i, row) in guesses.axis_iter(Axis(0)).enumerate() {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let log_sum_exp = max + row.iter().map(|&v| (v - max).exp()).sum::<f32>().ln();
            total += log_sum_exp - row[i];
            if argmax(row.iter().copied()) == Some(i) {
                acc[i] = 1.0;
            }
        }

        let mut aux = Aux::new();
        aux.insert("acc".to_string(), acc.into_dyn());
        Ok((total / batch_size as f32, aux))
    }
}
