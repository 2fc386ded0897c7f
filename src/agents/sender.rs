use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Gumbel;

use crate::activations::softmax_rows;
use crate::checkpoint::StateDict;
use crate::error::{EmcomError, Result};
use crate::network::Mlp;
use super::traits::{Annealable, Sender};

/// Sender projecting an image representation onto a vocabulary and emitting
/// a relaxed one-hot symbol.
///
/// While training the symbol is a Gumbel-softmax sample at the current
/// temperature (hardened to a one-hot when `straight_through` is set); in
/// evaluation it is the one-hot of the highest logit.
pub struct EmSslSender {
    fc: Mlp,
    temperature: f32,
    trainable_temperature: bool,
    straight_through: bool,
    training: bool,
    rng: StdRng,
}

impl EmSslSender {
    pub fn new(
        input_dim: usize,
        hidden_dim: usize,
        output_dim: usize,
        temperature: f32,
        trainable_temperature: bool,
        straight_through: bool,
        seed: u64,
    ) -> Result<Self> {
        if temperature <= 0.0 {
            return Err(EmcomError::configuration("gs_temperature", "temperature must be positive"));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let fc = Mlp::projection_head(input_dim, hidden_dim, output_dim, true, true, &mut rng)?;
        Ok(EmSslSender {
            fc,
            temperature,
            trainable_temperature,
            straight_through,
            training: true,
            rng,
        })
    }

    pub fn vocab_size(&self) -> Option<usize> {
        self.fc.output_size()
    }

    /// Current temperature, regardless of whether it is annealed or trained
    pub fn current_temperature(&self) -> f32 {
        self.temperature
    }
}

impl Sender for EmSslSender {
    fn send(&mut self, input: ArrayView2<f32>) -> Result<Array2<f32>> {
        let logits = self.fc.forward(input)?;
        if self.training {
            gumbel_softmax_sample(&logits, self.temperature, self.straight_through, &mut self.rng)
        } else {
            Ok(one_hot_argmax(&logits))
        }
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
        self.fc.set_training(training);
    }

    fn as_annealable(&self) -> Option<&dyn Annealable> {
        if self.trainable_temperature {
            None
        } else {
            Some(self)
        }
    }

    fn as_annealable_mut(&mut self) -> Option<&mut dyn Annealable> {
        if self.trainable_temperature {
            None
        } else {
            Some(self)
        }
    }

    fn state_dict(&self) -> StateDict {
        self.fc.state_dict()
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        self.fc.load_state_dict(state)
    }
}

impl Annealable for EmSslSender {
    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn set_temperature(&mut self, temperature: f32) {
        self.temperature = temperature;
    }
}

/// Softmax of `(logits + g) / temperature` with standard Gumbel noise `g`.
pub fn gumbel_softmax_sample<R: Rng + ?Sized>(
    logits: &Array2<f32>,
    temperature: f32,
    straight_through: bool,
    rng: &mut R,
) -> Result<Array2<f32>> {
    let gumbel = Gumbel::new(0.0f32, 1.0f32).map_err(|e| EmcomError::Computation(e.to_string()))?;
    let perturbed = logits.mapv(|l| (l + rng.sample(gumbel)) / temperature);
    let sample = softmax_rows(&perturbed);
    if straight_through {
        Ok(one_hot_argmax(&sample))
    } else {
        Ok(sample)
    }
}

/// One-hot encoding of each row's largest entry (first one on ties)
pub fn one_hot_argmax(values: &Array2<f32>) -> Array2<f32> {
    let mut out = Array2::zeros(values.dim());
    for (i, row) in values.axis_iter(Axis(0)).enumerate() {
        if let Some(j) = argmax(row.iter().copied()) {
            out[[i, j]] = 1.0;
        }
    }
    out
}

pub(crate) fn argmax<I: Iterator<Item = f32>>(values: I) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, v) in values.enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
