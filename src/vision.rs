//! Image encoders feeding the agents.
//!
//! An encoder turns flattened images into visual features. Sender and
//! receiver either share one encoder or own one each.

use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Serialize, Deserialize};

use crate::activations::Activation;
use crate::checkpoint::{extend_prefixed, sub_state, StateDict};
use crate::error::{EmcomError, Result};
use crate::layers::{DenseLayer, LayerTrait, WeightInit};
use crate::network::Mlp;

/// Encoder architectures known to the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncoderArch {
    /// Single ReLU projection
    #[default]
    Linear,
    /// Two ReLU projections through a hidden layer of the same width as the output
    TwoLayer,
}

/// Maps flattened images to visual features
pub struct ImageEncoder {
    net: Mlp,
    features_dim: usize,
}

impl ImageEncoder {
    pub fn new(arch: EncoderArch, image_dim: usize, features_dim: usize, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers: Vec<Box<dyn LayerTrait>> = Vec::new();
        match arch {
            EncoderArch::Linear => {
                layers.push(Box::new(DenseLayer::with_init(image_dim, features_dim, Activation::Relu, WeightInit::HeUniform, &mut rng)?));
            }
            EncoderArch::TwoLayer => {
                layers.push(Box::new(DenseLayer::with_init(image_dim, features_dim, Activation::Relu, WeightInit::HeUniform, &mut rng)?));
                layers.push(Box::new(DenseLayer::with_init(features_dim, features_dim, Activation::Relu, WeightInit::HeUniform, &mut rng)?));
            }
        }
        Ok(ImageEncoder { net: Mlp::new(layers), features_dim })
    }

    pub fn features_dim(&self) -> usize {
        self.features_dim
    }

    pub fn encode(&mut self, images: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.net.forward(images)
    }

    pub fn set_training(&mut self, training: bool) {
        self.net.set_training(training);
    }
}

/// The sender's and the receiver's encoders
pub struct VisionModule {
    sender: ImageEncoder,
    receiver: Option<ImageEncoder>,
}

impl VisionModule {
    /// One encoder used for both views
    pub fn shared(encoder: ImageEncoder) -> Self {
        VisionModule { sender: encoder, receiver: None }
    }

    pub fn separate(sender: ImageEncoder, receiver: ImageEncoder) -> Result<Self> {
        if sender.features_dim() != receiver.features_dim() {
            return Err(EmcomError::dimension_mismatch(
                format!("{} receiver features", sender.features_dim()),
                format!("{} receiver features", receiver.features_dim()),
            ));
        }
        Ok(VisionModule { sender, receiver: Some(receiver) })
    }

    pub fn is_shared(&self) -> bool {
        self.receiver.is_none()
    }

    pub fn features_dim(&self) -> usize {
        self.sender.features_dim()
    }

    pub fn encode_sender(&mut self, images: ArrayView2<f32>) -> Result<Array2<f32>> {
        self.sender.encode(images)
    }

    pub fn encode_receiver(&mut self, images: ArrayView2<f32>) -> Result<Array2<f32>> {
        match self.receiver.as_mut() {
            Some(receiver) => receiver.encode(images),
            None => self.sender.encode(images),
        }
    }

    pub fn set_training(&mut self, training: bool) {
        self.sender.set_training(training);
        if let Some(receiver) = self.receiver.as_mut() {
            receiver.set_training(training);
        }
    }

    pub fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        extend_prefixed(&mut state, "sender.", self.sender.net.state_dict());
        if let Some(receiver) = &self.receiver {
            extend_prefixed(&mut state, "receiver.", receiver.net.state_dict());
        }
        state
    }

    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        self.sender.net.load_state_dict(&sub_state(state, "sender."))?;
        if let Some(receiver) = self.receiver.as_mut() {
            receiver.net.load_state_dict(&sub_state(state, "receiver."))?;
        }
        Ok(())
    }
}

/// Build the vision module and report the visual feature width.
pub fn build_vision_encoder(
    arch: EncoderArch,
    image_dim: usize,
    features_dim: usize,
    shared: bool,
    seed: u64,
) -> Result<(VisionModule, usize)> {
    let sender = ImageEncoder::new(arch, image_dim, features_dim, seed)?;
    let module = if shared {
        VisionModule::shared(sender)
    } else {
        let receiver = ImageEncoder::new(arch, image_dim, features_dim, seed.wrapping_add(1))?;
        VisionModule::separate(sender, receiver)?
    };
    Ok((module, features_dim))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_encoder_gives_identical_views() {
        let (mut vision, dim) = build_vision_encoder(EncoderArch::Linear, 5, 3, true, 0).unwrap();
        assert_eq!(dim, 3);
        assert!(vision.is_shared());
        let x = Array2::from_shape_fn((2, 5), |(i, j)| (i + j) as f32);
        assert_eq!(vision.encode_sender(x.view()).unwrap(), vision.encode_receiver(x.view()).unwrap());
        assert!(vision.state_dict().keys().all(|k| k.starts_with("sender.")));
    }

    #[test]
    fn test_separate_encoders_differ() {
        let (mut vision, _) = build_vision_encoder(EncoderArch::TwoLayer, 5, 4, false, 0).unwrap();
        let x = Array2::from_shape_fn((2, 5), |(i, j)| (i * 5 + j) as f32 / 7.0);
        let s = vision.encode_sender(x.view()).unwrap();
        let r = vision.encode_receiver(x.view()).unwrap();
        assert_eq!(s.dim(), (2, 4));
        assert_eq!(r.dim(), (2, 4));
        let state = vision.state_dict();
        assert_ne!(state["sender.fc.0.weight"], state["receiver.fc.0.weight"]);
        assert!(state.contains_key("receiver.fc.1.weight"));
    }

    #[test]
    fn test_state_dict_reload() {
        let (a, _) = build_vision_encoder(EncoderArch::Linear, 4, 2, false, 1).unwrap();
        let (mut b, _) = build_vision_encoder(EncoderArch::Linear, 4, 2, false, 9).unwrap();
        b.load_state_dict(&a.state_dict()).unwrap();
        assert_eq!(a.state_dict(), b.state_dict());
    }
}
