//! Experiment configuration.
//!
//! Every field has a default, so a TOML file only needs the values it
//! changes. The random seed is threaded explicitly into every component
//! built from the configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::data::Augmentation;
use crate::error::{EmcomError, Result};
use crate::evaluation::EvaluationMode;
use crate::loss::Similarity;
use crate::vision::EncoderArch;

/// Full experiment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub agents: AgentConfig,
    #[serde(default)]
    pub loss: LossConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationConfig {
    #[serde(default = "default_n_senders")]
    pub n_senders: usize,
    #[serde(default = "default_n_recvs")]
    pub n_recvs: usize,
    #[serde(default = "default_n_losses")]
    pub n_losses: usize,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
    #[serde(default)]
    pub evaluation_mode: EvaluationMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    #[serde(default = "default_gs_temperature")]
    pub gs_temperature: f32,
    #[serde(default = "default_gs_temperature_decay")]
    pub gs_temperature_decay: f32,
    #[serde(default = "default_update_gs_temp_frequency")]
    pub update_gs_temp_frequency: usize,
    #[serde(default = "default_minimum_gs_temperature")]
    pub minimum_gs_temperature: f32,
    #[serde(default)]
    pub train_gs_temperature: bool,
    #[serde(default)]
    pub straight_through: bool,
    #[serde(default = "default_projection_dim")]
    pub projection_hidden_dim: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossConfig {
    #[serde(default = "default_loss_temperature")]
    pub loss_temperature: f32,
    #[serde(default)]
    pub similarity: Similarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionConfig {
    #[serde(default)]
    pub arch: EncoderArch,
    #[serde(default = "default_image_dim")]
    pub image_dim: usize,
    #[serde(default = "default_features_dim")]
    pub features_dim: usize,
    #[serde(default)]
    pub shared_vision: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub augmentation: Augmentation,
    #[serde(default)]
    pub shuffle: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_interaction_folder: Option<PathBuf>,
}

fn default_n_senders() -> usize { 3 }
fn default_n_recvs() -> usize { 3 }
fn default_n_losses() -> usize { 1 }
fn default_random_seed() -> u64 { 111 }
fn default_vocab_size() -> usize { 2048 }
fn default_gs_temperature() -> f32 { 5.0 }
fn default_gs_temperature_decay() -> f32 { 1.0 }
fn default_update_gs_temp_frequency() -> usize { 1 }
fn default_minimum_gs_temperature() -> f32 { 0.1 }
fn default_projection_dim() -> usize { 2048 }
fn default_loss_temperature() -> f32 { 0.1 }
fn default_image_dim() -> usize { 3072 }
fn default_features_dim() -> usize { 512 }
fn default_batch_size() -> usize { 128 }

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            agents: AgentConfig::default(),
            loss: LossConfig::default(),
            vision: VisionConfig::default(),
            data: DataConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            n_senders: default_n_senders(),
            n_recvs: default_n_recvs(),
            n_losses: default_n_losses(),
            random_seed: default_random_seed(),
            evaluation_mode: EvaluationMode::default(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            vocab_size: default_vocab_size(),
            gs_temperature: default_gs_temperature(),
            gs_temperature_decay: default_gs_temperature_decay(),
            update_gs_temp_frequency: default_update_gs_temp_frequency(),
            minimum_gs_temperature: default_minimum_gs_temperature(),
            train_gs_temperature: false,
            straight_through: false,
            projection_hidden_dim: default_projection_dim(),
        }
    }
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            loss_temperature: default_loss_temperature(),
            similarity: Similarity::default(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            arch: EncoderArch::default(),
            image_dim: default_image_dim(),
            features_dim: default_features_dim(),
            shared_vision: false,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            augmentation: Augmentation::default(),
            shuffle: false,
        }
    }
}

impl ExperimentConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ExperimentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EmcomError::configuration("config", format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded experiment config");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings no experiment can run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("population.n_senders", self.population.n_senders),
            ("population.n_recvs", self.population.n_recvs),
            ("population.n_losses", self.population.n_losses),
            ("agents.vocab_size", self.agents.vocab_size),
            ("agents.update_gs_temp_frequency", self.agents.update_gs_temp_frequency),
            ("agents.projection_hidden_dim", self.agents.projection_hidden_dim),
            ("vision.image_dim", self.vision.image_dim),
            ("vision.features_dim", self.vision.features_dim),
            ("data.batch_size", self.data.batch_size),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(EmcomError::configuration(name, "must be at least 1"));
            }
        }

        let temperatures = [
            ("agents.gs_temperature", self.agents.gs_temperature),
            ("agents.minimum_gs_temperature", self.agents.minimum_gs_temperature),
            ("loss.loss_temperature", self.loss.loss_temperature),
        ];
        for (name, value) in temperatures {
            if !(value > 0.0) || !value.is_finite() {
                return Err(EmcomError::configuration(name, format!("must be a positive finite number, got {}", value)));
            }
        }

        let decay = self.agents.gs_temperature_decay;
        if !(decay > 0.0 && decay <= 1.0) {
            return Err(EmcomError::configuration(
                "agents.gs_temperature_decay",
                format!("must lie in (0, 1], got {}", decay),
            ));
        }

        if let Augmentation::GaussianNoise { std } = self.data.augmentation {
            if !(std >= 0.0) || !std.is_finite() {
                return Err(EmcomError::configuration("data.augmentation", format!("invalid noise std {}", std)));
            }
        }
        Ok(())
    }
}
