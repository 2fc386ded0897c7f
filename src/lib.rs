//! # emcom - Population Games for Emergent Communication
//!
//! emcom runs populations of sender/receiver agents on a self-supervised
//! image discrimination game: a sender sees an image and emits a symbol, a
//! receiver sees an augmented view of every candidate image and has to tell
//! which one the sender was talking about.
//!
//! ## Key Features
//!
//! - **Population sampling**: a seeded uniform sampler picks a sender, a
//!   receiver and a loss for every forward pass
//! - **Evaluation**: every sender/receiver pair played over a dataset and
//!   merged into a single interaction record
//! - **Callbacks**: best-stats tracking, JSON console logging and
//!   temperature annealing driven by explicit lifecycle hooks
//! - **Checkpoints**: flat state dicts saved with bincode
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use emcom::builders::build_game;
//! use emcom::config::ExperimentConfig;
//! use emcom::data::{DataLoader, ImageDataset};
//! use emcom::evaluation::{evaluate, EvaluationMode};
//!
//! let mut config = ExperimentConfig::default();
//! config.vision.image_dim = 64;
//! config.agents.vocab_size = 32;
//! config.agents.projection_hidden_dim = 64;
//! config.data.batch_size = 16;
//!
//! let mut game = build_game(&config).unwrap();
//! let dataset = ImageDataset::synthetic(256, 64, 10, 0).unwrap();
//! let loader = DataLoader::new(dataset, 16).unwrap();
//!
//! let (loss, interaction) = evaluate(&mut game, &loader, 3, 3, EvaluationMode::Exhaustive).unwrap();
//! println!("loss {} over {} examples", loss, interaction.size());
//! ```
//!
//! ## Module Organization
//!
//! - [`activations`] - Element-wise activations and row softmax
//! - [`agents`] - Sender and receiver traits and the projection agents
//! - [`builders`] - Assembly of a population game from a configuration
//! - [`callbacks`] - Lifecycle observers and record sinks
//! - [`checkpoint`] - State dicts and checkpoint files
//! - [`config`] - Experiment configuration
//! - [`data`] - Image datasets, batches and the data loader
//! - [`error`] - Error types and result handling
//! - [`evaluation`] - Evaluation over every sender/receiver pair
//! - [`game`] - Two-player games and the game traits
//! - [`interaction`] - Interaction records and logging strategies
//! - [`layers`] - Forward-only neural network layers
//! - [`loss`] - Game losses
//! - [`network`] - Layer stacks and projection heads
//! - [`population`] - Agent pools, the uniform sampler and the population game
//! - [`vision`] - Image encoders

pub mod activations;
pub mod agents;
pub mod builders;
pub mod callbacks;
pub mod checkpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod game;
pub mod interaction;
pub mod layers;
pub mod loss;
pub mod network;
pub mod population;
pub mod vision;

#[cfg(test)]
mod tests;
