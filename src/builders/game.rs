use std::path::Path;
use tracing::info;

use crate::agents::{EmSslSender, ProjectionReceiver, Receiver, Sender};
use crate::checkpoint::{num_parameters, Checkpoint};
use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::game::{SymbolGame, VisionGame};
use crate::interaction::LoggingStrategy;
use crate::loss::{Loss, XEntLoss};
use crate::population::{Population, PopulationGame, UniformAgentSampler};
use crate::vision::build_vision_encoder;

/// The game assembled from an [`ExperimentConfig`]
pub type PopulationVisionGame = PopulationGame<VisionGame<SymbolGame>>;

const SENDER_STREAM: u64 = 1;
const RECEIVER_STREAM: u64 = 2;
const VISION_STREAM: u64 = 3;
const SAMPLER_STREAM: u64 = 4;

/// Independent seed for the `index`-th component of a kind
fn component_seed(base: u64, stream: u64, index: usize) -> u64 {
    base.wrapping_add(stream.wrapping_mul(1_000_003)).wrapping_add(index as u64)
}

/// Build the sender, receiver and loss pools for agents reading visual
/// features of width `input_dim`.
pub fn build_population(config: &ExperimentConfig, input_dim: usize) -> Result<Population> {
    config.validate()?;
    let seed = config.population.random_seed;
    let agents = &config.agents;

    let senders = (0..config.population.n_senders)
        .map(|i| {
            EmSslSender::new(
                input_dim,
                agents.projection_hidden_dim,
                agents.vocab_size,
                agents.gs_temperature,
                agents.train_gs_temperature,
                agents.straight_through,
                component_seed(seed, SENDER_STREAM, i),
            )
            .map(|s| Box::new(s) as Box<dyn Sender>)
        })
        .collect::<Result<Vec<_>>>()?;

    let receivers = (0..config.population.n_recvs)
        .map(|i| {
            ProjectionReceiver::new(
                input_dim,
                agents.projection_hidden_dim,
                agents.vocab_size,
                component_seed(seed, RECEIVER_STREAM, i),
            )
            .map(|r| Box::new(r) as Box<dyn Receiver>)
        })
        .collect::<Result<Vec<_>>>()?;

    let losses = (0..config.population.n_losses)
        .map(|_| {
            XEntLoss::new(config.loss.loss_temperature, config.loss.similarity)
                .map(|l| Box::new(l) as Box<dyn Loss>)
        })
        .collect::<Result<Vec<_>>>()?;

    Population::new(senders, receivers, losses)
}

/// Assemble population ⟶ vision ⟶ symbol game from the configuration.
///
/// Both training and test interactions keep labels, messages and receiver
/// outputs only.
pub fn build_game(config: &ExperimentConfig) -> Result<PopulationVisionGame> {
    config.validate()?;
    let seed = config.population.random_seed;
    let (vision, features_dim) = build_vision_encoder(
        config.vision.arch,
        config.vision.image_dim,
        config.vision.features_dim,
        config.vision.shared_vision,
        component_seed(seed, VISION_STREAM, 0),
    )?;

    let population = build_population(config, features_dim)?;
    let strategy = LoggingStrategy::population_game();
    let game = VisionGame::new(SymbolGame::new(strategy, strategy), vision);
    let sampler = UniformAgentSampler::new(population, component_seed(seed, SAMPLER_STREAM, 0));

    info!(
        senders = config.population.n_senders,
        receivers = config.population.n_recvs,
        losses = config.population.n_losses,
        vocab_size = config.agents.vocab_size,
        shared_vision = config.vision.shared_vision,
        "built population game"
    );
    Ok(PopulationGame::new(game, sampler))
}

/// Build the game and restore its parameters from a checkpoint.
pub fn get_game<P: AsRef<Path>>(config: &ExperimentConfig, checkpoint_path: P) -> Result<PopulationVisionGame> {
    let mut game = build_game(config)?;
    let checkpoint = Checkpoint::load(checkpoint_path.as_ref())?;
    game.load_state_dict(&checkpoint.model_state_dict)?;
    info!(
        path = %checkpoint_path.as_ref().display(),
        epoch = checkpoint.epoch,
        parameters = num_parameters(&checkpoint.model_state_dict),
        "restored game from checkpoint"
    );
    Ok(game)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Batch;
    use crate::error::EmcomError;
    use crate::game::Game;
    use ndarray::{Array1, Array2};
    use tempfile::tempdir;

    fn small_config() -> ExperimentConfig {
        let mut config = ExperimentConfig::default();
        config.population.n_senders = 2;
        config.population.n_recvs = 2;
        config.agents.vocab_size = 6;
        config.agents.projection_hidden_dim = 8;
        config.vision.image_dim = 12;
        config.vision.features_dim = 5;
        config.data.batch_size = 4;
        config
    }

    fn batch() -> Batch {
        let images = Array2::from_shape_fn((4, 12), |(i, j)| ((i * 12 + j) % 9) as f32 / 9.0);
        Batch::new(images.clone(), Array1::from_iter(0..4), images).unwrap()
    }

    #[test]
    fn test_build_game_layout() {
        let mut game = build_game(&small_config()).unwrap();
        assert_eq!(game.population().n_senders(), 2);
        assert_eq!(game.population().n_receivers(), 2);
        let temperature = game.population().sender(0).unwrap().as_annealable().map(|a| a.temperature());
        assert_eq!(temperature, Some(5.0));

        game.eval();
        let (loss, interaction) = game.forward(&batch()).unwrap();
        assert!(loss.is_finite());
        assert!(interaction.sender_input.is_none());
        assert_eq!(interaction.message.unwrap().dim(), (4, 6));
        assert_eq!(interaction.receiver_output.unwrap().dim(), (4, 6));
    }

    #[test]
    fn test_trained_temperature_is_not_annealable() {
        let mut config = small_config();
        config.agents.train_gs_temperature = true;
        let game = build_game(&config).unwrap();
        assert!(game.population().sender(1).unwrap().as_annealable().is_none());
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let a = build_game(&small_config()).unwrap().state_dict();
        let b = build_game(&small_config()).unwrap().state_dict();
        assert_eq!(a, b);
        assert!(a.contains_key("senders.1.fc.0.weight"));
        assert!(a.contains_key("receivers.0.fc.3.weight"));
        assert!(a.contains_key("vision.sender.fc.0.weight"));
        assert!(a.contains_key("vision.receiver.fc.0.weight"));

        let mut other = small_config();
        other.population.random_seed = 7;
        assert_ne!(build_game(&other).unwrap().state_dict(), a);
    }

    #[test]
    fn test_get_game_restores_checkpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final.tar");

        let mut trained_config = small_config();
        trained_config.population.random_seed = 99;
        let trained = build_game(&trained_config).unwrap();
        Checkpoint::new(10, trained.state_dict()).save(&path).unwrap();

        let restored = get_game(&small_config(), &path).unwrap();
        assert_eq!(restored.state_dict(), trained.state_dict());
    }

    #[test]
    fn test_get_game_rejects_mismatched_checkpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("final.tar");
        let mut wide = small_config();
        wide.agents.vocab_size = 7;
        Checkpoint::new(1, build_game(&wide).unwrap().state_dict()).save(&path).unwrap();

        let err = get_game(&small_config(), &path).err().unwrap();
        assert!(matches!(err, EmcomError::DimensionMismatch { .. }));
        assert!(get_game(&small_config(), dir.path().join("missing.tar")).err().unwrap().is_configuration());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = small_config();
        config.population.n_senders = 0;
        assert!(build_game(&config).err().unwrap().is_configuration());
    }
}
