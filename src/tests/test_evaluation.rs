use crate::builders::build_game;
use crate::config::ExperimentConfig;
use crate::data::{DataLoader, ImageDataset};
use crate::evaluation::{evaluate, pair_accuracy, EvaluationMode};
use crate::population::{PopulationGame, UniformAgentSampler};
use crate::tests::stubs::{batch, const_losses, tag_receivers, tag_senders, EchoGame};

const LOSSES: [f32; 3] = [0.5, 1.0, 4.0];

fn sampler(seed: u64) -> UniformAgentSampler {
    UniformAgentSampler::from_pools(tag_senders(2), tag_receivers(3), const_losses(&LOSSES), seed).unwrap()
}

#[test]
fn test_exhaustive_counts_and_mean_loss() {
    let mut game = PopulationGame::new(EchoGame, sampler(8));
    let data = vec![batch(4, 2), batch(4, 2), batch(4, 2)];
    let (mean_loss, interaction) = evaluate(&mut game, data, 2, 3, EvaluationMode::Exhaustive).unwrap();

    assert_eq!(interaction.size(), 3 * 2 * 3 * 4);

    // every play draws only its loss from the sampler
    let mut replay = sampler(8);
    let plays: Vec<f32> = (0..3 * 2 * 3).map(|_| LOSSES[replay.draw_loss()]).collect();
    let expected = plays.iter().map(|&l| l as f64).sum::<f64>() / plays.len() as f64;
    assert!((mean_loss as f64 - expected).abs() < 1e-6);
}

#[test]
fn test_sampled_counts_and_mean_loss() {
    let mut game = PopulationGame::new(EchoGame, sampler(21));
    let data = vec![batch(2, 2), batch(2, 2)];
    let (mean_loss, interaction) = evaluate(&mut game, data, 2, 3, EvaluationMode::Sampled).unwrap();

    assert_eq!(interaction.size(), 2 * 2 * 3 * 2);

    let mut replay = sampler(21);
    let plays: Vec<f32> = (0..2 * 2 * 3).map(|_| LOSSES[replay.draw().loss_idx]).collect();
    let expected = plays.iter().map(|&l| l as f64).sum::<f64>() / plays.len() as f64;
    assert!((mean_loss as f64 - expected).abs() < 1e-6);
}

#[test]
fn test_exhaustive_evaluation_of_built_game() {
    let mut config = ExperimentConfig::default();
    config.population.n_senders = 2;
    config.population.n_recvs = 3;
    config.agents.vocab_size = 8;
    config.agents.projection_hidden_dim = 6;
    config.vision.image_dim = 10;
    config.vision.features_dim = 4;

    let mut game = build_game(&config).unwrap();
    let loader = DataLoader::new(ImageDataset::synthetic(20, 10, 3, 1).unwrap(), 4).unwrap();
    let (loss, interaction) = evaluate(&mut game, &loader, 2, 3, EvaluationMode::Exhaustive).unwrap();

    assert!(loss.is_finite());
    assert_eq!(interaction.size(), 5 * 2 * 3 * 4);
    assert!(interaction.sender_input.is_none());
    let acc = interaction.aux_mean("acc").unwrap();
    assert!((0.0..=1.0).contains(&acc));

    let per_pair = pair_accuracy(&interaction).unwrap();
    assert_eq!(per_pair.keys().copied().collect::<Vec<_>>(), vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
}

#[test]
fn test_evaluation_is_repeatable() {
    let run = || {
        let mut game = PopulationGame::new(EchoGame, sampler(4));
        evaluate(&mut game, vec![batch(3, 2); 2], 2, 3, EvaluationMode::Sampled).unwrap()
    };
    assert_eq!(run(), run());
}
