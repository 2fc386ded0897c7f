//! Throughput of the population game and of a full exhaustive evaluation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emcom::builders::build_game;
use emcom::config::ExperimentConfig;
use emcom::data::{DataLoader, ImageDataset};
use emcom::evaluation::{evaluate, EvaluationMode};
use emcom::game::Game;

fn bench_config() -> ExperimentConfig {
    let mut config = ExperimentConfig::default();
    config.agents.vocab_size = 256;
    config.agents.projection_hidden_dim = 256;
    config.vision.image_dim = 192;
    config.vision.features_dim = 64;
    config.data.batch_size = 32;
    config
}

fn bench_forward(c: &mut Criterion) {
    let config = bench_config();
    let mut game = build_game(&config).unwrap();
    game.eval();
    let loader = DataLoader::new(ImageDataset::synthetic(32, 192, 10, 0).unwrap(), 32).unwrap();
    let batch = loader.iter().next().unwrap();

    c.bench_function("population_forward_bs32", |b| {
        b.iter(|| black_box(game.forward(black_box(&batch)).unwrap()))
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let config = bench_config();
    let mut game = build_game(&config).unwrap();
    let loader = DataLoader::new(ImageDataset::synthetic(128, 192, 10, 0).unwrap(), 32).unwrap();

    let mut group = c.benchmark_group("evaluate");
    group.sample_size(20);
    for mode in [EvaluationMode::Exhaustive, EvaluationMode::Sampled] {
        group.bench_function(format!("{:?}", mode).to_lowercase(), |b| {
            b.iter(|| black_box(evaluate(&mut game, &loader, 3, 3, mode).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_forward, bench_evaluate);
criterion_main!(benches);
