//! emcom-eval - evaluate a trained population on a test set.

use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use emcom::builders::{build_game, get_game};
use emcom::callbacks::{RecordSink, StdoutSink};
use emcom::config::ExperimentConfig;
use emcom::data::{DataLoader, ImageDataset};
use emcom::error::Result;
use emcom::evaluation::{
    add_reshaped_interaction_fields, evaluate, pair_accuracy, save_interaction, EvaluationMode,
};

#[derive(Parser)]
#[command(name = "emcom-eval")]
#[command(author, version, about = "Evaluate every sender/receiver pair of a trained population", long_about = None)]
struct Cli {
    /// TOML experiment configuration (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Checkpoint holding the population parameters
    #[arg(long)]
    checkpoint_path: Option<PathBuf>,

    /// Dataset written with ImageDataset::save
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Size of the synthetic dataset used when no dataset is given
    #[arg(long, default_value = "1024")]
    synthetic_examples: usize,

    /// Classes of the synthetic dataset
    #[arg(long, default_value = "10")]
    synthetic_classes: usize,

    #[arg(long)]
    batch_size: Option<usize>,

    #[arg(long)]
    n_senders: Option<usize>,

    #[arg(long)]
    n_recvs: Option<usize>,

    /// "exhaustive" or "sampled"
    #[arg(long)]
    mode: Option<EvaluationMode>,

    /// Folder receiving interactions_test_set.bin
    #[arg(long)]
    dump_interaction_folder: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!(error = %e, "evaluation failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_toml_file(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(batch_size) = cli.batch_size {
        config.data.batch_size = batch_size;
    }
    if let Some(n_senders) = cli.n_senders {
        config.population.n_senders = n_senders;
    }
    if let Some(n_recvs) = cli.n_recvs {
        config.population.n_recvs = n_recvs;
    }
    if let Some(mode) = cli.mode {
        config.population.evaluation_mode = mode;
    }
    if cli.dump_interaction_folder.is_some() {
        config.output.dump_interaction_folder = cli.dump_interaction_folder.clone();
    }
    config.validate()?;

    let mut game = match &cli.checkpoint_path {
        Some(path) => get_game(&config, path)?,
        None => {
            warn!("no checkpoint given, evaluating freshly initialised agents");
            build_game(&config)?
        }
    };

    let dataset = match &cli.dataset {
        Some(path) => ImageDataset::load(path)?,
        None => ImageDataset::synthetic(
            cli.synthetic_examples,
            config.vision.image_dim,
            cli.synthetic_classes,
            config.population.random_seed,
        )?,
    };
    info!(examples = dataset.len(), image_dim = dataset.image_dim(), "loaded test data");
    let loader = DataLoader::from_config(dataset, &config.data, config.population.random_seed)?;

    let n_senders = config.population.n_senders;
    let n_recvs = config.population.n_recvs;
    let (loss, mut interaction) = evaluate(&mut game, &loader, n_senders, n_recvs, config.population.evaluation_mode)?;

    let per_pair: Vec<_> = pair_accuracy(&interaction)?
        .into_iter()
        .map(|((sender, receiver), acc)| json!({ "sender": sender, "receiver": receiver, "acc": acc }))
        .collect();
    StdoutSink.emit(&json!({
        "mode": "test",
        "loss": loss,
        "acc": interaction.aux_mean("acc")?,
        "examples": interaction.size(),
        "pairs": per_pair,
    }))?;

    if let Some(dir) = &config.output.dump_interaction_folder {
        add_reshaped_interaction_fields(&mut interaction, n_senders, n_recvs, config.data.batch_size)?;
        let path = save_interaction(&interaction, dir)?;
        info!(path = %path.display(), "dumped interaction");
    }
    Ok(())
}
