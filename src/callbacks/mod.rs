//! # Callbacks
//!
//! Observers invoked by a training driver at fixed lifecycle points, in this
//! order: `on_train_begin`, then per epoch `on_epoch_begin`, `on_epoch_end`,
//! `on_validation_begin`, `on_validation_end`, and finally `on_train_end`.
//!
//! Hooks that may change the agents (temperature annealing) receive the
//! population mutably. Structured output goes to a [`RecordSink`].

pub mod sink;
pub mod stats;
pub mod console;
pub mod temperature;

pub use sink::{MemorySink, RecordSink, StdoutSink};
pub use stats::{BestStatsTracker, SplitStats, StatsSlot};
pub use console::ConsoleLogger;
pub use temperature::TemperatureUpdater;

use tracing::debug;

use crate::config::ExperimentConfig;
use crate::error::Result;
use crate::interaction::Interaction;
use crate::population::Population;

/// Lifecycle observer. Every hook defaults to doing nothing.
pub trait Callback {
    fn on_train_begin(&mut self, _population: &mut Population) -> Result<()> {
        Ok(())
    }

    fn on_epoch_begin(&mut self, _epoch: usize) -> Result<()> {
        Ok(())
    }

    fn on_epoch_end(&mut self, _population: &mut Population, _loss: f32, _logs: &Interaction, _epoch: usize) -> Result<()> {
        Ok(())
    }

    fn on_validation_begin(&mut self, _epoch: usize) -> Result<()> {
        Ok(())
    }

    fn on_validation_end(&mut self, _loss: f32, _logs: &Interaction, _epoch: usize) -> Result<()> {
        Ok(())
    }

    fn on_train_end(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Standard callbacks for a population run: a JSON console logger, the
/// best-stats tracker, and one temperature updater per sender when the
/// senders anneal their temperature instead of learning it.
pub fn get_callbacks<S>(config: &ExperimentConfig, population: &Population, sink: S) -> Result<Vec<Box<dyn Callback>>>
where
    S: RecordSink + Clone + 'static,
{
    let mut callbacks: Vec<Box<dyn Callback>> = vec![
        Box::new(ConsoleLogger::with_sink(true, true, Box::new(sink.clone()))),
        Box::new(BestStatsTracker::with_sink(Box::new(sink))),
    ];

    let annealable = population
        .sender(0)
        .map_or(false, |sender| sender.as_annealable().is_some());
    if annealable && !config.agents.train_gs_temperature {
        for sender_idx in 0..population.n_senders() {
            callbacks.push(Box::new(TemperatureUpdater::new(
                sender_idx,
                config.agents.minimum_gs_temperature,
                config.agents.gs_temperature_decay,
                config.agents.update_gs_temp_frequency,
            )?));
        }
    }
    debug!(count = callbacks.len(), annealable, "built callbacks");
    Ok(callbacks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Sender;
    use crate::tests::stubs::{const_losses, tag_receivers, tag_senders, TagSender};

    #[test]
    fn test_updaters_only_for_annealable_senders() {
        let config = ExperimentConfig::default();

        let plain = Population::new(tag_senders(3), tag_receivers(1), const_losses(&[0.0])).unwrap();
        assert_eq!(get_callbacks(&config, &plain, MemorySink::new()).unwrap().len(), 2);

        let senders: Vec<Box<dyn Sender>> = (0..3).map(|i| Box::new(TagSender::annealable(i, 5.0)) as Box<dyn Sender>).collect();
        let annealing = Population::new(senders, tag_receivers(1), const_losses(&[0.0])).unwrap();
        assert_eq!(get_callbacks(&config, &annealing, MemorySink::new()).unwrap().len(), 5);

        let mut trained = config.clone();
        trained.agents.train_gs_temperature = true;
        assert_eq!(get_callbacks(&trained, &annealing, MemorySink::new()).unwrap().len(), 2);
    }
}
