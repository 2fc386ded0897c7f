use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::interaction::Interaction;
use crate::population::Population;
use super::{Callback, RecordSink, StdoutSink};

/// Accuracy, loss and epoch of one observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSlot {
    pub acc: f32,
    pub loss: f32,
    /// -1 until an epoch has been observed
    pub epoch: i64,
}

/// Best and most recent observation for one split
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SplitStats {
    pub best: StatsSlot,
    pub last: StatsSlot,
}

impl Default for SplitStats {
    fn default() -> Self {
        SplitStats {
            best: StatsSlot { acc: f32::NEG_INFINITY, loss: f32::INFINITY, epoch: -1 },
            last: StatsSlot { acc: 0.0, loss: 0.0, epoch: 0 },
        }
    }
}

impl SplitStats {
    /// Record an observation; the best slot only moves on a strictly higher
    /// accuracy, so the first of several equal accuracies is kept.
    pub fn observe(&mut self, acc: f32, loss: f32, epoch: usize) {
        let slot = StatsSlot { acc, loss, epoch: epoch as i64 };
        if acc > self.best.acc {
            self.best = slot;
        }
        self.last = slot;
    }

    fn record(&self, mode: &str) -> Value {
        json!({
            "mode": mode,
            "best_epoch": self.best.epoch,
            "best_acc": self.best.acc,
            "best_loss": self.best.loss,
            "last_epoch": self.last.epoch,
            "last_acc": self.last.acc,
            "last_loss": self.last.loss,
        })
    }
}

/// Keeps the best and the latest accuracy for the train and validation
/// splits and reports both at the end of training.
pub struct BestStatsTracker {
    train: SplitStats,
    validation: SplitStats,
    sink: Box<dyn RecordSink>,
}

impl Default for BestStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl BestStatsTracker {
    pub fn new() -> Self {
        Self::with_sink(Box::new(StdoutSink))
    }

    pub fn with_sink(sink: Box<dyn RecordSink>) -> Self {
        BestStatsTracker {
            train: SplitStats::default(),
            validation: SplitStats::default(),
            sink,
        }
    }

    pub fn train_stats(&self) -> &SplitStats {
        &self.train
    }

    pub fn validation_stats(&self) -> &SplitStats {
        &self.validation
    }

    /// The two records emitted at the end of training
    pub fn report(&self) -> [Value; 2] {
        [
            self.train.record("best train acc"),
            self.validation.record("best validation acc"),
        ]
    }
}

impl Callback for BestStatsTracker {
    fn on_epoch_end(&mut self, _population: &mut Population, loss: f32, logs: &Interaction, epoch: usize) -> Result<()> {
        let acc = logs.aux_mean("acc")?;
        self.train.observe(acc, loss, epoch);
        Ok(())
    }

    fn on_validation_end(&mut self, loss: f32, logs: &Interaction, epoch: usize) -> Result<()> {
        let acc = logs.aux_mean("acc")?;
        self.validation.observe(acc, loss, epoch);
        Ok(())
    }

    fn on_train_end(&mut self) -> Result<()> {
        for record in self.report() {
            self.sink.emit(&record)?;
        }
        Ok(())
    }
}
