use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Result;
use crate::interaction::Interaction;
use crate::population::Population;
use super::{Callback, RecordSink, StdoutSink};

/// Prints the loss and the mean of every aux metric at the end of each
/// epoch and validation pass.
pub struct ConsoleLogger {
    as_json: bool,
    print_train_loss: bool,
    sink: Box<dyn RecordSink>,
}

impl ConsoleLogger {
    pub fn new(as_json: bool, print_train_loss: bool) -> Self {
        Self::with_sink(as_json, print_train_loss, Box::new(StdoutSink))
    }

    pub fn with_sink(as_json: bool, print_train_loss: bool, sink: Box<dyn RecordSink>) -> Self {
        ConsoleLogger { as_json, print_train_loss, sink }
    }

    fn aggregate(&self, loss: f32, logs: &Interaction, mode: &str, epoch: usize) -> Result<()> {
        let mut record = Map::new();
        record.insert("loss".to_string(), Value::from(loss));
        for (key, values) in &logs.aux {
            match values.mean() {
                Some(mean) => {
                    record.insert(key.clone(), Value::from(mean));
                }
                None => warn!(metric = %key, "skipping empty aux metric"),
            }
        }

        if self.as_json {
            record.insert("mode".to_string(), Value::from(mode));
            record.insert("epoch".to_string(), Value::from(epoch));
            self.sink.emit(&Value::Object(record))
        } else {
            let fields: Vec<String> = record.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            self.sink.write_line(&format!("{}: epoch {}, {}", mode, epoch, fields.join(", ")))
        }
    }
}

impl Callback for ConsoleLogger {
    fn on_epoch_end(&mut self, _population: &mut Population, loss: f32, logs: &Interaction, epoch: usize) -> Result<()> {
        if self.print_train_loss {
            self.aggregate(loss, logs, "train", epoch)?;
        }
        Ok(())
    }

    fn on_validation_end(&mut self, loss: f32, logs: &Interaction, epoch: usize) -> Result<()> {
        self.aggregate(loss, logs, "test", epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::MemorySink;
    use crate::interaction::Aux;
    use crate::tests::stubs::{const_losses, tag_receivers, tag_senders};
    use ndarray::{array, ArrayD, IxDyn};

    fn logs() -> Interaction {
        let mut aux = Aux::new();
        aux.insert("acc".to_string(), array![1.0f32, 0.0, 1.0, 0.0].into_dyn());
        aux.insert("empty".to_string(), ArrayD::zeros(IxDyn(&[0])));
        Interaction { aux, ..Default::default() }
    }

    #[test]
    fn test_json_records() {
        let sink = MemorySink::new();
        let mut logger = ConsoleLogger::with_sink(true, true, Box::new(sink.clone()));
        let mut population = Population::new(tag_senders(1), tag_receivers(1), const_losses(&[0.0])).unwrap();

        logger.on_epoch_end(&mut population, 2.0, &logs(), 3).unwrap();
        logger.on_validation_end(1.5, &logs(), 3).unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["mode"], "train");
        assert_eq!(records[0]["epoch"], 3);
        assert_eq!(records[0]["acc"], 0.5);
        assert!(records[0].get("empty").is_none());
        assert_eq!(records[1]["mode"], "test");
        assert_eq!(records[1]["loss"], 1.5);
    }

    #[test]
    fn test_train_loss_can_be_silenced() {
        let sink = MemorySink::new();
        let mut logger = ConsoleLogger::with_sink(false, false, Box::new(sink.clone()));
        let mut population = Population::new(tag_senders(1), tag_receivers(1), const_losses(&[0.0])).unwrap();

        logger.on_epoch_end(&mut population, 2.0, &logs(), 0).unwrap();
        assert!(sink.lines().is_empty());

        logger.on_validation_end(1.0, &logs(), 0).unwrap();
        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("test: epoch 0"));
        assert!(lines[0].contains("acc=0.5"));
    }
}
