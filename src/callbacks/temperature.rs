use tracing::debug;

use crate::error::{EmcomError, Result};
use crate::interaction::Interaction;
use crate::population::Population;
use super::Callback;

/// Multiplies one sender's temperature by `decay` every `update_frequency`
/// epochs, never going below `minimum`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureUpdater {
    pub sender_idx: usize,
    pub minimum: f32,
    pub decay: f32,
    pub update_frequency: usize,
}

impl TemperatureUpdater {
    pub fn new(sender_idx: usize, minimum: f32, decay: f32, update_frequency: usize) -> Result<Self> {
        if update_frequency == 0 {
            return Err(EmcomError::configuration("update_gs_temp_frequency", "must be at least 1"));
        }
        Ok(TemperatureUpdater { sender_idx, minimum, decay, update_frequency })
    }
}

impl Callback for TemperatureUpdater {
    fn on_epoch_end(&mut self, population: &mut Population, _loss: f32, _logs: &Interaction, epoch: usize) -> Result<()> {
        if epoch % self.update_frequency != 0 {
            return Ok(());
        }
        let sender_idx = self.sender_idx;
        let agent = population
            .sender_mut(sender_idx)
            .and_then(|sender| sender.as_annealable_mut())
            .ok_or_else(|| {
                EmcomError::configuration(
                    "senders",
                    format!("sender {} has no annealable temperature", sender_idx),
                )
            })?;
        let temperature = (agent.temperature() * self.decay).max(self.minimum);
        agent.set_temperature(temperature);
        debug!(sender = sender_idx, epoch, temperature, "annealed temperature");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Sender;
    use crate::tests::stubs::{const_losses, tag_receivers, TagSender};

    fn population(temperature: Option<f32>) -> Population {
        let sender: Box<dyn Sender> = match temperature {
            Some(t) => Box::new(TagSender::annealable(0, t)),
            None => Box::new(TagSender::new(0)),
        };
        Population::new(vec![sender], tag_receivers(1), const_losses(&[0.0])).unwrap()
    }

    fn temperature(population: &Population) -> f32 {
        population.sender(0).unwrap().as_annealable().unwrap().temperature()
    }

    #[test]
    fn test_decay_respects_frequency_and_minimum() {
        let mut population = population(Some(1.0));
        let mut updater = TemperatureUpdater::new(0, 0.3, 0.5, 2).unwrap();
        let logs = Interaction::default();

        updater.on_epoch_end(&mut population, 0.0, &logs, 1).unwrap();
        assert_eq!(temperature(&population), 1.0);
        updater.on_epoch_end(&mut population, 0.0, &logs, 2).unwrap();
        assert_eq!(temperature(&population), 0.5);
        updater.on_epoch_end(&mut population, 0.0, &logs, 4).unwrap();
        assert_eq!(temperature(&population), 0.3);
    }

    #[test]
    fn test_sender_without_temperature_is_rejected() {
        let mut population = population(None);
        let mut updater = TemperatureUpdater::new(0, 0.1, 0.9, 1).unwrap();
        let err = updater.on_epoch_end(&mut population, 0.0, &Interaction::default(), 0).unwrap_err();
        assert!(err.is_configuration());
        assert!(TemperatureUpdater::new(0, 0.1, 0.9, 0).is_err());
    }
}
