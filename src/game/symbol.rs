use ndarray::Array1;

use crate::agents::{Receiver, Sender};
use crate::data::Batch;
use crate::error::Result;
use crate::interaction::{Interaction, LoggingStrategy};
use crate::loss::Loss;
use super::CommunicationGame;

/// Single-symbol game: the sender emits one (relaxed) symbol, the receiver
/// projects the candidates, the loss scores the pairing.
pub struct SymbolGame {
    train_logging_strategy: LoggingStrategy,
    test_logging_strategy: LoggingStrategy,
    training: bool,
}

impl SymbolGame {
    pub fn new(train_logging_strategy: LoggingStrategy, test_logging_strategy: LoggingStrategy) -> Self {
        SymbolGame {
            train_logging_strategy,
            test_logging_strategy,
            training: true,
        }
    }

    pub fn is_training(&self) -> bool {
        self.training
    }
}

impl Default for SymbolGame {
    fn default() -> Self {
        Self::new(LoggingStrategy::default(), LoggingStrategy::default())
    }
}

impl CommunicationGame for SymbolGame {
    fn play(
        &mut self,
        sender: &mut dyn Sender,
        receiver: &mut dyn Receiver,
        loss: &dyn Loss,
        batch: &Batch,
    ) -> Result<(f32, Interaction)> {
        let message = sender.send(batch.sender_input.view())?;
        let receiver_output = receiver.receive(message.view(), batch.receiver_input.view())?;
        let (loss_value, aux) = loss.compute(
            batch.sender_input.view(),
            message.view(),
            batch.receiver_input.view(),
            receiver_output.view(),
            batch.labels.view(),
        )?;

        let strategy = if self.training {
            &self.train_logging_strategy
        } else {
            &self.test_logging_strategy
        };
        let interaction = strategy.filtered_interaction(Interaction {
            sender_input: Some(batch.sender_input.clone()),
            receiver_input: Some(batch.receiver_input.clone()),
            labels: Some(batch.labels.clone()),
            message: Some(message),
            receiver_output: Some(receiver_output),
            message_length: Some(Array1::ones(batch.size())),
            aux,
        });
        Ok((loss_value, interaction))
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{EmSslSender, ProjectionReceiver};
    use crate::error::EmcomError;
    use crate::loss::{Similarity, XEntLoss};
    use ndarray::{Array2, ArrayView2};

    fn batch(n: usize, dim: usize) -> Batch {
        let x = Array2::from_shape_fn((n, dim), |(i, j)| ((i * dim + j) % 7) as f32 / 7.0);
        Batch::new(x.clone(), Array1::from_iter(0..n), x).unwrap()
    }

    #[test]
    fn test_play_applies_mode_specific_strategy() {
        let mut sender = EmSslSender::new(4, 6, 3, 1.0, false, false, 0).unwrap();
        let mut receiver = ProjectionReceiver::new(4, 6, 3, 1).unwrap();
        let loss = XEntLoss::new(0.1, Similarity::Cosine).unwrap();
        let mut game = SymbolGame::new(LoggingStrategy::default(), LoggingStrategy::population_game());

        let (value, interaction) = game.play(&mut sender, &mut receiver, &loss, &batch(5, 4)).unwrap();
        assert!(value.is_finite());
        assert_eq!(interaction.size(), 5);
        assert!(interaction.sender_input.is_some());
        assert_eq!(interaction.aux["acc"].len(), 5);

        game.set_training(false);
        let (_, interaction) = game.play(&mut sender, &mut receiver, &loss, &batch(5, 4)).unwrap();
        assert!(interaction.sender_input.is_none());
        assert!(interaction.receiver_output.is_some());
    }

    struct FailingSender;

    impl Sender for FailingSender {
        fn send(&mut self, _input: ArrayView2<f32>) -> Result<Array2<f32>> {
            Err(EmcomError::Computation("sender exploded".to_string()))
        }
    }

    #[test]
    fn test_agent_errors_propagate_unchanged() {
        let mut receiver = ProjectionReceiver::new(4, 6, 3, 1).unwrap();
        let loss = XEntLoss::new(0.1, Similarity::Cosine).unwrap();
        let mut game = SymbolGame::default();
        let err = game.play(&mut FailingSender, &mut receiver, &loss, &batch(2, 4)).unwrap_err();
        assert_eq!(err, EmcomError::Computation("sender exploded".to_string()));
    }
}
