use ndarray::{ArrayD, IxDyn};
use tracing::trace;

use crate::checkpoint::StateDict;
use crate::data::Batch;
use crate::error::Result;
use crate::game::{CommunicationGame, Game, PairwiseGame};
use crate::interaction::Interaction;
use super::{AgentDraw, Population, UniformAgentSampler};

/// Aux key holding the sender position for every example
pub const SENDER_IDX_KEY: &str = "sender_idx";
/// Aux key holding the receiver position for every example
pub const RECV_IDX_KEY: &str = "recv_idx";

/// Plays the wrapped game with a freshly sampled sender, receiver and loss on
/// every forward call.
pub struct PopulationGame<G> {
    game: G,
    sampler: UniformAgentSampler,
}

impl<G: CommunicationGame> PopulationGame<G> {
    pub fn new(game: G, sampler: UniformAgentSampler) -> Self {
        PopulationGame { game, sampler }
    }

    pub fn game(&self) -> &G {
        &self.game
    }

    pub fn sampler(&self) -> &UniformAgentSampler {
        &self.sampler
    }

    pub fn population(&self) -> &Population {
        self.sampler.population()
    }

    pub fn population_mut(&mut self) -> &mut Population {
        self.sampler.population_mut()
    }

    fn play_draw(&mut self, draw: AgentDraw, batch: &Batch) -> Result<(f32, Interaction)> {
        let sample = self.sampler.population_mut().select(draw)?;
        trace!(sender = draw.sender_idx, receiver = draw.recv_idx, loss = draw.loss_idx, "playing pair");
        let (loss, mut interaction) = self.game.play(sample.sender, sample.receiver, sample.loss, batch)?;
        tag_pair(&mut interaction, draw.sender_idx, draw.recv_idx, batch.size());
        Ok((loss, interaction))
    }

    /// Agent parameters followed by the wrapped game's own parameters
    pub fn state_dict(&self) -> StateDict {
        let mut state = self.sampler.population().state_dict();
        state.extend(self.game.state_dict());
        state
    }

    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        self.sampler.population_mut().load_state_dict(state)?;
        self.game.load_state_dict(state)
    }
}

impl<G: CommunicationGame> Game for PopulationGame<G> {
    fn forward(&mut self, batch: &Batch) -> Result<(f32, Interaction)> {
        let draw = self.sampler.draw();
        self.play_draw(draw, batch)
    }

    fn train(&mut self) {
        self.sampler.population_mut().set_training(true);
        self.game.set_training(true);
    }

    fn eval(&mut self) {
        self.sampler.population_mut().set_training(false);
        self.game.set_training(false);
    }
}

impl<G: CommunicationGame> PairwiseGame for PopulationGame<G> {
    fn n_senders(&self) -> usize {
        self.sampler.population().n_senders()
    }

    fn n_receivers(&self) -> usize {
        self.sampler.population().n_receivers()
    }

    /// Play a chosen pair; the loss is still drawn uniformly.
    fn forward_pair(&mut self, sender_idx: usize, recv_idx: usize, batch: &Batch) -> Result<(f32, Interaction)> {
        let loss_idx = self.sampler.draw_loss();
        self.play_draw(AgentDraw { sender_idx, recv_idx, loss_idx }, batch)
    }
}

fn tag_pair(interaction: &mut Interaction, sender_idx: usize, recv_idx: usize, rows: usize) {
    interaction
        .aux
        .insert(SENDER_IDX_KEY.to_string(), ArrayD::from_elem(IxDyn(&[rows]), sender_idx as f32));
    interaction
        .aux
        .insert(RECV_IDX_KEY.to_string(), ArrayD::from_elem(IxDyn(&[rows]), recv_idx as f32));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::stubs::{batch, const_losses, tag_receivers, tag_senders, BrokenLoss, EchoGame};
    use crate::error::EmcomError;
    use crate::loss::Loss;

    fn game(seed: u64) -> PopulationGame<EchoGame> {
        let sampler = UniformAgentSampler::from_pools(tag_senders(3), tag_receivers(2), const_losses(&[0.5]), seed).unwrap();
        PopulationGame::new(EchoGame, sampler)
    }

    #[test]
    fn test_recorded_pair_matches_injected_agents() {
        let mut g = game(9);
        for _ in 0..50 {
            let (loss, interaction) = g.forward(&batch(4, 3)).unwrap();
            assert_eq!(loss, 0.5);
            assert_eq!(interaction.aux[SENDER_IDX_KEY], interaction.aux["echo_sender"]);
            assert_eq!(interaction.aux[RECV_IDX_KEY], interaction.aux["echo_receiver"]);
            assert_eq!(interaction.aux[SENDER_IDX_KEY].len(), 4);
        }
    }

    #[test]
    fn test_recorded_pair_matches_sampler_draw() {
        let mut g = game(17);
        let mut replay = UniformAgentSampler::from_pools(tag_senders(3), tag_receivers(2), const_losses(&[0.5]), 17).unwrap();
        for _ in 0..30 {
            let draw = replay.draw();
            let (_, interaction) = g.forward(&batch(2, 3)).unwrap();
            assert_eq!(interaction.aux[SENDER_IDX_KEY][0], draw.sender_idx as f32);
            assert_eq!(interaction.aux[RECV_IDX_KEY][0], draw.recv_idx as f32);
        }
    }

    #[test]
    fn test_forward_pair_plays_requested_pair() {
        let mut g = game(0);
        let (_, interaction) = g.forward_pair(2, 1, &batch(3, 3)).unwrap();
        assert_eq!(interaction.aux["echo_sender"][0], 2.0);
        assert_eq!(interaction.aux["echo_receiver"][0], 1.0);
        assert!(g.forward_pair(3, 0, &batch(3, 3)).err().unwrap().is_configuration());
    }

    #[test]
    fn test_loss_errors_propagate() {
        let losses: Vec<Box<dyn Loss>> = vec![Box::new(BrokenLoss)];
        let sampler = UniformAgentSampler::from_pools(tag_senders(1), tag_receivers(1), losses, 0).unwrap();
        let mut g = PopulationGame::new(EchoGame, sampler);
        let err = g.forward(&batch(2, 2)).unwrap_err();
        assert_eq!(err, EmcomError::Computation("loss diverged".to_string()));
    }
}
