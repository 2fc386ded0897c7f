use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::agents::{Receiver, Sender};
use crate::error::Result;
use crate::loss::Loss;
use super::Population;

/// Positions of one sampled (sender, receiver, loss) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentDraw {
    pub sender_idx: usize,
    pub recv_idx: usize,
    pub loss_idx: usize,
}

/// A sampled triple, borrowed from the population for one call
pub struct Sample<'a> {
    pub sender_idx: usize,
    pub recv_idx: usize,
    pub loss_idx: usize,
    pub sender: &'a mut dyn Sender,
    pub receiver: &'a mut dyn Receiver,
    pub loss: &'a dyn Loss,
}

/// Draws a sender, a receiver and a loss uniformly and independently, with
/// replacement across calls.
///
/// The random source is owned by the sampler and seeded explicitly, so a
/// sampler rebuilt with the same seed replays the same sequence of draws.
pub struct UniformAgentSampler {
    population: Population,
    rng: StdRng,
}

impl UniformAgentSampler {
    pub fn new(population: Population, seed: u64) -> Self {
        Self::with_rng(population, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(population: Population, rng: StdRng) -> Self {
        UniformAgentSampler { population, rng }
    }

    /// Build the population and the sampler in one step; any empty pool is a
    /// configuration error.
    pub fn from_pools(
        senders: Vec<Box<dyn Sender>>,
        receivers: Vec<Box<dyn Receiver>>,
        losses: Vec<Box<dyn Loss>>,
        seed: u64,
    ) -> Result<Self> {
        Ok(Self::new(Population::new(senders, receivers, losses)?, seed))
    }

    /// Draw positions only
    pub fn draw(&mut self) -> AgentDraw {
        AgentDraw {
            sender_idx: self.rng.gen_range(0..self.population.n_senders()),
            recv_idx: self.rng.gen_range(0..self.population.n_receivers()),
            loss_idx: self.rng.gen_range(0..self.population.n_losses()),
        }
    }

    /// Draw a loss position only
    pub fn draw_loss(&mut self) -> usize {
        self.rng.gen_range(0..self.population.n_losses())
    }

    /// Draw a triple and borrow its members
    pub fn sample(&mut self) -> Sample<'_> {
        let draw = self.draw();
        let population = &mut self.population;
        Sample {
            sender_idx: draw.sender_idx,
            recv_idx: draw.recv_idx,
            loss_idx: draw.loss_idx,
            sender: population.senders[draw.sender_idx].as_mut(),
            receiver: population.receivers[draw.recv_idx].as_mut(),
            loss: population.losses[draw.loss_idx].as_ref(),
        }
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }
}
