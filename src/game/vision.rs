use crate::agents::{Receiver, Sender};
use crate::checkpoint::{extend_prefixed, sub_state, StateDict};
use crate::data::Batch;
use crate::error::Result;
use crate::interaction::Interaction;
use crate::loss::Loss;
use crate::vision::VisionModule;
use super::CommunicationGame;

/// Encodes both views of the batch before handing it to the wrapped game.
pub struct VisionGame<G> {
    game: G,
    vision: VisionModule,
}

impl<G: CommunicationGame> VisionGame<G> {
    pub fn new(game: G, vision: VisionModule) -> Self {
        VisionGame { game, vision }
    }

    pub fn inner(&self) -> &G {
        &self.game
    }

    pub fn vision(&self) -> &VisionModule {
        &self.vision
    }
}

impl<G: CommunicationGame> CommunicationGame for VisionGame<G> {
    fn play(
        &mut self,
        sender: &mut dyn Sender,
        receiver: &mut dyn Receiver,
        loss: &dyn Loss,
        batch: &Batch,
    ) -> Result<(f32, Interaction)> {
        let encoded = Batch::new(
            self.vision.encode_sender(batch.sender_input.view())?,
            batch.labels.clone(),
            self.vision.encode_receiver(batch.receiver_input.view())?,
        )?;
        self.game.play(sender, receiver, loss, &encoded)
    }

    fn set_training(&mut self, training: bool) {
        self.vision.set_training(training);
        self.game.set_training(training);
    }

    fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        extend_prefixed(&mut state, "vision.", self.vision.state_dict());
        extend_prefixed(&mut state, "game.", self.game.state_dict());
        state
    }

    fn load_state_dict(&mut self, state: &StateDict) -> Result<()> {
        self.vision.load_state_dict(&sub_state(state, "vision."))?;
        self.game.load_state_dict(&sub_state(state, "game."))
    }
}
