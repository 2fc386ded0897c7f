//! # Agents
//!
//! Senders map an input representation to a message, receivers consume a
//! message together with their own view of the candidates. Agents whose
//! sharpness is controlled by a temperature declare it through
//! [`Annealable`] so annealing observers can be attached without probing.

pub mod traits;
pub mod sender;
pub mod receiver;

pub use traits::{Annealable, Receiver, Sender};
pub use sender::{EmSslSender, gumbel_softmax_sample, one_hot_argmax};
pub use receiver::ProjectionReceiver;
