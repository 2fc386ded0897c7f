pub mod functions;

pub use functions::{Loss, Similarity, XEntLoss};
