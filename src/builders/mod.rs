pub mod game;

pub use game::{build_game, build_population, get_game, PopulationVisionGame};
