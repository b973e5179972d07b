pub mod model;
pub mod utils;
pub mod wire;

pub use model::*;
