pub mod checkpoint;
pub mod model;
pub mod network;

pub use checkpoint::{Checkpoint, CheckpointManager};
pub use model::{BasicModel, EstimatorSpec, ModeKeys, Predictions};
pub use network::Network;
