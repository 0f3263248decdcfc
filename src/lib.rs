#![warn(clippy::all)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod bc;
pub mod cases;
pub mod command;
pub mod deck;
pub mod errors;
pub mod geometry;
pub mod mesh;
pub mod report;
pub mod session;
pub mod stats;

pub use errors::{DeckError, GenerateError, SessionError};
pub use geometry::{point, Point};
pub use mesh::MeshModel;
pub use session::{tracked_cmd, tracked_cmd_single, MeshingSession};
pub use stats::MeshStatistics;
