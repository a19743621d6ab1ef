pub mod action_item;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod emergency;
pub mod error;
pub mod feedback;
pub mod io;
pub mod mediation;
pub mod pulse;
pub mod score;
pub mod suggest;
pub mod trend;
pub mod types;
pub mod week;
pub mod workspace;

pub use error::{PulseError, Result};
