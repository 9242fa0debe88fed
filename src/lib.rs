pub mod captaincy;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod fixtures;
pub mod lineup;
pub mod logging;
pub mod manager_state;
pub mod minutes;
pub mod model;
pub mod normalize;
pub mod optimizer;
pub mod pipeline;
pub mod projection;
pub mod squad;
pub mod synthetic;
pub mod transfers;

pub use error::{PlannerError, Result, SquadError};
