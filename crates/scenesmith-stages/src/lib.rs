//! Pipeline stage implementations
//!
//! [`OraclePlanner`] and [`OracleMapper`] ask the oracle and repair what comes
//! back; [`PythonSynthesizer`] is deterministic and never calls out.

mod mapper;
mod planner;
mod prompts;
mod synthesizer;

pub use mapper::{OracleMapper, archetype, color};
pub use planner::OraclePlanner;
pub use synthesizer::PythonSynthesizer;
