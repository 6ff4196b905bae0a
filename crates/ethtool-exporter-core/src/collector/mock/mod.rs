//! Mock implementations for testing collectors without Linux.

mod filesystem;
mod runner;
pub mod scenarios;

pub use filesystem::MockFs;
pub use runner::MockRunner;
