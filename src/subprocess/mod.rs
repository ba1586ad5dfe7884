//! Process execution seam used to drive the external optimizer.
//!
//! Production code goes through [`TokioProcessRunner`]; unit tests swap in
//! a `MockProcessRunner` so no real binary is needed.

pub mod builder;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod runner;


pub use builder::ProcessCommandBuilder;
pub use error::ProcessError;
#[cfg(test)]
pub use mock::{MockCommandConfig, MockProcessRunner};
pub use runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner, TokioProcessRunner};
