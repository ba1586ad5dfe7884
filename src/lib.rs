//! # pngcrush-stream
//!
//! Pipe image bytes through `pngcrush`, or any optimizer that only works on
//! files, as if it were an async transform stream.
//!
//! ```no_run
//! use pngcrush_stream::{OptimizerConfig, OptimizerContext, StreamingOptimizer};
//!
//! # async fn demo(png: &[u8]) -> pngcrush_stream::Result<Vec<u8>> {
//! let context = OptimizerContext::production(OptimizerConfig::default());
//! let mut optimizer = StreamingOptimizer::create(vec!["-brute".into()], &context).await?;
//! optimizer.write(png).await?;
//! optimizer.end(None).await?;
//! optimizer.collect_output().await
//! # }
//! ```
//!
//! ## Modules
//!
//! - `optimizer` - The streaming job, its state machine and events
//! - `subprocess` - Process runner abstraction with a mock for tests
//! - `config` - TOML and environment configuration
//! - `temp` - Unique temporary path allocation
//! - `diagnostics` - Sink for best-effort cleanup failures
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod optimizer;
pub mod subprocess;
pub mod temp;

pub use config::OptimizerConfig;
pub use error::{OptimizerError, Result};
pub use optimizer::{
    optimize_bytes, OptimizerContext, OutputMode, StreamEvent, StreamObserver, StreamingOptimizer,
};
