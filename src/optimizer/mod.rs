//! Streaming adapter around a file-based image optimizer
//!
//! A job moves through `Idle -> Ingesting -> Spawned -> Emitting` and ends in
//! `Succeeded` or `Failed`. See [`StreamingOptimizer`] for the public surface.

pub mod dispatch;
pub mod events;
pub mod job;
pub mod state;
pub mod stream;


pub use events::{JobEvent, LoggingObserver, StreamEvent, StreamObserver};
pub use job::OptimizationJob;
pub use state::{InvalidTransition, JobState, OutputMode};
pub use stream::StreamingOptimizer;

use std::sync::Arc;

use crate::config::OptimizerConfig;
use crate::diagnostics::{DiagnosticSink, TracingDiagnostics};
use crate::error::Result;
use crate::subprocess::{ProcessRunner, TokioProcessRunner};
use crate::temp::{SystemTempPaths, TempPathAllocator};

/// Collaborators shared by every job: configuration, the process runner,
/// temp path allocation and the diagnostics sink.
#[derive(Clone)]
pub struct OptimizerContext {
    config: Arc<OptimizerConfig>,
    runner: Arc<dyn ProcessRunner>,
    paths: Arc<dyn TempPathAllocator>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl OptimizerContext {
    pub fn new(
        config: OptimizerConfig,
        runner: Arc<dyn ProcessRunner>,
        paths: Arc<dyn TempPathAllocator>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            runner,
            paths,
            diagnostics,
        }
    }

    /// Real processes, temp files under the configured directory, tracing diagnostics
    pub fn production(config: OptimizerConfig) -> Self {
        let paths = SystemTempPaths::new(config.resolved_temp_dir());
        Self::new(
            config,
            Arc::new(TokioProcessRunner),
            Arc::new(paths),
            Arc::new(TracingDiagnostics),
        )
    }

    #[cfg(test)]
    pub fn mock(config: OptimizerConfig) -> (Self, crate::subprocess::MockProcessRunner) {
        let mock = crate::subprocess::MockProcessRunner::new();
        let context = Self::production(config).with_runner(Arc::new(mock.clone()));
        (context, mock)
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_paths(mut self, paths: Arc<dyn TempPathAllocator>) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn runner(&self) -> Arc<dyn ProcessRunner> {
        Arc::clone(&self.runner)
    }

    pub fn paths(&self) -> &dyn TempPathAllocator {
        self.paths.as_ref()
    }

    pub fn diagnostics(&self) -> &dyn DiagnosticSink {
        self.diagnostics.as_ref()
    }
}

/// Run `input` through the optimizer in one call
pub async fn optimize_bytes(
    arguments: Vec<String>,
    input: &[u8],
    context: &OptimizerContext,
) -> Result<Vec<u8>> {
    let mut optimizer = StreamingOptimizer::create(arguments, context).await?;
    optimizer.end(Some(input)).await?;
    optimizer.collect_output().await
}
