//! Events flowing through an optimization job

use super::state::OutputMode;
use crate::error::OptimizerError;
use async_trait::async_trait;

/// Internal completions that drive the job state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// Input temp file created and open for writing
    InputOpened,
    /// Input handle flushed and closed, tool about to run
    InputClosed { mode: OutputMode },
    /// Tool exited with code 0
    ProcessSucceeded,
    /// All output delivered to the consumer
    OutputDrained,
    Failed,
}

impl JobEvent {
    pub fn name(&self) -> &'static str {
        match self {
            JobEvent::InputOpened => "input-opened",
            JobEvent::InputClosed { .. } => "input-closed",
            JobEvent::ProcessSucceeded => "process-succeeded",
            JobEvent::OutputDrained => "output-drained",
            JobEvent::Failed => "failed",
        }
    }
}

/// What a consumer of the optimizer sees
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Data(Vec<u8>),
    End,
    Error(OptimizerError),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End | StreamEvent::Error(_))
    }

    pub fn description(&self) -> String {
        match self {
            StreamEvent::Data(chunk) => format!("data ({} bytes)", chunk.len()),
            StreamEvent::End => "end".to_string(),
            StreamEvent::Error(err) => format!("error: {err}"),
        }
    }
}

/// Subscriber for the output side of a [`StreamingOptimizer`](super::StreamingOptimizer)
#[async_trait]
pub trait StreamObserver: Send + Sync {
    async fn on_data(&self, chunk: &[u8]);

    async fn on_end(&self);

    async fn on_error(&self, error: &OptimizerError);
}

/// Logs every event at debug level
pub struct LoggingObserver;

#[async_trait]
impl StreamObserver for LoggingObserver {
    async fn on_data(&self, chunk: &[u8]) {
        tracing::debug!("Optimizer emitted {} bytes", chunk.len());
    }

    async fn on_end(&self) {
        tracing::debug!("Optimizer stream ended");
    }

    async fn on_error(&self, error: &OptimizerError) {
        tracing::debug!("Optimizer stream failed: {}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_event_terminal() {
        assert!(!StreamEvent::Data(vec![1, 2]).is_terminal());
        assert!(StreamEvent::End.is_terminal());
        assert!(StreamEvent::Error(OptimizerError::NotWritable).is_terminal());
    }

    #[test]
    fn test_stream_event_description() {
        assert_eq!(StreamEvent::Data(vec![0; 3]).description(), "data (3 bytes)");
        assert_eq!(StreamEvent::End.description(), "end");
        assert_eq!(
            StreamEvent::Error(OptimizerError::NotWritable).description(),
            "error: Stream is no longer writable"
        );
    }
}
