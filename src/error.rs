use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::optimizer::InvalidTransition;
use crate::subprocess::ProcessError;

/// Every way an optimization job can fail.
///
/// Errors travel to consumers inside stream events, so the type is `Clone`;
/// underlying sources are shared behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum OptimizerError {
    #[error("Failed to write input file {}: {source}", .path.display())]
    WriteHandle {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: Arc<ProcessError>,
    },

    #[error("The {program} process exited with a non-zero exit code: {code}")]
    NonZeroExit {
        program: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("The {program} process was terminated by signal {signal}")]
    Signal { program: String, signal: i32 },

    #[error("The {program} process timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("{program} did not write an output file, stdout output:\n{stdout}")]
    MissingOutputFile { program: String, stdout: String },

    #[error("Failed to read output file {}: {source}", .path.display())]
    OutputRead {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("Stream is no longer writable")]
    NotWritable,

    #[error("Optimization job stopped before reporting completion")]
    Interrupted,

    #[error(transparent)]
    State(#[from] InvalidTransition),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OptimizerError {
    pub fn write_handle(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteHandle {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub fn output_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OutputRead {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Map a runner failure, keeping timeouts distinct from spawn problems
    pub fn from_process(program: &str, error: ProcessError) -> Self {
        match error {
            ProcessError::Timeout(after) => Self::Timeout {
                program: program.to_string(),
                after,
            },
            other => Self::Spawn {
                program: program.to_string(),
                source: Arc::new(other),
            },
        }
    }

    /// Exit code of the external tool, when it ran to completion
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_message_shows_code_only() {
        let err = OptimizerError::NonZeroExit {
            program: "pngcrush".to_string(),
            code: 2,
            stdout: "verbose output".to_string(),
            stderr: "bad chunk".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "The pngcrush process exited with a non-zero exit code: 2"
        );
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn test_missing_output_includes_stdout() {
        let err = OptimizerError::MissingOutputFile {
            program: "pngcrush".to_string(),
            stdout: "nothing to do".to_string(),
        };

        assert!(err.to_string().contains("did not write an output file"));
        assert!(err.to_string().ends_with("nothing to do"));
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_from_process_maps_timeout() {
        let err = OptimizerError::from_process(
            "pngcrush",
            ProcessError::Timeout(Duration::from_secs(3)),
        );
        assert!(matches!(err, OptimizerError::Timeout { .. }));

        let err = OptimizerError::from_process(
            "pngcrush",
            ProcessError::CommandNotFound("pngcrush".to_string()),
        );
        match err {
            OptimizerError::Spawn { program, source } => {
                assert_eq!(program, "pngcrush");
                assert!(source.is_spawn_failure());
            }
            other => panic!("Expected Spawn, got {other:?}"),
        }
    }

    #[test]
    fn test_errors_are_cloneable_with_source() {
        use std::error::Error as _;

        let err = OptimizerError::write_handle(
            "/tmp/in.png",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert!(copy.source().is_some());
    }
}
