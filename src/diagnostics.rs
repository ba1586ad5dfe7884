//! Diagnostic reporting for problems that never reach the stream consumer.

use std::path::Path;

/// Receives best-effort failures, such as a temp file that could not be removed.
pub trait DiagnosticSink: Send + Sync {
    fn cleanup_failed(&self, path: &Path, error: &std::io::Error);
}

/// Forwards diagnostics to `tracing`
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn cleanup_failed(&self, path: &Path, error: &std::io::Error) {
        tracing::warn!(
            "Failed to remove temporary file {}: {}",
            path.display(),
            error
        );
    }
}
