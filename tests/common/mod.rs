//! Common test utilities and helpers

use pngcrush_stream::{OptimizerConfig, OptimizerContext};
use std::path::Path;
use tempfile::TempDir;

/// Uses `sh` as a stand-in optimizer. Scripts receive the temp paths as
/// `$1` (input) and `$2` (output).
pub struct ShellFixture {
    temp_dir: TempDir,
    pub context: OptimizerContext,
}

impl ShellFixture {
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    pub fn with_config<F>(adjust: F) -> Self
    where
        F: FnOnce(OptimizerConfig) -> OptimizerConfig,
    {
        let temp_dir = TempDir::new().unwrap();
        let config = adjust(
            OptimizerConfig::default()
                .with_program("sh")
                .with_temp_dir(temp_dir.path()),
        );
        Self {
            context: OptimizerContext::production(config),
            temp_dir,
        }
    }

    /// Arguments that make `sh` run `script` with the temp paths as positionals
    pub fn script_args(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string(), "fake-crush".to_string()]
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn leftover_files(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path()).unwrap().count()
    }
}
