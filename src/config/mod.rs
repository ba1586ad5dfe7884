use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{OptimizerError, Result};

pub mod loader;

pub use loader::load_config;

/// pngcrush's "no output" switch: analyze only, report on stdout/stderr
pub const DEFAULT_REPORT_ONLY_FLAG: &str = "-n";
pub const DEFAULT_PROGRAM: &str = "pngcrush";
pub const DEFAULT_SUFFIX: &str = ".png";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Executable invoked for every job
    pub program: String,
    /// Argument whose presence switches a job into report-only mode
    pub report_only_flag: String,
    /// Suffix given to temporary input and output files
    pub suffix: String,
    /// Directory for temporary files, system temp dir when unset
    pub temp_dir: Option<PathBuf>,
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,
    /// Size of each data chunk read back from the output file
    pub read_chunk_size: usize,
    /// Number of undelivered events buffered before the job waits on the consumer
    pub event_buffer: usize,
    /// Remove temporary files when a job fails
    pub cleanup_on_failure: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            report_only_flag: DEFAULT_REPORT_ONLY_FLAG.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
            temp_dir: None,
            timeout: None,
            read_chunk_size: 64 * 1024,
            event_buffer: 16,
            cleanup_on_failure: true,
        }
    }
}

impl OptimizerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_report_only_flag(mut self, flag: impl Into<String>) -> Self {
        self.report_only_flag = flag.into();
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| OptimizerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Directory temporary files are placed in
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn merge_env_vars(&mut self) -> Result<()> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `PNGCRUSH_STREAM_*` overrides read through `lookup`
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(program) = lookup("PNGCRUSH_STREAM_PROGRAM") {
            self.program = program;
        }

        if let Some(dir) = lookup("PNGCRUSH_STREAM_TEMP_DIR") {
            self.temp_dir = Some(PathBuf::from(dir));
        }

        if let Some(timeout) = lookup("PNGCRUSH_STREAM_TIMEOUT") {
            let parsed = humantime_serde::re::humantime::parse_duration(&timeout).map_err(|e| {
                OptimizerError::Config(format!("invalid PNGCRUSH_STREAM_TIMEOUT '{timeout}': {e}"))
            })?;
            self.timeout = Some(parsed);
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(OptimizerError::Config("program must not be empty".to_string()));
        }
        if self.read_chunk_size == 0 {
            return Err(OptimizerError::Config(
                "read_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(OptimizerError::Config(
                "event_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
