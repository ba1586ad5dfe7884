use std::path::{Path, PathBuf};

use super::state::OutputMode;
use crate::config::OptimizerConfig;
use crate::subprocess::{ProcessCommand, ProcessCommandBuilder};

/// Arguments and temp paths for one run of the external tool
#[derive(Debug, Clone)]
pub struct OptimizationJob {
    arguments: Vec<String>,
    input_path: PathBuf,
    output_path: PathBuf,
    mode: Option<OutputMode>,
}

impl OptimizationJob {
    pub fn new(arguments: Vec<String>, input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            arguments,
            input_path,
            output_path,
            mode: None,
        }
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Known once the input has been closed
    pub fn mode(&self) -> Option<OutputMode> {
        self.mode
    }

    /// Decide the output mode and append the file arguments
    ///
    /// Rewrite mode gets `input output`, report-only gets just `input`.
    /// Calling it again returns the mode already chosen.
    pub fn seal(&mut self, report_only_flag: &str) -> OutputMode {
        if let Some(mode) = self.mode {
            return mode;
        }

        let mode = OutputMode::detect(&self.arguments, report_only_flag);
        self.arguments
            .push(self.input_path.to_string_lossy().into_owned());
        if !mode.is_report_only() {
            self.arguments
                .push(self.output_path.to_string_lossy().into_owned());
        }
        self.mode = Some(mode);
        mode
    }

    pub fn command_line(&self, program: &str) -> String {
        if self.arguments.is_empty() {
            program.to_string()
        } else {
            format!("{} {}", program, self.arguments.join(" "))
        }
    }

    pub fn to_command(&self, config: &OptimizerConfig) -> ProcessCommand {
        ProcessCommandBuilder::new(&config.program)
            .args(&self.arguments)
            .maybe_timeout(config.timeout)
            .build()
    }
}
