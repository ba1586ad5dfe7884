//! Job state machine
//!
//! Every asynchronous completion in a job is turned into a [`JobEvent`] and
//! fed through [`JobState::next`]. Terminal states accept no events, which is
//! what keeps a job to exactly one `End` or `Error`.

use super::events::JobEvent;

/// What the external tool is expected to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// The tool writes an optimized copy to the output path
    Rewrite,
    /// The tool only reports on stdout/stderr
    ReportOnly,
}

impl OutputMode {
    /// Report-only when `flag` appears anywhere in `args`
    pub fn detect(args: &[String], flag: &str) -> Self {
        if args.iter().any(|arg| arg == flag) {
            OutputMode::ReportOnly
        } else {
            OutputMode::Rewrite
        }
    }

    pub fn is_report_only(&self) -> bool {
        matches!(self, OutputMode::ReportOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    /// Created, input handle not yet open
    Idle,
    /// Accepting input bytes
    Ingesting,
    /// Input closed, external process launched
    Spawned { mode: OutputMode },
    /// Process succeeded, output is being delivered
    Emitting { mode: OutputMode },
    Succeeded { mode: OutputMode },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid job transition from {from:?} on {event}")]
pub struct InvalidTransition {
    pub from: JobState,
    pub event: &'static str,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded { .. } | JobState::Failed)
    }

    pub fn accepts_input(&self) -> bool {
        matches!(self, JobState::Ingesting)
    }

    pub fn mode(&self) -> Option<OutputMode> {
        match self {
            JobState::Spawned { mode }
            | JobState::Emitting { mode }
            | JobState::Succeeded { mode } => Some(*mode),
            _ => None,
        }
    }

    /// Compute the state that follows `event`
    pub fn next(&self, event: &JobEvent) -> Result<JobState, InvalidTransition> {
        let next = match (self, event) {
            (JobState::Idle, JobEvent::InputOpened) => JobState::Ingesting,
            (JobState::Ingesting, JobEvent::InputClosed { mode }) => {
                JobState::Spawned { mode: *mode }
            }
            (JobState::Spawned { mode }, JobEvent::ProcessSucceeded) => {
                JobState::Emitting { mode: *mode }
            }
            (JobState::Emitting { mode }, JobEvent::OutputDrained) => {
                JobState::Succeeded { mode: *mode }
            }
            (state, JobEvent::Failed) if !state.is_terminal() => JobState::Failed,
            (state, event) => {
                return Err(InvalidTransition {
                    from: state.clone(),
                    event: event.name(),
                })
            }
        };
        Ok(next)
    }
}
