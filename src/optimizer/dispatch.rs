//! Single dispatch point for a job's state and its outgoing events

use std::sync::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{JobEvent, StreamEvent};
use super::state::{InvalidTransition, JobState};
use crate::error::OptimizerError;

/// Owns the job state and the sending half of the consumer channel.
///
/// Every transition goes through [`JobCore::dispatch`]; terminal events are
/// only sent by the call that moved the job into a terminal state.
pub struct JobCore {
    id: Uuid,
    state: Mutex<JobState>,
    events: mpsc::Sender<StreamEvent>,
}

impl JobCore {
    pub fn new(events: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: Mutex::new(JobState::Idle),
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.lock_state().clone()
    }

    pub fn dispatch(&self, event: JobEvent) -> Result<JobState, InvalidTransition> {
        let mut state = self.lock_state();
        let next = state.next(&event)?;
        tracing::trace!(
            "Job {} transition {:?} -> {:?} on {}",
            self.id,
            *state,
            next,
            event.name()
        );
        *state = next.clone();
        Ok(next)
    }

    /// Forward a chunk while the job is emitting. Returns false once the
    /// job is over or the consumer has gone away.
    pub async fn emit_data(&self, chunk: Vec<u8>) -> bool {
        if !matches!(self.state(), JobState::Emitting { .. }) {
            return false;
        }
        self.send(StreamEvent::Data(chunk)).await
    }

    /// Move to the success state and emit `End`
    pub async fn finish(&self) -> bool {
        match self.dispatch(JobEvent::OutputDrained) {
            Ok(_) => {
                tracing::debug!("Job {} completed", self.id);
                self.send(StreamEvent::End).await;
                true
            }
            Err(e) => {
                tracing::debug!("Job {} not finished: {}", self.id, e);
                false
            }
        }
    }

    /// Report a failure. Only the first report of a job reaches the consumer;
    /// later ones return false and are dropped.
    pub async fn report_error(&self, error: OptimizerError) -> bool {
        if let Err(e) = self.dispatch(JobEvent::Failed) {
            tracing::debug!(
                "Job {} suppressed late error ({}): {}",
                self.id,
                e,
                error
            );
            return false;
        }

        tracing::debug!("Job {} failed: {}", self.id, error);
        self.send(StreamEvent::Error(error)).await;
        true
    }

    async fn send(&self, event: StreamEvent) -> bool {
        if self.events.send(event).await.is_err() {
            tracing::debug!("Job {} consumer dropped the stream", self.id);
            return false;
        }
        true
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OutputMode;

    fn core() -> (JobCore, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (JobCore::new(tx), rx)
    }

    fn drain(rx: &mut mpsc::Receiver<StreamEvent>) -> Vec<String> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.description());
        }
        seen
    }

    #[tokio::test]
    async fn test_report_error_is_idempotent() {
        let (core, mut rx) = core();
        core.dispatch(JobEvent::InputOpened).unwrap();

        assert!(core.report_error(OptimizerError::NotWritable).await);
        assert!(!core.report_error(OptimizerError::Interrupted).await);
        assert!(!core.finish().await);

        assert_eq!(core.state(), JobState::Failed);
        assert_eq!(drain(&mut rx), vec!["error: Stream is no longer writable"]);
    }

    #[tokio::test]
    async fn test_error_after_end_is_suppressed() {
        let (core, mut rx) = core();
        let mode = OutputMode::Rewrite;
        core.dispatch(JobEvent::InputOpened).unwrap();
        core.dispatch(JobEvent::InputClosed { mode }).unwrap();
        core.dispatch(JobEvent::ProcessSucceeded).unwrap();

        assert!(core.emit_data(b"png".to_vec()).await);
        assert!(core.finish().await);
        assert!(!core.report_error(OptimizerError::Interrupted).await);
        assert!(!core.emit_data(b"late".to_vec()).await);

        assert_eq!(drain(&mut rx), vec!["data (3 bytes)", "end"]);
    }

    #[tokio::test]
    async fn test_data_only_flows_while_emitting() {
        let (core, mut rx) = core();
        core.dispatch(JobEvent::InputOpened).unwrap();

        assert!(!core.emit_data(b"early".to_vec()).await);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_send_fails_when_consumer_dropped() {
        let (core, rx) = core();
        drop(rx);
        core.dispatch(JobEvent::InputOpened).unwrap();
        core.dispatch(JobEvent::InputClosed {
            mode: OutputMode::Rewrite,
        })
        .unwrap();
        core.dispatch(JobEvent::ProcessSucceeded).unwrap();

        assert!(!core.emit_data(vec![1]).await);
        // The state still settles even though nobody is listening
        assert!(core.finish().await);
        assert!(core.state().is_terminal());
    }
}
