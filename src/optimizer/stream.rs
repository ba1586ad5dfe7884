use futures::stream::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, watch};

use super::dispatch::JobCore;
use super::events::{JobEvent, StreamEvent, StreamObserver};
use super::job::OptimizationJob;
use super::state::OutputMode;
use super::OptimizerContext;
use crate::error::{OptimizerError, Result};
use crate::subprocess::ExitStatus;

/// Duplex stream around an external, file-based optimizer.
///
/// The sink side (`write`, `end`) fills a temporary input file. `end` closes
/// it and hands the job to a background task that runs the tool and feeds
/// the result back through the source side: a `Stream` of [`StreamEvent`]s
/// that always finishes with exactly one `End` or `Error`.
pub struct StreamingOptimizer {
    job: OptimizationJob,
    context: OptimizerContext,
    core: Option<Arc<JobCore>>,
    writer: Option<BufWriter<File>>,
    events: mpsc::Receiver<StreamEvent>,
    pause: watch::Sender<bool>,
    readable: bool,
}

impl StreamingOptimizer {
    /// Allocate the temp files and open the input for writing
    ///
    /// The input file must not exist yet; an allocated path that collides
    /// with an existing file is a `WriteHandle` error.
    pub async fn create(arguments: Vec<String>, context: &OptimizerContext) -> Result<Self> {
        let config = context.config();
        config.validate()?;

        let input_path = context.paths().allocate(&config.suffix);
        let output_path = context.paths().allocate(&config.suffix);

        let file = context
            .paths()
            .create_file(&input_path)
            .await
            .map_err(|e| OptimizerError::write_handle(&input_path, e))?;

        let (tx, rx) = mpsc::channel(config.event_buffer);
        let core = Arc::new(JobCore::new(tx));
        core.dispatch(JobEvent::InputOpened)?;

        tracing::debug!(
            "Job {} buffering input to {}",
            core.id(),
            input_path.display()
        );

        let (pause, _) = watch::channel(false);

        Ok(Self {
            job: OptimizationJob::new(arguments, input_path, output_path),
            context: context.clone(),
            core: Some(core),
            writer: Some(BufWriter::new(file)),
            events: rx,
            pause,
            readable: true,
        })
    }

    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    /// False once the terminal event has been handed out
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn input_path(&self) -> &Path {
        self.job.input_path()
    }

    pub fn output_path(&self) -> &Path {
        self.job.output_path()
    }

    pub fn arguments(&self) -> &[String] {
        self.job.arguments()
    }

    /// The full invocation, available after `end`
    pub fn command_line(&self) -> Option<String> {
        self.job
            .mode()
            .map(|_| self.job.command_line(&self.context.config().program))
    }

    /// Append a chunk to the input file, waiting until the handle accepts it
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(OptimizerError::NotWritable)?;
        if let Err(e) = writer.write_all(chunk).await {
            return Err(self.fail_ingest(e).await);
        }
        Ok(())
    }

    /// Write the optional last chunk, close the input and start the tool
    pub async fn end(&mut self, chunk: Option<&[u8]>) -> Result<()> {
        if let Some(chunk) = chunk {
            self.write(chunk).await?;
        }

        let mut writer = self.writer.take().ok_or(OptimizerError::NotWritable)?;
        if let Err(e) = writer.shutdown().await {
            return Err(self.fail_ingest(e).await);
        }
        drop(writer);

        let core = self.core.take().ok_or(OptimizerError::NotWritable)?;
        let mode = self.job.seal(&self.context.config().report_only_flag);
        core.dispatch(JobEvent::InputClosed { mode })?;

        tracing::debug!(
            "Job {} input closed, running: {}",
            core.id(),
            self.job.command_line(&self.context.config().program)
        );

        tokio::spawn(run_job(JobRun {
            core,
            job: self.job.clone(),
            context: self.context.clone(),
            pause: self.pause.subscribe(),
        }));

        Ok(())
    }

    /// Hold back output; applied at the next chunk, or when the output file
    /// is opened if that has not happened yet
    pub fn pause(&self) {
        self.pause.send_replace(true);
    }

    pub fn resume(&self) {
        self.pause.send_replace(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.pause.borrow()
    }

    /// Deliver every event to `observer`, stopping after the terminal one
    pub async fn pipe_to(&mut self, observer: &dyn StreamObserver) -> Result<()> {
        while let Some(event) = self.next().await {
            match event {
                StreamEvent::Data(chunk) => observer.on_data(&chunk).await,
                StreamEvent::End => {
                    observer.on_end().await;
                    return Ok(());
                }
                StreamEvent::Error(err) => {
                    observer.on_error(&err).await;
                    return Err(err);
                }
            }
        }
        Err(OptimizerError::Interrupted)
    }

    /// Gather all output bytes, or the error that ended the job
    pub async fn collect_output(mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        while let Some(event) = self.next().await {
            match event {
                StreamEvent::Data(chunk) => output.extend_from_slice(&chunk),
                StreamEvent::End => return Ok(output),
                StreamEvent::Error(err) => return Err(err),
            }
        }
        Err(OptimizerError::Interrupted)
    }

    async fn fail_ingest(&mut self, error: std::io::Error) -> OptimizerError {
        self.writer = None;
        let err = OptimizerError::write_handle(self.job.input_path(), error);

        if let Some(core) = self.core.take() {
            core.report_error(err.clone()).await;
        }
        if self.context.config().cleanup_on_failure {
            remove_temp_file(self.job.input_path(), &self.context, true).await;
        }
        err
    }
}

impl Stream for StreamingOptimizer {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        let this = self.get_mut();
        if !this.readable {
            return Poll::Ready(None);
        }

        match this.events.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    this.readable = false;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                this.readable = false;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for StreamingOptimizer {
    fn drop(&mut self) {
        // Never ended: nothing else will clean up the input file
        if self.writer.take().is_some() {
            if let Err(e) = std::fs::remove_file(self.job.input_path()) {
                self.context
                    .diagnostics()
                    .cleanup_failed(self.job.input_path(), &e);
            }
        }
    }
}

struct JobRun {
    core: Arc<JobCore>,
    job: OptimizationJob,
    context: OptimizerContext,
    pause: watch::Receiver<bool>,
}

async fn run_job(mut run: JobRun) {
    if let Err(err) = process_and_emit(&mut run).await {
        if run.context.config().cleanup_on_failure {
            remove_temp_file(run.job.input_path(), &run.context, true).await;
            remove_temp_file(run.job.output_path(), &run.context, true).await;
        }
        run.core.report_error(err).await;
    }
}

async fn process_and_emit(run: &mut JobRun) -> Result<()> {
    let config = run.context.config();
    let program = config.program.clone();
    let mode = run.job.mode().unwrap_or(OutputMode::Rewrite);

    let output = run
        .context
        .runner()
        .run(run.job.to_command(config))
        .await
        .map_err(|e| OptimizerError::from_process(&program, e))?;

    match output.status {
        ExitStatus::Success => {}
        ExitStatus::Error(code) => {
            return Err(OptimizerError::NonZeroExit {
                program,
                code,
                stdout: output.stdout_lossy(),
                stderr: output.stderr_lossy(),
            })
        }
        ExitStatus::Signal(signal) => return Err(OptimizerError::Signal { program, signal }),
    }

    run.core.dispatch(JobEvent::ProcessSucceeded)?;
    remove_temp_file(run.job.input_path(), &run.context, false).await;

    let output_path = run.job.output_path().to_path_buf();
    let metadata = fs::metadata(&output_path).await;
    match metadata {
        Ok(_) => stream_output_file(run, output_path, mode).await,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => match mode {
            OutputMode::Rewrite => Err(OptimizerError::MissingOutputFile {
                program,
                stdout: output.stdout_lossy(),
            }),
            OutputMode::ReportOnly => {
                run.core.emit_data(output.stdout).await;
                run.core.emit_data(output.stderr).await;
                run.core.finish().await;
                Ok(())
            }
        },
        Err(e) => Err(OptimizerError::output_read(output_path, e)),
    }
}

async fn stream_output_file(run: &mut JobRun, path: PathBuf, mode: OutputMode) -> Result<()> {
    let mut file = File::open(&path)
        .await
        .map_err(|e| OptimizerError::output_read(&path, e))?;
    let mut buffer = vec![0u8; run.context.config().read_chunk_size];

    loop {
        let resumed = run.pause.wait_for(|paused| !*paused).await.is_ok();
        if !resumed {
            tracing::debug!("Job {} consumer dropped while paused", run.core.id());
            break;
        }

        let read = file
            .read(&mut buffer)
            .await
            .map_err(|e| OptimizerError::output_read(&path, e))?;
        if read == 0 {
            break;
        }
        if !run.core.emit_data(buffer[..read].to_vec()).await {
            break;
        }
    }
    drop(file);

    if !mode.is_report_only() {
        remove_temp_file(&path, &run.context, false).await;
    }
    run.core.finish().await;
    Ok(())
}

/// Best-effort removal; failures go to the diagnostics sink only
async fn remove_temp_file(path: &Path, context: &OptimizerContext, ignore_missing: bool) {
    match fs::remove_file(path).await {
        Ok(()) => tracing::trace!("Removed temporary file {}", path.display()),
        Err(e) if ignore_missing && e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => context.diagnostics().cleanup_failed(path, &e),
    }
}
