use clap::Parser;
use futures::{Stream, StreamExt};
use pngcrush_stream::{
    config::load_config, OptimizerContext, OptimizerError, StreamEvent, StreamingOptimizer,
};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, trace};

/// Optimize an image read from stdin with pngcrush and write the result to stdout
#[derive(Parser)]
#[command(name = "pngcrush-stream")]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Optimizer executable (overrides the configuration)
    #[arg(long)]
    program: Option<String>,

    /// Argument that switches the tool into report-only mode
    #[arg(long)]
    report_flag: Option<String>,

    /// Arguments forwarded to the optimizer, before the temp file paths
    #[arg(last = true)]
    tool_args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // stdout carries image bytes, keep logs on stderr
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .with_writer(std::io::stderr)
        .init();

    debug!("pngcrush-stream started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli).await {
        error!("Fatal error: {}", e);
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_deref()).await?;
    if let Some(program) = cli.program {
        config.program = program;
    }
    if let Some(flag) = cli.report_flag {
        config.report_only_flag = flag;
    }
    config.validate()?;

    let context = OptimizerContext::production(config);
    let mut optimizer = StreamingOptimizer::create(cli.tool_args, &context).await?;

    feed_input(tokio::io::stdin(), &mut optimizer).await?;
    optimizer.end(None).await?;

    write_events(&mut optimizer, tokio::io::stdout()).await
}

async fn feed_input<R>(mut input: R, optimizer: &mut StreamingOptimizer) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = input.read(&mut buffer).await?;
        if read == 0 {
            return Ok(());
        }
        optimizer.write(&buffer[..read]).await?;
    }
}

/// Copy data events to `out` until `End`. A stream that closes without a
/// terminal event is an error, so partial output never exits cleanly.
async fn write_events<S, W>(events: &mut S, mut out: W) -> anyhow::Result<()>
where
    S: Stream<Item = StreamEvent> + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Data(chunk) => out.write_all(&chunk).await?,
            StreamEvent::End => {
                out.flush().await?;
                return Ok(());
            }
            StreamEvent::Error(err) => return Err(err.into()),
        }
    }
    Err(OptimizerError::Interrupted.into())
}
