//! Console entry point.
//!
//! Reads one integer per line from stdin, keeps the non-negative multiples of
//! three, and prints the ring buffer every flush interval. Type `exit` (or
//! close stdin) to finish normally; Ctrl+C aborts.

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::{bounded, select, Receiver};
use ring_pipeline::{ConsoleSink, LineSource, PipelineBuilder, DEFAULT_CAPACITY};
use std::thread;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "ring-pipeline")]
#[command(about = "Filter integers from stdin into a periodically flushed ring buffer", long_about = None)]
struct Cli {
    /// Ring buffer capacity
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Flush interval in seconds
    #[arg(short, long, default_value_t = 5)]
    interval_secs: u64,

    /// Flush interval in milliseconds, overrides --interval-secs
    #[arg(long)]
    interval_ms: Option<u64>,
}

impl Cli {
    fn flush_interval(&self) -> Duration {
        self.interval_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| Duration::from_secs(self.interval_secs))
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries buffer output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let running = PipelineBuilder::new()
        .with_standard_filters()
        .capacity(cli.capacity)
        .flush_interval(cli.flush_interval())
        .build()
        .context("invalid pipeline configuration")?
        .start(LineSource::stdin(), ConsoleSink::stdout())?;

    let interrupted = interrupt_listener()?;
    let input_closed = running.input_closed();

    let report = select! {
        recv(interrupted) -> msg => match msg {
            Ok(()) => {
                println!("Got interrupt signal. Aborting ...");
                running.shutdown()?
            }
            // No signal listener, so only the input can end the run
            Err(_) => running.wait()?,
        },
        recv(input_closed) -> _ => running.wait()?,
    };

    tracing::debug!("{}", report.summary());
    Ok(())
}

/// Receiver that gets a message when the process is interrupted.
///
/// The signal future runs on a single-threaded tokio runtime parked on its own thread.
fn interrupt_listener() -> Result<Receiver<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;
    let (tx, rx) = bounded(1);

    thread::Builder::new()
        .name("signal".into())
        .spawn(move || match runtime.block_on(tokio::signal::ctrl_c()) {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(err) => tracing::error!(%err, "Unable to listen for interrupt"),
        })
        .context("failed to spawn signal thread")?;

    Ok(rx)
}
