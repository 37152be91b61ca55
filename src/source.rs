use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::shutdown::Shutdown;
use crate::stage::hand_off;
use crossbeam::channel::Sender;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use tracing::{debug, info, warn};

/// Line that ends the read loop, compared case-insensitively
pub const EXIT_COMMAND: &str = "exit";

/// One parsed input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Value(i64),
    Exit,
}

/// Parse a raw input line. Surrounding whitespace is ignored.
pub fn parse_line(line: &str) -> Result<Command> {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case(EXIT_COMMAND) {
        return Ok(Command::Exit);
    }

    trimmed
        .parse::<i64>()
        .map(Command::Value)
        .map_err(|source| PipelineError::Parse {
            input: trimmed.to_string(),
            source,
        })
}

/// Parse raw input bytes. Bytes that are not UTF-8 fail like any other bad line.
pub fn parse_bytes(bytes: &[u8]) -> Result<Command> {
    parse_line(std::str::from_utf8(bytes)?)
}

/// Reads integers line by line and feeds them into the first pipeline channel.
///
/// Invalid lines are reported on `console` and never reach the channel.
pub struct LineSource<R, W> {
    reader: R,
    console: W,
    metrics: StageMetrics,
}

impl LineSource<BufReader<Stdin>, Stdout> {
    /// Source reading from the process's standard input
    pub fn stdin() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> LineSource<R, W>
where
    R: BufRead,
    W: Write,
{
    /// Create a source reading from `reader` and reporting bad lines on `console`
    pub fn new(reader: R, console: W) -> Self {
        Self {
            reader,
            console,
            metrics: StageMetrics::new(),
        }
    }

    /// Record into an existing set of counters
    pub fn with_metrics(mut self, metrics: StageMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Read until EOF, the exit command, shutdown, or the downstream stage going away.
    ///
    /// A read blocked on the underlying stream only observes shutdown once
    /// the next line arrives.
    pub fn run(mut self, output: Sender<i64>, shutdown: Shutdown) -> Result<()> {
        info!("Source started");
        let mut line = Vec::new();

        while !shutdown.is_triggered() {
            line.clear();
            if self.reader.read_until(b'\n', &mut line)? == 0 {
                info!("Input exhausted");
                break;
            }
            debug!(input = %String::from_utf8_lossy(&line).trim_end(), "Line read");
            self.metrics.record_received();

            match parse_bytes(&line) {
                Ok(Command::Exit) => {
                    writeln!(self.console, "Program exits!")?;
                    info!("Input closed by user");
                    break;
                }
                Ok(Command::Value(value)) => {
                    if !hand_off(&output, value, &shutdown) {
                        break;
                    }
                    self.metrics.record_forwarded();
                }
                Err(err) => {
                    warn!(%err, "Discarding input");
                    self.metrics.record_dropped();
                    writeln!(self.console, "This is not the number!")?;
                }
            }
        }

        self.console.flush()?;
        info!("Source finished");
        Ok(())
    }
}
