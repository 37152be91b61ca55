//! Periodic output of the ring buffer.
//!
//! A [`SinkDriver`] wakes up on a fixed interval, drains the [`RingBuffer`]
//! and hands any non-empty snapshot to a [`Sink`]. Two sinks are provided:
//!
//! - [`ConsoleSink`]: renders `The buffer is [v1 v2 ... vn]` lines to a writer
//! - [`ChannelSink`]: forwards each snapshot over a crossbeam channel

use crate::buffer::RingBuffer;
use crate::error::{PipelineError, Result};
use crate::shutdown::Shutdown;
use crossbeam::channel::{select, tick, Sender};
use std::io::{self, Stdout, Write};
use std::time::Duration;
use tracing::{debug, error, info};

/// A destination for drained buffer contents
pub trait Sink: Send + 'static {
    /// Receive one non-empty snapshot, oldest value first
    fn emit(&mut self, values: &[i64]) -> Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &str {
        "sink"
    }
}

/// Render a snapshot the way the console shows it
pub fn format_buffer(values: &[i64]) -> String {
    let joined = values
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!("The buffer is [{joined}]")
}

/// Writes one [`format_buffer`] line per flush
pub struct ConsoleSink<W> {
    out: W,
}

impl ConsoleSink<Stdout> {
    /// Console sink printing to the process's standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Create a console sink writing to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send + 'static> Sink for ConsoleSink<W> {
    fn emit(&mut self, values: &[i64]) -> Result<()> {
        writeln!(self.out, "{}", format_buffer(values))?;
        self.out.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Sends every snapshot to a channel
pub struct ChannelSink {
    sender: Sender<Vec<i64>>,
}

impl ChannelSink {
    /// Create a sink that sends each snapshot on `sender`
    pub fn new(sender: Sender<Vec<i64>>) -> Self {
        Self { sender }
    }
}

impl Sink for ChannelSink {
    fn emit(&mut self, values: &[i64]) -> Result<()> {
        self.sender
            .send(values.to_vec())
            .map_err(|_| PipelineError::SinkError("channel receiver dropped".into()))
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Drains the ring buffer into a sink on a fixed period
pub struct SinkDriver<S> {
    buffer: RingBuffer,
    sink: S,
    interval: Duration,
    shutdown: Shutdown,
}

impl<S: Sink> SinkDriver<S> {
    /// Create a driver that drains `buffer` into `sink` every `interval`
    pub fn new(buffer: RingBuffer, sink: S, interval: Duration, shutdown: Shutdown) -> Self {
        Self {
            buffer,
            sink,
            interval,
            shutdown,
        }
    }

    /// Drain once and emit if anything was there. Returns whether a snapshot was emitted.
    pub fn flush(&mut self) -> Result<bool> {
        let values = self.buffer.drain_and_reset();
        if values.is_empty() {
            return Ok(false);
        }

        debug!(sink = self.sink.name(), count = values.len(), "Flushing buffer");
        self.sink.emit(&values)?;
        Ok(true)
    }

    /// Flush on every tick until shutdown, then flush one last time.
    ///
    /// Returns the number of snapshots emitted. A sink error stops the driver.
    pub fn run(mut self) -> Result<u64> {
        info!(sink = self.sink.name(), interval = ?self.interval, "Sink driver started");
        let ticker = tick(self.interval);
        let mut emitted = 0;

        loop {
            select! {
                recv(ticker) -> _ => {
                    emitted += self.flush_logged()? as u64;
                }
                recv(self.shutdown.receiver()) -> _ => {
                    emitted += self.flush_logged()? as u64;
                    break;
                }
            }
        }

        info!(sink = self.sink.name(), emitted, "Sink driver finished");
        Ok(emitted)
    }

    fn flush_logged(&mut self) -> Result<bool> {
        self.flush().inspect_err(|err| {
            error!(sink = self.sink.name(), %err, "Sink failed, stopping driver");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::unbounded;
    use std::thread;

    #[test]
    fn test_format_buffer() {
        assert_eq!(format_buffer(&[2, 3, 4]), "The buffer is [2 3 4]");
        assert_eq!(format_buffer(&[-1]), "The buffer is [-1]");
    }

    #[test]
    fn test_console_sink_writes_line() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.emit(&[0, 3, 9]).unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "The buffer is [0 3 9]\n");
    }

    #[test]
    fn test_flush_skips_empty_buffer() {
        let buffer = RingBuffer::new(3).unwrap();
        let (tx, rx) = unbounded();
        let mut driver = SinkDriver::new(
            buffer.clone(),
            ChannelSink::new(tx),
            Duration::from_secs(60),
            Shutdown::new(),
        );

        assert!(!driver.flush().unwrap());
        buffer.push(6);
        assert!(driver.flush().unwrap());
        assert_eq!(rx.try_recv().unwrap(), vec![6]);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_driver_emits_on_tick() {
        let buffer = RingBuffer::new(3).unwrap();
        let (tx, rx) = unbounded();
        let shutdown = Shutdown::new();
        let driver = SinkDriver::new(
            buffer.clone(),
            ChannelSink::new(tx),
            Duration::from_millis(20),
            shutdown.clone(),
        );

        for v in 1..=4 {
            buffer.push(v);
        }
        let handle = thread::spawn(move || driver.run());

        let snapshot = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(snapshot, vec![2, 3, 4]);

        shutdown.trigger();
        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_driver_final_flush_on_shutdown() {
        let buffer = RingBuffer::new(5).unwrap();
        let (tx, rx) = unbounded();
        let shutdown = Shutdown::new();
        let driver = SinkDriver::new(
            buffer.clone(),
            ChannelSink::new(tx),
            Duration::from_secs(3600),
            shutdown.clone(),
        );

        buffer.push(12);
        shutdown.trigger();
        assert_eq!(driver.run().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), vec![12]);
    }

    #[test]
    fn test_driver_stops_on_sink_error() {
        let buffer = RingBuffer::new(2).unwrap();
        let (tx, rx) = unbounded();
        drop(rx);
        let shutdown = Shutdown::new();
        let driver = SinkDriver::new(
            buffer.clone(),
            ChannelSink::new(tx),
            Duration::from_millis(10),
            shutdown,
        );

        buffer.push(3);
        assert!(matches!(driver.run(), Err(PipelineError::SinkError(_))));
    }
}
