use crate::buffer::RingBuffer;
use crate::error::{PipelineError, Result};
use crate::metrics::{MetricsSnapshot, StageMetrics};
use crate::shutdown::Shutdown;
use crate::sink::{Sink, SinkDriver};
use crate::source::LineSource;
use crate::stage::{standard_filters, BufferWriter, Stage, StageRunner};
use crossbeam::channel::{bounded, Receiver};
use std::io::{BufRead, Write};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ring buffer capacity used when none is configured
pub const DEFAULT_CAPACITY: usize = 20;

/// Flush period used when none is configured
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Builder for constructing pipelines
pub struct PipelineBuilder {
    capacity: usize,
    flush_interval: Duration,
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder with no stages and default settings
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            stages: Vec::new(),
        }
    }

    /// Append the non-negative and divisible-by-three filters
    pub fn with_standard_filters(mut self) -> Self {
        self.stages.extend(standard_filters());
        self
    }

    /// Append a stage after the ones already added
    pub fn add_stage(mut self, stage: impl Stage) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Set the ring buffer capacity
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set how often the buffer is flushed to the sink
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<Pipeline> {
        if self.stages.is_empty() {
            return Err(PipelineError::NoStages);
        }
        if self.flush_interval.is_zero() {
            return Err(PipelineError::ConfigError(
                "flush interval must be greater than zero".into(),
            ));
        }

        Ok(Pipeline {
            buffer: RingBuffer::new(self.capacity)?,
            flush_interval: self.flush_interval,
            stages: self.stages,
            shutdown: Shutdown::new(),
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated, not yet running pipeline
pub struct Pipeline {
    buffer: RingBuffer,
    flush_interval: Duration,
    stages: Vec<Box<dyn Stage>>,
    shutdown: Shutdown,
}

impl Pipeline {
    /// The ring buffer the last stage writes into
    pub fn buffer(&self) -> RingBuffer {
        self.buffer.clone()
    }

    /// Names of the filter stages, in order
    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    /// Spawn one thread per component: source, each stage, buffer writer, sink driver.
    ///
    /// Components are linked by zero-capacity channels, so every hand-off is a
    /// rendezvous and a slow stage blocks everything upstream of it.
    pub fn start<R, W, S>(self, source: LineSource<R, W>, sink: S) -> Result<RunningPipeline>
    where
        R: BufRead + Send + 'static,
        W: Write + Send + 'static,
        S: Sink,
    {
        let shutdown = self.shutdown;
        let mut metrics = Vec::with_capacity(self.stages.len() + 2);

        let (source_tx, mut upstream) = bounded(0);
        let (finished_tx, input_closed) = bounded::<()>(0);
        let source_metrics = StageMetrics::new();
        metrics.push(("source".to_string(), source_metrics.clone()));

        let source_shutdown = shutdown.clone();
        let source_handle = spawn_named("source", &shutdown, move || {
            // Dropped when the thread ends, which disconnects `input_closed`
            let _finished = finished_tx;
            source
                .with_metrics(source_metrics)
                .run(source_tx, source_shutdown)
        })?;

        let mut workers = Vec::with_capacity(self.stages.len() + 1);
        for stage in self.stages {
            let name = stage.name().to_string();
            let (tx, rx) = bounded(0);
            let stage_metrics = StageMetrics::new();
            metrics.push((name.clone(), stage_metrics.clone()));

            let runner =
                StageRunner::new(upstream, tx, shutdown.clone()).with_metrics(stage_metrics);
            workers.push((
                name.clone(),
                spawn_named(&name, &shutdown, move || runner.run(stage))?,
            ));
            upstream = rx;
        }

        let writer_metrics = StageMetrics::new();
        metrics.push(("buffer_writer".to_string(), writer_metrics.clone()));
        let writer = BufferWriter::new(upstream, self.buffer.clone(), shutdown.clone())
            .with_metrics(writer_metrics);
        workers.push((
            "buffer_writer".to_string(),
            spawn_named("buffer_writer", &shutdown, move || writer.run())?,
        ));

        let driver = SinkDriver::new(
            self.buffer.clone(),
            sink,
            self.flush_interval,
            shutdown.clone(),
        );
        let sink_handle = spawn_named("sink", &shutdown, move || driver.run())?;

        info!(
            stages = workers.len() - 1,
            capacity = self.buffer.capacity(),
            interval = ?self.flush_interval,
            "Pipeline started"
        );

        Ok(RunningPipeline {
            source: source_handle,
            workers,
            sink: sink_handle,
            input_closed,
            shutdown,
            buffer: self.buffer,
            metrics,
        })
    }
}

/// Spawn a named thread; on failure, stop whatever was already started
fn spawn_named<F, T>(name: &str, shutdown: &Shutdown, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|e| {
            shutdown.trigger();
            PipelineError::ThreadError(format!("failed to spawn {name}: {e}"))
        })
}

fn join_named<T>(name: &str, handle: JoinHandle<T>) -> Result<T> {
    handle
        .join()
        .map_err(|_| PipelineError::ThreadError(format!("{name} thread panicked")))
}

/// A running pipeline that can be awaited or shut down
pub struct RunningPipeline {
    source: JoinHandle<Result<()>>,
    workers: Vec<(String, JoinHandle<()>)>,
    sink: JoinHandle<Result<u64>>,
    input_closed: Receiver<()>,
    shutdown: Shutdown,
    buffer: RingBuffer,
    metrics: Vec<(String, StageMetrics)>,
}

impl RunningPipeline {
    /// Receiver that disconnects once the source has stopped reading
    pub fn input_closed(&self) -> Receiver<()> {
        self.input_closed.clone()
    }

    /// Token that stops every thread of this pipeline once triggered
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// The ring buffer the last stage writes into
    pub fn buffer(&self) -> RingBuffer {
        self.buffer.clone()
    }

    /// Let the input run to its end, drain every stage, flush once more and stop.
    ///
    /// Blocks for as long as the source keeps producing.
    pub fn wait(self) -> Result<PipelineReport> {
        let source_result = join_named("source", self.source);

        // The source's sender is gone, so each stage ends once its input is empty
        let mut workers_result = Ok(());
        for (name, handle) in self.workers {
            if let Err(err) = join_named(&name, handle) {
                // A dead stage disconnects its neighbours; stop the rest too
                self.shutdown.trigger();
                workers_result = workers_result.and(Err(err));
            }
        }
        self.shutdown.trigger();
        let flushes = join_named("sink", self.sink)?;

        let report = PipelineReport::collect(&self.metrics, flushes.as_ref().ok().copied());
        report.log();
        source_result??;
        workers_result?;
        flushes?;
        Ok(report)
    }

    /// Stop every stage at its next suspension point and flush what the buffer holds.
    ///
    /// Items in flight between stages are discarded. A source blocked on a
    /// read cannot observe the signal, so it is only joined if it already ended.
    pub fn shutdown(self) -> Result<PipelineReport> {
        self.shutdown.trigger();

        for (name, handle) in self.workers {
            join_named(&name, handle)?;
        }
        let flushes = join_named("sink", self.sink)?;

        let source_result = if self.source.is_finished() {
            join_named("source", self.source)?
        } else {
            debug!("Source still blocked on input, detaching");
            Ok(())
        };

        let report = PipelineReport::collect(&self.metrics, flushes.as_ref().ok().copied());
        report.log();
        if let Err(err) = source_result {
            warn!(%err, "Source ended with an error");
        }
        flushes?;
        Ok(report)
    }
}

/// Final counters of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// One snapshot per component, source first, buffer writer last
    pub stages: Vec<MetricsSnapshot>,
    /// Non-empty snapshots the sink received, if the sink driver ended cleanly
    pub flushes: Option<u64>,
}

impl PipelineReport {
    fn collect(metrics: &[(String, StageMetrics)], flushes: Option<u64>) -> Self {
        Self {
            stages: metrics
                .iter()
                .map(|(name, m)| m.snapshot(name.as_str()))
                .collect(),
            flushes,
        }
    }

    /// Look up a component's snapshot by name
    pub fn stage(&self, name: &str) -> Option<&MetricsSnapshot> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Get a summary of all metrics
    pub fn summary(&self) -> String {
        let mut summary = String::from("Pipeline Metrics Summary:\n");
        for (i, snapshot) in self.stages.iter().enumerate() {
            summary.push_str(&format!("  Stage {}: {}\n", i, snapshot.format()));
        }
        if let Some(flushes) = self.flushes {
            summary.push_str(&format!("  Flushes: {flushes}\n"));
        }
        summary
    }

    fn log(&self) {
        for snapshot in &self.stages {
            info!(
                stage = %snapshot.name,
                received = snapshot.received,
                forwarded = snapshot.forwarded,
                dropped = snapshot.dropped,
                "Stage totals"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelSink;
    use crate::stage::FilterStage;
    use crossbeam::channel::unbounded;
    use std::io::{self, Cursor};

    #[test]
    fn test_pipeline_builder() {
        let pipeline = PipelineBuilder::new()
            .with_standard_filters()
            .build()
            .unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["non_negative", "divisible_by_three"]
        );
        assert_eq!(pipeline.buffer().capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_no_stages_error() {
        let result = PipelineBuilder::new().build();
        assert!(matches!(result, Err(PipelineError::NoStages)));
    }

    #[test]
    fn test_zero_capacity_error() {
        let result = PipelineBuilder::new()
            .with_standard_filters()
            .capacity(0)
            .build();
        assert!(matches!(result, Err(PipelineError::InvalidCapacity(0))));
    }

    #[test]
    fn test_zero_interval_error() {
        let result = PipelineBuilder::new()
            .with_standard_filters()
            .flush_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_wait_stops_sink_after_stage_panic() {
        let (tx, rx) = unbounded();
        let running = PipelineBuilder::new()
            .add_stage(FilterStage::new("fragile", |v| {
                if v == 2 {
                    panic!("cannot handle 2");
                }
                true
            }))
            .flush_interval(Duration::from_millis(10))
            .build()
            .unwrap()
            .start(
                LineSource::new(Cursor::new("1\n2\n3\n"), io::sink()),
                ChannelSink::new(tx),
            )
            .unwrap();

        assert!(matches!(running.wait(), Err(PipelineError::ThreadError(_))));

        // The sink thread has exited and dropped its sender
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        loop {
            match rx.recv_deadline(deadline) {
                Ok(_) => continue,
                Err(err) => {
                    assert!(err.is_disconnected());
                    break;
                }
            }
        }
    }

    #[test]
    fn test_wait_drains_and_flushes() {
        let (tx, rx) = unbounded();
        let running = PipelineBuilder::new()
            .add_stage(FilterStage::new("even", |v| v % 2 == 0))
            .capacity(4)
            .flush_interval(Duration::from_secs(3600))
            .build()
            .unwrap()
            .start(
                LineSource::new(Cursor::new("1\n2\n3\n4\n6\n"), io::sink()),
                ChannelSink::new(tx),
            )
            .unwrap();

        let report = running.wait().unwrap();
        assert_eq!(rx.try_recv().unwrap(), vec![2, 4, 6]);
        assert_eq!(report.flushes, Some(1));
        assert_eq!(report.stage("even").unwrap().dropped, 2);
        assert_eq!(report.stage("buffer_writer").unwrap().forwarded, 3);
    }
}
