use crate::buffer::RingBuffer;
use crate::metrics::StageMetrics;
use crate::shutdown::Shutdown;
use crossbeam::channel::{select, Receiver, Sender};
use tracing::{debug, info};

/// Trait for a processing stage in the pipeline
pub trait Stage: Send + 'static {
    /// Process one input value. `Some` is forwarded downstream, `None` drops it.
    fn process(&mut self, value: i64) -> Option<i64>;

    /// Get a human-readable name for this stage
    fn name(&self) -> &str {
        "stage"
    }
}

/// Keeps values that are zero or greater
pub fn is_non_negative(value: i64) -> bool {
    value >= 0
}

/// Keeps multiples of three. Zero is a multiple of three and passes.
pub fn is_divisible_by_three(value: i64) -> bool {
    value % 3 == 0
}

/// The two filters the console pipeline runs, in order
pub fn standard_filters() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(FilterStage::new("non_negative", is_non_negative)),
        Box::new(FilterStage::new("divisible_by_three", is_divisible_by_three)),
    ]
}

/// A filtering stage that passes through values matching a predicate
#[derive(Debug)]
pub struct FilterStage<F>
where
    F: Fn(i64) -> bool + Send + 'static,
{
    name: String,
    predicate: F,
}

impl<F> FilterStage<F>
where
    F: Fn(i64) -> bool + Send + 'static,
{
    /// Create a new filter stage
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Stage for FilterStage<F>
where
    F: Fn(i64) -> bool + Send + 'static,
{
    fn process(&mut self, value: i64) -> Option<i64> {
        (self.predicate)(value).then_some(value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Blocking send that gives up when shutdown is triggered or the receiver is gone.
///
/// Returns `true` once the value has been handed off.
pub fn hand_off(output: &Sender<i64>, value: i64, shutdown: &Shutdown) -> bool {
    select! {
        send(output, value) -> res => res.is_ok(),
        recv(shutdown.receiver()) -> _ => false,
    }
}

/// Blocking receive that yields `None` when the sender is gone or shutdown is triggered
fn take(input: &Receiver<i64>, shutdown: &Shutdown) -> Option<i64> {
    select! {
        recv(input) -> msg => msg.ok(),
        recv(shutdown.receiver()) -> _ => None,
    }
}

/// Runs a stage by pulling from the input channel, processing, and pushing to the output channel
pub struct StageRunner {
    input: Receiver<i64>,
    output: Sender<i64>,
    metrics: StageMetrics,
    shutdown: Shutdown,
}

impl StageRunner {
    /// Create a new stage runner
    pub fn new(input: Receiver<i64>, output: Sender<i64>, shutdown: Shutdown) -> Self {
        Self {
            input,
            output,
            metrics: StageMetrics::new(),
            shutdown,
        }
    }

    /// Record into an existing set of counters
    pub fn with_metrics(mut self, metrics: StageMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Run the stage with the provided implementation.
    ///
    /// Blocks until the input channel disconnects, the output channel's
    /// receiver goes away, or shutdown is triggered. Dropping `self` on return
    /// disconnects the output channel, which ends the next stage in turn.
    pub fn run(self, mut stage: Box<dyn Stage>) {
        info!(stage = stage.name(), "Stage started");

        while let Some(value) = take(&self.input, &self.shutdown) {
            self.metrics.record_received();

            match stage.process(value) {
                Some(out) => {
                    debug!(stage = stage.name(), value = out, "Forwarding");
                    if !hand_off(&self.output, out, &self.shutdown) {
                        break;
                    }
                    self.metrics.record_forwarded();
                }
                None => {
                    debug!(stage = stage.name(), value, "Dropped");
                    self.metrics.record_dropped();
                }
            }
        }

        info!(stage = stage.name(), "Stage finished");
    }
}

/// Terminal stage that moves every value from its input channel into the ring buffer
pub struct BufferWriter {
    input: Receiver<i64>,
    buffer: RingBuffer,
    metrics: StageMetrics,
    shutdown: Shutdown,
}

impl BufferWriter {
    /// Create a writer that stores everything received on `input` into `buffer`
    pub fn new(input: Receiver<i64>, buffer: RingBuffer, shutdown: Shutdown) -> Self {
        Self {
            input,
            buffer,
            metrics: StageMetrics::new(),
            shutdown,
        }
    }

    /// Record into an existing set of counters
    pub fn with_metrics(mut self, metrics: StageMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Push values into the buffer until the input disconnects or shutdown is triggered
    pub fn run(self) {
        info!("Buffer writer started");

        while let Some(value) = take(&self.input, &self.shutdown) {
            self.metrics.record_received();
            self.buffer.push(value);
            self.metrics.record_forwarded();
            debug!(value, "Stored in ring buffer");
        }

        info!("Buffer writer finished");
    }
}
