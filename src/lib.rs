//! A concurrent integer filtering pipeline backed by an overwrite ring buffer.
//!
//! Integers read from a line-oriented source flow through a chain of filter
//! stages, each on its own thread, connected by zero-capacity (rendezvous)
//! channels. Survivors land in a fixed-capacity [`RingBuffer`] that evicts its
//! oldest element when full, and a [`SinkDriver`] drains the buffer on a fixed
//! interval.
//!
//! ```text
//! source -> non_negative -> divisible_by_three -> buffer_writer -> RingBuffer -> sink
//! ```
//!
//! # Features
//!
//! - Mutex-protected ring buffer with atomic drain-and-reset
//! - Blocking hand-offs: a slow stage back-pressures everything upstream
//! - Cooperative shutdown observed at every channel operation and timer tick
//! - Per-stage counters: received, forwarded, dropped
//! - Builder pattern for pipeline construction
//!
//! # Example
//!
//! ```ignore
//! use ring_pipeline::{ConsoleSink, LineSource, PipelineBuilder};
//! use std::time::Duration;
//!
//! let running = PipelineBuilder::new()
//!     .with_standard_filters()
//!     .capacity(20)
//!     .flush_interval(Duration::from_secs(5))
//!     .build()?
//!     .start(LineSource::stdin(), ConsoleSink::stdout())?;
//!
//! let report = running.wait()?;
//! println!("{}", report.summary());
//! ```

pub mod buffer;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod shutdown;
pub mod sink;
pub mod source;
pub mod stage;

// Re-exports for convenience
pub use buffer::RingBuffer;
pub use error::{PipelineError, Result};
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use pipeline::{
    Pipeline, PipelineBuilder, PipelineReport, RunningPipeline, DEFAULT_CAPACITY,
    DEFAULT_FLUSH_INTERVAL,
};
pub use shutdown::Shutdown;
pub use sink::{format_buffer, ChannelSink, ConsoleSink, Sink, SinkDriver};
pub use source::{parse_bytes, parse_line, Command, LineSource};
pub use stage::{
    is_divisible_by_three, is_non_negative, standard_filters, BufferWriter, FilterStage, Stage,
    StageRunner,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
