//! Number processing pipeline with a custom stage
//!
//! Pipeline:
//! 1. Source: numbers -50..=50, one per line, with a few malformed lines mixed in
//! 2. Filter: keep non-negative values
//! 3. Filter: keep multiples of three
//! 4. Custom: keep only values larger than anything seen before
//! 5. Ring buffer (capacity 8), printed every 100ms
//!
//! Usage: cargo run --example filter_pipeline --release

use ring_pipeline::{ConsoleSink, LineSource, PipelineBuilder, Stage};
use std::io::{self, Cursor};
use std::time::{Duration, Instant};

/// Passes a value only when it beats the running maximum
struct RisingEdge {
    max: Option<i64>,
}

impl Stage for RisingEdge {
    fn process(&mut self, value: i64) -> Option<i64> {
        if self.max.map_or(true, |max| value > max) {
            self.max = Some(value);
            Some(value)
        } else {
            None
        }
    }

    fn name(&self) -> &str {
        "rising_edge"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Number Processing Pipeline");
    println!("==========================");

    let mut input = String::new();
    for v in -50..=50 {
        input.push_str(&format!("{v}\n"));
        if v % 17 == 0 {
            input.push_str("oops\n");
        }
    }

    let start = Instant::now();

    let running = PipelineBuilder::new()
        .with_standard_filters()
        .add_stage(RisingEdge { max: None })
        .capacity(8)
        .flush_interval(Duration::from_millis(100))
        .build()?
        .start(
            LineSource::new(Cursor::new(input), io::stdout()),
            ConsoleSink::stdout(),
        )?;

    let report = running.wait()?;

    println!();
    print!("{}", report.summary());
    println!("Pipeline execution time: {:.3}s", start.elapsed().as_secs_f64());

    Ok(())
}
