//! Replays a file of integers through the standard pipeline
//!
//! Usage: cargo run --example replay -- numbers.txt [capacity]

use ring_pipeline::{ConsoleSink, LineSource, PipelineBuilder, DEFAULT_CAPACITY};
use std::fs::File;
use std::io::{self, BufReader};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: replay <file> [capacity]")?;
    let capacity = match args.next() {
        Some(arg) => arg.parse()?,
        None => DEFAULT_CAPACITY,
    };

    let running = PipelineBuilder::new()
        .with_standard_filters()
        .capacity(capacity)
        .flush_interval(Duration::from_secs(1))
        .build()?
        .start(
            LineSource::new(BufReader::new(File::open(&path)?), io::stderr()),
            ConsoleSink::stdout(),
        )?;

    let report = running.wait()?;
    eprint!("{}", report.summary());
    Ok(())
}
