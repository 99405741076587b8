//! Basic usage example
//!
//! Demonstrates levels, markup, keywords, custom levels and rich tracebacks.
//!
//! Run with: cargo run --example basic_usage

use richlog::prelude::*;
use richlog::{info, success, warning};
use std::fmt;
use std::io;

#[derive(Debug)]
struct ConfigError {
    source: io::Error,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "could not load settings")
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

fn main() -> Result<()> {
    println!("=== richlog - Basic Usage Example ===\n");

    let mut handler = Handler::builder()
        .level("TRACE")
        .markup(true)
        .rich_tracebacks(true)
        .keywords(["GET", "POST"])
        .sink(StandardSink::stdout())
        .build()?;

    println!("1. Every standard level:");
    handler.trace("Entering request loop")?;
    handler.debug("Cache holds 128 entries")?;
    handler.info("Server listening on 0.0.0.0:8080")?;
    handler.success("Migrations applied")?;
    handler.warning("Disk usage at 91%")?;
    handler.error("Upstream returned 502")?;
    handler.critical("Out of worker threads")?;

    println!("\n2. Macros, markup and keywords:");
    info!(handler, "GET /api/users took [bold]{}[/bold] ms", 12)?;
    warning!(handler, "POST /login rate limited for {}", "10.0.0.7")?;
    success!(handler, "[green]Deploy finished[/green]")?;

    println!("\n3. Printf-style arguments:");
    let record = Record::new(Level::info(), "%s uploaded %d files (%.1f MB)")
        .with_arg("alice")
        .with_arg(3)
        .with_arg(12.5);
    handler.handle(&record)?;

    println!("\n4. Error chains:");
    let err = ConfigError {
        source: io::Error::new(io::ErrorKind::NotFound, "settings.json"),
    };
    handler.exception("Startup aborted", &err)?;

    println!("\n5. Traceback with frames and locals:");
    let trace = Trace::new(vec![Stack::new("ValueError", "invalid port 'http'").with_frames(
        vec![
            Frame::here("main"),
            Frame::new("<config>", 1, "parse_port").with_locals([
                ("raw", "'http'"),
                ("default", "8080"),
            ]),
        ],
    )]);
    handler.handle(&Record::new(Level::error(), "Bad configuration").with_exception(trace))?;

    println!("\n6. Metrics:");
    let metrics = handler.metrics();
    println!("   Emitted:   {}", metrics.emitted());
    println!("   Delivered: {}", metrics.delivered());
    println!("   Failures:  {:.2}%", metrics.failure_rate());

    handler.shutdown()?;
    println!("\n=== Example completed successfully ===");
    Ok(())
}
