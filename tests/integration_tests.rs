//! Integration tests for the handler pipeline
//!
//! These tests verify:
//! - Configuration files drive level, keywords and columns
//! - Repeated times are blanked in console output
//! - Rich tracebacks show source windows, chains and elided frames
//! - Sink failures stay isolated
//! - Thread safety of a shared handler

use chrono::{Duration, Local, TimeZone};
use richlog::core::diagnostics::SharedBuffer;
use richlog::prelude::*;
use richlog::{Diagnostics, HandlerConfig, LogError, TracebackConfig};
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn console(buffer: &SharedBuffer, width: usize) -> StandardSink {
    StandardSink::new(Console::new(buffer.clone()).with_width(width))
}

fn columns(time: bool, icon: bool, level: bool, path: bool) -> RenderConfig {
    RenderConfig::default().with_columns(time, icon, level, path)
}

#[test]
fn test_config_file_drives_handler() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_file = temp_dir.path().join("logging.json");
    fs::write(
        &config_file,
        r#"{
            "level": "warn",
            "keywords": ["pool"],
            "render": { "show_time": false, "show_level_icon": false, "show_path": false }
        }"#,
    )
    .expect("Failed to write config");

    let config = HandlerConfig::from_file(&config_file).expect("Failed to load config");
    let buffer = SharedBuffer::new();
    let mut handler = HandlerBuilder::from_config(config)
        .restricted_host(true)
        .sink(console(&buffer, 60))
        .build()
        .expect("Failed to build handler");

    handler.info("connection opened").unwrap();
    handler.warning("db pool exhausted").unwrap();

    assert_eq!(buffer.contents(), " WARNING  db pool exhausted\n");
    assert_eq!(handler.metrics().filtered(), 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(matches!(
        HandlerConfig::from_json(r#"{ "level": "chatty" }"#),
        Err(LogError::NotFound { .. })
    ));
    assert!(matches!(
        HandlerConfig::from_json(r#"{ "render": { "omit_interval": -1.0 } }"#),
        Err(LogError::InvalidConfiguration { .. })
    ));
    assert!(matches!(
        HandlerConfig::from_json("{ not json"),
        Err(LogError::Json(_))
    ));
}

#[test]
fn test_repeated_times_are_blanked() {
    let buffer = SharedBuffer::new();
    let render = columns(true, false, true, false)
        .with_newline_time(false)
        .with_time_format("%H:%M:%S");
    let mut handler = Handler::builder()
        .restricted_host(true)
        .render(render)
        .sink(console(&buffer, 60))
        .build()
        .unwrap();

    let start = Local.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    for (offset_ms, msg) in [(0, "first"), (100, "second"), (2_000, "third")] {
        let record = Record::new(Level::info(), msg)
            .with_timestamp(start + Duration::milliseconds(offset_ms));
        handler.handle(&record).unwrap();
    }

    let output = buffer.contents();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with(" 09:30:00 INFO"));
    assert!(lines[1].starts_with("          INFO"));
    assert!(lines[1].ends_with("second"));
    assert!(lines[2].starts_with(" 09:30:02 INFO"));
}

#[test]
fn test_traceback_shows_source_window() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source = temp_dir.path().join("service.rs");
    fs::write(
        &source,
        "fn handle(raw: &str) -> Result<u32> {\n    let trimmed = raw.trim();\n    log(trimmed);\n    let id = parse(trimmed)?;\n    Ok(id)\n}\n",
    )
    .expect("Failed to write source");
    let source = source.to_string_lossy().into_owned();

    let buffer = SharedBuffer::new();
    let mut handler = Handler::builder()
        .restricted_host(true)
        .rich_tracebacks(true)
        .render(columns(false, false, true, false))
        .traceback(TracebackConfig::default().with_width(100).with_show_locals(false))
        .sink(console(&buffer, 140))
        .build()
        .unwrap();

    let trace = Trace::new(vec![Stack::new("ValueError", "bad id 'x1'")
        .with_frames(vec![Frame::new(source.as_str(), 4, "handle")])]);
    let record = Record::new(Level::error(), "request rejected").with_exception(trace);
    handler.handle(&record).unwrap();

    let output = buffer.contents();
    assert!(output.contains("request rejected"));
    assert!(output.contains("Traceback"));
    assert!(output.contains(&format!("{}:4 in handle", source)));
    assert!(output
        .lines()
        .any(|line| line.contains('❱') && line.contains("let id = parse(trimmed)?;")));
    assert!(output.contains("let trimmed = raw.trim();"));
    assert!(output.contains("ValueError: bad id 'x1'"));
}

#[test]
fn test_long_stacks_are_elided() {
    let buffer = SharedBuffer::new();
    let mut handler = Handler::builder()
        .restricted_host(true)
        .rich_tracebacks(true)
        .render(columns(false, false, true, false))
        .traceback(TracebackConfig::default().with_max_frames(10))
        .sink(console(&buffer, 140))
        .build()
        .unwrap();

    let frames = (1..=30)
        .map(|n| Frame::new("/missing/recursion.rs", n, format!("step_{}", n)))
        .collect();
    let trace = Trace::new(vec![
        Stack::new("RecursionError", "maximum depth exceeded").with_frames(frames)
    ]);
    handler
        .handle(&Record::new(Level::error(), "gave up").with_exception(trace))
        .unwrap();

    let output = buffer.contents();
    assert_eq!(output.matches("... 20 frames hidden ...").count(), 1);
    assert!(output.contains("in step_5:5"));
    assert!(!output.contains("in step_6:6"));
    assert!(output.contains("in step_26:26"));
}

#[derive(Debug)]
struct QueryError {
    source: io::Error,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query failed")
    }
}

impl StdError for QueryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

#[test]
fn test_error_chain_newest_first() {
    let buffer = SharedBuffer::new();
    let mut handler = Handler::builder()
        .restricted_host(true)
        .rich_tracebacks(true)
        .render(columns(false, false, true, false))
        .sink(console(&buffer, 200))
        .build()
        .unwrap();

    let err = QueryError {
        source: io::Error::new(io::ErrorKind::TimedOut, "socket timed out"),
    };
    handler.exception("report generation aborted", &err).unwrap();

    let output = buffer.contents();
    let outer = output.find("query failed").expect("outer error shown");
    let transition = output
        .find("The above exception was the direct cause of the following exception:")
        .expect("cause transition shown");
    let inner = output.find("socket timed out").expect("inner error shown");
    assert!(outer < transition && transition < inner);
}

struct ClosedPipe;

impl io::Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_broken_console_does_not_block_other_sinks() {
    let diagnostics = SharedBuffer::new();
    let buffer = SharedBuffer::new();
    let mut handler = Handler::builder()
        .restricted_host(true)
        .render(columns(false, false, true, false))
        .diagnostics(Diagnostics::to_writer(diagnostics.clone()))
        .sink(StandardSink::new(Console::new(ClosedPipe)).with_name("pipe"))
        .sink(console(&buffer, 60))
        .build()
        .unwrap();

    handler.critical("primary database unreachable").unwrap();

    assert!(buffer.contents().contains("primary database unreachable"));
    assert_eq!(handler.metrics().sink_failures(), 1);
    assert_eq!(handler.metrics().delivered(), 1);

    let report = diagnostics.contents();
    assert!(report.contains("Sink: pipe"));
    assert!(report.contains("reader went away"));
}

#[test]
fn test_shared_handler_across_threads() {
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&delivered);
    let handler = Handler::builder()
        .restricted_host(true)
        .sink(CallableSink::new(move |_: &[Block]| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .build()
        .unwrap()
        .shared();

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let handler = Arc::clone(&handler);
            thread::spawn(move || {
                for i in 0..50 {
                    handler
                        .lock()
                        .info(format!("worker {} message {}", worker, i))
                        .unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker panicked");
    }

    assert_eq!(delivered.load(Ordering::SeqCst), 200);
    assert_eq!(handler.lock().metrics().emitted(), 200);
}

#[cfg(feature = "async-sink")]
mod async_delivery {
    use super::*;
    use richlog::AsyncSink;
    use std::time::Duration as StdDuration;

    #[test]
    fn test_drain_waits_for_async_deliveries() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("Failed to build runtime");

        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        let sink = AsyncSink::new(
            move |_blocks: Vec<Block>| {
                let counter = Arc::clone(&counter);
                async move {
                    tokio::time::sleep(StdDuration::from_millis(5)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, LogError>(())
                }
            },
            runtime.handle().clone(),
        );

        let mut handler = Handler::builder()
            .restricted_host(true)
            .sink(sink)
            .build()
            .unwrap();

        for i in 0..20 {
            handler.info(format!("event {}", i)).unwrap();
        }
        handler.drain().expect("drain failed");

        assert_eq!(delivered.load(Ordering::SeqCst), 20);
        handler.shutdown().unwrap();
    }
}
