//! Async sink example
//!
//! Demonstrates delivering records through a tokio runtime and waiting for
//! them with `drain`.
//!
//! Run with: cargo run --example async_sink

use richlog::prelude::*;
use richlog::{AsyncSink, BlockingTarget};
use std::sync::Arc;
use std::thread;

fn main() -> Result<()> {
    println!("=== richlog - Async Sink Example ===\n");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    let sink = AsyncSink::new(BlockingTarget::new(Console::stdout()), runtime.handle().clone())
        .with_name("async-stdout");

    let handler = Handler::builder()
        .level("DEBUG")
        .sink(sink)
        .build()?
        .shared();

    println!("1. Scheduling records from several threads:");
    let mut workers = Vec::new();
    for worker in 0..3 {
        let handler = Arc::clone(&handler);
        workers.push(thread::spawn(move || -> Result<()> {
            for i in 0..5 {
                handler
                    .lock()
                    .info(format!("Worker {} finished job {}", worker, i))?;
            }
            // Waits only for the jobs this thread scheduled
            handler.lock().drain()
        }));
    }

    for worker in workers {
        match worker.join() {
            Ok(result) => result?,
            Err(_) => eprintln!("worker thread panicked"),
        }
    }

    println!("\n2. Shutting down:");
    let mut handler = handler.lock();
    handler.shutdown()?;
    println!("   Delivered: {}", handler.metrics().delivered());

    println!("\n=== Example completed successfully ===");
    Ok(())
}
