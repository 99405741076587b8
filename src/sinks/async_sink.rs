//! Sink that schedules delivery on a tokio runtime
//!
//! Rendering happens on the caller's thread; only the final delivery runs as
//! a task. Each task is tracked in a registry together with the thread that
//! scheduled it, and removes itself when it completes or is cancelled.

use super::console::Console;
use crate::core::diagnostics::Diagnostics;
use crate::core::error::{LogError, Result};
use crate::core::sink::{OutputTarget, Sink, SinkState};
use crate::render::Block;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;

/// Asynchronous destination for rendered blocks
///
/// # Example
///
/// ```no_run
/// use richlog::sinks::AsyncTarget;
/// use richlog::render::Block;
/// use richlog::Result;
/// use async_trait::async_trait;
///
/// struct Collector;
///
/// #[async_trait]
/// impl AsyncTarget for Collector {
///     async fn deliver(&self, blocks: Vec<Block>) -> Result<()> {
///         println!("{} blocks", blocks.len());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait AsyncTarget: Send + Sync + 'static {
    async fn deliver(&self, blocks: Vec<Block>) -> Result<()>;
}

#[async_trait]
impl<F, Fut> AsyncTarget for F
where
    F: Fn(Vec<Block>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn deliver(&self, blocks: Vec<Block>) -> Result<()> {
        (self)(blocks).await
    }
}

/// Runs a blocking [`OutputTarget`] on tokio's blocking pool
pub struct BlockingTarget<T: OutputTarget = Console> {
    target: Arc<Mutex<T>>,
}

impl<T: OutputTarget> BlockingTarget<T> {
    pub fn new(target: T) -> Self {
        Self {
            target: Arc::new(Mutex::new(target)),
        }
    }

    pub fn target(&self) -> Arc<Mutex<T>> {
        Arc::clone(&self.target)
    }
}

#[async_trait]
impl<T: OutputTarget + 'static> AsyncTarget for BlockingTarget<T> {
    async fn deliver(&self, blocks: Vec<Block>) -> Result<()> {
        let target = Arc::clone(&self.target);
        tokio::task::spawn_blocking(move || target.lock().print(&blocks))
            .await
            .map_err(|e| LogError::other(format!("delivery task failed: {}", e)))?
            .map_err(LogError::from)
    }
}

struct Unit {
    handle: JoinHandle<()>,
    context: ThreadId,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    units: HashMap<u64, Unit>,
    /// Failures kept for the next `drain` when errors are not caught
    failures: Vec<LogError>,
}

/// Removes its unit from the registry when the task finishes or is dropped
struct Completion {
    registry: Weak<Mutex<Registry>>,
    id: u64,
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().units.remove(&self.id);
        }
    }
}

/// Non-blocking sink; each write becomes one delivery task
///
/// Delivery order across records is not guaranteed. With `catch_errors`
/// (the default) a failed delivery is dumped to the diagnostics stream;
/// otherwise the failure is kept and returned by the next [`Sink::drain`].
pub struct AsyncSink {
    target: Arc<dyn AsyncTarget>,
    runtime: Handle,
    registry: Arc<Mutex<Registry>>,
    name: String,
    catch_errors: bool,
    diagnostics: Diagnostics,
    state: SinkState,
}

impl AsyncSink {
    pub fn new(target: impl AsyncTarget, runtime: Handle) -> Self {
        Self {
            target: Arc::new(target),
            runtime,
            registry: Arc::new(Mutex::new(Registry::default())),
            name: "async".to_string(),
            catch_errors: true,
            diagnostics: Diagnostics::default(),
            state: SinkState::Active,
        }
    }

    /// Sink bound to the runtime the caller is running in
    pub fn current(target: impl AsyncTarget) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| LogError::config("AsyncSink", format!("no tokio runtime: {}", e)))?;
        Ok(Self::new(target, runtime))
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_catch_errors(mut self, catch_errors: bool) -> Self {
        self.catch_errors = catch_errors;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Deliveries scheduled from any thread that have not finished
    pub fn pending(&self) -> usize {
        self.registry
            .lock()
            .units
            .values()
            .filter(|unit| !unit.handle.is_finished())
            .count()
    }

    /// Deliveries scheduled from the calling thread that have not finished
    pub fn pending_in_current_context(&self) -> usize {
        let context = thread::current().id();
        self.registry
            .lock()
            .units
            .values()
            .filter(|unit| unit.context == context && !unit.handle.is_finished())
            .count()
    }

    fn take_units(&self, context: Option<ThreadId>) -> Vec<(u64, Unit)> {
        let mut registry = self.registry.lock();
        let ids: Vec<u64> = registry
            .units
            .iter()
            .filter(|(_, unit)| context.map_or(true, |ctx| unit.context == ctx))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter()
            .filter_map(|id| registry.units.remove(&id).map(|unit| (id, unit)))
            .collect()
    }

    fn take_failures(&self) -> Result<()> {
        let failures = std::mem::take(&mut self.registry.lock().failures);
        if failures.is_empty() {
            return Ok(());
        }
        let message = failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(LogError::sink_delivery(&self.name, message))
    }
}

impl Sink for AsyncSink {
    fn write(&mut self, blocks: &[Block]) -> Result<()> {
        if self.state == SinkState::Stopped {
            return Ok(());
        }

        let target = Arc::clone(&self.target);
        let diagnostics = self.diagnostics.clone();
        let name = self.name.clone();
        let catch_errors = self.catch_errors;
        let blocks = blocks.to_vec();

        let id = {
            let mut registry = self.registry.lock();
            registry.next_id += 1;
            registry.next_id
        };
        let completion = Completion {
            registry: Arc::downgrade(&self.registry),
            id,
        };
        let failures = Arc::downgrade(&self.registry);
        let handle = self.runtime.spawn(async move {
            let _completion = completion;
            if let Err(error) = target.deliver(blocks.clone()).await {
                if catch_errors {
                    diagnostics.report_delivery_failure(&name, &blocks, &error);
                } else if let Some(registry) = failures.upgrade() {
                    registry.lock().failures.push(error);
                }
            }
        });

        let mut registry = self.registry.lock();
        registry.units.retain(|_, unit| !unit.handle.is_finished());
        if !handle.is_finished() {
            registry.units.insert(
                id,
                Unit {
                    handle,
                    context: thread::current().id(),
                },
            );
        }
        Ok(())
    }

    fn stop(&mut self) {
        for (_, unit) in self.take_units(None) {
            if !unit.handle.is_finished() {
                unit.handle.abort();
            }
        }
        self.state = SinkState::Stopped;
    }

    fn drain(&mut self) -> Result<()> {
        let context = thread::current().id();
        let units = self.take_units(Some(context));
        if units.is_empty() {
            return self.take_failures();
        }

        let wait = |units: Vec<(u64, Unit)>| async move {
            for (_, unit) in units {
                // Aborted tasks resolve with a cancellation error
                let _ = unit.handle.await;
            }
        };

        match Handle::try_current() {
            Err(_) => self.runtime.block_on(wait(units)),
            Ok(current) if current.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| current.block_on(wait(units)));
            }
            Ok(_) => {
                // A current-thread runtime cannot be blocked from inside;
                // the units stay tracked.
                let mut registry = self.registry.lock();
                for (id, unit) in units {
                    if !unit.handle.is_finished() {
                        registry.units.insert(id, unit);
                    }
                }
            }
        }
        self.take_failures()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> SinkState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::SharedBuffer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::runtime::Runtime;

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn test_drain_waits_for_deliveries() {
        let rt = runtime();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        let target = move |_blocks: Vec<Block>| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LogError>(())
            }
        };

        let mut sink = AsyncSink::new(target, rt.handle().clone());
        for _ in 0..5 {
            sink.write(&["x".into()]).unwrap();
        }
        sink.drain().unwrap();

        assert_eq!(delivered.load(Ordering::SeqCst), 5);
        assert_eq!(sink.pending_in_current_context(), 0);
    }

    #[test]
    fn test_drain_skips_other_contexts() {
        let rt = runtime();
        let (release, gate) = tokio::sync::watch::channel(false);
        let target = move |_blocks: Vec<Block>| {
            let mut gate = gate.clone();
            async move {
                let _ = gate.wait_for(|open| *open).await;
                Ok::<_, LogError>(())
            }
        };
        let sink = Arc::new(Mutex::new(AsyncSink::new(target, rt.handle().clone())));

        let writer = Arc::clone(&sink);
        thread::spawn(move || writer.lock().write(&["other".into()]).unwrap())
            .join()
            .unwrap();

        sink.lock().drain().unwrap();
        assert_eq!(sink.lock().pending(), 1);
        assert_eq!(sink.lock().pending_in_current_context(), 0);

        release.send(true).unwrap();
        sink.lock().stop();
        assert_eq!(sink.lock().pending(), 0);
    }

    #[test]
    fn test_failures_are_dumped_to_diagnostics() {
        let rt = runtime();
        let buffer = SharedBuffer::new();
        let target =
            |_blocks: Vec<Block>| async { Err::<(), _>(LogError::other("remote closed the stream")) };
        let mut sink = AsyncSink::new(target, rt.handle().clone())
            .with_name("remote")
            .with_diagnostics(Diagnostics::to_writer(buffer.clone()));

        sink.write(&["payment accepted".into()]).unwrap();
        sink.drain().unwrap();

        let dump = buffer.contents();
        assert!(dump.starts_with("--- Logging Error ---"));
        assert!(dump.contains("Sink: remote"));
        assert!(dump.contains("Record was: payment accepted"));
        assert!(dump.contains("remote closed the stream"));
        assert!(dump.ends_with("--- End of logging error ---\n"));
    }

    #[test]
    fn test_uncaught_failures_surface_on_drain() {
        let rt = runtime();
        let target = |_blocks: Vec<Block>| async { Err::<(), _>(LogError::other("boom")) };
        let mut sink =
            AsyncSink::new(target, rt.handle().clone()).with_catch_errors(false);

        sink.write(&["x".into()]).unwrap();
        let err = sink.drain().unwrap_err();
        assert!(err.is_delivery());
        assert!(sink.drain().is_ok(), "failures are reported once");
    }

    #[test]
    fn test_stop_cancels_pending_work() {
        let rt = runtime();
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        let target = move |_blocks: Vec<Block>| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LogError>(())
            }
        };

        let mut sink = AsyncSink::new(target, rt.handle().clone());
        sink.write(&["slow".into()]).unwrap();
        sink.stop();

        assert_eq!(sink.state(), SinkState::Stopped);
        assert_eq!(sink.pending(), 0);
        sink.write(&["ignored".into()]).unwrap();
        assert_eq!(sink.pending(), 0);
        assert_eq!(delivered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_blocking_target_prints_to_console() {
        let rt = runtime();
        let buffer = SharedBuffer::new();
        let target = BlockingTarget::new(Console::new(buffer.clone()).with_width(40));
        let mut sink = AsyncSink::new(target, rt.handle().clone());

        sink.write(&["queued line".into()]).unwrap();
        sink.drain().unwrap();
        assert_eq!(buffer.contents(), "queued line\n");
    }

    #[test]
    fn test_drain_on_current_thread_runtime_does_not_block() {
        tokio_test::block_on(async {
            let delivered = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&delivered);
            let target = move |_blocks: Vec<Block>| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, LogError>(())
                }
            };

            let mut sink = AsyncSink::current(target).unwrap();
            sink.write(&["x".into()]).unwrap();

            sink.drain().unwrap();
            assert_eq!(sink.pending_in_current_context(), 1);

            while sink.pending() > 0 {
                tokio::task::yield_now().await;
            }
            assert_eq!(delivered.load(Ordering::SeqCst), 1);
        });
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drain_inside_multi_thread_runtime() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        let target = move |_blocks: Vec<Block>| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, LogError>(())
            }
        };

        let mut sink = AsyncSink::current(target).unwrap();
        for _ in 0..3 {
            sink.write(&["x".into()]).unwrap();
        }
        sink.drain().unwrap();
        assert_eq!(delivered.load(Ordering::SeqCst), 3);
    }
}
