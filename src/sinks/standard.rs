//! Synchronous sink delivering straight to an output target

use super::console::Console;
use crate::core::error::{LogError, Result};
use crate::core::sink::{OutputTarget, Sink, SinkState};
use crate::render::Block;
use parking_lot::Mutex;
use std::sync::Arc;

/// Blocking delivery to an [`OutputTarget`], by default the [`Console`]
///
/// The target is shared so callers can keep a handle to it, for example to
/// inspect a captured buffer. Stopping mutes the target; later writes are
/// discarded by the target itself.
pub struct StandardSink<T: OutputTarget = Console> {
    target: Arc<Mutex<T>>,
    name: String,
    state: SinkState,
}

impl StandardSink<Console> {
    pub fn stdout() -> Self {
        Self::new(Console::stdout()).with_name("stdout")
    }

    pub fn stderr() -> Self {
        Self::new(Console::stderr()).with_name("stderr")
    }
}

impl<T: OutputTarget> StandardSink<T> {
    pub fn new(target: T) -> Self {
        Self::shared(Arc::new(Mutex::new(target)))
    }

    pub fn shared(target: Arc<Mutex<T>>) -> Self {
        Self {
            target,
            name: "standard".to_string(),
            state: SinkState::Active,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn target(&self) -> Arc<Mutex<T>> {
        Arc::clone(&self.target)
    }
}

impl<T: OutputTarget> Sink for StandardSink<T> {
    fn write(&mut self, blocks: &[Block]) -> Result<()> {
        self.target
            .lock()
            .print(blocks)
            .map_err(|e| LogError::sink_delivery(&self.name, e.to_string()))
    }

    fn stop(&mut self) {
        self.target.lock().set_quiet(true);
        self.state = SinkState::Stopped;
    }

    fn drain(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> SinkState {
        self.state
    }
}
