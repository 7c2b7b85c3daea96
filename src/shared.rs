use crate::error::{ProfilerError, Result};
use crate::registry::Registry;
use crate::report::Report;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Thread-safe handle to a [`Registry`].
///
/// Every operation runs under one mutex, so the lookup, growth and timestamp
/// capture of a `start` are atomic with respect to other threads. Clones share
/// the same registry.
#[derive(Clone, Debug)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>> {
        self.inner.lock().map_err(|_| ProfilerError::LockPoisoned)
    }

    pub fn initialize(&self) -> Result<()> {
        self.lock()?.initialize()
    }

    pub fn start(&self, name: &str) -> Result<()> {
        self.lock()?.start(name)
    }

    pub fn stop(&self, name: &str) -> Result<()> {
        self.lock()?.stop(name)
    }

    pub fn export(&self, program_name: &str) -> Result<PathBuf> {
        self.lock()?.export(program_name)
    }

    pub fn snapshot(&self, program_name: &str) -> Result<Report> {
        self.lock()?.snapshot(program_name)
    }

    pub fn cleanup(&self) -> Result<()> {
        self.lock()?.cleanup()
    }

    pub fn total_elapsed(&self) -> Result<Duration> {
        Ok(self.lock()?.total_elapsed())
    }

    /// Run `f` with exclusive access to the underlying registry
    pub fn with<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> Result<T> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard))
    }
}

impl From<Registry> for SharedRegistry {
    fn from(registry: Registry) -> Self {
        Self::new(registry)
    }
}
