use crate::clock::{Clock, MonotonicClock};
use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result};
use crate::logging::*;
use crate::report::{report_path, FunctionReport, Report, ReportMetadata, TIMESTAMP_FORMAT};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Accumulated timing for one name
#[derive(Debug, Clone, PartialEq)]
pub struct TimerEntry {
    name: String,
    accumulated: Duration,
    call_count: u64,
    /// Set while running, taken on stop
    pending_start: Option<Duration>,
}

impl TimerEntry {
    fn started(name: String, at: Duration) -> Self {
        Self {
            name,
            accumulated: Duration::ZERO,
            call_count: 1,
            pending_start: Some(at),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sum of all completed intervals
    pub fn accumulated(&self) -> Duration {
        self.accumulated
    }

    pub fn accumulated_secs(&self) -> f64 {
        self.accumulated.as_secs_f64()
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn is_running(&self) -> bool {
        self.pending_start.is_some()
    }

    /// Mean time per accepted start; never divides by zero since entries
    /// only exist after their first start
    pub fn average_secs(&self) -> f64 {
        self.accumulated_secs() / self.call_count as f64
    }
}

/// Named timer registry.
///
/// Entries are kept in insertion order, which is also the export order, with
/// a name index on the side for constant-time lookup. The registry is unusable
/// until [`Registry::initialize`] and again after [`Registry::cleanup`].
pub struct Registry {
    entries: Vec<TimerEntry>,
    index: HashMap<String, usize>,
    total_elapsed: Duration,
    ready: bool,
    initial_capacity: usize,
    clock: Arc<dyn Clock>,
    output_dir: PathBuf,
    file_prefix: String,
    #[cfg(test)]
    fail_next_growth: bool,
}

impl Registry {
    /// Unready registry on the monotonic clock, writing reports to the
    /// current directory
    pub fn new() -> Self {
        Self::with_config(&ProfilerConfig::default())
    }

    pub fn with_config(config: &ProfilerConfig) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            total_elapsed: Duration::ZERO,
            ready: false,
            initial_capacity: config.registry.initial_capacity.max(1),
            clock: Arc::new(MonotonicClock::new()),
            output_dir: config.report.output_dir.clone(),
            file_prefix: config.report.file_prefix.clone(),
            #[cfg(test)]
            fail_next_growth: false,
        }
    }

    /// Replace the time source
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity.max(1);
        self
    }

    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Make the registry ready, discarding any existing timers.
    ///
    /// On allocation failure the registry is left empty and unready.
    pub fn initialize(&mut self) -> Result<()> {
        let dropped = self.entries.len();
        self.release();

        let mut entries = Vec::new();
        entries
            .try_reserve_exact(self.initial_capacity)
            .map_err(|_| ProfilerError::AllocationError {
                requested: self.initial_capacity,
            })?;
        let mut index = HashMap::new();
        index
            .try_reserve(self.initial_capacity)
            .map_err(|_| ProfilerError::AllocationError {
                requested: self.initial_capacity,
            })?;

        self.entries = entries;
        self.index = index;
        self.ready = true;

        if dropped > 0 {
            log_registry_reset(dropped);
        }
        log_registry_initialized(self.entries.capacity());
        Ok(())
    }

    /// Begin an interval for `name`, creating its timer on first use
    pub fn start(&mut self, name: &str) -> Result<()> {
        self.check_ready(name)?;

        if let Some(&slot) = self.index.get(name) {
            if self.entries[slot].is_running() {
                log_timer_rejected("start", name, "already running");
                return Err(ProfilerError::AlreadyRunning(name.to_string()));
            }

            let now = self.clock.now()?;
            let entry = &mut self.entries[slot];
            entry.pending_start = Some(now);
            entry.call_count += 1;
            log_timer_started(name, entry.call_count);
            return Ok(());
        }

        // Reserve everything before the timestamp so growth is not measured
        // and a failure leaves no partial entry behind
        self.reserve_slot()?;
        let now = self.clock.now()?;

        let slot = self.entries.len();
        self.entries.push(TimerEntry::started(name.to_string(), now));
        self.index.insert(name.to_string(), slot);
        log_timer_started(name, 1);
        Ok(())
    }

    /// Close the running interval for `name`
    pub fn stop(&mut self, name: &str) -> Result<()> {
        self.check_ready(name)?;
        // Taken before the lookup so search cost is not measured
        let now = self.clock.now()?;

        let Some(&slot) = self.index.get(name) else {
            log_timer_rejected("stop", name, "unknown timer");
            return Err(ProfilerError::NotFound(name.to_string()));
        };

        let entry = &mut self.entries[slot];
        let Some(started) = entry.pending_start else {
            log_timer_rejected("stop", name, "not running");
            return Err(ProfilerError::NotRunning(name.to_string()));
        };

        let elapsed = now.checked_sub(started).ok_or_else(|| {
            ProfilerError::ClockError(format!(
                "stop of {name:?} is {:?} before its start",
                started - now
            ))
        })?;

        entry.accumulated += elapsed;
        entry.pending_start = None;
        self.total_elapsed += elapsed;
        log_timer_stopped(name, elapsed.as_secs_f64());
        Ok(())
    }

    /// Run `f` between `start(name)` and `stop(name)`
    pub fn time<T, F>(&mut self, name: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> T,
    {
        self.start(name)?;
        let output = f();
        self.stop(name)?;
        Ok(output)
    }

    /// Build the report for the current state without writing it
    pub fn snapshot(&self, program_name: &str) -> Result<Report> {
        if !self.ready {
            return Err(ProfilerError::NotInitialized);
        }

        let functions = self
            .entries
            .iter()
            .map(|entry| FunctionReport {
                name: entry.name.clone(),
                exec_time: entry.accumulated_secs(),
                call_count: entry.call_count,
                avg_time: entry.average_secs(),
            })
            .collect();

        Ok(Report {
            metadata: ReportMetadata {
                total_time: self.total_elapsed.as_secs_f64(),
                program_name: program_name.to_string(),
                timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            },
            functions,
        })
    }

    /// Write the report for `program_name` and return where it landed.
    ///
    /// The file is committed atomically; on failure nothing new is left on disk.
    pub fn export(&self, program_name: &str) -> Result<PathBuf> {
        let report = self.snapshot(program_name)?;
        let path = report_path(&self.output_dir, &self.file_prefix, program_name);

        match report.write_atomic(&path) {
            Ok(()) => {
                log_report_written(&path.display().to_string(), report.functions.len());
                Ok(path)
            }
            Err(e) => {
                log_report_error(&path.display().to_string(), &e.to_string());
                Err(e)
            }
        }
    }

    /// Release all timers and return to the unready state. Idempotent.
    pub fn cleanup(&mut self) -> Result<()> {
        if self.ready {
            log_registry_cleanup(self.entries.len(), self.total_elapsed.as_secs_f64());
        }
        self.release();
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn entry(&self, name: &str) -> Option<&TimerEntry> {
        self.index.get(name).map(|&slot| &self.entries[slot])
    }

    /// Timers in insertion order
    pub fn entries(&self) -> &[TimerEntry] {
        &self.entries
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.entry(name).is_some_and(TimerEntry::is_running)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of timers storable before the next growth
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }

    fn check_ready(&self, name: &str) -> Result<()> {
        if !self.ready {
            return Err(ProfilerError::NotInitialized);
        }
        if name.is_empty() {
            return Err(ProfilerError::InvalidName);
        }
        Ok(())
    }

    /// Ensure room for one more timer, doubling storage when full
    fn reserve_slot(&mut self) -> Result<()> {
        let len = self.entries.len();
        let capacity = self.entries.capacity();
        if len == capacity {
            let target = capacity.max(1).saturating_mul(2);
            #[cfg(test)]
            if std::mem::take(&mut self.fail_next_growth) {
                return Err(ProfilerError::AllocationError { requested: target });
            }
            self.entries
                .try_reserve_exact(target - len)
                .map_err(|_| ProfilerError::AllocationError { requested: target })?;
            log_registry_grown(capacity, self.entries.capacity());
        }
        self.index
            .try_reserve(1)
            .map_err(|_| ProfilerError::AllocationError { requested: len + 1 })?;
        Ok(())
    }

    fn release(&mut self) {
        self.entries = Vec::new();
        self.index = HashMap::new();
        self.total_elapsed = Duration::ZERO;
        self.ready = false;
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries)
            .field("total_elapsed", &self.total_elapsed)
            .field("ready", &self.ready)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}
