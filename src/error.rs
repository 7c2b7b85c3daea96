use std::path::PathBuf;

/// Errors returned by registry, clock and report operations
#[derive(Debug)]
pub enum ProfilerError {
    /// Operation attempted before `initialize` or after `cleanup`
    NotInitialized,
    /// Empty name supplied to start/stop
    InvalidName,
    AlreadyRunning(String),
    NotRunning(String),
    NotFound(String),
    /// Timer storage could not be reserved or grown
    AllocationError { requested: usize },
    /// Time source unavailable or produced a negative interval
    ClockError(String),
    IoError { path: PathBuf, source: std::io::Error },
    /// Shared registry mutex was poisoned by a panicking holder
    LockPoisoned,
    /// Report could not be serialized
    Serialization(serde_json::Error),
    /// Report file is malformed or fails structural validation
    InvalidReport(String),
}

impl std::fmt::Display for ProfilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfilerError::NotInitialized => write!(f, "Profiler is not initialized"),
            ProfilerError::InvalidName => write!(f, "Timer name must not be empty"),
            ProfilerError::AlreadyRunning(name) => write!(f, "Timer already running: {name}"),
            ProfilerError::NotRunning(name) => write!(f, "Timer not running: {name}"),
            ProfilerError::NotFound(name) => write!(f, "Timer not found: {name}"),
            ProfilerError::AllocationError { requested } => {
                write!(f, "Failed to reserve storage for {requested} timers")
            }
            ProfilerError::ClockError(detail) => write!(f, "Clock error: {detail}"),
            ProfilerError::IoError { path, source } => {
                write!(f, "Failed to write {}: {source}", path.display())
            }
            ProfilerError::LockPoisoned => write!(f, "Registry lock was poisoned"),
            ProfilerError::Serialization(e) => write!(f, "Failed to serialize report: {e}"),
            ProfilerError::InvalidReport(msg) => write!(f, "Invalid report: {msg}"),
        }
    }
}

impl std::error::Error for ProfilerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfilerError::IoError { source, .. } => Some(source),
            ProfilerError::Serialization(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProfilerError>;
