//! Function-level timing registry.
//!
//! Callers mark named regions with [`Registry::start`] and [`Registry::stop`];
//! the registry accumulates elapsed monotonic time and call counts per name and
//! exports them as a JSON report.
//!
//! ```no_run
//! use khronos::Registry;
//!
//! let mut registry = Registry::new();
//! registry.initialize()?;
//! registry.start("load")?;
//! // ... work ...
//! registry.stop("load")?;
//! registry.export("my_program")?;
//! registry.cleanup()?;
//! # Ok::<(), khronos::ProfilerError>(())
//! ```

pub mod clock;
pub mod config;
pub mod dev_tools;
pub mod error;
pub mod logging;
pub mod registry;
pub mod report;
pub mod shared;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::ProfilerConfig;
pub use error::{ProfilerError, Result};
pub use registry::{Registry, TimerEntry};
pub use report::{FunctionReport, Report, ReportMetadata};
pub use shared::SharedRegistry;
