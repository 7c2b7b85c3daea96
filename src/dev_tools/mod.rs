//! Development tools and utilities
//!
//! Tooling that exercises the registry outside of normal instrumentation:
//! - Timing accuracy checks under concurrent use
//! - Sample workloads for producing reports

pub mod demo;
pub mod self_test;

pub use demo::run_demo;
pub use self_test::test_registry_timing;
