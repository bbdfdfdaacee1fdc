//! HTTP middleware: admission control and request tracing.

pub mod admission;
pub mod tracing;
