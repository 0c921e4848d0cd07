//! Observability wiring shared by the binaries.

pub mod tracing_setup;
