//! Chrome Trace execution profiler.
//!
//! Records one span per step phase (bridge collect/prune/destroy/spawn, each
//! sync processor, behavior stages, zone triggers, deletion) and writes a
//! Chrome Trace Event JSON file readable by `chrome://tracing` or
//! <https://ui.perfetto.dev>.
//!
//! Only active with the `profiling` feature:
//!
//! ```bash
//! cargo test --features profiling
//! ```
//!
//! Without it, every call is an inlined no-op.

pub mod profiler;
