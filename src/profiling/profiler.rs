//! Span recording for step phases.
//!
//! ```ignore
//! particle_entity_bridge::profiler::init("profile/bridge.json");
//! world.step(1.0 / 60.0);
//! particle_entity_bridge::profiler::shutdown();
//! ```
//!
//! Spans opened before [`init`] or after [`shutdown`] are dropped silently.

use std::path::Path;

/// Value attached to a span.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// Counter or tick.
    U64(u64),
    /// Measured quantity.
    F64(f64),
    /// Free-form label.
    Str(String),
}

#[cfg(feature = "profiling")]
mod enabled {
    use std::fs::{self, File};
    use std::io::{self, BufWriter, Write};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::{Mutex, OnceLock, PoisonError};
    use std::time::Instant;

    use log::{info, warn};
    use serde::Serialize;
    use serde_json::{Map, Value};

    use super::{Arg, Path};

    /// Complete event (`ph: "X"`) in Chrome Trace Event format.
    #[derive(Serialize)]
    struct CompleteEvent {
        name: &'static str,
        cat: &'static str,
        ph: &'static str,
        ts: u64,
        dur: u64,
        pid: u32,
        tid: u64,
        #[serde(skip_serializing_if = "Map::is_empty")]
        args: Map<String, Value>,
    }

    #[derive(Serialize)]
    struct TraceDocument<'a> {
        #[serde(rename = "traceEvents")]
        trace_events: &'a [CompleteEvent],
    }

    struct Recorder {
        origin: Instant,
        path: PathBuf,
        recording: AtomicBool,
        events: Mutex<Vec<CompleteEvent>>,
    }

    static RECORDER: OnceLock<Recorder> = OnceLock::new();
    static NEXT_THREAD: AtomicU64 = AtomicU64::new(1);

    thread_local! {
        static THREAD: u64 = NEXT_THREAD.fetch_add(1, Ordering::Relaxed);
    }

    impl Arg {
        fn to_value(&self) -> Value {
            match self {
                Arg::U64(v) => Value::from(*v),
                Arg::F64(v) => serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number),
                Arg::Str(s) => Value::String(s.clone()),
            }
        }
    }

    fn now_us(recorder: &Recorder) -> u64 {
        recorder.origin.elapsed().as_micros() as u64
    }

    /// Starts recording. Only the first call has any effect.
    pub fn init<P: AsRef<Path>>(path: P) {
        let fresh = RECORDER
            .set(Recorder {
                origin: Instant::now(),
                path: path.as_ref().to_path_buf(),
                recording: AtomicBool::new(true),
                events: Mutex::new(Vec::new()),
            })
            .is_ok();
        if fresh {
            info!("profiler: recording to {}", path.as_ref().display());
        }
    }

    /// Stops recording and writes the trace file.
    pub fn shutdown() {
        let Some(recorder) = RECORDER.get() else { return };
        recorder.recording.store(false, Ordering::Release);
        if let Err(e) = flush(recorder) {
            warn!("profiler: could not write {}: {e}", recorder.path.display());
        }
    }

    fn flush(recorder: &Recorder) -> io::Result<()> {
        let events = std::mem::take(&mut *recorder.events.lock().unwrap_or_else(PoisonError::into_inner));
        if let Some(dir) = recorder.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut out = BufWriter::new(File::create(&recorder.path)?);
        serde_json::to_writer(&mut out, &TraceDocument { trace_events: &events })?;
        out.flush()
    }

    /// Opens a span; it is recorded when the guard drops.
    pub fn span(name: &'static str) -> SpanGuard {
        match RECORDER.get() {
            Some(recorder) if recorder.recording.load(Ordering::Acquire) => SpanGuard {
                name,
                started_us: now_us(recorder),
                args: Map::new(),
                live: true,
            },
            _ => SpanGuard { name, started_us: 0, args: Map::new(), live: false },
        }
    }

    /// Guard of an open span.
    pub struct SpanGuard {
        name: &'static str,
        started_us: u64,
        args: Map<String, Value>,
        live: bool,
    }

    impl SpanGuard {
        /// Attaches an argument shown in the trace viewer.
        pub fn arg(mut self, key: &str, value: Arg) -> Self {
            if self.live {
                self.args.insert(key.to_owned(), value.to_value());
            }
            self
        }
    }

    impl Drop for SpanGuard {
        fn drop(&mut self) {
            if !self.live {
                return;
            }
            let Some(recorder) = RECORDER.get() else { return };
            if !recorder.recording.load(Ordering::Acquire) {
                return;
            }
            let event = CompleteEvent {
                name: self.name,
                cat: "bridge",
                ph: "X",
                ts: self.started_us,
                dur: now_us(recorder).saturating_sub(self.started_us),
                pid: std::process::id(),
                tid: THREAD.with(|t| *t),
                args: std::mem::take(&mut self.args),
            };
            if let Ok(mut events) = recorder.events.lock() {
                events.push(event);
            }
        }
    }
}

#[cfg(not(feature = "profiling"))]
mod disabled {
    use super::{Arg, Path};

    /// No-op without the `profiling` feature.
    #[inline]
    pub fn init<P: AsRef<Path>>(_path: P) {}

    /// No-op without the `profiling` feature.
    #[inline]
    pub fn shutdown() {}

    /// No-op without the `profiling` feature.
    #[inline]
    pub fn span(_name: &'static str) -> SpanGuard {
        SpanGuard
    }

    /// Zero-sized stand-in guard.
    pub struct SpanGuard;

    impl SpanGuard {
        /// No-op without the `profiling` feature.
        #[inline]
        pub fn arg(self, _key: &str, _value: Arg) -> Self {
            self
        }
    }
}

#[cfg(feature = "profiling")]
pub use enabled::{init, shutdown, span, SpanGuard};

#[cfg(not(feature = "profiling"))]
pub use disabled::{init, shutdown, span, SpanGuard};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_without_init_are_harmless() {
        let guard = span("unrecorded").arg("n", Arg::U64(3)).arg("label", Arg::Str("x".into()));
        drop(guard);
        shutdown();
    }
}
