//! Bridge between the tracing crate and the compressor's verbosity flags.
//!
//! [`CompressorLayer`] maps each event's `compressor::*` target to a
//! [`LogFlag`] and its level to a verbosity level, consults the
//! [`VerbosityConfig`] and writes the surviving events as single lines.
//! Warnings and errors are always written, whatever their target.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logging::{VerbosityConfig, init_tracing};
//!
//! init_tracing(VerbosityConfig::from_verbose_level(2))?;
//! tracing::debug!(target: "compressor::control", "pause");
//! ```

use std::fmt::{self, Write as _};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use super::config::VerbosityConfig;
use super::levels::LogFlag;

/// A tracing layer that filters events by flag and writes them as lines.
pub struct CompressorLayer {
    config: VerbosityConfig,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl CompressorLayer {
    /// Create a layer writing to standard error.
    #[must_use]
    pub fn new(config: VerbosityConfig) -> Self {
        Self::with_writer(config, io::stderr())
    }

    /// Create a layer writing to `writer`.
    pub fn with_writer(config: VerbosityConfig, writer: impl Write + Send + 'static) -> Self {
        Self {
            config,
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Map a tracing level to a verbosity level.
    const fn level_to_verbosity_level(level: &Level) -> u8 {
        match *level {
            Level::ERROR | Level::WARN => 0,
            Level::INFO => 1,
            Level::DEBUG => 2,
            Level::TRACE => 3,
        }
    }

    /// `Some` when the event should be written, carrying its flag if the
    /// target has one.
    fn admit(&self, target: &str, level: &Level) -> Option<Option<LogFlag>> {
        let verbosity_level = Self::level_to_verbosity_level(level);
        let flag = LogFlag::from_target(target);
        if verbosity_level == 0 {
            return Some(flag);
        }
        let flag = flag?;
        self.config.enabled(flag, verbosity_level).then_some(Some(flag))
    }
}

impl<S> Layer<S> for CompressorLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let Some(flag) = self.admit(metadata.target(), metadata.level()) else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut line = String::from("compressor");
        match *metadata.level() {
            Level::ERROR => line.push_str(" error"),
            Level::WARN => line.push_str(" warning"),
            _ => {}
        }
        if let Some(flag) = flag {
            let _ = write!(line, " [{flag}]");
        }
        line.push_str(": ");
        line.push_str(visitor.message.as_deref().unwrap_or_default());
        line.push_str(&visitor.fields);
        line.push('\n');

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // Diagnostics must never take the process down.
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }
}

/// Visitor that extracts the message and renders the other fields.
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }
}

/// Install a global subscriber that writes events per `config`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing(config: VerbosityConfig) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(CompressorLayer::new(config))
        .try_init()
}

/// Install a global subscriber that applies `filter` before the verbosity
/// flags, e.g. an `EnvFilter` built from `COMPRESSOR_LOG`.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing_with_filter<F>(config: VerbosityConfig, filter: F) -> Result<(), TryInitError>
where
    F: Layer<tracing_subscriber::Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(filter)
        .with(CompressorLayer::new(config))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn capture(level: u8, emit: impl FnOnce()) -> String {
        let buffer = SharedBuffer::default();
        let layer =
            CompressorLayer::with_writer(VerbosityConfig::from_verbose_level(level), buffer.clone());
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, emit);
        buffer.contents()
    }

    #[test]
    fn test_level_to_verbosity_level() {
        assert_eq!(CompressorLayer::level_to_verbosity_level(&Level::ERROR), 0);
        assert_eq!(CompressorLayer::level_to_verbosity_level(&Level::WARN), 0);
        assert_eq!(CompressorLayer::level_to_verbosity_level(&Level::INFO), 1);
        assert_eq!(CompressorLayer::level_to_verbosity_level(&Level::DEBUG), 2);
        assert_eq!(CompressorLayer::level_to_verbosity_level(&Level::TRACE), 3);
    }

    #[test]
    fn errors_are_written_even_when_quiet() {
        let out = capture(0, || {
            tracing::error!(target: "compressor::cleanup", path = "out/a.gz", "could not remove");
            tracing::info!(target: "compressor::pipeline", "job started");
        });
        assert_eq!(out, "compressor error [cleanup]: could not remove path=out/a.gz\n");
    }

    #[test]
    fn info_needs_one_v() {
        let emit = || tracing::info!(target: "compressor::pipeline", total_bytes = 10u64, "job started");
        assert!(capture(0, emit).is_empty());
        assert_eq!(
            capture(1, emit),
            "compressor [pipeline]: job started total_bytes=10\n"
        );
    }

    #[test]
    fn debug_and_trace_follow_verbosity() {
        let emit = || {
            tracing::debug!(target: "compressor::control", "pause");
            tracing::trace!(target: "compressor::pipeline", "chunk forwarded");
        };
        assert!(capture(1, emit).is_empty());
        assert_eq!(capture(2, emit), "compressor [control]: pause\n");
        assert_eq!(capture(3, emit).lines().count(), 2);
    }

    #[test]
    fn foreign_targets_only_surface_warnings() {
        let out = capture(3, || {
            tracing::info!(target: "other_crate", "noise");
            tracing::warn!(target: "other_crate", "heads up");
        });
        assert_eq!(out, "compressor warning: heads up\n");
    }
}
