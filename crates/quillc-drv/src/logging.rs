//! Minimal logger behind the `log` facade.
//!
//! Developer tracing (`info!`/`debug!`/`trace!`) goes to stderr with a
//! level prefix; the threshold derives from the CLI log level. User-facing
//! ILLUSTRATIVE narration does not pass through here — it prints straight
//! to stdout, gated by the configured level.

use log::{Level, LevelFilter, Log, Metadata, Record};
use quillc_util::LogLevel;

/// The one logger the process ever installs.
struct QuillLogger {
    filter: LevelFilter,
}

impl Log for QuillLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN ",
            Level::Info => "info ",
            Level::Debug => "debug",
            Level::Trace => "trace",
        };
        eprintln!("[{tag}] {}", record.args());
    }

    fn flush(&self) {}
}

/// Install the logger once; later calls are no-ops (tests may race).
///
/// # Arguments
///
/// * `level` - The CLI log level; its [`LogLevel::to_level_filter`]
///   mapping becomes the global threshold
pub fn init(level: LogLevel) {
    let filter = level.to_level_filter();
    let logger = Box::new(QuillLogger { filter });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(filter);
    }
}
