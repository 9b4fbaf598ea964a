//! Console logger
//!
//! Backend for the `log` facade. Every line is written to the registered
//! [`ConsoleSink`] with a short level prefix, e.g. `[I] Created process: A (PID: 2)`.

use core::fmt::{self, Write};

use ::log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Destination for console output (UART, VGA text buffer, test capture...)
pub trait ConsoleSink: Sync {
    fn write_str(&self, s: &str);
}

/// `log::Log` implementation writing to the registered console sink
pub struct ConsoleLogger {
    sink: Mutex<Option<&'static dyn ConsoleSink>>,
}

static LOGGER: ConsoleLogger = ConsoleLogger::new();

impl ConsoleLogger {
    const fn new() -> Self {
        Self { sink: Mutex::new(None) }
    }
}

/// Short prefix written before every line of the given level
pub fn level_prefix(level: Level) -> &'static str {
    match level {
        Level::Error => "[E]",
        Level::Warn => "[W]",
        Level::Info => "[I]",
        Level::Debug => "[D]",
        Level::Trace => "[T]",
    }
}

struct SinkWriter(&'static dyn ConsoleSink);

impl Write for SinkWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write_str(s);
        Ok(())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= ::log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Holding the lock keeps lines from interleaving
        let sink = self.sink.lock();
        if let Some(sink) = *sink {
            let mut writer = SinkWriter(sink);
            let _ = writeln!(writer, "{} {}", level_prefix(record.level()), record.args());
        }
    }

    fn flush(&self) {}
}

/// Install the console logger writing to `sink`
///
/// May be called again to swap the sink or the level; the logger itself is
/// only registered with the facade once.
pub fn init(sink: &'static dyn ConsoleSink, level: LevelFilter) {
    *LOGGER.sink.lock() = Some(sink);
    // Fails only when a logger is already installed, which is fine on re-init
    let _ = ::log::set_logger(&LOGGER);
    ::log::set_max_level(level);
}

/// Change the maximum level that reaches the console
pub fn set_level(level: LevelFilter) {
    ::log::set_max_level(level);
}

/// Current maximum level
pub fn level() -> LevelFilter {
    ::log::max_level()
}
