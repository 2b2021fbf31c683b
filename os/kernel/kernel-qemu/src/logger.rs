use crate::qemu_trace;
use core::fmt;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// `log` backend writing `[LEVEL] target: message` lines to the debug port.
pub struct QemuLogger {
    max_level: LevelFilter,
}

impl QemuLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    #[must_use]
    pub const fn max_level(&self) -> LevelFilter {
        self.max_level
    }

    /// Installs this logger as the global `log` backend. Call once, early.
    ///
    /// # Errors
    /// If a logger is already installed.
    pub fn install(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.max_level);
        Ok(())
    }
}

/// One log line, newline included.
fn write_record(out: &mut impl fmt::Write, record: &Record<'_>) -> fmt::Result {
    writeln!(out, "[{}] {}: {}", record.level(), record.target(), record.args())
}

impl Log for QemuLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        qemu_trace!("{}", Line(record));
    }

    fn flush(&self) {}
}

struct Line<'a, 'r>(&'a Record<'r>);

impl fmt::Display for Line<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_record(f, self.0)
    }
}
