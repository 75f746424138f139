//! A simulation specific logger.
//!
//! The engine emits its diagnostic warnings through the [`log`] facade;
//! this module provides a colored default backend for binaries and tests
//! that want to see them. Installing it is optional, any other `log`
//! implementation works as well.

use log::{set_logger, set_max_level, Level, LevelFilter, Log, SetLoggerError};
use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// A logger instance for diagnostics from the simulation framework.
pub static LOGGER: StandardLogger = StandardLogger();

/// The default logging backend, writing level-colored records to the
/// standard streams.
pub struct StandardLogger();

impl StandardLogger {
    /// Installs this logger as the global `log` backend.
    ///
    /// # Errors
    ///
    /// Returns an error if another logger is already installed.
    pub fn setup() -> Result<(), SetLoggerError> {
        set_logger(&LOGGER).map(|()| set_max_level(LevelFilter::Trace))
    }

    fn level_color(level: Level) -> Color {
        match level {
            Level::Debug => Color::Cyan,
            Level::Trace => Color::Magenta,
            Level::Info => Color::Green,
            Level::Warn => Color::Yellow,
            Level::Error => Color::Red,
        }
    }
}

impl Log for StandardLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= Level::Trace
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut stream = match record.level() {
            Level::Error => StandardStream::stderr(ColorChoice::Always),
            _ => StandardStream::stdout(ColorChoice::Always),
        };

        let dim = ColorSpec::new()
            .set_fg(Some(Color::Rgb(0x7f, 0x8c, 0x8d)))
            .clone();

        let result = stream
            .set_color(&dim)
            .and_then(|()| write!(&mut stream, "[ "))
            .and_then(|()| {
                stream.set_color(
                    ColorSpec::new().set_fg(Some(StandardLogger::level_color(record.level()))),
                )
            })
            .and_then(|()| write!(&mut stream, "{:>20}", record.target()))
            .and_then(|()| stream.set_color(&dim))
            .and_then(|()| write!(&mut stream, " ] "))
            .and_then(|()| stream.reset())
            .and_then(|()| writeln!(&mut stream, "{}", record.args()));

        result.expect("Failed to write to output stream");
    }

    fn flush(&self) {}
}
