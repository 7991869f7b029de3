use std::fmt::Display;

use log::{Level, LevelFilter};

/// A named logger. Every message is prefixed with the name of the component
/// that owns the logger and forwarded to the [log] facade.
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
}

impl Logger {
    pub fn create(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn log(&self, level: Level, message: impl Display) {
        log::log!(target: "vpuppr_speech", level, "[{}] {message}", self.name);
    }

    pub fn debug(&self, message: impl Display) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl Display) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl Display) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl Display) {
        self.log(Level::Error, message);
    }
}

/// Install the global logger for the binary.
///
/// `quiet` overrides `verbose`. `RUST_LOG` is still respected on top of the
/// chosen level.
pub fn init(verbose: bool, quiet: bool) {
    let level = if quiet {
        LevelFilter::Off
    } else if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
}
