//! Explicit per-component log handles.
//!
//! Every component that logs (the store, the service, each selector, the
//! driver) owns a [`Log`] with its own verbosity, configured from the steering
//! file. Messages that pass the handle's level are emitted as `tracing` events
//! carrying the component name, so the subscriber installed by the binary
//! decides where they end up.

use std::fmt;
use std::str::FromStr;
use tracing::Level;

/// Verbosity of a [`Log`] handle, ordered from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parse a steering-file level name, case-insensitively.
    ///
    /// Returns `None` for names that are not recognised.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warning" | "warn" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// The matching `tracing` directive, used to build an `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        LogLevel::parse(s).ok_or_else(|| format!("unknown log level '{}'", s))
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// A named log handle with its own threshold.
#[derive(Debug, Clone)]
pub struct Log {
    component: String,
    level: LogLevel,
}

impl Log {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            level: LogLevel::default(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    /// A handle for a sub-component that inherits this handle's level.
    pub fn child(&self, component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            level: self.level,
        }
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    pub fn debug(&self, message: impl fmt::Display) {
        if self.enabled(LogLevel::Debug) {
            tracing::event!(Level::DEBUG, component = %self.component, "{}", message);
        }
    }

    pub fn info(&self, message: impl fmt::Display) {
        if self.enabled(LogLevel::Info) {
            tracing::event!(Level::INFO, component = %self.component, "{}", message);
        }
    }

    pub fn warning(&self, message: impl fmt::Display) {
        if self.enabled(LogLevel::Warning) {
            tracing::event!(Level::WARN, component = %self.component, "{}", message);
        }
    }

    pub fn error(&self, message: impl fmt::Display) {
        if self.enabled(LogLevel::Error) {
            tracing::event!(Level::ERROR, component = %self.component, "{}", message);
        }
    }
}
