//! Diagnostic sink. `Module` owns one `Box<dyn Logger>`; the four severities
//! match spec.md §7 exactly. The default implementation forwards to the
//! `log` facade the way the wider `spirq-rs` workspace wires `log` +
//! `env_logger` into its dev-dependencies and example binaries, even though
//! `spirq-core` itself never needed a logger (it's a one-shot parser, not a
//! stateful builder that accumulates diagnostics across many calls).
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Fatal,
}
impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogLevel::Info => f.write_str("info"),
            LogLevel::Warning => f.write_str("warning"),
            LogLevel::Error => f.write_str("error"),
            LogLevel::Fatal => f.write_str("fatal"),
        }
    }
}

pub trait Logger {
    fn log(&self, level: LogLevel, msg: &str);
}

/// Forwards to the `log` crate. `Fatal` is logged at `log::Level::Error`
/// since `log` has no fatal level of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdLogger;
impl Logger for StdLogger {
    fn log(&self, level: LogLevel, msg: &str) {
        match level {
            LogLevel::Info => log::info!("{msg}"),
            LogLevel::Warning => log::warn!("{msg}"),
            LogLevel::Error | LogLevel::Fatal => log::error!("{msg}"),
        }
    }
}

/// Discards everything. Useful in tests, where `env_logger` isn't set up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;
impl Logger for NullLogger {
    fn log(&self, _level: LogLevel, _msg: &str) {}
}
