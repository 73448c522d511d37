//! Scan event sink

mod handler;
mod logging;

pub use handler::{NoOpHandler, ProgressHandler, ScanEvent, SkipReason};
pub use logging::LoggingHandler;
