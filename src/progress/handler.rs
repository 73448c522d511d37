//! Progress handler trait and scan events

use std::path::PathBuf;
use std::time::Duration;

/// Why a directory entry was left out of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched an exclusion layer (named by its display form)
    Excluded { layer: String },
    /// Listing or reading failed
    Unreadable { error: String },
    /// Below the configured depth limit
    MaxDepth,
}

/// Lifecycle notifications emitted by the scanner.
///
/// Handlers observe only; nothing they do feeds back into matching.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Scan started at `root`
    ScanStarted { root: PathBuf },

    /// Scan finished
    ScanCompleted {
        components: usize,
        directories: usize,
        duration: Duration,
        cancelled: bool,
    },

    EnterDirectory { path: PathBuf, depth: usize },

    LeaveDirectory { path: PathBuf },

    /// A named fragment was attached as a component
    ComponentDetected {
        name: String,
        detector: &'static str,
        path: PathBuf,
    },

    /// A catalog rule matched in a directory
    RuleMatched { tech: String, path: PathBuf },

    /// A file or directory was skipped
    FileSkipped { path: PathBuf, reason: SkipReason },
}

/// Trait for handling scan events
pub trait ProgressHandler: Send + Sync {
    /// Called when a scan event occurs
    fn on_event(&self, event: &ScanEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_event(&self, _event: &ScanEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_event(&self, _event: &ScanEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_handler() {
        NoOpHandler.on_event(&ScanEvent::ScanStarted {
            root: PathBuf::from("/test"),
        });
    }

    #[test]
    fn test_handler_receives_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler { count: count.clone() };

        handler.on_event(&ScanEvent::ScanStarted {
            root: PathBuf::from("/test"),
        });
        handler.on_event(&ScanEvent::EnterDirectory {
            path: PathBuf::from("/test"),
            depth: 0,
        });
        handler.on_event(&ScanEvent::ScanCompleted {
            components: 1,
            directories: 1,
            duration: Duration::from_millis(5),
            cancelled: false,
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_debug() {
        let event = ScanEvent::FileSkipped {
            path: PathBuf::from("/test/node_modules"),
            reason: SkipReason::MaxDepth,
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("FileSkipped"));
        assert!(debug_str.contains("MaxDepth"));
    }
}
