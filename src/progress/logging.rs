//! Logging-based progress handler

use super::{ProgressHandler, ScanEvent, SkipReason};
use tracing::{debug, info, trace, warn};

/// Handler that logs scan events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_event(&self, event: &ScanEvent) {
        match event {
            ScanEvent::ScanStarted { root } => {
                info!(root = %root.display(), "Starting scan");
            }
            ScanEvent::ScanCompleted {
                components,
                directories,
                duration,
                cancelled,
            } => {
                if *cancelled {
                    warn!(
                        components,
                        directories,
                        duration_ms = duration.as_millis(),
                        "Scan cancelled, returning partial tree"
                    );
                } else {
                    info!(
                        components,
                        directories,
                        duration_ms = duration.as_millis(),
                        "Scan complete"
                    );
                }
            }
            ScanEvent::EnterDirectory { path, depth } => {
                trace!(path = %path.display(), depth, "Entering directory");
            }
            ScanEvent::LeaveDirectory { path } => {
                trace!(path = %path.display(), "Leaving directory");
            }
            ScanEvent::ComponentDetected { name, detector, path } => {
                debug!(component = %name, detector, path = %path.display(), "Component detected");
            }
            ScanEvent::RuleMatched { tech, path } => {
                trace!(tech = %tech, path = %path.display(), "Rule matched");
            }
            ScanEvent::FileSkipped { path, reason } => match reason {
                SkipReason::Excluded { layer } => {
                    trace!(path = %path.display(), layer = %layer, "Excluded");
                }
                SkipReason::Unreadable { error } => {
                    warn!(path = %path.display(), error = %error, "Skipping unreadable entry");
                }
                SkipReason::MaxDepth => {
                    debug!(path = %path.display(), "Depth limit reached");
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;
        let path = PathBuf::from("/test");

        let events = vec![
            ScanEvent::ScanStarted { root: path.clone() },
            ScanEvent::EnterDirectory {
                path: path.clone(),
                depth: 0,
            },
            ScanEvent::ComponentDetected {
                name: "web".to_string(),
                detector: "npm",
                path: path.clone(),
            },
            ScanEvent::RuleMatched {
                tech: "docker".to_string(),
                path: path.clone(),
            },
            ScanEvent::FileSkipped {
                path: path.join("node_modules"),
                reason: SkipReason::Excluded {
                    layer: "global".to_string(),
                },
            },
            ScanEvent::FileSkipped {
                path: path.join("secret"),
                reason: SkipReason::Unreadable {
                    error: "permission denied".to_string(),
                },
            },
            ScanEvent::LeaveDirectory { path: path.clone() },
            ScanEvent::ScanCompleted {
                components: 2,
                directories: 1,
                duration: Duration::from_millis(3),
                cancelled: true,
            },
        ];

        for event in events {
            handler.on_event(&event);
        }
    }
}
