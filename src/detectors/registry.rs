use super::{
    CargoDetector, ComponentDetector, DetectionContext, DockerComposeDetector, GitHubActionsDetector,
    GoModDetector, GradleDetector, MavenDetector, NpmDetector, PythonDetector,
};
use crate::payload::Fragment;
use tracing::{debug, warn};

/// One fragment with the detector that produced it.
#[derive(Debug, Clone)]
pub struct Detected {
    pub detector: &'static str,
    pub claims_directory: bool,
    pub fragment: Fragment,
}

/// Output of every detector for one directory, in registration order.
#[derive(Debug, Default)]
pub struct DetectionOutcome {
    pub detected: Vec<Detected>,
    /// Detectors that failed, with the reason. They contributed nothing.
    pub failures: Vec<(&'static str, String)>,
}

impl DetectionOutcome {
    /// Index of the first named fragment that claims its directory.
    pub fn claiming_fragment(&self) -> Option<usize> {
        self.detected
            .iter()
            .position(|d| d.claims_directory && !d.fragment.is_virtual())
    }
}

/// Ordered list of detectors, built once and passed to the scanner.
pub struct DetectorRegistry {
    detectors: Vec<Box<dyn ComponentDetector>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(NpmDetector));
        registry.register(Box::new(CargoDetector));
        registry.register(Box::new(PythonDetector));
        registry.register(Box::new(GoModDetector));
        registry.register(Box::new(MavenDetector));
        registry.register(Box::new(GradleDetector));
        registry.register(Box::new(DockerComposeDetector));
        registry.register(Box::new(GitHubActionsDetector));
        registry
    }

    pub fn register(&mut self, detector: Box<dyn ComponentDetector>) {
        self.detectors.push(detector);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run every detector. A failing detector is logged and skipped.
    pub fn detect_all(&self, ctx: &DetectionContext<'_>) -> DetectionOutcome {
        let mut outcome = DetectionOutcome::default();
        for detector in &self.detectors {
            match detector.detect(ctx) {
                Ok(fragments) => {
                    if !fragments.is_empty() {
                        debug!(
                            detector = detector.name(),
                            dir = %ctx.dir.display(),
                            fragments = fragments.len(),
                            "Detector matched"
                        );
                    }
                    outcome
                        .detected
                        .extend(fragments.into_iter().map(|fragment| Detected {
                            detector: detector.name(),
                            claims_directory: detector.claims_directory(),
                            fragment,
                        }));
                }
                Err(e) => {
                    warn!(detector = detector.name(), dir = %ctx.dir.display(), error = %e, "Detector failed");
                    outcome.failures.push((detector.name(), format!("{:#}", e)));
                }
            }
        }
        outcome
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
