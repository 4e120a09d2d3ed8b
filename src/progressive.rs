//! Progressive two-phase design delivery.
//!
//! A design request first yields a quick-mode preview, then an
//! exhaustive-mode final result that supersedes it. Each `start()` bumps a
//! session-wide generation counter; results are tagged with the generation
//! they belong to, and consumers keep only results from the current
//! generation. Last writer wins — a stale completion is discarded, never
//! merged. The worker re-checks the counter between phases and abandons
//! the exhaustive pass once superseded.

use crate::design::{DesignEngine, DesignOptions, DesignResult, DesignSpecification};
use crate::error::DesignError;
use crate::template::Template;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesignPhase {
    /// Quick-mode result, emitted first.
    Preview,
    /// Exhaustive-mode result; supersedes the preview.
    Final,
}

/// One emission from a design worker. At most two arrive per request:
/// a preview and then a final.
#[derive(Debug)]
pub struct PhasedResult {
    pub generation: u64,
    pub phase: DesignPhase,
    pub outcome: Result<DesignResult, DesignError>,
}

/// Owns the generation counter for a stream of design requests.
#[derive(Debug, Default)]
pub struct DesignSession {
    generation: Arc<AtomicU64>,
}

impl DesignSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// True when the result belongs to the newest request.
    pub fn is_current(&self, result: &PhasedResult) -> bool {
        result.generation == self.current_generation()
    }

    /// Invalidates all in-flight work without starting a new request.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Spawns a worker for one design request and returns the channel its
    /// phased results arrive on. A previously started request keeps
    /// running until its next generation check, but everything it sends is
    /// already stale.
    pub fn start(
        &self,
        engine: Arc<DesignEngine>,
        template: Template,
        spec: DesignSpecification,
        options: DesignOptions,
    ) -> Receiver<PhasedResult> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let counter = Arc::clone(&self.generation);
        let (tx, rx) = channel();

        thread::spawn(move || {
            let quick = DesignOptions {
                exhaustive: false,
                ..options.clone()
            };
            let preview = engine.design(&template, &spec, &quick);
            if tx
                .send(PhasedResult {
                    generation,
                    phase: DesignPhase::Preview,
                    outcome: preview,
                })
                .is_err()
            {
                return;
            }

            // superseded while the preview ran; skip the expensive pass
            if counter.load(Ordering::SeqCst) != generation {
                return;
            }

            let exhaustive = DesignOptions {
                exhaustive: true,
                ..options
            };
            let outcome = engine.design(&template, &spec, &exhaustive);
            if counter.load(Ordering::SeqCst) != generation {
                return;
            }
            let _ = tx.send(PhasedResult {
                generation,
                phase: DesignPhase::Final,
                outcome,
            });
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::DesignSpecification;
    use std::time::Duration;

    const T60: &str = "GCAGTCCAGGCTACGGTCACATTTAGCATAAGTCAATTGAGACGTTGGACGCTAAGCCAG";

    fn request() -> (Arc<DesignEngine>, Template, DesignSpecification, DesignOptions) {
        (
            Arc::new(DesignEngine::default()),
            Template::from_sequence(T60).unwrap(),
            DesignSpecification::deletion(20, 40),
            DesignOptions::default(),
        )
    }

    #[test]
    fn test_preview_then_final() {
        let session = DesignSession::new();
        let (engine, template, spec, options) = request();
        let rx = session.start(engine, template, spec, options);

        let preview = rx.recv_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(preview.phase, DesignPhase::Preview);
        assert!(session.is_current(&preview));
        let preview_score = preview.outcome.unwrap().composite_score;

        let fin = rx.recv_timeout(Duration::from_secs(60)).unwrap();
        assert_eq!(fin.phase, DesignPhase::Final);
        assert!(session.is_current(&fin));
        let final_score = fin.outcome.unwrap().composite_score;

        // the exhaustive pass can only improve on the preview
        assert!(final_score >= preview_score);
    }

    #[test]
    fn test_cancel_marks_results_stale() {
        let session = DesignSession::new();
        let (engine, template, spec, options) = request();
        let rx = session.start(engine, template, spec, options);
        session.cancel();

        // whatever still arrives belongs to the old generation
        while let Ok(result) = rx.recv_timeout(Duration::from_secs(60)) {
            assert!(!session.is_current(&result));
        }
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let session = DesignSession::new();
        let (engine, template, spec, options) = request();
        let rx_old = session.start(
            Arc::clone(&engine),
            template.clone(),
            spec.clone(),
            options.clone(),
        );
        let rx_new = session.start(engine, template, spec, options);

        while let Ok(result) = rx_old.recv_timeout(Duration::from_secs(60)) {
            assert!(!session.is_current(&result), "stale result accepted");
        }
        let newest = rx_new.recv_timeout(Duration::from_secs(60)).unwrap();
        assert!(session.is_current(&newest));
    }
}
