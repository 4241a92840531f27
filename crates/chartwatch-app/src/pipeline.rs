use std::sync::Arc;

use chartwatch_capture::{CaptureSurface, TextRecognizer};
use chartwatch_core::{
    ContextTracker, DispatchContext, DispatchReport, Dispatcher, Error, IdentityExtractor, Result,
    Transition,
};
use chartwatch_directory::PatientMatcher;
use chartwatch_types::{ActiveContext, ScoredMatch};

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Nothing identifying on screen
    NoIdentity,
    /// Identity found but the directory does not know it
    NoMatch,
    /// Same patient as before, deduplicated
    Unchanged,
    Notified(DispatchReport),
}

/// What one capture pass found, before the tracker has seen it
#[derive(Debug)]
pub enum Detection {
    NoIdentity,
    NoMatch,
    Matched { scored: ScoredMatch, text: String },
}

/// One detection cycle, capture -> recognize -> extract -> match -> decide,
/// plus the capture and OCR resources it runs on.
pub struct Pipeline {
    surface: Box<dyn CaptureSurface>,
    recognizer: Box<dyn TextRecognizer>,
    extractor: Arc<dyn IdentityExtractor>,
    matcher: Arc<dyn PatientMatcher>,
    dispatcher: Arc<Dispatcher>,
    tracker: ContextTracker,
    keep_raw_text: bool,
    acquired: bool,
}

impl Pipeline {
    pub fn new(
        surface: Box<dyn CaptureSurface>,
        recognizer: Box<dyn TextRecognizer>,
        extractor: Arc<dyn IdentityExtractor>,
        matcher: Arc<dyn PatientMatcher>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            surface,
            recognizer,
            extractor,
            matcher,
            dispatcher,
            tracker: ContextTracker::new(),
            keep_raw_text: false,
            acquired: false,
        }
    }

    pub fn keep_raw_text(mut self, keep: bool) -> Self {
        self.keep_raw_text = keep;
        self
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired
    }

    pub fn active(&self) -> Option<&ActiveContext> {
        self.tracker.active()
    }

    /// Initialize capture, then OCR. If OCR fails the capture surface is
    /// released again so nothing is left half-acquired.
    pub async fn acquire(&mut self) -> Result<()> {
        if self.acquired {
            return Ok(());
        }

        self.surface.initialize().await?;
        if let Err(e) = self.recognizer.initialize().await {
            self.surface.stop().await;
            return Err(e);
        }

        self.acquired = true;
        Ok(())
    }

    /// Terminate OCR, stop capture and forget the active patient.
    /// Returns false if there was nothing to release.
    pub async fn release(&mut self) -> bool {
        if !self.acquired {
            return false;
        }

        self.recognizer.terminate().await;
        self.surface.stop().await;
        self.tracker.reset();
        self.acquired = false;
        true
    }

    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let detection = self.detect().await?;
        Ok(self.commit(detection).await)
    }

    /// Capture, recognize, extract and look up. Touches no state, so it is
    /// safe to abandon at any await point.
    pub async fn detect(&self) -> Result<Detection> {
        let snapshot = self.surface.snapshot().await?;
        let text = self.recognizer.recognize(&snapshot).await?;
        tracing::debug!("Recognized {} chars", text.chars().count());

        let candidate = self.extractor.extract(&text);
        match self.matcher.match_candidate(&candidate).await {
            Ok(Some(scored)) => Ok(Detection::Matched { scored, text }),
            Ok(None) => Ok(Detection::NoMatch),
            Err(Error::MissingIdentity) => Ok(Detection::NoIdentity),
            Err(e) => Err(e),
        }
    }

    /// Feed a detection to the tracker and fan out on a transition.
    /// Once the tracker has moved the fan-out must run to completion.
    pub async fn commit(&mut self, detection: Detection) -> CycleOutcome {
        let (scored, text) = match detection {
            Detection::NoIdentity => return CycleOutcome::NoIdentity,
            Detection::NoMatch => {
                self.tracker.observe(None);
                return CycleOutcome::NoMatch;
            }
            Detection::Matched { scored, text } => (scored, text),
        };

        match self.tracker.observe(Some(&scored.patient)) {
            Transition::NoChange => CycleOutcome::Unchanged,
            Transition::Occurred { previous, current } => {
                tracing::info!(
                    "Active patient {} -> {}",
                    previous.map_or_else(|| "none".to_string(), |p| p.patient_id),
                    current.patient_id
                );

                let ctx = DispatchContext {
                    source: self.surface.label().to_string(),
                    app_name: self.surface.app_name(),
                    confidence: scored.confidence,
                    raw_text: self.keep_raw_text.then_some(text),
                    screen_region: self.surface.region(),
                };
                let report = self.dispatcher.dispatch(&scored.patient, ctx).await;
                CycleOutcome::Notified(report)
            }
        }
    }
}
