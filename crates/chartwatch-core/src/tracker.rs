use chartwatch_types::{ActiveContext, PatientMatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The active identity changed, a notification is due
    Occurred {
        previous: Option<ActiveContext>,
        current: ActiveContext,
    },
    NoChange,
}

impl Transition {
    pub fn occurred(&self) -> bool {
        matches!(self, Self::Occurred { .. })
    }
}

/// Holds the one active patient and decides when it changes.
///
/// `Empty -> Active(id)` and `Active(id) -> Active(id')` are transitions;
/// the same id again or no match at all leave the state alone.
#[derive(Debug, Default)]
pub struct ContextTracker {
    active: Option<ActiveContext>,
}

impl ContextTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, matched: Option<&PatientMatch>) -> Transition {
        let Some(patient) = matched else {
            return Transition::NoChange;
        };

        if self
            .active
            .as_ref()
            .is_some_and(|active| active.patient_id == patient.id)
        {
            return Transition::NoChange;
        }

        let current = ActiveContext::from(patient);
        let previous = self.active.replace(current.clone());
        Transition::Occurred { previous, current }
    }

    pub fn active(&self) -> Option<&ActiveContext> {
        self.active.as_ref()
    }

    /// Forget the active patient, used when monitoring stops
    pub fn reset(&mut self) {
        self.active = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(id: &str) -> PatientMatch {
        PatientMatch {
            id: id.to_string(),
            display_name: format!("Patient {id}"),
            mrn: None,
        }
    }

    #[test]
    fn test_first_match_transitions() {
        let mut tracker = ContextTracker::new();
        let transition = tracker.observe(Some(&patient("a")));
        assert_eq!(
            transition,
            Transition::Occurred {
                previous: None,
                current: ActiveContext::from(&patient("a")),
            }
        );
        assert_eq!(tracker.active().unwrap().patient_id, "a");
    }

    #[test]
    fn test_same_identity_is_deduplicated() {
        let mut tracker = ContextTracker::new();
        let notified = (0..10)
            .filter(|_| tracker.observe(Some(&patient("a"))).occurred())
            .count();
        assert_eq!(notified, 1);
    }

    #[test]
    fn test_transition_sequence() {
        let mut tracker = ContextTracker::new();
        let positions: Vec<usize> = ["A", "A", "B", "B", "A"]
            .iter()
            .enumerate()
            .filter(|(_, id)| tracker.observe(Some(&patient(id))).occurred())
            .map(|(i, _)| i + 1)
            .collect();
        assert_eq!(positions, vec![1, 3, 5]);
    }

    #[test]
    fn test_no_match_keeps_state() {
        let mut tracker = ContextTracker::new();
        assert_eq!(tracker.observe(None), Transition::NoChange);
        assert!(tracker.active().is_none());

        tracker.observe(Some(&patient("a")));
        assert_eq!(tracker.observe(None), Transition::NoChange);
        assert_eq!(tracker.active().unwrap().patient_id, "a");
    }

    #[test]
    fn test_change_reports_previous() {
        let mut tracker = ContextTracker::new();
        tracker.observe(Some(&patient("a")));
        match tracker.observe(Some(&patient("b"))) {
            Transition::Occurred { previous, current } => {
                assert_eq!(previous.unwrap().patient_id, "a");
                assert_eq!(current.patient_id, "b");
            }
            Transition::NoChange => panic!("expected a transition"),
        }
    }

    #[test]
    fn test_reset_allows_renotify() {
        let mut tracker = ContextTracker::new();
        tracker.observe(Some(&patient("a")));
        tracker.reset();
        assert!(tracker.active().is_none());
        assert!(tracker.observe(Some(&patient("a"))).occurred());
    }
}
