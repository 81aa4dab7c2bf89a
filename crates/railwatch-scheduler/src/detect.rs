//! Change detection — decides whether a fresh snapshot is worth a notification.

use railwatch_core::config::DetectionMode;
use railwatch_core::fingerprint::StatusFingerprint;
use railwatch_core::types::{PersistedState, StatusSnapshot};

/// Compares a fetched snapshot with the last persisted state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector {
    mode: DetectionMode,
}

impl ChangeDetector {
    pub fn new(mode: DetectionMode) -> Self {
        Self { mode }
    }

    /// True when `current` carries information `previous` does not.
    ///
    /// A first-seen entity (empty previous fingerprint) always notifies as
    /// soon as the current fingerprint is non-empty.
    pub fn should_notify(&self, previous: &PersistedState, current: &StatusSnapshot) -> bool {
        let fingerprint = current.fingerprint();
        if previous.fingerprint.is_empty() {
            return !fingerprint.is_empty();
        }
        match self.mode {
            DetectionMode::Containment => !previous.fingerprint.contains(&fingerprint.render()),
            DetectionMode::Strict => match StatusFingerprint::parse(&previous.fingerprint) {
                Some(prev) => prev != fingerprint,
                None => {
                    tracing::debug!("Stored fingerprint is not parseable, treating as changed");
                    true
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use railwatch_core::types::PassengerStatus;

    fn snapshot(passengers: &[(u32, &str, &str, u32)]) -> StatusSnapshot {
        StatusSnapshot {
            train_name: "MUMBAI RAJDHANI".into(),
            passengers: passengers
                .iter()
                .map(|&(number, current, coach, berth)| PassengerStatus {
                    number,
                    booking_status: "WL 12".into(),
                    current_status: current.into(),
                    coach: coach.into(),
                    berth,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn state(fingerprint: &str) -> PersistedState {
        PersistedState {
            fingerprint: fingerprint.into(),
            ..Default::default()
        }
    }

    const BOTH: [DetectionMode; 2] = [DetectionMode::Containment, DetectionMode::Strict];

    #[test]
    fn test_new_entity_notifies() {
        let current = snapshot(&[(1, "CNF", "B1", 12)]);
        for mode in BOTH {
            assert!(ChangeDetector::new(mode).should_notify(&PersistedState::default(), &current));
        }
    }

    #[test]
    fn test_new_entity_without_passengers_stays_quiet() {
        let current = snapshot(&[]);
        for mode in BOTH {
            assert!(!ChangeDetector::new(mode).should_notify(&PersistedState::default(), &current));
        }
    }

    #[test]
    fn test_identical_does_not_notify() {
        let current = snapshot(&[(1, "CNF", "B1", 12), (2, "CNF", "B1", 13)]);
        let previous = state(&current.fingerprint().render());
        for mode in BOTH {
            assert!(!ChangeDetector::new(mode).should_notify(&previous, &current));
        }
    }

    #[test]
    fn test_changed_berth_notifies() {
        let previous = state("#1->Current: CNF Berth: 12 Coach: B1");
        let current = snapshot(&[(1, "CNF", "B1", 14)]);
        for mode in BOTH {
            assert!(ChangeDetector::new(mode).should_notify(&previous, &current));
        }
    }

    #[test]
    fn test_containment_tolerates_superset() {
        // Previous holds an extra passenger; the current rendering is a substring.
        let previous = state("#1->Current: CNF Berth: 12 Coach: B1#2->Current: CNF Berth: 13 Coach: B1");
        let current = snapshot(&[(1, "CNF", "B1", 12)]);
        assert!(!ChangeDetector::new(DetectionMode::Containment).should_notify(&previous, &current));
        assert!(ChangeDetector::new(DetectionMode::Strict).should_notify(&previous, &current));
    }

    #[test]
    fn test_strict_unparseable_previous_notifies() {
        let previous = state("legacy free text #1->Current: CNF Berth: 12 Coach: B1");
        let current = snapshot(&[(1, "CNF", "B1", 12)]);
        assert!(ChangeDetector::new(DetectionMode::Strict).should_notify(&previous, &current));
        assert!(!ChangeDetector::new(DetectionMode::Containment).should_notify(&previous, &current));
    }

    #[test]
    fn test_order_matters() {
        let previous = state("#2->Current: CNF Berth: 13 Coach: B1#1->Current: CNF Berth: 12 Coach: B1");
        let current = snapshot(&[(1, "CNF", "B1", 12), (2, "CNF", "B1", 13)]);
        for mode in BOTH {
            assert!(ChangeDetector::new(mode).should_notify(&previous, &current));
        }
    }
}
