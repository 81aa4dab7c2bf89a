//! Status fingerprint — the comparable summary of a reservation's passengers.
//!
//! Rendered form, one segment per passenger, no separator:
//! `#1->Current: CNF Berth: 12 Coach: B1#2->Current: RAC 4 Berth: 0 Coach: `
//!
//! The rendered text is what gets persisted, so [`StatusFingerprint::parse`]
//! must accept everything [`StatusFingerprint::render`] produces.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::types::PassengerStatus;

static SEGMENT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\d+->Current: ").expect("segment regex is valid"));

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(\d+)->Current: (.*) Berth: (\d+) Coach: (.*)$").expect("segment regex is valid")
});

/// One passenger's comparable fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    pub number: u32,
    pub current_status: String,
    pub berth: u32,
    pub coach: String,
}

impl FingerprintEntry {
    fn render(&self) -> String {
        format!(
            "#{}->Current: {} Berth: {} Coach: {}",
            self.number, self.current_status, self.berth, self.coach
        )
    }
}

/// Ordered passenger summary of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFingerprint {
    entries: Vec<FingerprintEntry>,
}

impl StatusFingerprint {
    pub fn from_passengers(passengers: &[PassengerStatus]) -> Self {
        Self {
            entries: passengers
                .iter()
                .map(|p| FingerprintEntry {
                    number: p.number,
                    current_status: p.current_status.clone(),
                    berth: p.berth,
                    coach: p.coach.clone(),
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[FingerprintEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical text form.
    pub fn render(&self) -> String {
        self.entries.iter().map(FingerprintEntry::render).collect()
    }

    /// Parse rendered text back into entries.
    ///
    /// Returns `None` when the text has anything that is not a well-formed
    /// segment, including leading garbage before the first segment.
    pub fn parse(text: &str) -> Option<Self> {
        let starts: Vec<usize> = SEGMENT_START.find_iter(text).map(|m| m.start()).collect();
        if starts.is_empty() {
            return text.is_empty().then(Self::default);
        }
        if starts[0] != 0 {
            return None;
        }

        let mut entries = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            let caps = SEGMENT.captures(&text[start..end])?;
            entries.push(FingerprintEntry {
                number: caps[1].parse().ok()?,
                current_status: caps[2].to_string(),
                berth: caps[3].parse().ok()?,
                coach: caps[4].to_string(),
            });
        }
        Some(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passenger(number: u32, current: &str, coach: &str, berth: u32) -> PassengerStatus {
        PassengerStatus {
            number,
            booking_status: "WL 10".into(),
            current_status: current.into(),
            coach: coach.into(),
            berth,
        }
    }

    #[test]
    fn test_render_single() {
        let fp = StatusFingerprint::from_passengers(&[passenger(1, "CNF", "B1", 12)]);
        assert_eq!(fp.render(), "#1->Current: CNF Berth: 12 Coach: B1");
    }

    #[test]
    fn test_render_preserves_order() {
        let fp = StatusFingerprint::from_passengers(&[
            passenger(2, "RAC 4", "", 0),
            passenger(1, "CNF", "B1", 12),
        ]);
        assert_eq!(
            fp.render(),
            "#2->Current: RAC 4 Berth: 0 Coach: #1->Current: CNF Berth: 12 Coach: B1"
        );
    }

    #[test]
    fn test_parse_rendered_multi() {
        let fp = StatusFingerprint::from_passengers(&[
            passenger(1, "CNF", "B1", 12),
            passenger(2, "RLWL 3", "", 0),
            passenger(3, "CNF", "S4", 33),
        ]);
        assert_eq!(StatusFingerprint::parse(&fp.render()), Some(fp));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(
            StatusFingerprint::parse(""),
            Some(StatusFingerprint::default())
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(StatusFingerprint::parse("hello").is_none());
        assert!(StatusFingerprint::parse("x#1->Current: CNF Berth: 1 Coach: A1").is_none());
        assert!(StatusFingerprint::parse("#1->Current: CNF Berth: ?? Coach: A1").is_none());
    }
}
