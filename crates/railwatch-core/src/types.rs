//! Domain types: tracked reservations, provider snapshots and persisted state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::KeyError;
use crate::fingerprint::StatusFingerprint;

/// Number of trailing identifier characters used as the storage key.
pub const CACHE_KEY_LEN: usize = 4;

/// Storage-safe key derived from an identifier's suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key from the last [`CACHE_KEY_LEN`] characters of `identifier`.
    pub fn derive(identifier: &str) -> Result<Self, KeyError> {
        let trimmed = identifier.trim();
        let chars: Vec<char> = trimmed.chars().collect();
        if chars.len() < CACHE_KEY_LEN {
            return Err(KeyError::TooShort {
                identifier: identifier.to_string(),
                min: CACHE_KEY_LEN,
            });
        }
        let suffix: String = chars[chars.len() - CACHE_KEY_LEN..].iter().collect();
        if !suffix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(KeyError::UnsafeSuffix {
                identifier: identifier.to_string(),
            });
        }
        Ok(Self(suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reservation being watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedEntity {
    pub identifier: String,
    pub cache_key: CacheKey,
}

impl TrackedEntity {
    pub fn new(identifier: &str) -> Result<Self, KeyError> {
        let cache_key = CacheKey::derive(identifier)?;
        Ok(Self {
            identifier: identifier.trim().to_string(),
            cache_key,
        })
    }
}

/// One passenger line of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassengerStatus {
    pub number: u32,
    pub booking_status: String,
    pub current_status: String,
    pub coach: String,
    pub berth: u32,
}

/// The provider's view of one reservation at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub pnr: String,
    pub train_no: String,
    pub train_name: String,
    /// Date of journey as the provider formats it.
    pub doj: String,
    pub from: String,
    pub to: String,
    pub class: String,
    pub chart_prepared: bool,
    pub cache_time: String,
    pub passengers: Vec<PassengerStatus>,
}

impl StatusSnapshot {
    pub fn fingerprint(&self) -> StatusFingerprint {
        StatusFingerprint::from_passengers(&self.passengers)
    }
}

/// Last-known state for one CacheKey.
///
/// The default value is the empty state of an entity seen for the first time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Rendered fingerprint text.
    pub fingerprint: String,
    pub cache_time: String,
    pub checked_at: String,
}

impl PersistedState {
    pub fn is_empty(&self) -> bool {
        self.fingerprint.is_empty() && self.cache_time.is_empty() && self.checked_at.is_empty()
    }
}

/// Where an entity's notifications go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTarget {
    pub uri: String,
    pub recipients: Vec<String>,
}

/// Plain-text notification body, sent verbatim to every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage(String);

impl NotificationMessage {
    pub fn render(snapshot: &StatusSnapshot, fingerprint: &StatusFingerprint) -> Self {
        Self(format!(
            "TrainName: {} Status: {}",
            snapshot.train_name,
            fingerprint.render()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NotificationMessage {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for NotificationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_uses_last_four() {
        let key = CacheKey::derive("8524301234").unwrap();
        assert_eq!(key.as_str(), "1234");
    }

    #[test]
    fn test_cache_key_trims_whitespace() {
        let key = CacheKey::derive(" PNR1234 ").unwrap();
        assert_eq!(key.as_str(), "1234");
    }

    #[test]
    fn test_cache_key_too_short() {
        let err = CacheKey::derive("123").unwrap_err();
        assert_eq!(
            err,
            KeyError::TooShort {
                identifier: "123".into(),
                min: 4
            }
        );
    }

    #[test]
    fn test_cache_key_rejects_path_chars() {
        assert!(matches!(
            CacheKey::derive("PNR/../1"),
            Err(KeyError::UnsafeSuffix { .. })
        ));
    }

    #[test]
    fn test_message_render() {
        let snapshot = StatusSnapshot {
            train_name: "RAJDHANI EXP".into(),
            passengers: vec![PassengerStatus {
                number: 1,
                booking_status: "WL 5".into(),
                current_status: "CNF".into(),
                coach: "B1".into(),
                berth: 12,
            }],
            ..Default::default()
        };
        let msg = NotificationMessage::render(&snapshot, &snapshot.fingerprint());
        assert_eq!(
            msg.as_str(),
            "TrainName: RAJDHANI EXP Status: #1->Current: CNF Berth: 12 Coach: B1"
        );
    }

    #[test]
    fn test_default_state_is_empty() {
        assert!(PersistedState::default().is_empty());
    }
}
