//! Notification routing — positional lookup of where an entity's alerts go.
//! Lightweight: no registry, no lookups by name. Index in the batch selects
//! the queue suffix and recipient slot.

use railwatch_core::config::WatchConfig;
use railwatch_core::error::RoutingError;
use railwatch_core::types::RoutingTarget;

/// Maps batch positions to routing targets.
#[derive(Debug, Clone)]
pub struct NotifyRouter {
    base_uri: String,
    queues: Vec<String>,
    recipients: Vec<String>,
}

impl NotifyRouter {
    pub fn new(base_uri: &str, queues: Vec<String>, recipients: Vec<String>) -> Self {
        Self {
            base_uri: base_uri.to_string(),
            queues,
            recipients,
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(
            &config.notify_base_uri,
            config.queues.clone(),
            config.recipients.clone(),
        )
    }

    /// Resolve the target for the entity at `index` of a batch of `batch_size`.
    pub fn resolve(&self, index: usize, batch_size: usize) -> Result<RoutingTarget, RoutingError> {
        if index >= batch_size {
            return Err(RoutingError::IndexOutOfBatch { index, batch_size });
        }
        let queue = self.queues.get(index).ok_or(RoutingError::MissingQueue {
            index,
            configured: self.queues.len(),
        })?;

        let recipients = self
            .recipients
            .get(index)
            .map(|slot| {
                slot.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(RoutingTarget {
            uri: format!("{}{}", self.base_uri, queue),
            recipients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> NotifyRouter {
        NotifyRouter::new(
            "https://ntfy.example.com/",
            vec!["pnr-a".into(), "pnr-b".into(), "pnr-c".into()],
            vec!["a@example.com".into(), "".into()],
        )
    }

    #[test]
    fn test_resolve_first() {
        let target = router().resolve(0, 3).unwrap();
        assert_eq!(target.uri, "https://ntfy.example.com/pnr-a");
        assert_eq!(target.recipients, vec!["a@example.com"]);
    }

    #[test]
    fn test_blank_and_missing_recipient_slots() {
        assert!(router().resolve(1, 3).unwrap().recipients.is_empty());
        let target = router().resolve(2, 3).unwrap();
        assert_eq!(target.uri, "https://ntfy.example.com/pnr-c");
        assert!(target.recipients.is_empty());
    }

    #[test]
    fn test_multiple_recipients_in_slot() {
        let router = NotifyRouter::new(
            "https://ntfy.example.com/",
            vec!["pnr-a".into()],
            vec!["a@example.com; b@example.com".into()],
        );
        assert_eq!(
            router.resolve(0, 1).unwrap().recipients,
            vec!["a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn test_missing_queue() {
        assert_eq!(
            router().resolve(3, 4),
            Err(RoutingError::MissingQueue {
                index: 3,
                configured: 3
            })
        );
    }

    #[test]
    fn test_index_outside_batch() {
        assert_eq!(
            router().resolve(2, 2),
            Err(RoutingError::IndexOutOfBatch {
                index: 2,
                batch_size: 2
            })
        );
    }
}
