//! Notification dispatch — actually sends notifications to configured channels.
//! Supports: plain push (text/plain POST) and email-tagged push (Email + Priority headers).
//!
//! Every channel is attempted regardless of what happened on the others.

use async_trait::async_trait;
use railwatch_core::config::NotifyConfig;
use railwatch_core::error::DispatchError;
use railwatch_core::types::{NotificationMessage, RoutingTarget};
use std::time::Duration;

/// How many attempts a channel makes per target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// One attempt per target.
    Once,
    /// One attempt per recipient; none when the target has no recipients.
    PerRecipient,
}

/// A notification transport.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    fn name(&self) -> &str;

    fn fan_out(&self) -> FanOut;

    async fn send(
        &self,
        uri: &str,
        recipient: Option<&str>,
        message: &NotificationMessage,
    ) -> Result<(), DispatchError>;
}

/// Outcome of one channel attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome {
    pub channel: String,
    pub recipient: Option<String>,
    pub result: Result<(), DispatchError>,
}

/// Per-channel outcomes of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchResult {
    pub outcomes: Vec<ChannelOutcome>,
}

impl DispatchResult {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// At least one attempt was made and none failed.
    pub fn all_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &DispatchError> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().err())
    }
}

/// Sends one message through every configured channel.
pub struct Dispatcher {
    channels: Vec<Box<dyn NotifyChannel>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn NotifyChannel>>) -> Self {
        Self { channels }
    }

    /// Build the HTTP channels enabled in config.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let client = reqwest::Client::new();
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut channels: Vec<Box<dyn NotifyChannel>> = Vec::new();
        if config.push_enabled {
            channels.push(Box::new(PushChannel::new(client.clone(), timeout)));
        }
        if config.email_enabled {
            channels.push(Box::new(EmailChannel::new(client, timeout)));
        }
        if channels.is_empty() {
            tracing::warn!("⚠️ All notification channels are disabled");
        }
        Self::new(channels)
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn dispatch(
        &self,
        target: &RoutingTarget,
        message: &NotificationMessage,
    ) -> DispatchResult {
        let mut result = DispatchResult::default();
        for channel in &self.channels {
            let recipients: Vec<Option<&str>> = match channel.fan_out() {
                FanOut::Once => vec![None],
                FanOut::PerRecipient => target.recipients.iter().map(|r| Some(r.as_str())).collect(),
            };
            if recipients.is_empty() {
                tracing::debug!("No recipients for {} channel, skipping", channel.name());
            }
            for recipient in recipients {
                let outcome = channel.send(&target.uri, recipient, message).await;
                match &outcome {
                    Ok(()) => tracing::info!("✅ {} notification sent to {}", channel.name(), target.uri),
                    Err(e) => tracing::warn!("⚠️ {e}"),
                }
                result.outcomes.push(ChannelOutcome {
                    channel: channel.name().to_string(),
                    recipient: recipient.map(String::from),
                    result: outcome,
                });
            }
        }
        result
    }
}

/// Success is exactly HTTP 200, nothing else.
async fn post(
    channel: &str,
    req: reqwest::RequestBuilder,
) -> Result<(), DispatchError> {
    let resp = req.send().await.map_err(|e| DispatchError::Unreachable {
        channel: channel.to_string(),
        reason: e.to_string(),
    })?;
    if resp.status() == reqwest::StatusCode::OK {
        Ok(())
    } else {
        Err(DispatchError::Rejected {
            channel: channel.to_string(),
            status: resp.status().as_u16(),
        })
    }
}

/// Plain push: POST the message as `text/plain`, no extra headers.
pub struct PushChannel {
    client: reqwest::Client,
    timeout: Duration,
}

impl PushChannel {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl NotifyChannel for PushChannel {
    fn name(&self) -> &str {
        "push"
    }

    fn fan_out(&self) -> FanOut {
        FanOut::Once
    }

    async fn send(
        &self,
        uri: &str,
        _recipient: Option<&str>,
        message: &NotificationMessage,
    ) -> Result<(), DispatchError> {
        let req = self
            .client
            .post(uri)
            .header("Content-Type", "text/plain")
            .body(message.to_string())
            .timeout(self.timeout);
        post(self.name(), req).await
    }
}

/// Email-tagged push: the notification service forwards it to `Email`.
pub struct EmailChannel {
    client: reqwest::Client,
    timeout: Duration,
}

impl EmailChannel {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl NotifyChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    fn fan_out(&self) -> FanOut {
        FanOut::PerRecipient
    }

    async fn send(
        &self,
        uri: &str,
        recipient: Option<&str>,
        message: &NotificationMessage,
    ) -> Result<(), DispatchError> {
        let mut req = self
            .client
            .post(uri)
            .header("Priority", "high")
            .body(message.to_string())
            .timeout(self.timeout);
        if let Some(email) = recipient {
            req = req.header("Email", email);
        }
        post(self.name(), req).await
    }
}
