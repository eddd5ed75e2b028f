use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{ModelError, ModelResult};

/// Allowed clock skew for ordinary messages, in seconds.
pub const MESSAGE_MAX_SKEW_SECS: i64 = 30_000;
/// Allowed clock skew for status events, in seconds.
pub const STATUS_MAX_SKEW_SECS: i64 = 60_000;

/// Fields shared by every inbound message variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBase {
    pub message_id: String,
    /// Unix seconds as reported by the platform.
    pub timestamp: i64,
    /// Id of the message this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
}

impl MessageBase {
    pub fn new(message_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            message_id: message_id.into(),
            timestamp,
            context_id: None,
        }
    }

    /// Checks the timestamp against the current clock.
    ///
    /// Returns `Ok(true)` when the timestamp is too far in the future and `strict` is off;
    /// with `strict` on the same condition is a [`ModelError::Validation`].
    pub fn valid_time_interval(&self, is_status: bool, strict: bool) -> ModelResult<bool> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.valid_time_interval_at(now, is_status, strict)
    }

    /// Same as [`valid_time_interval`](Self::valid_time_interval) against an explicit clock.
    ///
    /// ```
    /// use chatwire_core::MessageBase;
    ///
    /// let base = MessageBase::new("wamid.1", 1_000 + 30_001);
    /// assert_eq!(base.valid_time_interval_at(1_000, false, false).unwrap(), true);
    /// assert!(base.valid_time_interval_at(1_000, false, true).is_err());
    /// assert_eq!(base.valid_time_interval_at(1_000, true, true).unwrap(), false);
    /// ```
    pub fn valid_time_interval_at(
        &self,
        now: i64,
        is_status: bool,
        strict: bool,
    ) -> ModelResult<bool> {
        let max_skew = if is_status {
            STATUS_MAX_SKEW_SECS
        } else {
            MESSAGE_MAX_SKEW_SECS
        };
        let too_far = self.timestamp > now.saturating_add(max_skew);
        if too_far && strict {
            return Err(ModelError::validation(format!(
                "timestamp {} is more than {max_skew}s ahead of {now}",
                self.timestamp
            )));
        }
        Ok(too_far)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    #[serde(flatten)]
    pub base: MessageBase,
    pub text: String,
}

/// A button or list selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveMessage {
    #[serde(flatten)]
    pub base: MessageBase,
    /// Id of the selected option.
    pub payload: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Delivery status change or reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(flatten)]
    pub base: MessageBase,
    pub status: String,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMessage {
    #[serde(flatten)]
    pub base: MessageBase,
    pub media_type: String,
    pub mime_type: String,
    pub sha256: String,
    pub media_id: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub voice: Option<bool>,
    #[serde(default)]
    pub origin_name: Option<String>,
}

/// Inbound message, discriminated by the platform-reported type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundMessage {
    Text(TextMessage),
    Interactive(InteractiveMessage),
    Event(EventMessage),
    Media(MediaMessage),
}

impl InboundMessage {
    pub fn base(&self) -> &MessageBase {
        match self {
            Self::Text(m) => &m.base,
            Self::Interactive(m) => &m.base,
            Self::Event(m) => &m.base,
            Self::Media(m) => &m.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut MessageBase {
        match self {
            Self::Text(m) => &mut m.base,
            Self::Interactive(m) => &mut m.base,
            Self::Event(m) => &mut m.base,
            Self::Media(m) => &mut m.base,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.base().message_id
    }

    pub fn context_id(&self) -> Option<&str> {
        self.base().context_id.as_deref()
    }

    pub fn set_context_id(&mut self, context_id: Option<String>) {
        self.base_mut().context_id = context_id;
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Interactive(_) => "interactive",
            Self::Event(_) => "event",
            Self::Media(_) => "media",
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, Self::Event(_))
    }

    /// Skew check using the status allowance for events and the message allowance otherwise.
    pub fn valid_time_interval(&self, strict: bool) -> ModelResult<bool> {
        self.base().valid_time_interval(self.is_status(), strict)
    }
}

impl From<TextMessage> for InboundMessage {
    fn from(value: TextMessage) -> Self {
        Self::Text(value)
    }
}

impl From<InteractiveMessage> for InboundMessage {
    fn from(value: InteractiveMessage) -> Self {
        Self::Interactive(value)
    }
}

impl From<EventMessage> for InboundMessage {
    fn from(value: EventMessage) -> Self {
        Self::Event(value)
    }
}

impl From<MediaMessage> for InboundMessage {
    fn from(value: MediaMessage) -> Self {
        Self::Media(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skew_rejected_only_in_strict_mode() {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let message = InboundMessage::Text(TextMessage {
            base: MessageBase::new("wamid.future", now + 40_000),
            text: "from the future".into(),
        });
        assert!(matches!(
            message.valid_time_interval(true),
            Err(ModelError::Validation { .. })
        ));
        assert!(message.valid_time_interval(false).unwrap());
    }

    #[test]
    fn status_events_get_a_wider_window() {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let event = InboundMessage::Event(EventMessage {
            base: MessageBase::new("wamid.status", now + 40_000),
            status: "delivered".into(),
            emoji: None,
        });
        assert!(!event.valid_time_interval(true).unwrap());
    }

    #[test]
    fn serializes_with_kind_tag_and_flat_base() {
        let mut message = InboundMessage::Interactive(InteractiveMessage {
            base: MessageBase::new("wamid.2", 1_700_000_000),
            payload: "opt-1".into(),
            title: Some("Yes".into()),
        });
        message.set_context_id(Some("wamid.1".into()));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "kind": "interactive",
                "message_id": "wamid.2",
                "timestamp": 1_700_000_000,
                "context_id": "wamid.1",
                "payload": "opt-1",
                "title": "Yes"
            })
        );
    }
}
