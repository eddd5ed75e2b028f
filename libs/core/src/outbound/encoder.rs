use serde_json::Value;

use super::models::{MediaMessage, ReplyMessage, SectionsMessage};
use crate::error::ModelResult;

/// Key holding the platform-agnostic form of what was sent, for caller-side auditing.
pub const STANDARD_MESSAGE_KEY: &str = "_standard_message";
/// Key holding the option payload ids included in an interactive envelope.
pub const UUID_LIST_KEY: &str = "uuid_list";

/// Per-platform mapping from outbound message kinds to wire envelopes.
///
/// Builders receive messages whose text has already been substituted and must not mutate them.
/// Constraint violations are reported as [`ModelError::Encode`](crate::ModelError::Encode).
pub trait OutboundEncoder {
    /// Lowercase platform identifier used in spans and metrics.
    fn platform(&self) -> &'static str;

    /// Builds a plain text envelope from the already-substituted `text`.
    ///
    /// Implementations may reject a body that is blank after substitution; the WhatsApp encoder
    /// does, so a message whose placeholders all resolve to nothing is recorded as an
    /// [`ModelError::Encode`](crate::ModelError::Encode) instead of being sent.
    fn text_to_data(&self, recipient: &str, text: &str) -> ModelResult<Value>;

    fn multimedia_to_data(
        &self,
        recipient: &str,
        media_type: &str,
        media: &MediaMessage,
    ) -> ModelResult<Value>;

    fn few_buttons_to_data(&self, recipient: &str, message: &ReplyMessage) -> ModelResult<Value>;

    fn many_buttons_to_data(&self, recipient: &str, message: &ReplyMessage)
    -> ModelResult<Value>;

    fn sections_to_data(&self, recipient: &str, message: &SectionsMessage) -> ModelResult<Value>;

    /// Extracts the platform-assigned message id from a send response.
    fn get_mid(&self, body: Option<&Value>) -> Option<String>;

    /// Copy of `payload` without the audit-only keys, ready for the transport.
    fn wire_body(&self, payload: &Value) -> Value {
        let mut wire = payload.clone();
        if let Some(map) = wire.as_object_mut() {
            map.remove(STANDARD_MESSAGE_KEY);
            map.remove(UUID_LIST_KEY);
        }
        wire
    }
}
