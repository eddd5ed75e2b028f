use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// Performs the platform call for one outbound envelope.
///
/// Implementations return the decoded response body; the encoder extracts the platform
/// message id from it with [`OutboundEncoder::get_mid`](crate::OutboundEncoder::get_mid).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, payload: &Value) -> Result<Value, TransportError>;
}

#[async_trait]
impl<T> Transport for std::sync::Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, payload: &Value) -> Result<Value, TransportError> {
        (**self).send(payload).await
    }
}
