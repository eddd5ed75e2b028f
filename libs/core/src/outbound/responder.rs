use serde::Serialize;
use serde_json::{Value, json};

use super::encoder::{OutboundEncoder, STANDARD_MESSAGE_KEY, UUID_LIST_KEY};
use super::models::{MediaMessage, Message, ReplyMessage, SectionsMessage};
use crate::error::{ModelError, ModelResult};
use crate::params::{Parameters, resolve};
use crate::sink::{ErrorRecord, ErrorSink, error_context};
use crate::transport::Transport;
use chatwire_telemetry::{TelemetryLabels, record_counter, telemetry_enabled};

const ENCODE_SPAN_NAME: &str = "translate.run";
const TRANSLATED_COUNTER: &str = "messages_translated";
const SENT_COUNTER: &str = "payloads_sent";

/// What happened to one payload during [`Responder::send_messages`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendOutcome {
    /// Position in the payload list.
    pub index: usize,
    /// Platform message id, when the response carried one.
    pub mid: Option<String>,
    pub response: Option<Value>,
    pub standard_message: Option<Value>,
    pub uuid_list: Vec<String>,
    pub error: Option<String>,
}

/// Outbound session for one recipient: renders messages, accumulates envelopes, then sends them.
///
/// Every `message_*` call is one isolation unit: a failure is recorded and the call returns
/// `Ok(())`, unless the session runs in debug mode.
pub struct Responder<E> {
    encoder: E,
    sender_uid: String,
    parameters: Parameters,
    message_list: Vec<Value>,
    sink: ErrorSink,
}

impl<E> Responder<E>
where
    E: OutboundEncoder,
{
    pub fn new(
        encoder: E,
        sender_uid: impl Into<String>,
        parameters: Parameters,
        debug: bool,
    ) -> Self {
        Self {
            encoder,
            sender_uid: sender_uid.into(),
            parameters,
            message_list: Vec::new(),
            sink: ErrorSink::new(debug),
        }
    }

    pub fn sender_uid(&self) -> &str {
        &self.sender_uid
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Accumulated envelopes, in append order.
    pub fn message_list(&self) -> &[Value] {
        &self.message_list
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        self.sink.errors()
    }

    pub fn into_errors(self) -> Vec<ErrorRecord> {
        self.sink.into_errors()
    }

    fn rep_text(&self, text: &str) -> String {
        resolve(&self.parameters, text)
    }

    pub fn message_text(&mut self, text: &str) -> ModelResult<()> {
        let text = self.rep_text(text);
        let result = self.encode("text", |encoder, to| {
            let data = encoder.text_to_data(to, &text)?;
            Ok((data, serde_json::to_value(Message::new(text.as_str()))?))
        });
        self.push_or_record("message_text", result)
    }

    /// Queues a media send; `url_media` and `media_id` are alternatives, one is required.
    pub fn message_multimedia(
        &mut self,
        media_type: &str,
        url_media: &str,
        media_id: &str,
        caption: &str,
    ) -> ModelResult<()> {
        let media = MediaMessage {
            caption: self.rep_text(caption),
            id: media_id.to_string(),
            link: url_media.to_string(),
        };
        let result = self.encode(media_type, |encoder, to| {
            let data = encoder.multimedia_to_data(to, media_type, &media)?;
            Ok((data, serde_json::to_value(&media)?))
        });
        self.push_or_record("message_multimedia", result)
    }

    pub fn message_few_buttons(&mut self, mut message: ReplyMessage) -> ModelResult<()> {
        message.replace_text(&self.parameters);
        let result = self.encode("few_buttons", |encoder, to| {
            let data = encoder.few_buttons_to_data(to, &message)?;
            Ok((data, serde_json::to_value(&message)?))
        });
        self.push_or_record("message_few_buttons", result)
    }

    pub fn message_many_buttons(&mut self, mut message: ReplyMessage) -> ModelResult<()> {
        message.replace_text(&self.parameters);
        let result = self.encode("many_buttons", |encoder, to| {
            let data = encoder.many_buttons_to_data(to, &message)?;
            Ok((data, serde_json::to_value(&message)?))
        });
        self.push_or_record("message_many_buttons", result)
    }

    pub fn message_sections(&mut self, mut message: SectionsMessage) -> ModelResult<()> {
        message.replace_text(&self.parameters);
        let result = self.encode("sections", |encoder, to| {
            let data = encoder.sections_to_data(to, &message)?;
            Ok((data, serde_json::to_value(&message)?))
        });
        self.push_or_record("message_sections", result)
    }

    fn encode<F>(&self, kind: &str, build: F) -> ModelResult<Value>
    where
        F: FnOnce(&E, &str) -> ModelResult<(Value, Value)>,
    {
        let platform = self.encoder.platform();
        let span = tracing::info_span!(
            ENCODE_SPAN_NAME,
            to_platform = %platform,
            kind = %kind,
            to = %self.sender_uid
        );
        let _guard = span.enter();

        let (mut data, standard) = build(&self.encoder, &self.sender_uid)?;
        match data.as_object_mut() {
            Some(map) => {
                map.insert(STANDARD_MESSAGE_KEY.into(), standard);
            }
            None => {
                return Err(ModelError::encode(format!(
                    "{platform} encoder produced a non-object envelope"
                )));
            }
        }
        if telemetry_enabled() {
            let mut labels = TelemetryLabels::new(platform);
            labels.extra.push(("kind".into(), kind.to_string()));
            record_counter(TRANSLATED_COUNTER, 1, &labels);
        }
        Ok(data)
    }

    fn push_or_record(&mut self, method: &str, result: ModelResult<Value>) -> ModelResult<()> {
        let to = self.sender_uid.clone();
        let captured = self
            .sink
            .capture(result, || error_context(json!({"method": method, "to": to})))?;
        if let Some(data) = captured {
            self.message_list.push(data);
        }
        Ok(())
    }

    /// Sends every accumulated envelope in append order, once each.
    ///
    /// A transport failure is recorded and the remaining payloads are still sent; in debug mode
    /// the first failure is returned instead.
    pub async fn send_messages<T>(&mut self, transport: &T) -> ModelResult<Vec<SendOutcome>>
    where
        T: Transport + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(self.message_list.len());
        for (index, payload) in self.message_list.iter().enumerate() {
            let wire = self.encoder.wire_body(payload);
            let standard_message = payload.get(STANDARD_MESSAGE_KEY).cloned();
            let uuid_list = payload
                .get(UUID_LIST_KEY)
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let mut outcome = SendOutcome {
                index,
                mid: None,
                response: None,
                standard_message,
                uuid_list,
                error: None,
            };
            match transport.send(&wire).await {
                Ok(body) => {
                    outcome.mid = self.encoder.get_mid(Some(&body));
                    outcome.response = Some(body);
                    tracing::debug!(index, mid = ?outcome.mid, "payload sent");
                }
                Err(err) => {
                    outcome.error = Some(err.to_string());
                    self.sink.record(
                        error_context(json!({"method": "send_message", "message": wire})),
                        err.into(),
                    )?;
                }
            }
            let mut labels = TelemetryLabels::new(self.encoder.platform());
            labels.extra.push((
                "outcome".into(),
                if outcome.error.is_some() { "error" } else { "ok" }.to_string(),
            ));
            record_counter(SENT_COUNTER, 1, &labels);
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::outbound::models::Button;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoEncoder;

    impl OutboundEncoder for EchoEncoder {
        fn platform(&self) -> &'static str {
            "echo"
        }

        fn text_to_data(&self, recipient: &str, text: &str) -> ModelResult<Value> {
            if text.is_empty() {
                return Err(ModelError::encode("empty text"));
            }
            Ok(json!({"to": recipient, "type": "text", "text": text}))
        }

        fn multimedia_to_data(
            &self,
            recipient: &str,
            media_type: &str,
            media: &MediaMessage,
        ) -> ModelResult<Value> {
            Ok(json!({"to": recipient, "type": media_type, "link": media.link}))
        }

        fn few_buttons_to_data(
            &self,
            recipient: &str,
            message: &ReplyMessage,
        ) -> ModelResult<Value> {
            let ids: Vec<_> = message.buttons.iter().map(|b| b.payload.clone()).collect();
            Ok(json!({"to": recipient, "type": "buttons", "uuid_list": ids}))
        }

        fn many_buttons_to_data(
            &self,
            recipient: &str,
            message: &ReplyMessage,
        ) -> ModelResult<Value> {
            self.few_buttons_to_data(recipient, message)
        }

        fn sections_to_data(
            &self,
            recipient: &str,
            _message: &SectionsMessage,
        ) -> ModelResult<Value> {
            Ok(json!({"to": recipient, "type": "sections"}))
        }

        fn get_mid(&self, body: Option<&Value>) -> Option<String> {
            body?.get("id")?.as_str().map(str::to_string)
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Value>>,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, payload: &Value) -> Result<Value, TransportError> {
            let mut sent = self.sent.lock().unwrap();
            let idx = sent.len();
            sent.push(payload.clone());
            if self.fail_on == Some(idx) {
                return Err(TransportError::permanent("echo_failed", "rejected"));
            }
            Ok(json!({"id": format!("mid-{idx}")}))
        }
    }

    fn responder(debug: bool) -> Responder<EchoEncoder> {
        let params = json!({"name": "Ana"}).as_object().cloned().unwrap();
        Responder::new(EchoEncoder, "5215550001", params, debug)
    }

    #[test]
    fn substitutes_and_attaches_standard_message() {
        let mut responder = responder(false);
        responder.message_text("Hola   {{name}}").unwrap();
        let payload = &responder.message_list()[0];
        assert_eq!(payload["text"], "Hola Ana");
        assert_eq!(payload[STANDARD_MESSAGE_KEY], json!({"body": "Hola Ana"}));
    }

    #[test]
    fn encode_failure_is_recorded_per_call() {
        let mut responder = responder(false);
        responder.message_text("{{missing}}").unwrap();
        responder.message_text("ok").unwrap();
        assert_eq!(responder.message_list().len(), 1);
        assert_eq!(responder.errors().len(), 1);
        assert_eq!(responder.errors()[0].context["method"], "message_text");
        assert_eq!(responder.errors()[0].context["to"], "5215550001");
    }

    #[test]
    fn encode_failure_propagates_in_debug_mode() {
        let mut responder = responder(true);
        assert!(matches!(
            responder.message_text(""),
            Err(ModelError::Encode { .. })
        ));
    }

    #[tokio::test]
    async fn transport_failure_does_not_stop_remaining_sends() {
        let mut responder = responder(false);
        responder.message_text("one").unwrap();
        responder
            .message_few_buttons(ReplyMessage::new("two", vec![Button::new("p1", "P1")]))
            .unwrap();
        responder.message_text("three").unwrap();

        let transport = RecordingTransport {
            fail_on: Some(1),
            ..Default::default()
        };
        let outcomes = responder.send_messages(&transport).await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0]["text"], "one");
        assert_eq!(sent[2]["text"], "three");
        assert!(sent.iter().all(|p| p.get(STANDARD_MESSAGE_KEY).is_none()));
        assert!(sent[1].get(UUID_LIST_KEY).is_none());

        assert_eq!(outcomes[0].mid.as_deref(), Some("mid-0"));
        assert_eq!(outcomes[1].mid, None);
        assert_eq!(outcomes[1].uuid_list, vec!["p1".to_string()]);
        assert!(outcomes[1].error.is_some());
        assert_eq!(outcomes[2].mid.as_deref(), Some("mid-2"));
        assert_eq!(responder.errors().len(), 1);
        assert_eq!(responder.errors()[0].context["method"], "send_message");
    }

    #[tokio::test]
    async fn transport_failure_propagates_in_debug_mode() {
        let mut responder = responder(true);
        responder.message_text("one").unwrap();
        responder.message_text("two").unwrap();
        let transport = RecordingTransport {
            fail_on: Some(0),
            ..Default::default()
        };
        let err = responder.send_messages(&transport).await.unwrap_err();
        assert!(matches!(err, ModelError::Transport(_)));
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }
}
