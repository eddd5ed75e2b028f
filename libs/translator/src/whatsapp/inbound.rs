use std::collections::HashMap;

use chatwire_core::inbound::MediaMessage;
use chatwire_core::{
    AccountRegistry, ErrorSink, EventMessage, InboundClassifier, InboundMessage, InputAccount,
    InteractiveMessage, MessageBase, ModelError, ModelResult, TextMessage, error_context,
};
use serde_json::{Map, Value, json};

use crate::WHATSAPP;

const MEDIA_TAGS: [&str; 5] = ["image", "video", "audio", "document", "sticker"];

/// Sender profiles seen in the current delivery, keyed by `wa_id`.
type ContactCache = HashMap<String, Value>;

/// Classifier for WhatsApp Cloud API webhook deliveries.
///
/// ```
/// use chatwire_core::InboundClassifier;
/// use chatwire_translator::WhatsAppRequest;
/// use serde_json::json;
///
/// let raw = json!({"entry": [{"changes": [{"value": {
///     "metadata": {"phone_number_id": "pn-1"},
///     "messages": [{"from": "5215500000000", "id": "wamid.1", "timestamp": "1700000000",
///                   "type": "text", "text": {"body": "hola"}}]
/// }}]}]});
/// let run = WhatsAppRequest.classify(raw, false).unwrap();
/// assert_eq!(run.message_ids(), vec!["wamid.1"]);
/// assert!(run.errors().is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatsAppRequest;

impl InboundClassifier for WhatsAppRequest {
    fn platform(&self) -> &'static str {
        WHATSAPP
    }

    fn account_hint(&self, raw: &Value) -> Option<String> {
        raw.pointer("/entry/0/changes/0/value/metadata/phone_number_id")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    fn sort_data(
        &self,
        raw: &Value,
        registry: &mut AccountRegistry,
        sink: &mut ErrorSink,
    ) -> ModelResult<()> {
        if !raw.is_object() {
            return Err(ModelError::malformed("webhook delivery is not a JSON object"));
        }
        let mut contacts = ContactCache::new();
        for entry in raw["entry"].as_array().into_iter().flatten() {
            for change in entry["changes"].as_array().into_iter().flatten() {
                match self.process_change(change, registry, sink, &mut contacts) {
                    Ok(()) => {}
                    Err(err) if sink.is_debug() => return Err(err),
                    Err(err) => sink.record(error_context(json!({"change_data": change})), err)?,
                }
            }
        }
        Ok(())
    }

    fn data_to_class(&self, fragment: &Value) -> ModelResult<InboundMessage> {
        let tag = fragment["type"]
            .as_str()
            .ok_or_else(|| ModelError::malformed("fragment has no type tag"))?;
        let mut message: InboundMessage = match tag {
            "text" => text_message(fragment)?.into(),
            "interactive" => interactive_message(fragment)?.into(),
            "state" | "reaction" => state_notification(fragment)?.into(),
            tag if MEDIA_TAGS.contains(&tag) => media_message(fragment, tag)?.into(),
            other => return Err(ModelError::unsupported(other)),
        };
        if let Some(context_id) = fragment.pointer("/context/id").and_then(Value::as_str) {
            message.set_context_id(Some(context_id.to_string()));
        }
        Ok(message)
    }
}

impl WhatsAppRequest {
    fn process_change(
        &self,
        change: &Value,
        registry: &mut AccountRegistry,
        sink: &mut ErrorSink,
        contacts: &mut ContactCache,
    ) -> ModelResult<()> {
        let value = &change["value"];
        let pid = value
            .pointer("/metadata/phone_number_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::resolution("change has no value.metadata.phone_number_id"))?;
        let account = registry.get_input_account(pid, change.clone());

        full_contact(value, contacts, sink)?;
        self.set_messages(value, account, contacts, sink)?;
        set_statuses(value, account, contacts, sink)
    }

    fn set_messages(
        &self,
        value: &Value,
        account: &mut InputAccount,
        contacts: &ContactCache,
        sink: &mut ErrorSink,
    ) -> ModelResult<()> {
        for message in value["messages"].as_array().into_iter().flatten() {
            let Some(sender_id) = message["from"].as_str() else {
                sink.record(
                    error_context(json!({
                        "method": "get_input_sender",
                        "value.messages.message": message,
                    })),
                    ModelError::malformed("message has no sender"),
                )?;
                continue;
            };
            let sender = account.get_input_sender(sender_id, member_data(contacts, sender_id));
            let classified = sink.capture(self.data_to_class(message), || {
                error_context(json!({
                    "method": "data_to_class",
                    "value.messages.message": message,
                }))
            })?;
            if let Some(classified) = classified {
                sender.push(classified);
            }
        }
        Ok(())
    }
}

/// Caches every contact profile of the change, tagged for phone-based lookups. First one wins.
fn full_contact(value: &Value, contacts: &mut ContactCache, sink: &mut ErrorSink) -> ModelResult<()> {
    for contact in value["contacts"].as_array().into_iter().flatten() {
        let Some(wa_id) = contact["wa_id"].as_str() else {
            sink.record(
                error_context(json!({"method": "full_contact", "contact": contact})),
                ModelError::malformed("contact has no wa_id"),
            )?;
            continue;
        };
        let mut profile = match &contact["profile"] {
            Value::Object(profile) => profile.clone(),
            _ => Map::new(),
        };
        profile.insert("phone".into(), json!(wa_id));
        profile.insert("user_field_filter".into(), json!("phone"));
        contacts
            .entry(wa_id.to_string())
            .or_insert_with(|| json!({"sender_id": wa_id, "contact": profile}));
    }
    Ok(())
}

fn set_statuses(
    value: &Value,
    account: &mut InputAccount,
    contacts: &ContactCache,
    sink: &mut ErrorSink,
) -> ModelResult<()> {
    for status in value["statuses"].as_array().into_iter().flatten() {
        let mut status_data = status.clone();
        if let Some(map) = status_data.as_object_mut() {
            map.insert("type".into(), json!("state"));
        }
        let recipient = match &status_data["recipient_id"] {
            Value::Null => None,
            Value::String(recipient) => Some(recipient.as_str()),
            other => {
                let err = ModelError::malformed(format!("status recipient_id {other} is not a string"));
                sink.record(
                    error_context(json!({"status_data": status_data, "method": "get_input_sender"})),
                    err,
                )?;
                continue;
            }
        };
        match recipient {
            Some(recipient) => {
                let sender = account.get_input_sender(recipient, member_data(contacts, recipient));
                if let Some(event) = capture_status(&status_data, sink)? {
                    sender.push(event.into());
                }
            }
            None => {
                if let Some(event) = capture_status(&status_data, sink)? {
                    tracing::debug!(account = %account.pid, status = %event.status, "status without recipient");
                    account.push_status(event);
                }
            }
        }
    }
    Ok(())
}

fn capture_status(status_data: &Value, sink: &mut ErrorSink) -> ModelResult<Option<EventMessage>> {
    sink.capture(state_notification(status_data), || {
        error_context(json!({
            "status_data": status_data,
            "method": "create_state_notification",
        }))
    })
}

fn member_data(contacts: &ContactCache, sender_id: &str) -> Value {
    contacts
        .get(sender_id)
        .cloned()
        .unwrap_or_else(|| json!({}))
}

/// Platform timestamps arrive as decimal strings; numbers are accepted too. Absent means 0.
fn timestamp(fragment: &Value) -> ModelResult<i64> {
    match &fragment["timestamp"] {
        Value::Null => Ok(0),
        Value::String(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ModelError::malformed(format!("invalid timestamp {raw:?}"))),
        Value::Number(number) => number
            .as_i64()
            .ok_or_else(|| ModelError::malformed(format!("invalid timestamp {number}"))),
        other => Err(ModelError::malformed(format!("invalid timestamp {other}"))),
    }
}

fn base(fragment: &Value) -> ModelResult<MessageBase> {
    let message_id = fragment["id"].as_str().unwrap_or_default();
    Ok(MessageBase::new(message_id, timestamp(fragment)?))
}

fn text_message(fragment: &Value) -> ModelResult<TextMessage> {
    let text = fragment
        .pointer("/text/body")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::malformed("text message has no text.body"))?;
    Ok(TextMessage {
        base: base(fragment)?,
        text: text.to_string(),
    })
}

/// The selected option lives under the key named by `interactive.type`
/// (`button_reply`, `list_reply`, ...).
fn interactive_message(fragment: &Value) -> ModelResult<InteractiveMessage> {
    let interactive = &fragment["interactive"];
    let reply_kind = interactive["type"]
        .as_str()
        .ok_or_else(|| ModelError::malformed("interactive message has no interactive.type"))?;
    let reply = &interactive[reply_kind];
    if !reply.is_object() {
        return Err(ModelError::malformed(format!(
            "interactive message has no {reply_kind} object"
        )));
    }
    Ok(InteractiveMessage {
        base: base(fragment)?,
        payload: reply["id"].as_str().unwrap_or_default().to_string(),
        title: reply["title"].as_str().map(str::to_string),
    })
}

fn state_notification(fragment: &Value) -> ModelResult<EventMessage> {
    if !fragment.is_object() {
        return Err(ModelError::malformed("status fragment is not a JSON object"));
    }
    let ts = timestamp(fragment)?;
    if fragment["type"].as_str() == Some("reaction") {
        let reaction = &fragment["reaction"];
        return Ok(EventMessage {
            base: MessageBase::new(reaction["message_id"].as_str().unwrap_or_default(), ts),
            status: "reaction".into(),
            emoji: reaction["emoji"].as_str().map(str::to_string),
        });
    }
    Ok(EventMessage {
        base: MessageBase::new(fragment["id"].as_str().unwrap_or_default(), ts),
        status: fragment["status"].as_str().unwrap_or_default().to_string(),
        emoji: None,
    })
}

fn media_message(fragment: &Value, media_type: &str) -> ModelResult<MediaMessage> {
    let media = &fragment[media_type];
    if !media.is_object() {
        return Err(ModelError::malformed(format!(
            "{media_type} message has no {media_type} object"
        )));
    }
    let required = |field: &str| {
        media[field]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ModelError::malformed(format!("{media_type} message has no {field}")))
    };
    Ok(MediaMessage {
        base: base(fragment)?,
        media_type: media_type.to_string(),
        mime_type: required("mime_type")?,
        sha256: required("sha256")?,
        media_id: required("id")?,
        caption: media["caption"].as_str().map(str::to_string),
        filename: media["filename"].as_str().map(str::to_string),
        voice: media["voice"].as_bool(),
        origin_name: None,
    })
}
