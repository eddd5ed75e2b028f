use chatwire_core::outbound::MediaMessage;
use chatwire_core::{
    Button, Header, Message, ModelError, ModelResult, OutboundEncoder, ReplyMessage, Section,
    SectionsMessage,
};
use serde_json::{Map, Value, json};
use unicode_segmentation::UnicodeSegmentation;

use crate::WHATSAPP;

const MESSAGING_PRODUCT: &str = "whatsapp";
const MEDIA_TYPES: [&str; 6] = ["image", "video", "audio", "file", "document", "sticker"];

/// Cloud API limits applied while building interactive envelopes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppEncoderConfig {
    /// Maximum characters of a text header.
    pub header_text_limit: usize,
    /// Maximum characters of the button that opens a list.
    pub list_button_limit: usize,
    pub max_reply_buttons: usize,
    pub max_sections: usize,
    pub max_rows: usize,
    /// Title used when options are partitioned into sections automatically.
    pub default_section_title: String,
}

impl Default for WhatsAppEncoderConfig {
    fn default() -> Self {
        Self {
            header_text_limit: 60,
            list_button_limit: 20,
            max_reply_buttons: 3,
            max_sections: 10,
            max_rows: 10,
            default_section_title: "Opciones:".into(),
        }
    }
}

/// Builds WhatsApp Cloud API message envelopes.
#[derive(Debug, Clone, Default)]
pub struct WhatsAppEncoder {
    config: WhatsAppEncoderConfig,
}

impl WhatsAppEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WhatsAppEncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WhatsAppEncoderConfig {
        &self.config
    }

    fn message_to_data(&self, message: &Message, header_supp_media: bool) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("body".into(), json!({"text": message.body}));
        if let Some(header) = &message.header {
            let (mut kind, value) = match header {
                Header::Text(value) if value.starts_with("https") => ("image", value.as_str()),
                Header::Text(value) => ("text", value.as_str()),
                Header::Media(media) => (media.media_type.as_str(), media.value.as_str()),
            };
            if !header_supp_media {
                kind = "text";
            }
            let value = if kind == "text" {
                Value::String(truncate(value, self.config.header_text_limit))
            } else {
                json!({"link": value})
            };
            data.insert("header".into(), json!({"type": kind, kind: value}));
        }
        if let Some(footer) = message.footer.as_deref().filter(|f| !f.is_empty()) {
            data.insert("footer".into(), json!({"text": footer}));
        }
        data
    }

    fn section_to_data(&self, section: &Section) -> Value {
        let rows: Vec<Value> = section
            .buttons
            .iter()
            .take(self.config.max_rows)
            .map(|button| {
                json!({
                    "id": button.payload,
                    "title": button.title,
                    "description": button.description.as_deref().unwrap_or_default(),
                })
            })
            .collect();
        json!({"title": section.title, "rows": rows})
    }

    /// List envelope shared by auto-partitioned buttons and explicit sections.
    fn list_to_data(
        &self,
        recipient: &str,
        message: &Message,
        button_text: &str,
        sections: &[Section],
        context_id: Option<&str>,
    ) -> ModelResult<Value> {
        let sections = &sections[..sections.len().min(self.config.max_sections)];
        if sections.iter().all(|section| section.buttons.is_empty()) {
            return Err(ModelError::encode("list message has no options"));
        }
        let mut interactive = self.message_to_data(message, false);
        interactive.insert("type".into(), json!("list"));
        interactive.insert(
            "action".into(),
            json!({
                "button": truncate(button_text, self.config.list_button_limit),
                "sections": sections
                    .iter()
                    .map(|section| self.section_to_data(section))
                    .collect::<Vec<_>>(),
            }),
        );

        let uuid_list: Vec<&str> = sections
            .iter()
            .flat_map(|section| section.buttons.iter().take(self.config.max_rows))
            .map(|button| button.payload.as_str())
            .collect();
        let mut data = base_data(recipient, "interactive", Value::Object(interactive));
        with_context(&mut data, context_id);
        data["uuid_list"] = json!(uuid_list);
        Ok(data)
    }
}

impl OutboundEncoder for WhatsAppEncoder {
    fn platform(&self) -> &'static str {
        WHATSAPP
    }

    /// Blank bodies are rejected: the Cloud API refuses empty text messages.
    fn text_to_data(&self, recipient: &str, text: &str) -> ModelResult<Value> {
        if text.trim().is_empty() {
            return Err(ModelError::encode("text body is empty"));
        }
        Ok(base_data(recipient, "text", json!({"body": text})))
    }

    fn multimedia_to_data(
        &self,
        recipient: &str,
        media_type: &str,
        media: &MediaMessage,
    ) -> ModelResult<Value> {
        if !MEDIA_TYPES.contains(&media_type) {
            return Err(ModelError::encode(format!(
                "media type {media_type} must be one of {}",
                MEDIA_TYPES.join(", ")
            )));
        }
        if media.link.is_empty() && media.id.is_empty() {
            return Err(ModelError::encode("either a media url or a media id is required"));
        }
        let mut body = Map::new();
        if !media.caption.is_empty() {
            body.insert("caption".into(), json!(media.caption));
        }
        // The Cloud API rejects objects carrying both references.
        if media.id.is_empty() {
            body.insert("link".into(), json!(media.link));
        } else {
            body.insert("id".into(), json!(media.id));
        }
        let wire_type = if media_type == "file" { "document" } else { media_type };
        Ok(base_data(recipient, wire_type, Value::Object(body)))
    }

    fn few_buttons_to_data(&self, recipient: &str, message: &ReplyMessage) -> ModelResult<Value> {
        let buttons: Vec<&Button> = message
            .get_only_buttons()
            .iter()
            .take(self.config.max_reply_buttons)
            .collect();
        if buttons.is_empty() {
            return Err(ModelError::encode("reply message has no buttons"));
        }
        let mut interactive = self.message_to_data(&message.message, true);
        interactive.insert("type".into(), json!("button"));
        interactive.insert(
            "action".into(),
            json!({
                "buttons": buttons
                    .iter()
                    .map(|button| json!({
                        "type": "reply",
                        "reply": {"id": button.payload, "title": button.title},
                    }))
                    .collect::<Vec<_>>(),
            }),
        );

        let mut data = base_data(recipient, "interactive", Value::Object(interactive));
        with_context(&mut data, message.get_context());
        data["uuid_list"] = json!(
            buttons
                .iter()
                .map(|button| button.payload.as_str())
                .collect::<Vec<_>>()
        );
        Ok(data)
    }

    fn many_buttons_to_data(
        &self,
        recipient: &str,
        message: &ReplyMessage,
    ) -> ModelResult<Value> {
        let sections = message.get_section(&self.config.default_section_title, self.config.max_rows);
        self.list_to_data(
            recipient,
            &message.message,
            &message.button_text,
            &sections,
            message.get_context(),
        )
    }

    fn sections_to_data(&self, recipient: &str, message: &SectionsMessage) -> ModelResult<Value> {
        self.list_to_data(
            recipient,
            &message.message,
            &message.button_text,
            &message.sections,
            message.get_context(),
        )
    }

    fn get_mid(&self, body: Option<&Value>) -> Option<String> {
        get_mid(body)
    }
}

/// Rewrites legacy Mexican mobile numbers (`521…`) to the `52…` form the Cloud API delivers to.
///
/// ```
/// use chatwire_translator::normalize_recipient;
///
/// assert_eq!(normalize_recipient("5215512345678"), "525512345678");
/// assert_eq!(normalize_recipient("14155550100"), "14155550100");
/// ```
pub fn normalize_recipient(phone: &str) -> String {
    match phone.strip_prefix("521") {
        Some(rest) => format!("52{rest}"),
        None => phone.to_string(),
    }
}

/// Message id of the first entry in a send response's `messages` array.
///
/// ```
/// use chatwire_translator::get_mid;
/// use serde_json::json;
///
/// let body = json!({"messages": [{"id": "wamid.HBg"}]});
/// assert_eq!(get_mid(Some(&body)).as_deref(), Some("wamid.HBg"));
/// assert_eq!(get_mid(Some(&json!({"messages": []}))), None);
/// assert_eq!(get_mid(None), None);
/// ```
pub fn get_mid(body: Option<&Value>) -> Option<String> {
    body?
        .get("messages")?
        .get(0)?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

fn base_data(recipient: &str, kind: &str, body: Value) -> Value {
    json!({
        "messaging_product": MESSAGING_PRODUCT,
        "to": normalize_recipient(recipient),
        "type": kind,
        kind: body,
    })
}

fn with_context(data: &mut Value, context_id: Option<&str>) {
    if let Some(id) = context_id {
        data["context"] = json!({"message_id": id});
    }
}

fn truncate(text: &str, limit: usize) -> String {
    text.graphemes(true).take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwire_core::MediaHeader;

    fn buttons(count: usize) -> Vec<Button> {
        (1..=count)
            .map(|i| Button::new(format!("p{i}"), format!("Option {i}")))
            .collect()
    }

    #[test]
    fn text_envelope_normalizes_mexican_numbers() {
        let data = WhatsAppEncoder::new()
            .text_to_data("5215512345678", "Hola")
            .unwrap();
        assert_eq!(
            data,
            json!({
                "messaging_product": "whatsapp",
                "to": "525512345678",
                "type": "text",
                "text": {"body": "Hola"}
            })
        );
    }

    #[test]
    fn empty_text_is_an_encode_error() {
        let err = WhatsAppEncoder::new().text_to_data("1", "   ").unwrap_err();
        assert!(matches!(err, ModelError::Encode { .. }));
    }

    #[test]
    fn header_downgrade_and_truncation() {
        let encoder = WhatsAppEncoder::new();
        let long = "x".repeat(80);
        let data = encoder.message_to_data(&Message::new("b").with_header(long.as_str()), true);
        assert_eq!(data["header"]["text"].as_str().map(str::len), Some(60));

        let image = Message::new("b").with_header("https://cdn.example.com/a.png");
        let rich = encoder.message_to_data(&image, true);
        assert_eq!(
            rich["header"],
            json!({"type": "image", "image": {"link": "https://cdn.example.com/a.png"}})
        );
        let plain = encoder.message_to_data(&image, false);
        assert_eq!(
            plain["header"],
            json!({"type": "text", "text": "https://cdn.example.com/a.png"})
        );
    }

    #[test]
    fn typed_media_header_and_footer() {
        let message = Message::new("b")
            .with_header(Header::Media(MediaHeader {
                media_type: "video".into(),
                value: "https://cdn.example.com/v.mp4".into(),
            }))
            .with_footer("Gracias");
        let data = WhatsAppEncoder::new().message_to_data(&message, true);
        assert_eq!(data["header"]["video"]["link"], "https://cdn.example.com/v.mp4");
        assert_eq!(data["footer"], json!({"text": "Gracias"}));
    }

    #[test]
    fn truncation_counts_graphemes() {
        assert_eq!(truncate("ñandú🇲🇽x", 6), "ñandú🇲🇽");
    }

    #[test]
    fn multimedia_prefers_id_and_maps_file_to_document() {
        let encoder = WhatsAppEncoder::new();
        let media = MediaMessage {
            caption: "Factura".into(),
            id: "media-9".into(),
            link: "https://cdn.example.com/f.pdf".into(),
        };
        let data = encoder.multimedia_to_data("14155550100", "file", &media).unwrap();
        assert_eq!(data["type"], "document");
        assert_eq!(data["document"], json!({"caption": "Factura", "id": "media-9"}));

        let missing = MediaMessage::default();
        assert!(encoder.multimedia_to_data("1", "image", &missing).is_err());
        let bad_type = MediaMessage {
            link: "https://x".into(),
            ..Default::default()
        };
        let err = encoder.multimedia_to_data("1", "gif", &bad_type).unwrap_err();
        assert!(err.to_string().contains("media type gif"));
    }

    #[test]
    fn few_buttons_caps_at_three() {
        let message = ReplyMessage::new("Elige", buttons(5)).with_context("wamid.prev");
        let data = WhatsAppEncoder::new()
            .few_buttons_to_data("14155550100", &message)
            .unwrap();
        assert_eq!(data["interactive"]["action"]["buttons"].as_array().map(Vec::len), Some(3));
        assert_eq!(data["uuid_list"], json!(["p1", "p2", "p3"]));
        assert_eq!(data["context"], json!({"message_id": "wamid.prev"}));
    }

    #[test]
    fn many_buttons_partition_into_titled_sections() {
        let message = ReplyMessage::new("Menu", buttons(12))
            .with_button_text("Ver todas las opciones disponibles");
        let data = WhatsAppEncoder::new()
            .many_buttons_to_data("14155550100", &message)
            .unwrap();
        let action = &data["interactive"]["action"];
        assert_eq!(action["button"], "Ver todas las opcion");
        assert_eq!(action["sections"][0]["title"], "Opciones:");
        assert_eq!(action["sections"][0]["rows"].as_array().map(Vec::len), Some(10));
        assert_eq!(action["sections"][1]["rows"].as_array().map(Vec::len), Some(2));
        assert_eq!(action["sections"][1]["rows"][0]["description"], "");
        assert_eq!(data["uuid_list"].as_array().map(Vec::len), Some(12));
        assert!(data.get("context").is_none());
    }

    #[test]
    fn sections_are_capped() {
        let sections = (0..12)
            .map(|i| Section::new(format!("S{i}"), buttons(11)))
            .collect();
        let data = WhatsAppEncoder::new()
            .sections_to_data("1", &SectionsMessage::new("Menu", sections))
            .unwrap();
        let sections = data["interactive"]["action"]["sections"].as_array().unwrap();
        assert_eq!(sections.len(), 10);
        assert!(sections.iter().all(|s| s["rows"].as_array().map(Vec::len) == Some(10)));
        assert_eq!(data["uuid_list"].as_array().map(Vec::len), Some(100));
    }

    #[test]
    fn empty_option_lists_are_rejected() {
        let encoder = WhatsAppEncoder::new();
        let empty = ReplyMessage::new("x", Vec::new());
        assert!(encoder.few_buttons_to_data("1", &empty).is_err());
        assert!(encoder.many_buttons_to_data("1", &empty).is_err());
    }
}
