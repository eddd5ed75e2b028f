use serde::{Deserialize, Serialize};

use crate::params::{Parameters, resolve};

/// Label shown on the list-opening button when the author does not pick one.
pub const DEFAULT_BUTTON_TEXT: &str = "Opciones";

fn default_button_text() -> String {
    DEFAULT_BUTTON_TEXT.to_string()
}

/// Typed media reference used as a rich header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHeader {
    #[serde(rename = "type")]
    pub media_type: String,
    pub value: String,
}

/// Header of an outbound message: plain text or a typed media reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Header {
    Text(String),
    Media(MediaHeader),
}

impl From<&str> for Header {
    fn from(value: &str) -> Self {
        Header::Text(value.to_string())
    }
}

impl From<String> for Header {
    fn from(value: String) -> Self {
        Header::Text(value)
    }
}

/// Platform-agnostic text message with optional header and footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            header: None,
            footer: None,
        }
    }

    pub fn with_header(mut self, header: impl Into<Header>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Substitutes parameters in the body, footer, and a plain-text header.
    ///
    /// Media header values are references, not text, and are left untouched.
    pub fn replace_text(&mut self, parameters: &Parameters) {
        self.body = resolve(parameters, &self.body);
        if let Some(Header::Text(text)) = &mut self.header {
            *text = resolve(parameters, text);
        }
        if let Some(footer) = &mut self.footer {
            *footer = resolve(parameters, footer);
        }
    }
}

/// Standalone media send: a caption plus either a hosted id or a link.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaMessage {
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub link: String,
}

/// Selectable option; `payload` comes back in the platform click event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub payload: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Button {
    pub fn new(payload: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn replace_text(&mut self, parameters: &Parameters) {
        self.title = resolve(parameters, &self.title);
        if let Some(description) = &mut self.description {
            *description = resolve(parameters, description);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub buttons: Vec<Button>,
}

impl Section {
    pub fn new(title: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            title: title.into(),
            buttons,
        }
    }
}

/// Message followed by an ordered list of options.
///
/// ```
/// use chatwire_core::outbound::{Button, ReplyMessage};
///
/// let buttons = (0..12).map(|i| Button::new(format!("p{i}"), format!("Option {i}"))).collect();
/// let message = ReplyMessage::new("Pick one", buttons).with_context("wamid.prev");
/// let sections = message.get_section("Opciones:", 10);
/// assert_eq!(sections.len(), 2);
/// assert_eq!(sections[1].buttons.len(), 2);
/// assert_eq!(message.get_context(), Some("wamid.prev"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    #[serde(flatten)]
    pub message: Message,
    pub buttons: Vec<Button>,
    #[serde(default = "default_button_text")]
    pub button_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(skip)]
    replaced: bool,
}

impl ReplyMessage {
    pub fn new(body: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self::from_message(Message::new(body), buttons)
    }

    pub fn from_message(message: Message, buttons: Vec<Button>) -> Self {
        Self {
            message,
            buttons,
            button_text: default_button_text(),
            context_id: None,
            replaced: false,
        }
    }

    pub fn with_context(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn with_button_text(mut self, button_text: impl Into<String>) -> Self {
        self.button_text = button_text.into();
        self
    }

    /// Id of the message this one replies to.
    pub fn get_context(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    pub fn get_only_buttons(&self) -> &[Button] {
        &self.buttons
    }

    /// Partitions the options into sections of at most `available_button_space` rows, all
    /// titled `default_title`.
    pub fn get_section(&self, default_title: &str, available_button_space: usize) -> Vec<Section> {
        self.buttons
            .chunks(available_button_space.max(1))
            .map(|chunk| Section::new(default_title, chunk.to_vec()))
            .collect()
    }

    /// Runs parameter substitution over every textual field. Later calls are no-ops.
    pub fn replace_text(&mut self, parameters: &Parameters) {
        if self.replaced {
            return;
        }
        self.message.replace_text(parameters);
        for button in &mut self.buttons {
            button.replace_text(parameters);
        }
        self.button_text = resolve(parameters, &self.button_text);
        self.replaced = true;
    }
}

/// Message with explicitly titled option groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionsMessage {
    #[serde(flatten)]
    pub message: Message,
    pub sections: Vec<Section>,
    #[serde(default = "default_button_text")]
    pub button_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(skip)]
    replaced: bool,
}

impl SectionsMessage {
    pub fn new(body: impl Into<String>, sections: Vec<Section>) -> Self {
        Self::from_message(Message::new(body), sections)
    }

    pub fn from_message(message: Message, sections: Vec<Section>) -> Self {
        Self {
            message,
            sections,
            button_text: default_button_text(),
            context_id: None,
            replaced: false,
        }
    }

    pub fn with_context(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }

    pub fn with_button_text(mut self, button_text: impl Into<String>) -> Self {
        self.button_text = button_text.into();
        self
    }

    pub fn get_context(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    /// Runs parameter substitution over every textual field. Later calls are no-ops.
    pub fn replace_text(&mut self, parameters: &Parameters) {
        if self.replaced {
            return;
        }
        self.message.replace_text(parameters);
        for section in &mut self.sections {
            section.title = resolve(parameters, &section.title);
            for button in &mut section.buttons {
                button.replace_text(parameters);
            }
        }
        self.button_text = resolve(parameters, &self.button_text);
        self.replaced = true;
    }
}
