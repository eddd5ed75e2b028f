//! Platform adapters that map between raw platform JSON and the chatwire core models.
//!
//! Inbound, a [`WhatsAppRequest`] walks a webhook delivery and fills the run-scoped account tree.
//! Outbound, a [`WhatsAppEncoder`] turns rendered messages into Cloud API envelopes that a
//! [`Responder`](chatwire_core::Responder) queues and sends.

pub mod whatsapp;

pub use whatsapp::{
    WhatsAppEncoder, WhatsAppEncoderConfig, WhatsAppRequest, get_mid, normalize_recipient,
};

/// Platform identifier shared by the WhatsApp classifier and encoder.
pub const WHATSAPP: &str = "whatsapp";
