//! WhatsApp Cloud API transport for chatwire.
//!
//! [`WhatsAppTransport`] implements [`chatwire_core::Transport`] so a
//! [`Responder`](chatwire_core::Responder) can deliver its envelopes, and adds the read-receipt
//! and media download calls an inbound handler needs.

mod config;
mod whatsapp;

pub use config::{DEFAULT_API_BASE, DEFAULT_API_VERSION, WhatsAppConfig};
pub use whatsapp::WhatsAppTransport;
