mod inbound;
mod outbound;

pub use inbound::WhatsAppRequest;
pub use outbound::{WhatsAppEncoder, WhatsAppEncoderConfig, get_mid, normalize_recipient};
