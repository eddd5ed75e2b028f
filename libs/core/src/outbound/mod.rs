//! Outbound side: author-facing message models, the per-platform encoder contract, and the
//! response session that renders and sends them.

pub mod encoder;
pub mod models;
pub mod responder;

pub use encoder::{OutboundEncoder, STANDARD_MESSAGE_KEY, UUID_LIST_KEY};
pub use models::{
    Button, DEFAULT_BUTTON_TEXT, Header, MediaHeader, MediaMessage, Message, ReplyMessage,
    Section, SectionsMessage,
};
pub use responder::{Responder, SendOutcome};
