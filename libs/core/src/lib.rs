//! Chatwire core contracts and value types.
//!
//! This crate holds everything a platform adapter shares: the inbound message variants and the
//! run-scoped account tree, the outbound message models and response session, the
//! `{{path}}` parameter resolver, and the [`ErrorSink`] both pipelines report through.
pub mod config;
pub mod error;
pub mod inbound;
pub mod outbound;
pub mod params;
pub mod sink;
pub mod transport;

pub use config::CoreConfig;
pub use error::{ModelError, ModelResult, TransportError};
pub use inbound::{
    AccountRegistry, EventMessage, InboundClassifier, InboundMessage, InboundRun, InputAccount,
    InputSender, InteractiveMessage, MessageBase, RawFragment, TextMessage,
};
pub use outbound::{
    Button, Header, MediaHeader, Message, OutboundEncoder, ReplyMessage, Responder, Section,
    SectionsMessage, SendOutcome,
};
pub use params::{Parameters, resolve, resolve_with_default};
pub use sink::{ErrorContext, ErrorRecord, ErrorSink, error_context};
pub use transport::Transport;
