//! Inbound side: typed message variants, the run-scoped account tree, and the classifier contract.

pub mod classifier;
pub mod models;
pub mod registry;

pub use classifier::{InboundClassifier, InboundRun};
pub use models::{
    EventMessage, InboundMessage, InteractiveMessage, MESSAGE_MAX_SKEW_SECS, MediaMessage,
    MessageBase, STATUS_MAX_SKEW_SECS, TextMessage,
};
pub use registry::{AccountRegistry, InputAccount, InputSender, RawFragment};
