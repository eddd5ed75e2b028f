use serde::Serialize;
use serde_json::Value;

use super::models::{EventMessage, InboundMessage};

/// Raw platform fragment kept verbatim for anything not yet mapped to a typed field.
pub type RawFragment = Value;

/// End-user identity that sent messages to an account during one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSender {
    pub uid: String,
    /// Opaque profile data (contact name, phone) captured from the delivery.
    pub sender_data: Value,
    messages: Vec<InboundMessage>,
}

impl InputSender {
    pub fn new(uid: impl Into<String>, sender_data: Value) -> Self {
        Self {
            uid: uid.into(),
            sender_data,
            messages: Vec::new(),
        }
    }

    /// Appends a message; insertion order is processing order.
    pub fn push(&mut self, message: InboundMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[InboundMessage] {
        &self.messages
    }
}

/// Platform-side messaging endpoint, unique by `pid` within a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputAccount {
    pub pid: String,
    pub raw_data: RawFragment,
    members: Vec<InputSender>,
    statuses: Vec<EventMessage>,
}

impl InputAccount {
    pub fn new(pid: impl Into<String>, raw_data: RawFragment) -> Self {
        Self {
            pid: pid.into(),
            raw_data,
            members: Vec::new(),
            statuses: Vec::new(),
        }
    }

    /// Returns the sender with `uid`, creating it with `sender_data` on first sight.
    ///
    /// The profile passed on later calls is ignored; the first one seen wins.
    pub fn get_input_sender(&mut self, uid: &str, sender_data: Value) -> &mut InputSender {
        let existing = self.members.iter().position(|member| member.uid == uid);
        match existing {
            Some(idx) => &mut self.members[idx],
            None => self.create_input_sender(uid, sender_data),
        }
    }

    fn create_input_sender(&mut self, uid: &str, sender_data: Value) -> &mut InputSender {
        tracing::debug!(account = %self.pid, sender = %uid, "creating input sender");
        self.members.push(InputSender::new(uid, sender_data));
        let last = self.members.len() - 1;
        &mut self.members[last]
    }

    pub fn members(&self) -> &[InputSender] {
        &self.members
    }

    pub fn find_sender(&self, uid: &str) -> Option<&InputSender> {
        self.members.iter().find(|member| member.uid == uid)
    }

    /// Keeps a status event that could not be attributed to a sender.
    pub fn push_status(&mut self, status: EventMessage) {
        self.statuses.push(status);
    }

    pub fn statuses(&self) -> &[EventMessage] {
        &self.statuses
    }
}

/// Run-scoped account tree. Constructed per classification call and discarded after.
///
/// ```
/// use chatwire_core::AccountRegistry;
/// use serde_json::json;
///
/// let mut registry = AccountRegistry::default();
/// registry.get_input_account("pn-1", json!({})).get_input_sender("521", json!({}));
/// registry.get_input_account("pn-1", json!({})).get_input_sender("521", json!({}));
/// assert_eq!(registry.accounts().len(), 1);
/// assert_eq!(registry.accounts()[0].members().len(), 1);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct AccountRegistry {
    accounts: Vec<InputAccount>,
}

impl AccountRegistry {
    /// Returns the account with `pid`, creating it from `raw_data` on first sight.
    pub fn get_input_account(&mut self, pid: &str, raw_data: RawFragment) -> &mut InputAccount {
        let existing = self.accounts.iter().position(|account| account.pid == pid);
        match existing {
            Some(idx) => &mut self.accounts[idx],
            None => self.create_input_account(pid, raw_data),
        }
    }

    fn create_input_account(&mut self, pid: &str, raw_data: RawFragment) -> &mut InputAccount {
        tracing::debug!(account = %pid, "creating input account");
        self.accounts.push(InputAccount::new(pid, raw_data));
        let last = self.accounts.len() - 1;
        &mut self.accounts[last]
    }

    pub fn accounts(&self) -> &[InputAccount] {
        &self.accounts
    }

    pub fn find_account(&self, pid: &str) -> Option<&InputAccount> {
        self.accounts.iter().find(|account| account.pid == pid)
    }

    pub fn into_accounts(self) -> Vec<InputAccount> {
        self.accounts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbound::models::{MessageBase, TextMessage};
    use serde_json::json;

    fn text(id: &str) -> InboundMessage {
        InboundMessage::Text(TextMessage {
            base: MessageBase::new(id, 1_700_000_000),
            text: id.to_string(),
        })
    }

    #[test]
    fn first_profile_wins_for_a_sender() {
        let mut account = InputAccount::new("pn-1", json!({}));
        account.get_input_sender("5215550001", json!({"contact": {"name": "Ana"}}));
        let sender = account.get_input_sender("5215550001", json!({"contact": {"name": "Other"}}));
        assert_eq!(sender.sender_data["contact"]["name"], "Ana");
        assert_eq!(account.members().len(), 1);
    }

    #[test]
    fn senders_are_scoped_per_account() {
        let mut registry = AccountRegistry::default();
        registry
            .get_input_account("pn-1", json!({"n": 1}))
            .get_input_sender("u1", json!({}))
            .push(text("a"));
        registry
            .get_input_account("pn-2", json!({"n": 2}))
            .get_input_sender("u1", json!({}))
            .push(text("b"));
        registry
            .get_input_account("pn-1", json!({"n": 3}))
            .get_input_sender("u1", json!({}))
            .push(text("c"));

        assert_eq!(registry.accounts().len(), 2);
        let first = registry.find_account("pn-1").unwrap();
        assert_eq!(first.raw_data, json!({"n": 1}));
        let ids: Vec<_> = first
            .find_sender("u1")
            .unwrap()
            .messages()
            .iter()
            .map(InboundMessage::message_id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(
            registry.find_account("pn-2").unwrap().members()[0].messages()[0].message_id(),
            "b"
        );
    }
}
