use serde::Serialize;
use serde_json::{Value, json};

use super::models::InboundMessage;
use super::registry::{AccountRegistry, InputAccount, RawFragment};
use crate::error::ModelResult;
use crate::sink::{ErrorRecord, ErrorSink, error_context};
use chatwire_telemetry::{TelemetryLabels, record_counter, with_common_fields};

const CLASSIFY_SPAN_NAME: &str = "classify.run";
const CLASSIFIED_COUNTER: &str = "messages_classified";

/// Per-platform walker that turns a raw webhook delivery into the account tree.
///
/// Implementations only provide [`sort_data`](Self::sort_data) and
/// [`data_to_class`](Self::data_to_class); [`classify`](Self::classify) owns the run-scoped
/// registry and error sink.
pub trait InboundClassifier {
    /// Lowercase platform identifier used in spans and metrics.
    fn platform(&self) -> &'static str;

    /// Walks every delivery unit in `raw`, filling `registry` and routing unit failures to `sink`.
    fn sort_data(
        &self,
        raw: &Value,
        registry: &mut AccountRegistry,
        sink: &mut ErrorSink,
    ) -> ModelResult<()>;

    /// Maps one fragment to its typed variant, including the reply context.
    fn data_to_class(&self, fragment: &Value) -> ModelResult<InboundMessage>;

    /// Account id recorded on the run span; purely informational.
    fn account_hint(&self, _raw: &Value) -> Option<String> {
        None
    }

    /// Runs one classification over a fresh registry.
    ///
    /// Outside debug mode this only fails if nothing could be recorded; in debug mode the first
    /// captured error is returned.
    fn classify(&self, raw: Value, debug: bool) -> ModelResult<InboundRun> {
        let span = tracing::info_span!(
            CLASSIFY_SPAN_NAME,
            platform = tracing::field::Empty,
            account = tracing::field::Empty,
            msg_id = tracing::field::Empty
        );
        let account = self.account_hint(&raw);
        with_common_fields(&span, self.platform(), account.as_deref(), None);
        let _guard = span.enter();

        let mut registry = AccountRegistry::default();
        let mut sink = ErrorSink::new(debug);
        match self.sort_data(&raw, &mut registry, &mut sink) {
            Ok(()) => {}
            Err(err) if sink.is_debug() => return Err(err),
            Err(err) => sink.record(error_context(json!({"method": "sort_data"})), err)?,
        }

        let run = InboundRun {
            raw,
            registry,
            errors: sink.into_errors(),
        };
        let mut labels = TelemetryLabels::new(self.platform());
        labels
            .extra
            .push(("errors".into(), run.errors.len().to_string()));
        record_counter(CLASSIFIED_COUNTER, run.message_count() as u64, &labels);
        tracing::info!(
            accounts = run.accounts().len(),
            messages = run.message_count(),
            errors = run.errors.len(),
            "classification finished"
        );
        Ok(run)
    }
}

/// Result of one classification: the account tree plus everything that was recorded.
#[derive(Debug, Clone, Serialize)]
pub struct InboundRun {
    pub raw: RawFragment,
    registry: AccountRegistry,
    errors: Vec<ErrorRecord>,
}

impl InboundRun {
    pub fn accounts(&self) -> &[InputAccount] {
        self.registry.accounts()
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    /// Every sender message as `(account pid, sender uid, message)`, in processing order per
    /// sender.
    pub fn messages(&self) -> impl Iterator<Item = (&str, &str, &InboundMessage)> {
        self.registry.accounts().iter().flat_map(|account| {
            account.members().iter().flat_map(move |sender| {
                sender
                    .messages()
                    .iter()
                    .map(move |message| (account.pid.as_str(), sender.uid.as_str(), message))
            })
        })
    }

    pub fn message_ids(&self) -> Vec<&str> {
        self.messages()
            .map(|(_, _, message)| message.message_id())
            .collect()
    }

    /// Count of sender messages plus standalone account statuses.
    pub fn message_count(&self) -> usize {
        self.registry
            .accounts()
            .iter()
            .map(|account| {
                account.statuses().len()
                    + account
                        .members()
                        .iter()
                        .map(|sender| sender.messages().len())
                        .sum::<usize>()
            })
            .sum()
    }

    pub fn into_parts(self) -> (AccountRegistry, Vec<ErrorRecord>) {
        (self.registry, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::inbound::models::{MessageBase, TextMessage};

    /// Flat test format: `{"account": "...", "items": [{"from": "...", "id": "..."}]}`.
    struct FlatClassifier;

    impl InboundClassifier for FlatClassifier {
        fn platform(&self) -> &'static str {
            "flat"
        }

        fn sort_data(
            &self,
            raw: &Value,
            registry: &mut AccountRegistry,
            sink: &mut ErrorSink,
        ) -> ModelResult<()> {
            let pid = raw
                .get("account")
                .and_then(Value::as_str)
                .ok_or_else(|| ModelError::resolution("missing account"))?;
            let account = registry.get_input_account(pid, raw.clone());
            for item in raw["items"].as_array().into_iter().flatten() {
                let classified = sink.capture(self.data_to_class(item), || {
                    error_context(json!({"method": "data_to_class", "item": item}))
                })?;
                let Some(message) = classified else {
                    continue;
                };
                let from = item["from"].as_str().unwrap_or_default();
                account.get_input_sender(from, Value::Null).push(message);
            }
            Ok(())
        }

        fn data_to_class(&self, fragment: &Value) -> ModelResult<InboundMessage> {
            let id = fragment
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| ModelError::malformed("missing id"))?;
            Ok(TextMessage {
                base: MessageBase::new(id, 0),
                text: String::new(),
            }
            .into())
        }
    }

    #[test]
    fn sort_data_failure_is_recorded_with_method() {
        let run = FlatClassifier.classify(json!({"items": []}), false).unwrap();
        assert!(run.accounts().is_empty());
        assert_eq!(run.errors().len(), 1);
        assert_eq!(run.errors()[0].context["method"], "sort_data");
    }

    #[test]
    fn debug_mode_returns_the_first_error() {
        let raw = json!({"account": "a", "items": [{"from": "u", "id": "1"}, {"from": "u"}]});
        let err = FlatClassifier.classify(raw, true).unwrap_err();
        assert!(matches!(err, ModelError::MalformedFragment { .. }));
    }

    #[test]
    fn messages_iterates_in_processing_order() {
        let raw = json!({"account": "a", "items": [
            {"from": "u1", "id": "1"},
            {"from": "u2", "id": "2"},
            {"from": "u1"},
            {"from": "u1", "id": "3"}
        ]});
        let run = FlatClassifier.classify(raw, false).unwrap();
        assert_eq!(run.message_ids(), vec!["1", "3", "2"]);
        assert_eq!(run.message_count(), 3);
        assert_eq!(run.errors().len(), 1);
        let senders: Vec<_> = run.messages().map(|(_, uid, _)| uid).collect();
        assert_eq!(senders, vec!["u1", "u1", "u2"]);
    }
}
