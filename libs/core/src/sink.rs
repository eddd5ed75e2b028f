use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};
use chatwire_telemetry::{TelemetryLabels, record_counter};

const ERRORS_RECORDED: &str = "errors_recorded";

/// Structured context attached to a recorded failure (the offending fragment, the method name).
pub type ErrorContext = Map<String, Value>;

/// Builds an [`ErrorContext`] from a JSON object literal.
///
/// Non-object values are kept under a `context` key so nothing is silently dropped.
///
/// ```
/// use chatwire_core::error_context;
/// use serde_json::json;
///
/// let ctx = error_context(json!({"method": "sort_data"}));
/// assert_eq!(ctx["method"], "sort_data");
/// ```
pub fn error_context(value: Value) -> ErrorContext {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("context".into(), other);
            map
        }
    }
}

/// One captured failure: the caller-provided context plus the rendered error.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub context: ErrorContext,
    pub error: String,
}

impl ErrorRecord {
    /// Returns `context ∪ {"error": <message>}`; the error key wins on collision.
    pub fn to_value(&self) -> Value {
        let mut map = self.context.clone();
        map.insert("error".into(), Value::String(self.error.clone()));
        Value::Object(map)
    }
}

impl Serialize for ErrorRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Accumulator shared by the inbound and outbound pipelines.
///
/// In debug mode a recorded error is logged and handed straight back so the caller can
/// propagate it with `?`. Otherwise it is appended to the ordered error list and swallowed.
///
/// ```
/// use chatwire_core::{ErrorSink, ModelError, error_context};
/// use serde_json::json;
///
/// let mut sink = ErrorSink::new(false);
/// sink.record(error_context(json!({"method": "text"})), ModelError::encode("empty body"))
///     .unwrap();
/// assert_eq!(sink.errors()[0].to_value()["error"], "encode failed: empty body");
///
/// let mut strict = ErrorSink::new(true);
/// assert!(strict.record(Default::default(), ModelError::encode("boom")).is_err());
/// ```
#[derive(Debug, Default)]
pub struct ErrorSink {
    debug: bool,
    errors: Vec<ErrorRecord>,
}

impl ErrorSink {
    pub fn new(debug: bool) -> Self {
        Self {
            debug,
            errors: Vec::new(),
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn record(&mut self, context: ErrorContext, err: ModelError) -> ModelResult<()> {
        let mut labels = TelemetryLabels::new("core");
        labels.extra.push(("kind".into(), err.kind().to_string()));
        record_counter(ERRORS_RECORDED, 1, &labels);

        let rendered = Value::Object(context.clone());
        if self.debug {
            tracing::error!(context = %rendered, error = %err, "raising captured error in debug mode");
            return Err(err);
        }
        tracing::warn!(context = %rendered, error = %err, "error recorded");
        self.errors.push(ErrorRecord {
            context,
            error: err.to_string(),
        });
        Ok(())
    }

    /// Folds a unit result into the sink.
    ///
    /// `Ok(Some(value))` on success, `Ok(None)` when the failure was recorded, `Err` when debug
    /// mode re-raises. The context is only built on failure.
    pub fn capture<T, C>(&mut self, result: ModelResult<T>, context: C) -> ModelResult<Option<T>>
    where
        C: FnOnce() -> ErrorContext,
    {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                self.record(context(), err)?;
                Ok(None)
            }
        }
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<ErrorRecord> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn error_key_overrides_context_key() {
        let record = ErrorRecord {
            context: error_context(json!({"error": "stale", "method": "x"})),
            error: "fresh".into(),
        };
        assert_eq!(record.to_value(), json!({"error": "fresh", "method": "x"}));
        assert_eq!(serde_json::to_value(&record).unwrap(), record.to_value());
    }

    #[test]
    fn non_object_context_is_wrapped() {
        let ctx = error_context(json!("raw"));
        assert_eq!(Value::Object(ctx), json!({"context": "raw"}));
    }

    #[test]
    fn capture_keeps_order_and_skips_context_on_success() {
        let mut sink = ErrorSink::new(false);
        let ok: ModelResult<u8> = Ok(1);
        let value = sink
            .capture(ok, || panic!("context must not be built on success"))
            .unwrap();
        assert_eq!(value, Some(1));

        for idx in 0..3 {
            let failed: ModelResult<u8> = Err(ModelError::malformed(format!("fragment {idx}")));
            let value = sink
                .capture(failed, || error_context(json!({"index": idx})))
                .unwrap();
            assert_eq!(value, None);
        }
        let indexes: Vec<_> = sink
            .errors()
            .iter()
            .map(|record| record.context["index"].clone())
            .collect();
        assert_eq!(indexes, vec![json!(0), json!(1), json!(2)]);
    }

    #[traced_test]
    #[test]
    fn debug_mode_logs_and_reraises() {
        let mut sink = ErrorSink::new(true);
        let err = sink
            .record(
                error_context(json!({"method": "get_input_sender"})),
                ModelError::resolution("missing sender id"),
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::Resolution { .. }));
        assert!(sink.is_empty());
        assert!(logs_contain("raising captured error in debug mode"));
        assert!(logs_contain("get_input_sender"));
    }
}
