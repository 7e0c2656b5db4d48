//! Event envelope decoding and dispatch.
//!
//! Every pushed domain event arrives as a JSON envelope:
//!
//! ```text
//! { "actionType": "CREATE" | "UPDATE" | "DELETE", "payload": <entity> }
//! ```
//!
//! Decoding happens in two steps: the envelope is parsed shallowly first,
//! and the payload is only deserialized into its entity type when the
//! action type matches the one the handler was built for. A body that is
//! not a valid envelope fails with [`SyncError::MalformedEnvelope`] rather
//! than being dropped; the transport's message loop logs it and moves on.

use crate::error::Result;
use crate::transport::MessageHandler;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Operation carried by a pushed event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

/// Shallow envelope shape, payload left undecoded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    action_type: ActionType,
    payload: serde_json::Value,
}

/// Decode an envelope body, returning the typed payload when the action
/// type matches `expected` and `None` when it does not.
pub fn decode_matching<T: DeserializeOwned>(body: &str, expected: ActionType) -> Result<Option<T>> {
    let envelope: RawEnvelope = serde_json::from_str(body)?;
    if envelope.action_type != expected {
        return Ok(None);
    }
    let payload = serde_json::from_value(envelope.payload)?;
    Ok(Some(payload))
}

/// Build a message handler bound to a single action type.
///
/// The returned handler invokes `on_match` at most once per message, with
/// the decoded payload. Non-matching action types are a clean no-op.
pub fn handler<T, F>(expected: ActionType, on_match: F) -> MessageHandler
where
    T: DeserializeOwned,
    F: Fn(T) + Send + Sync + 'static,
{
    Arc::new(move |body: &str| {
        if let Some(payload) = decode_matching::<T>(body, expected)? {
            on_match(payload);
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Thought;
    use parking_lot::Mutex;

    fn thought_body(action: &str) -> String {
        format!(
            r#"{{"actionType":"{}","payload":{{
                "id":"1","message":"hi","votes":0,"completed":false,
                "category":"Start","retroId":"r1",
                "createdAt":"2024-01-01T00:00:00.000Z"}}}}"#,
            action
        )
    }

    #[test]
    fn test_matching_action_invokes_once() {
        let seen: Arc<Mutex<Vec<Thought>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = handler(ActionType::Create, move |t: Thought| sink.lock().push(t));

        handle(&thought_body("CREATE")).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, "1");
    }

    #[test]
    fn test_non_matching_action_is_filtered() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = handler(ActionType::Update, move |t: Thought| sink.lock().push(t));

        handle(&thought_body("CREATE")).unwrap();

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_malformed_body_errors_without_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = handler(ActionType::Create, move |t: Thought| sink.lock().push(t));

        assert!(handle("not json").is_err());
        assert!(handle("").is_err());
        assert!(handle(r#"{"payload":{}}"#).is_err());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_payload_must_decode_as_entity() {
        let handle = handler(ActionType::Create, |_: Thought| {});
        let result = handle(r#"{"actionType":"CREATE","payload":{"id":"1"}}"#);
        assert!(result.is_err());
    }
}
