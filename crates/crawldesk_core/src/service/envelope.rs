//! Response envelope returned by service calls.

use serde::Serialize;
use serde_json::{Map, Value};

/// `{success, message, <payload-key>: data | null}` result of one service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

impl<T: Serialize> ResponseEnvelope<T> {
    /// Renders the envelope with the payload stored under `payload_key`.
    pub fn to_json(&self, payload_key: &str) -> serde_json::Result<Value> {
        let mut object = Map::new();
        object.insert("success".to_string(), Value::Bool(self.success));
        object.insert("message".to_string(), Value::String(self.message.clone()));
        let payload = match self.data.as_ref() {
            Some(data) => serde_json::to_value(data)?,
            None => Value::Null,
        };
        object.insert(payload_key.to_string(), payload);
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::ResponseEnvelope;
    use serde_json::json;

    #[test]
    fn payload_is_stored_under_requested_key() {
        let envelope = ResponseEnvelope::ok("article created", Some(json!({"id": 7})));
        assert_eq!(
            envelope.to_json("article").unwrap(),
            json!({"success": true, "message": "article created", "article": {"id": 7}})
        );
    }

    #[test]
    fn failure_has_null_payload() {
        let envelope = ResponseEnvelope::<u8>::fail("boom");
        assert_eq!(
            envelope.to_json("articles").unwrap(),
            json!({"success": false, "message": "boom", "articles": null})
        );
    }
}
