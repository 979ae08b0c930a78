//! The request/response envelope every HTTP API reply uses:
//! `{"ok": true, "data": ...}` on success, `{"ok": false, "error": ...}`
//! on failure.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiEnvelope<T> {
    Ok { ok: OkTag, data: T },
    Err { ok: ErrTag, error: ApiErrorBody },
}

/// Zero-sized tags so `ok` always serializes as the literal `true`/`false`
/// without needing a manual `Serialize` impl for the envelope itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OkTag;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrTag;

impl Serialize for OkTag {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(true)
    }
}
impl<'de> Deserialize<'de> for OkTag {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        if bool::deserialize(d)? {
            Ok(OkTag)
        } else {
            Err(serde::de::Error::custom("expected ok=true"))
        }
    }
}
impl Serialize for ErrTag {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bool(false)
    }
}
impl<'de> Deserialize<'de> for ErrTag {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        if bool::deserialize(d)? {
            Err(serde::de::Error::custom("expected ok=false"))
        } else {
            Ok(ErrTag)
        }
    }
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        ApiEnvelope::Ok { ok: OkTag, data }
    }

    pub fn err(error: ApiErrorBody) -> Self {
        ApiEnvelope::Err { ok: ErrTag, error }
    }
}

/// The body of an `{ok:false}` response: a machine-readable `kind` (mirroring
/// [`CoreError`]'s taxonomy) plus a human-readable `message`, and — for a
/// `conflict` — the current `updated_at` the caller lost the race against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ApiErrorBody {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            current_updated_at: None,
        }
    }

    pub fn with_conflict_timestamp(mut self, current_updated_at: chrono::DateTime<chrono::Utc>) -> Self {
        self.current_updated_at = Some(current_updated_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_serializes_with_ok_true() {
        let env = ApiEnvelope::ok(serde_json::json!({"id": 1}));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["ok"], serde_json::json!(true));
        assert_eq!(v["data"]["id"], serde_json::json!(1));
    }

    #[test]
    fn err_envelope_serializes_with_ok_false() {
        let env: ApiEnvelope<()> = ApiEnvelope::err(ApiErrorBody::new("not_found", "no such card"));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v["ok"], serde_json::json!(false));
        assert_eq!(v["error"]["kind"], serde_json::json!("not_found"));
    }
}
