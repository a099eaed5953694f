//! crates/site_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! Every entity lives in the managed KV store as a JSON document under a
//! colon-delimited string key; the builders in [`keys`] are the single
//! source of truth for that layout.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The two-valued admin role carried in a user's JWT claims.
/// Ordinary site visitors have no permission at all (`None` on [`User`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Full,
    Readonly,
}

/// A registered user, keyed by email. Admin-console accounts created from
/// the dashboard are keyed by username instead; the `email` field then
/// holds the username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<Permission>,
    pub created_at: DateTime<Utc>,
}

/// A published article on the marketing site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One message of a chat-widget conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// A persisted chat-widget transcript. Visitors are anonymous, so the
/// widget may attach its own `visitor_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLog {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<String>,
    pub messages: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
}

/// Customer feedback submitted from the site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub email: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default)]
    pub file_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A completed questionnaire; the answers are free-form JSON shaped by the
/// front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Questionnaire {
    pub id: Uuid,
    pub email: String,
    pub answers: Value,
    #[serde(default)]
    pub file_urls: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A service application. Its `id` is the millisecond timestamp embedded
/// in the storage key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub email: String,
    pub service: String,
    pub details: String,
    #[serde(default)]
    pub file_urls: Vec<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// The application statuses the admin console knows about. The status API
/// accepts any string; the console owns the transition rules.
pub mod status {
    pub const PENDING: &str = "pending";
    pub const ACCEPTED: &str = "accepted";
    pub const COMPLETED: &str = "completed";
    pub const REJECTED: &str = "rejected";
}

/// Storage-key builders. The prefixes are load-bearing: list endpoints
/// scan them, and the submission/feedback/questionnaire keys embed the
/// submitting user's email so my-data lookups stay prefix-scoped.
pub mod keys {
    use uuid::Uuid;

    pub const USER_PREFIX: &str = "user:";
    pub const PHONE_PREFIX: &str = "phone:";
    pub const ARTICLE_PREFIX: &str = "article:";
    pub const CHAT_LOG_PREFIX: &str = "chat-log:";
    pub const FEEDBACK_PREFIX: &str = "customer-feedback:";
    pub const QUESTIONNAIRE_PREFIX: &str = "user_questionnaires:";
    pub const SUBMISSION_PREFIX: &str = "submission:";

    pub fn user(id: &str) -> String {
        format!("{USER_PREFIX}{id}")
    }

    /// Phone index entry; the value is the owning user's email as a plain
    /// string, not a JSON document.
    pub fn phone(phone: &str) -> String {
        format!("{PHONE_PREFIX}{phone}")
    }

    pub fn article(id: Uuid) -> String {
        format!("{ARTICLE_PREFIX}{id}")
    }

    pub fn chat_log(id: Uuid) -> String {
        format!("{CHAT_LOG_PREFIX}{id}")
    }

    pub fn feedback(email: &str, id: Uuid) -> String {
        format!("{FEEDBACK_PREFIX}{email}:{id}")
    }

    pub fn questionnaire(email: &str, id: Uuid) -> String {
        format!("{QUESTIONNAIRE_PREFIX}{email}:{id}")
    }

    pub fn submission(email: &str, timestamp_ms: i64) -> String {
        format!("{SUBMISSION_PREFIX}{email}:{timestamp_ms}")
    }
}

/// Decodes a stored document tolerantly. Writers always store raw JSON
/// objects, but a store migrated from the original deployment may hold the
/// legacy double-encoded form (a JSON string whose content is itself JSON).
pub fn decode_document<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_str::<T>(raw) {
        Ok(value) => Ok(value),
        Err(first_err) => match serde_json::from_str::<String>(raw) {
            Ok(inner) => serde_json::from_str(&inner),
            Err(_) => Err(first_err),
        },
    }
}

/// Pulls the owning email out of an untyped stored document.
pub fn document_email(doc: &Value) -> Option<&str> {
    doc.get("email").and_then(Value::as_str)
}

/// Collects every uploaded-file URL a stored document references, so
/// deletes can fan out to the blob store. Accepts both the current
/// `file_urls` field and the legacy `fileUrls` spelling.
pub fn document_file_urls(doc: &Value) -> Vec<String> {
    let urls = doc
        .get("file_urls")
        .or_else(|| doc.get("fileUrls"))
        .and_then(Value::as_array);
    match urls {
        Some(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_document_accepts_raw_objects() {
        let raw = r#"{"email":"a@b.com","password_hash":"h","created_at":"2024-01-01T00:00:00Z"}"#;
        let user: User = decode_document(raw).unwrap();
        assert_eq!(user.email, "a@b.com");
        assert!(user.permission.is_none());
    }

    #[test]
    fn decode_document_accepts_double_encoded_strings() {
        let inner = r#"{"email":"a@b.com","password_hash":"h","phone":"13800138000","created_at":"2024-01-01T00:00:00Z"}"#;
        let raw = serde_json::to_string(inner).unwrap();
        let user: User = decode_document(&raw).unwrap();
        assert_eq!(user.phone.as_deref(), Some("13800138000"));
    }

    #[test]
    fn decode_document_rejects_garbage() {
        assert!(decode_document::<User>("not json").is_err());
    }

    #[test]
    fn file_urls_cover_both_spellings() {
        let current = json!({ "file_urls": ["https://blob/a", "https://blob/b"] });
        let legacy = json!({ "fileUrls": ["https://blob/c"] });
        let none = json!({ "content": "hi" });
        assert_eq!(document_file_urls(&current).len(), 2);
        assert_eq!(document_file_urls(&legacy), vec!["https://blob/c"]);
        assert!(document_file_urls(&none).is_empty());
    }

    #[test]
    fn submission_keys_embed_email_and_timestamp() {
        assert_eq!(
            keys::submission("a@b.com", 1700000000000),
            "submission:a@b.com:1700000000000"
        );
    }

    #[test]
    fn permission_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Permission::Full).unwrap(),
            "\"full\""
        );
        assert_eq!(
            serde_json::from_str::<Permission>("\"readonly\"").unwrap(),
            Permission::Readonly
        );
    }
}
