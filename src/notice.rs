//! Purpose: Define a stable, structured schema for non-fatal load notices.
//! Exports: `Notice`, `NoticeKind`, `notice_json`.
//! Role: Carries skipped keys and non-array fields from the loader to callers and the CLI.
//! Invariants: Notices are non-fatal and never alter the loaded arrays beyond zero-fill.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoticeKind {
    /// Top-level key the loader does not know; its value was skipped.
    UnexpectedKey,
    /// Recognized field whose value is not an array; output left zeroed.
    NonArrayField,
    /// Location row that is not an array; that angle's column left zeroed.
    NonArrayRow,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeKind::UnexpectedKey => "unexpected_key",
            NoticeKind::NonArrayField => "non_array_field",
            NoticeKind::NonArrayRow => "non_array_row",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub key: String,
    pub offset: usize,
    pub message: String,
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind.as_str()));
    inner.insert("key".to_string(), json!(notice.key));
    inner.insert("offset".to_string(), json!(notice.offset));
    inner.insert("message".to_string(), json!(notice.message));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}
