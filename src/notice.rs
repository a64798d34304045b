//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`.
//! Role: Shared contract helper for CLI diagnostics (skipped overrides, missing registry).
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use crate::core::diagnostic::Diagnostic;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub key: Option<String>,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    pub fn from_diagnostic(diagnostic: &Diagnostic, cmd: &str, time: &str) -> Self {
        Self {
            kind: diagnostic.kind.as_str().to_string(),
            time: time.to_string(),
            cmd: cmd.to_string(),
            key: diagnostic.key.clone(),
            message: diagnostic.message.clone(),
            details: Map::new(),
        }
    }
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    if let Some(key) = &notice.key {
        inner.insert("key".to_string(), json!(key));
    }
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::{Notice, notice_json};
    use crate::core::diagnostic::{Diagnostic, DiagnosticKind};
    use serde_json::{Map, Value};

    #[test]
    fn notice_json_has_required_fields() {
        let mut details = Map::new();
        details.insert("skipped_count".to_string(), Value::from(3));

        let notice = Notice {
            kind: "registry_unavailable".to_string(),
            time: "2026-02-01T00:00:00Z".to_string(),
            cmd: "apply".to_string(),
            key: None,
            message: "overrides skipped".to_string(),
            details,
        };

        let value = notice_json(&notice);
        let obj = value
            .get("notice")
            .and_then(|v| v.as_object())
            .expect("notice object");

        assert_eq!(
            obj.get("kind").and_then(|v| v.as_str()),
            Some("registry_unavailable")
        );
        assert_eq!(
            obj.get("time").and_then(|v| v.as_str()),
            Some("2026-02-01T00:00:00Z")
        );
        assert_eq!(obj.get("cmd").and_then(|v| v.as_str()), Some("apply"));
        assert!(obj.get("key").is_none());
        assert_eq!(
            obj.get("message").and_then(|v| v.as_str()),
            Some("overrides skipped")
        );
        assert!(obj.get("details").and_then(|v| v.as_object()).is_some());
    }

    #[test]
    fn diagnostic_notice_carries_key() {
        let diagnostic = Diagnostic::new(
            DiagnosticKind::UnknownKey,
            "override failed: unknown option key x",
        )
        .with_key("x");
        let notice = Notice::from_diagnostic(&diagnostic, "apply", "2026-02-01T00:00:00Z");
        let value = notice_json(&notice);
        assert_eq!(value["notice"]["kind"], "unknown_key");
        assert_eq!(value["notice"]["key"], "x");
    }
}
