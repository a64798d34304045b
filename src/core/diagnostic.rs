//! Purpose: Record non-fatal problems found while applying a job's overrides.
//! Exports: `Diagnostic`, `DiagnosticKind`.
//! Role: Per-key failures are collected here instead of aborting the job.
//! Invariants: Diagnostics never alter the store; they only describe what was skipped.
use serde::Serialize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ShapeMismatch,
    UnresolvableSymbol,
    UnknownKey,
    RegistryUnavailable,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::ShapeMismatch => "shape_mismatch",
            DiagnosticKind::UnresolvableSymbol => "unresolvable_symbol",
            DiagnosticKind::UnknownKey => "unknown_key",
            DiagnosticKind::RegistryUnavailable => "registry_unavailable",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            key: None,
            message: message.into(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, DiagnosticKind};
    use serde_json::json;

    #[test]
    fn serializes_without_absent_key() {
        let diag = Diagnostic::new(DiagnosticKind::RegistryUnavailable, "no registry loaded");
        assert_eq!(
            serde_json::to_value(&diag).expect("encode"),
            json!({"kind": "registry_unavailable", "message": "no registry loaded"})
        );

        let keyed = Diagnostic::new(DiagnosticKind::UnknownKey, "override failed").with_key("x");
        assert_eq!(
            serde_json::to_value(&keyed).expect("encode")["key"],
            json!("x")
        );
    }
}
