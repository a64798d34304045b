//! Purpose: Hold the state that belongs to exactly one job.
//! Exports: `JobContext`, `Rotation`, `parse_payload`.
//! Role: Carries the payload, the dump flag, and recorded diagnostics through preparation.
//! Invariants: Nothing here is process-wide; a context is created and consumed per job.
//! Invariants: A malformed payload yields a context with no overrides, never an error.
use crate::core::diagnostic::Diagnostic;
use crate::core::error::{Error, ErrorKind};
use crate::core::overrides::{DUMP_CONFIG_KEY, ROTATION_KEY};
use serde::Serialize;
use serde_json::Value;

const LEGACY_DUMP_KEY: &str = "dump-config";
const MIN_ROTATION_DEG: f64 = 1e-6;

/// Job-scoped state: the parsed payload, the dump flag, and recorded diagnostics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JobContext {
    payload: Option<Value>,
    dump_config: bool,
    diagnostics: Vec<Diagnostic>,
}

impl JobContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_payload(payload: Value) -> Self {
        let dump_config = payload_requests_dump(&payload);
        Self {
            payload: Some(payload),
            dump_config,
            diagnostics: Vec::new(),
        }
    }

    /// Parse raw payload bytes; an empty or malformed payload yields a job with no overrides.
    pub fn from_payload_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::new();
        }
        match parse_payload(bytes) {
            Ok(payload) => Self::from_payload(payload),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    hint = err.hint().unwrap_or_default(),
                    "failed to parse override payload; continuing without overrides"
                );
                Self::new()
            }
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn dump_config(&self) -> bool {
        self.dump_config
    }

    pub(crate) fn take_payload(&mut self) -> Option<Value> {
        self.payload.take()
    }

    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn rotation(&self) -> Rotation {
        self.payload
            .as_ref()
            .map(Rotation::from_payload)
            .unwrap_or_default()
    }
}

/// Parse payload bytes that must hold a single JSON object.
pub fn parse_payload(bytes: &[u8]) -> Result<Value, Error> {
    let payload: Value = crate::json::parse::from_slice(bytes).map_err(|err| {
        Error::new(ErrorKind::InvalidPayload)
            .with_message("invalid json payload")
            .with_hint(crate::json::parse::hint_for_error(&err, "payload"))
            .with_source(err)
    })?;
    if !payload.is_object() {
        return Err(Error::new(ErrorKind::InvalidPayload)
            .with_message("payload must be a JSON object")
            .with_hint("Wrap overrides in an object, e.g. '{\"layer_height\": 0.1}'."));
    }
    Ok(payload)
}

fn payload_requests_dump(payload: &Value) -> bool {
    let Some(entries) = payload.as_object() else {
        return false;
    };
    let truthy = |value: &Value| match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64() == Some(1.0),
        Value::String(text) => text == "true" || text == "1",
        _ => false,
    };
    entries.get(DUMP_CONFIG_KEY).is_some_and(truthy)
        || entries
            .get(LEGACY_DUMP_KEY)
            .is_some_and(|value| !matches!(value, Value::Bool(false)))
}

/// Model rotation in degrees about each axis; zero means no rotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Rotation {
    /// Read `rotation_deg` from a payload; non-numeric axes and negligible angles are ignored.
    pub fn from_payload(payload: &Value) -> Self {
        let Some(rotation) = payload.get(ROTATION_KEY).filter(|v| v.is_object()) else {
            return Self::default();
        };
        let axis = |name: &str| {
            rotation
                .get(name)
                .and_then(Value::as_f64)
                .filter(|deg| deg.abs() >= MIN_ROTATION_DEG)
                .unwrap_or(0.0)
        };
        Self {
            x: axis("x"),
            y: axis("y"),
            z: axis("z"),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// Non-zero axis rotations in x, y, z order, in radians.
    pub fn radians(&self) -> Vec<(char, f64)> {
        [('x', self.x), ('y', self.y), ('z', self.z)]
            .into_iter()
            .filter(|(_, deg)| *deg != 0.0)
            .map(|(axis, deg)| (axis, deg.to_radians()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{JobContext, Rotation, parse_payload};
    use crate::core::diagnostic::{Diagnostic, DiagnosticKind};
    use crate::core::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn payload_bytes_drive_dump_flag() {
        assert!(JobContext::from_payload_bytes(br#"{"dumpConfig": true}"#).dump_config());
        assert!(JobContext::from_payload_bytes(br#"{"dumpConfig": 1}"#).dump_config());
        assert!(JobContext::from_payload_bytes(br#"{"dump-config": {}}"#).dump_config());
        assert!(!JobContext::from_payload_bytes(br#"{"dumpConfig": false}"#).dump_config());
        assert!(!JobContext::from_payload_bytes(br#"{"wall_loops": 1}"#).dump_config());
    }

    #[test]
    fn malformed_payload_means_no_overrides() {
        let ctx = JobContext::from_payload_bytes(b"{not json");
        assert!(ctx.payload().is_none());
        assert!(JobContext::from_payload_bytes(b"  ").payload().is_none());
    }

    #[test]
    fn strict_parse_requires_an_object() {
        assert!(parse_payload(br#"{"wall_loops": 3}"#).is_ok());
        let err = parse_payload(b"[1, 2]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
        let err = parse_payload(b"{oops").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPayload);
        assert!(err.hint().expect("hint").starts_with("parse category: syntax"));
        assert!(JobContext::from_payload_bytes(b"[1, 2]").payload().is_none());
    }

    #[test]
    fn diagnostics_are_taken_once() {
        let mut ctx = JobContext::from_payload(json!({"rotation_deg": {"x": 30}}));
        ctx.record(Diagnostic::new(DiagnosticKind::UnknownKey, "override failed").with_key("x"));
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.take_diagnostics().len(), 1);
        assert!(ctx.diagnostics().is_empty());
        assert_eq!(ctx.rotation().x, 30.0);
        assert!(ctx.take_payload().is_some());
        assert!(ctx.rotation().is_identity());
    }

    #[test]
    fn rotation_ignores_negligible_and_non_numeric_axes() {
        let rotation = Rotation::from_payload(&json!({
            "rotation_deg": {"x": 1e-9, "y": "90", "z": -45}
        }));
        assert_eq!(
            rotation,
            Rotation {
                x: 0.0,
                y: 0.0,
                z: -45.0
            }
        );
        assert_eq!(rotation.radians().len(), 1);
        assert!(Rotation::from_payload(&json!({"rotation_deg": 5})).is_identity());
    }
}
