//! Purpose: Drive coercion and alias resolution across a whole override payload.
//! Exports: `apply_overrides`, `CONFIG_KEY`, `ROTATION_KEY`, `DUMP_CONFIG_KEY`.
//! Role: The only writer of payload values into a job's option store.
//! Invariants: Never fails; per-key problems become diagnostics in the job context.
//! Invariants: The nested `config` block is applied before flat keys, so flat keys win.
//! Invariants: Without a registry nothing is written and exactly one diagnostic is recorded.
use crate::core::alias::AliasTable;
use crate::core::coerce::{self, CoercionFailure};
use crate::core::diagnostic::{Diagnostic, DiagnosticKind};
use crate::core::job::JobContext;
use crate::core::registry::OptionRegistry;
use crate::core::store::OptionStore;
use serde_json::Value;

/// Nested object of option overrides.
pub const CONFIG_KEY: &str = "config";
/// Model rotation in degrees; consumed by the geometry collaborator.
pub const ROTATION_KEY: &str = "rotation_deg";
/// Job flag requesting a dump of the finished store.
pub const DUMP_CONFIG_KEY: &str = "dumpConfig";

const RESERVED_KEYS: [&str; 3] = [CONFIG_KEY, ROTATION_KEY, DUMP_CONFIG_KEY];

pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

pub fn apply_overrides(
    registry: Option<&OptionRegistry>,
    aliases: &AliasTable,
    store: &mut OptionStore,
    payload: &Value,
    ctx: &mut JobContext,
) {
    let Some(registry) = registry else {
        tracing::warn!("option registry unavailable; overrides skipped");
        ctx.record(Diagnostic::new(
            DiagnosticKind::RegistryUnavailable,
            "option registry unavailable; overrides skipped",
        ));
        return;
    };
    let Some(entries) = payload.as_object() else {
        tracing::debug!("override payload is not an object; nothing to apply");
        return;
    };

    if let Some(nested) = entries.get(CONFIG_KEY).and_then(Value::as_object) {
        tracing::debug!(count = nested.len(), "applying nested override block");
        for (key, raw) in nested {
            apply_entry(registry, aliases, store, key, raw, ctx);
        }
    }
    for (key, raw) in entries {
        apply_entry(registry, aliases, store, key, raw, ctx);
    }
}

fn apply_entry(
    registry: &OptionRegistry,
    aliases: &AliasTable,
    store: &mut OptionStore,
    key: &str,
    raw: &Value,
    ctx: &mut JobContext,
) {
    if is_reserved(key) {
        return;
    }
    let direct = match coerce::apply_value(registry, store, key, raw) {
        Ok(()) => return,
        Err(failure) => failure,
    };
    let failure = match aliases.apply(registry, store, key, raw) {
        Some(Ok(())) => return,
        Some(Err(alias_failure)) if matches!(direct, CoercionFailure::UnknownKey { .. }) => {
            alias_failure
        }
        _ => direct,
    };
    tracing::warn!(key, %failure, "failed to apply override");
    ctx.record(
        Diagnostic::new(failure.kind(), format!("override failed: {failure}"))
            .with_key(key),
    );
}

#[cfg(test)]
mod tests {
    use super::apply_overrides;
        use crate::core::alias::AliasTable;
    use crate::core::diagnostic::DiagnosticKind;
    use crate::core::job::JobContext;
    use crate::core::registry::OptionRegistry;
    use crate::core::store::OptionStore;
    use crate::core::value::OptionValue;
    use serde_json::json;

    fn registry() -> OptionRegistry {
        OptionRegistry::from_json_str(
            r#"{"options": [
                {"key": "layer_height", "type": "float", "default": 0.2},
                {"key": "wall_loops", "type": "int", "default": 2},
                {"key": "enable_support", "type": "bool"},
                {"key": "sparse_infill_pattern", "type": "enum", "default": "grid",
                 "enum_symbols": [{"value": "grid", "code": 0}, {"value": "gyroid", "code": 1}]}
            ]}"#,
        )
        .expect("registry")
    }

    fn run(payload: serde_json::Value) -> (OptionStore, JobContext) {
        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        let mut ctx = JobContext::new();
        apply_overrides(
            Some(&registry),
            &AliasTable::legacy(),
            &mut store,
            &payload,
            &mut ctx,
        );
        (store, ctx)
    }

    #[test]
    fn nested_and_flat_keys_both_apply() {
        let (store, ctx) = run(json!({"config": {"layer_height": 0.1}, "wall_loops": 3}));
        assert_eq!(store.get("layer_height"), Some(&OptionValue::Float(0.1)));
        assert_eq!(store.get("wall_loops"), Some(&OptionValue::Int(3)));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn flat_keys_overwrite_nested_block() {
        let (store, ctx) = run(json!({"wall_loops": 5, "config": {"wall_loops": 1}}));
        assert_eq!(store.get("wall_loops"), Some(&OptionValue::Int(5)));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn alias_keys_apply_without_diagnostics() {
        let (store, ctx) = run(json!({"supports_enabled": true}));
        assert_eq!(store.get("enable_support"), Some(&OptionValue::Bool(true)));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn reserved_keys_are_not_options() {
        let (_, ctx) = run(json!({
            "rotation_deg": {"z": 90},
            "dumpConfig": true,
            "config": {"config": 1, "rotation_deg": 2}
        }));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn failures_are_recorded_per_key_and_do_not_stop_the_pass() {
        let (store, ctx) = run(json!({
            "sparse_infill_pattern": "hexagon",
            "mystery": 1,
            "layer_height": "thin",
            "wall_loops": 4
        }));
        assert_eq!(store.get("wall_loops"), Some(&OptionValue::Int(4)));
        assert_eq!(store.get("sparse_infill_pattern"), Some(&OptionValue::Enum(0)));
        let kinds: Vec<_> = ctx
            .diagnostics()
            .iter()
            .map(|d| (d.key.as_deref().unwrap_or(""), d.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("sparse_infill_pattern", DiagnosticKind::UnresolvableSymbol),
                ("mystery", DiagnosticKind::UnknownKey),
                ("layer_height", DiagnosticKind::ShapeMismatch),
            ]
        );
    }

    #[test]
    fn missing_registry_records_one_diagnostic() {
        let mut store = OptionStore::new();
        let mut ctx = JobContext::new();
        apply_overrides(
            None,
            &AliasTable::legacy(),
            &mut store,
            &json!({"layer_height": 0.1, "wall_loops": 3}),
            &mut ctx,
        );
        assert!(store.is_empty());
        assert_eq!(ctx.diagnostics().len(), 1);
        assert_eq!(ctx.diagnostics()[0].kind, DiagnosticKind::RegistryUnavailable);
    }

    #[test]
    fn non_object_payload_is_a_no_op() {
        let (store, ctx) = run(json!([1, 2, 3]));
        assert_eq!(store.get("wall_loops"), Some(&OptionValue::Int(2)));
        assert!(ctx.diagnostics().is_empty());
    }
}
