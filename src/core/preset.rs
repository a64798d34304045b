//! Purpose: Define the baseline job profile applied on top of registry defaults.
//! Exports: `Preset`, `baseline`.
//! Role: Runs between default seeding and payload overrides.
//! Invariants: A preset entry that cannot be applied is logged and skipped; never fatal.
use crate::core::coerce;
use crate::core::registry::OptionRegistry;
use crate::core::store::OptionStore;
use serde_json::{Value, json};

#[derive(Clone, Debug, PartialEq)]
pub struct Preset {
    entries: Vec<(String, Value)>,
}

impl Preset {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.entries.push((key.into(), value));
        self
    }

    /// Apply every entry in order; returns the keys that could not be applied.
    pub fn apply(&self, registry: &OptionRegistry, store: &mut OptionStore) -> Vec<String> {
        let mut failed = Vec::new();
        for (key, value) in &self.entries {
            if let Err(failure) = coerce::apply_value(registry, store, key, value) {
                let type_name = store
                    .get(key)
                    .map(|value| value.option_type().as_str())
                    .or_else(|| registry.get(key).map(|def| def.option_type.as_str()))
                    .unwrap_or("missing");
                tracing::warn!(
                    key = %key,
                    option_type = type_name,
                    %failure,
                    "failed to apply preset value"
                );
                failed.push(key.clone());
            }
        }
        failed
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-walled, hollow, support-free draft profile.
pub fn baseline() -> Preset {
    Preset::new()
        .with("layer_height", json!(0.2))
        .with("sparse_infill_density", json!(0))
        .with("wall_loops", json!(2))
        .with("top_shell_layers", json!(0))
        .with("bottom_shell_layers", json!(0))
        .with("enable_support", json!(false))
        .with("skirt_loops", json!(0))
        .with("brim_width", json!(0.0))
        .with("wall_generator", json!("classic"))
        .with("ensure_vertical_shell_thickness", json!("none"))
        .with("precise_outer_wall", json!(false))
        .with("thick_internal_bridges", json!(false))
}
