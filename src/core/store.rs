//! Purpose: Own the mutable per-job map of option values.
//! Exports: `OptionStore`.
//! Role: Target of default seeding, preset tweaks, and override application.
//! Invariants: Every stored value carries the type tag its registry entry declares.
//! Invariants: A failed write leaves the store exactly as it was.
use crate::core::coerce::{self, Coerced, CoercionFailure};
use crate::core::registry::{OptionDef, OptionRegistry};
use crate::core::value::{OptionValue, Serialized};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionStore {
    values: BTreeMap<String, OptionValue>,
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding every registry key at its default.
    pub fn seeded(registry: &OptionRegistry) -> Self {
        let mut store = Self::new();
        store.seed(registry);
        store
    }

    /// Reset every registry key to its default. Running it twice yields the same store.
    pub fn seed(&mut self, registry: &OptionRegistry) {
        for def in registry.iter() {
            self.values.insert(def.key.clone(), def.initial_value());
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Store `coerced` for `def`, creating the entry from the definition when absent.
    pub fn write(&mut self, def: &OptionDef, coerced: Coerced) -> Result<(), CoercionFailure> {
        match self.values.get_mut(&def.key) {
            Some(slot) => coerce::write(slot, coerced),
            None => {
                let mut value = def.initial_value();
                coerce::write(&mut value, coerced)?;
                self.values.insert(def.key.clone(), value);
                Ok(())
            }
        }
    }

    /// Key-sorted `key = serialized` lines.
    pub fn dump_lines(&self, registry: &OptionRegistry) -> Vec<String> {
        self.values
            .iter()
            .map(|(key, value)| {
                let text = match serialize(registry, key, value) {
                    Serialized::Scalar(text) => text,
                    Serialized::Vector(items) => items.join(","),
                };
                format!("{key} = {text}")
            })
            .collect()
    }

    /// `{key: serialized}` with scalars as strings and vectors as string lists.
    pub fn export(&self, registry: &OptionRegistry) -> Value {
        let mut out = Map::new();
        for (key, value) in &self.values {
            let encoded = match serialize(registry, key, value) {
                Serialized::Scalar(text) => Value::String(text),
                Serialized::Vector(items) => {
                    Value::Array(items.into_iter().map(Value::String).collect())
                }
            };
            out.insert(key.clone(), encoded);
        }
        Value::Object(out)
    }
}

fn serialize(registry: &OptionRegistry, key: &str, value: &OptionValue) -> Serialized {
    match registry.get(key) {
        Some(def) => def.serialize_value(value),
        None => value.serialize(&[]),
    }
}

#[cfg(test)]
mod tests {
    use super::OptionStore;
    use crate::core::coerce::{Coerced, apply_value};
    use crate::core::registry::OptionRegistry;
    use crate::core::value::{OptionValue, Slots};
    use serde_json::json;

    fn registry() -> OptionRegistry {
        OptionRegistry::from_json_str(
            r#"{"options": [
                {"key": "layer_height", "type": "float", "default": 0.2},
                {"key": "nozzle_diameter", "type": "floats", "default": [0.4, 0.4]},
                {"key": "wall_loops", "type": "int"},
                {"key": "sparse_infill_pattern", "type": "enum", "default": "grid",
                 "enum_symbols": [{"value": "grid", "code": 0}, {"value": "gyroid", "code": 1}]}
            ]}"#,
        )
        .expect("registry")
    }

    #[test]
    fn seeding_is_idempotent() {
        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        let first = store.clone();
        store.seed(&registry);
        assert_eq!(store, first);
        assert_eq!(store.len(), 4);
        assert_eq!(store.get("wall_loops"), Some(&OptionValue::Int(0)));
    }

    #[test]
    fn write_creates_missing_entry_from_definition() {
        let registry = registry();
        let mut store = OptionStore::new();
        let def = registry.get("nozzle_diameter").expect("def");
        store.write(def, Coerced::Float(0.6)).expect("write");
        assert_eq!(
            store.get("nozzle_diameter"),
            Some(&OptionValue::Floats(Slots::Plain(vec![0.6, 0.6])))
        );
    }

    #[test]
    fn failed_write_leaves_store_untouched() {
        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        let before = store.clone();
        let rejected =
            apply_value(&registry, &mut store, "sparse_infill_pattern", &json!("hexagon"));
        assert!(rejected.is_err());
        assert!(apply_value(&registry, &mut store, "nope", &json!(1)).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn dump_and_export_use_symbol_names() {
        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        apply_value(&registry, &mut store, "sparse_infill_pattern", &json!("gyroid"))
            .expect("apply");
        assert_eq!(
            store.dump_lines(&registry),
            vec![
                "layer_height = 0.2",
                "nozzle_diameter = 0.4,0.4",
                "sparse_infill_pattern = gyroid",
                "wall_loops = 0",
            ]
        );
        let exported = store.export(&registry);
        assert_eq!(exported["nozzle_diameter"], json!(["0.4", "0.4"]));
        assert_eq!(exported["sparse_infill_pattern"], json!("gyroid"));
    }
}
