//! Purpose: Map legacy override keys onto one or more canonical option keys.
//! Exports: `AliasTable`, `AliasEntry`, `AliasTarget`, `AliasTransform`.
//! Role: Second chance for payload keys the registry does not know directly.
//! Invariants: Every target of an alias is attempted, in order, even after a success.
//! Invariants: A fallback transform is tried at most once per target, after direct coercion fails.
use crate::core::coerce::{self, CoercionFailure};
use crate::core::error::{Error, ErrorKind};
use crate::core::registry::OptionRegistry;
use crate::core::store::OptionStore;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Rewrites a raw value that failed direct coercion into one the target accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AliasTransform {
    /// Case-insensitive label lookup producing an enum symbol string.
    LabelToSymbol(BTreeMap<String, String>),
}

impl AliasTransform {
    pub fn label_to_symbol<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        AliasTransform::LabelToSymbol(
            pairs
                .into_iter()
                .map(|(label, symbol)| (label.to_lowercase(), symbol.to_string()))
                .collect(),
        )
    }

    pub fn apply(&self, raw: &Value) -> Option<Value> {
        match self {
            AliasTransform::LabelToSymbol(labels) => {
                let label = raw.as_str()?.to_lowercase();
                labels.get(&label).map(|symbol| Value::String(symbol.clone()))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasTarget {
    pub key: String,
    pub fallback: Option<AliasTransform>,
}

impl AliasTarget {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: AliasTransform) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AliasEntry {
    pub legacy: String,
    pub targets: Vec<AliasTarget>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AliasTable {
    entries: BTreeMap<String, AliasEntry>,
}

#[derive(Deserialize)]
struct AliasFile {
    aliases: BTreeMap<String, Vec<RawTarget>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Key(String),
    Detailed {
        key: String,
        #[serde(default)]
        fallback: Option<RawTransform>,
    },
}

#[derive(Deserialize)]
struct RawTransform {
    labels: BTreeMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table of keys older clients still send.
    pub fn legacy() -> Self {
        let infill_labels = AliasTransform::label_to_symbol([
            ("grid", "grid"),
            ("gyroid", "gyroid"),
            ("cubic", "cubic"),
            ("triangles", "triangles"),
            ("rectilinear", "zig-zag"),
            ("lightning", "lightning"),
        ]);
        let mut table = Self::new();
        table.insert("supports_enabled", [AliasTarget::new("enable_support")]);
        table.insert(
            "cooling_fan_speed",
            [AliasTarget::new("fan_max_speed"), AliasTarget::new("fan_min_speed")],
        );
        table.insert(
            "nozzle_temperature_initial",
            [
                AliasTarget::new("nozzle_temperature_initial_layer"),
                AliasTarget::new("first_layer_temperature"),
            ],
        );
        table.insert(
            "bed_temperature_initial",
            [
                AliasTarget::new("bed_temperature_initial_layer"),
                AliasTarget::new("first_layer_bed_temperature"),
            ],
        );
        table.insert(
            "first_layer_height",
            [
                AliasTarget::new("first_layer_height"),
                AliasTarget::new("initial_layer_print_height"),
            ],
        );
        table.insert(
            "infill_pattern",
            [AliasTarget::new("sparse_infill_pattern").with_fallback(infill_labels)],
        );
        table
    }

    pub fn from_json_str(input: &str) -> Result<Self, Error> {
        let file: AliasFile = crate::json::parse::from_str(input).map_err(|err| {
            Error::new(ErrorKind::InvalidPayload)
                .with_message("alias table is not valid json")
                .with_hint(crate::json::parse::hint_for_error(&err, "alias table"))
                .with_source(err)
        })?;
        let mut table = Self::new();
        for (legacy, targets) in file.aliases {
            let targets = targets.into_iter().map(|raw| match raw {
                RawTarget::Key(key) => AliasTarget::new(key),
                RawTarget::Detailed { key, fallback } => AliasTarget {
                    key,
                    fallback: fallback.map(|transform| {
                        AliasTransform::label_to_symbol(
                            transform
                                .labels
                                .iter()
                                .map(|(label, symbol)| (label.as_str(), symbol.as_str())),
                        )
                    }),
                },
            });
            table.insert(legacy, targets);
        }
        Ok(table)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            let kind = if err.kind() == std::io::ErrorKind::NotFound {
                ErrorKind::NotFound
            } else {
                ErrorKind::Io
            };
            Error::new(kind)
                .with_message("failed to read alias table")
                .with_path(path)
                .with_source(err)
        })?;
        Self::from_json_str(&text).map_err(|err| err.with_path(path))
    }

    /// Add or replace the targets for `legacy`.
    pub fn insert(
        &mut self,
        legacy: impl Into<String>,
        targets: impl IntoIterator<Item = AliasTarget>,
    ) {
        let legacy = legacy.into();
        let entry = AliasEntry {
            legacy: legacy.clone(),
            targets: targets.into_iter().collect(),
        };
        self.entries.insert(legacy, entry);
    }

    /// Layer `other` on top of `self`; entries in `other` win.
    pub fn extend(&mut self, other: AliasTable) {
        self.entries.extend(other.entries);
    }

    pub fn get(&self, legacy: &str) -> Option<&AliasEntry> {
        self.entries.get(legacy)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply `raw` through the alias for `legacy`; true iff at least one target took it.
    pub fn resolve(
        &self,
        registry: &OptionRegistry,
        store: &mut OptionStore,
        legacy: &str,
        raw: &Value,
    ) -> bool {
        matches!(self.apply(registry, store, legacy, raw), Some(Ok(())))
    }

    /// Like `resolve`, but reports why every target failed.
    ///
    /// Returns `None` when `legacy` is not an alias, `Some(Ok(()))` when any target succeeded,
    /// and otherwise the first target's failure.
    pub fn apply(
        &self,
        registry: &OptionRegistry,
        store: &mut OptionStore,
        legacy: &str,
        raw: &Value,
    ) -> Option<Result<(), CoercionFailure>> {
        let entry = self.entries.get(legacy)?;
        let mut applied_any = false;
        let mut first_failure = None;
        for target in &entry.targets {
            match apply_target(registry, store, target, raw) {
                Ok(()) => applied_any = true,
                Err(failure) => {
                    tracing::debug!(
                        legacy,
                        target = %target.key,
                        %failure,
                        "alias target rejected value"
                    );
                    first_failure.get_or_insert(failure);
                }
            }
        }
        if applied_any {
            return Some(Ok(()));
        }
        Some(Err(first_failure.unwrap_or_else(|| CoercionFailure::UnknownKey {
            key: legacy.to_string(),
        })))
    }
}

fn apply_target(
    registry: &OptionRegistry,
    store: &mut OptionStore,
    target: &AliasTarget,
    raw: &Value,
) -> Result<(), CoercionFailure> {
    let failure = match coerce::apply_value(registry, store, &target.key, raw) {
        Ok(()) => return Ok(()),
        Err(failure) => failure,
    };
    match target.fallback.as_ref().and_then(|transform| transform.apply(raw)) {
        Some(mapped) => coerce::apply_value(registry, store, &target.key, &mapped),
        None => Err(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::{AliasTable, AliasTarget};
    use crate::core::diagnostic::DiagnosticKind;
    use crate::core::registry::OptionRegistry;
    use crate::core::store::OptionStore;
    use crate::core::value::{OptionValue, Slots};
    use serde_json::json;

    fn registry() -> OptionRegistry {
        OptionRegistry::from_json_str(
            r#"{"options": [
                {"key": "fan_max_speed", "type": "ints", "default": [100]},
                {"key": "fan_min_speed", "type": "ints", "default": [35]},
                {"key": "enable_support", "type": "bool"},
                {"key": "wall_loops", "type": "int", "default": 3},
                {"key": "sparse_infill_pattern", "type": "enum", "default": "grid",
                 "enum_symbols": [
                    {"value": "grid", "code": 0}, {"value": "gyroid", "code": 1},
                    {"value": "zig-zag", "code": 2}, {"value": "cubic", "code": 3}
                 ]}
            ]}"#,
        )
        .expect("registry")
    }

    #[test]
    fn fan_out_sets_every_target() {
        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        let table = AliasTable::legacy();
        assert!(table.resolve(&registry, &mut store, "cooling_fan_speed", &json!(80)));
        assert_eq!(
            store.get("fan_max_speed"),
            Some(&OptionValue::Ints(Slots::Plain(vec![80])))
        );
        assert_eq!(
            store.get("fan_min_speed"),
            Some(&OptionValue::Ints(Slots::Plain(vec![80])))
        );
    }

    #[test]
    fn partial_success_still_counts() {
        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        let table = AliasTable::legacy();
        // Neither first_layer_height nor initial_layer_print_height is registered.
        assert!(!table.resolve(&registry, &mut store, "first_layer_height", &json!(0.3)));

        let mut custom = AliasTable::new();
        custom.insert(
            "supports",
            [AliasTarget::new("missing_key"), AliasTarget::new("enable_support")],
        );
        assert!(custom.resolve(&registry, &mut store, "supports", &json!(true)));
        assert_eq!(store.get("enable_support"), Some(&OptionValue::Bool(true)));
    }

    #[test]
    fn rejected_target_keeps_its_value_while_others_apply() {
        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        let mut table = AliasTable::new();
        table.insert(
            "supports",
            [AliasTarget::new("wall_loops"), AliasTarget::new("enable_support")],
        );
        table.insert(
            "supports_reversed",
            [AliasTarget::new("enable_support"), AliasTarget::new("wall_loops")],
        );

        assert!(table.resolve(&registry, &mut store, "supports", &json!(true)));
        assert_eq!(store.get("enable_support"), Some(&OptionValue::Bool(true)));
        assert_eq!(store.get("wall_loops"), Some(&OptionValue::Int(3)));

        assert!(table.resolve(&registry, &mut store, "supports_reversed", &json!(false)));
        assert_eq!(store.get("enable_support"), Some(&OptionValue::Bool(false)));
        assert_eq!(store.get("wall_loops"), Some(&OptionValue::Int(3)));
    }

    #[test]
    fn infill_label_fallback_is_case_insensitive() {
        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        let table = AliasTable::legacy();
        assert!(table.resolve(&registry, &mut store, "infill_pattern", &json!("Rectilinear")));
        assert_eq!(store.get("sparse_infill_pattern"), Some(&OptionValue::Enum(2)));
        assert!(table.resolve(&registry, &mut store, "infill_pattern", &json!("gyroid")));
        assert_eq!(store.get("sparse_infill_pattern"), Some(&OptionValue::Enum(1)));

        let failure = table
            .apply(&registry, &mut store, "infill_pattern", &json!("honeycomb"))
            .expect("alias exists")
            .unwrap_err();
        assert_eq!(failure.kind(), DiagnosticKind::UnresolvableSymbol);
        assert_eq!(store.get("sparse_infill_pattern"), Some(&OptionValue::Enum(1)));
    }

    #[test]
    fn unknown_alias_is_not_applied() {
        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        let table = AliasTable::legacy();
        assert!(!table.resolve(&registry, &mut store, "not_an_alias", &json!(1)));
        assert!(table.apply(&registry, &mut store, "not_an_alias", &json!(1)).is_none());
    }

    #[test]
    fn loads_json_tables() {
        let table = AliasTable::from_json_str(
            r#"{"aliases": {
                "support": ["enable_support"],
                "pattern": [{"key": "sparse_infill_pattern", "fallback": {"labels": {"Zig Zag": "zig-zag"}}}]
            }}"#,
        )
        .expect("aliases");
        assert_eq!(table.len(), 2);

        let registry = registry();
        let mut store = OptionStore::seeded(&registry);
        assert!(table.resolve(&registry, &mut store, "pattern", &json!("ZIG ZAG")));
        assert_eq!(store.get("sparse_infill_pattern"), Some(&OptionValue::Enum(2)));
        assert!(table.resolve(&registry, &mut store, "support", &json!(true)));
    }
}
