//! Purpose: Load and hold the read-only registry of option definitions.
//! Exports: `OptionRegistry`, `OptionDef`, `EnumSymbol`.
//! Role: Source of type tags, bounds, symbol tables, defaults, and display metadata.
//! Invariants: Keys are unique; the registry is never mutated after construction.
//! Invariants: Defaults are coerced once at load, so every stored default matches its type tag.
//! Notes: Absent bounds and dimensions are `None`; there are no sentinel values.
use crate::core::coerce;
use crate::core::error::{Error, ErrorKind};
use crate::core::option_type::{GuiType, OptionMode, OptionType, Technology};
use crate::core::value::{OptionValue, Serialized};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CATEGORY: &str = "General";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct EnumSymbol {
    pub value: String,
    pub code: i32,
    #[serde(default)]
    pub label: Option<String>,
}

impl EnumSymbol {
    pub fn new(value: impl Into<String>, code: i32) -> Self {
        Self {
            value: value.into(),
            code,
            label: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OptionDef {
    pub key: String,
    pub option_type: OptionType,
    pub nullable: bool,
    pub category: String,
    pub mode: OptionMode,
    pub label: String,
    pub full_label: Option<String>,
    pub tooltip: Option<String>,
    pub sidetext: Option<String>,
    pub gui_type: GuiType,
    pub gui_flags: Option<String>,
    pub aliases: Vec<String>,
    pub shortcut: Vec<String>,
    pub height: Option<i32>,
    pub width: Option<i32>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub max_literal: Option<f64>,
    pub enum_symbols: Option<Vec<EnumSymbol>>,
    pub default: Option<OptionValue>,
    pub serialization_ordinal: u32,
    pub readonly: bool,
    pub technology: Technology,
}

impl OptionDef {
    pub fn new(key: impl Into<String>, option_type: OptionType) -> Self {
        Self {
            key: key.into(),
            option_type,
            nullable: false,
            category: String::new(),
            mode: OptionMode::default(),
            label: String::new(),
            full_label: None,
            tooltip: None,
            sidetext: None,
            gui_type: GuiType::default(),
            gui_flags: None,
            aliases: Vec::new(),
            shortcut: Vec::new(),
            height: None,
            width: None,
            min: None,
            max: None,
            max_literal: None,
            enum_symbols: None,
            default: None,
            serialization_ordinal: 0,
            readonly: false,
            technology: Technology::default(),
        }
    }

    pub fn is_vector(&self) -> bool {
        self.option_type.is_vector()
    }

    /// Category label with the empty label mapped to "General".
    pub fn category_label(&self) -> &str {
        if self.category.is_empty() {
            DEFAULT_CATEGORY
        } else {
            &self.category
        }
    }

    pub fn symbols(&self) -> &[EnumSymbol] {
        self.enum_symbols.as_deref().unwrap_or(&[])
    }

    /// Value a fresh store holds for this key: the default, or the type's zero value.
    pub fn initial_value(&self) -> OptionValue {
        self.default
            .clone()
            .unwrap_or_else(|| OptionValue::empty(self.option_type, self.nullable))
    }

    pub fn serialize_value(&self, value: &OptionValue) -> Serialized {
        value.serialize(self.symbols())
    }
}

#[derive(Deserialize)]
struct RegistryFile {
    options: Vec<RawOptionDef>,
}

#[derive(Deserialize)]
struct RawOptionDef {
    key: String,
    #[serde(rename = "type")]
    option_type: OptionType,
    #[serde(default)]
    nullable: bool,
    #[serde(default)]
    category: String,
    #[serde(default)]
    mode: OptionMode,
    #[serde(default)]
    label: String,
    #[serde(default)]
    full_label: Option<String>,
    #[serde(default)]
    tooltip: Option<String>,
    #[serde(default, alias = "unit")]
    sidetext: Option<String>,
    #[serde(default)]
    gui_type: GuiType,
    #[serde(default)]
    gui_flags: Option<String>,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    shortcut: Vec<String>,
    #[serde(default)]
    height: Option<i32>,
    #[serde(default)]
    width: Option<i32>,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    max_literal: Option<f64>,
    #[serde(default)]
    enum_symbols: Option<Vec<EnumSymbol>>,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    serialization_ordinal: u32,
    #[serde(default)]
    readonly: bool,
    #[serde(default)]
    technology: Technology,
}

impl RawOptionDef {
    fn into_def(self) -> Result<OptionDef, Error> {
        let mut def = OptionDef {
            key: self.key,
            option_type: self.option_type,
            nullable: self.nullable,
            category: self.category,
            mode: self.mode,
            label: self.label,
            full_label: self.full_label.filter(|s| !s.is_empty()),
            tooltip: self.tooltip.filter(|s| !s.is_empty()),
            sidetext: self.sidetext.filter(|s| !s.is_empty()),
            gui_type: self.gui_type,
            gui_flags: self.gui_flags.filter(|s| !s.is_empty()),
            aliases: self.aliases,
            shortcut: self.shortcut,
            height: self.height.filter(|h| *h >= 0),
            width: self.width.filter(|w| *w >= 0),
            min: self.min,
            max: self.max,
            max_literal: self.max_literal,
            enum_symbols: self.enum_symbols,
            default: None,
            serialization_ordinal: self.serialization_ordinal,
            readonly: self.readonly,
            technology: self.technology,
        };
        if let Some(raw) = self.default {
            let value = default_value(&def, &raw).map_err(|failure| {
                Error::new(ErrorKind::InvalidRegistry)
                    .with_message(format!("invalid default: {failure}"))
                    .with_key(def.key.clone())
            })?;
            def.default = Some(value);
        }
        Ok(def)
    }
}

/// Defaults use the override wire shapes; serialized text (`"15%"`, `"0x0"`) is the fallback.
/// A `null` element leaves a slot of a nullable vector unset.
fn default_value(def: &OptionDef, raw: &Value) -> Result<OptionValue, coerce::CoercionFailure> {
    match (coerce::default_value(def, raw), raw) {
        (Ok(value), _) => Ok(value),
        (Err(_), Value::String(text)) if def.option_type != OptionType::String => {
            OptionValue::deserialize(def, text)
        }
        (Err(failure), _) => Err(failure),
    }
}

#[derive(Clone, Debug, Default)]
pub struct OptionRegistry {
    options: BTreeMap<String, OptionDef>,
}

impl OptionRegistry {
    pub fn from_defs(defs: impl IntoIterator<Item = OptionDef>) -> Result<Self, Error> {
        let mut options = BTreeMap::new();
        for def in defs {
            if options.contains_key(&def.key) {
                return Err(Error::new(ErrorKind::InvalidRegistry)
                    .with_message("duplicate option key")
                    .with_key(def.key));
            }
            options.insert(def.key.clone(), def);
        }
        Ok(Self { options })
    }

    pub fn from_json_str(input: &str) -> Result<Self, Error> {
        let file: RegistryFile = crate::json::parse::from_str(input).map_err(|err| {
            Error::new(ErrorKind::InvalidRegistry)
                .with_message("registry is not valid json")
                .with_hint(crate::json::parse::hint_for_error(&err, "registry"))
                .with_source(err)
        })?;
        let defs = file
            .options
            .into_iter()
            .map(RawOptionDef::into_def)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_defs(defs)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            let kind = if err.kind() == std::io::ErrorKind::NotFound {
                ErrorKind::NotFound
            } else {
                ErrorKind::Io
            };
            Error::new(kind)
                .with_message("failed to read registry")
                .with_path(path)
                .with_source(err)
        })?;
        Self::from_json_str(&text).map_err(|err| err.with_path(path))
    }

    pub fn get(&self, key: &str) -> Option<&OptionDef> {
        self.options.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Definitions in key order.
    pub fn iter(&self) -> impl Iterator<Item = &OptionDef> {
        self.options.values()
    }

    /// Definitions sorted by serialization ordinal, ties broken by key.
    pub fn ordered(&self) -> Vec<&OptionDef> {
        let mut defs: Vec<&OptionDef> = self.options.values().collect();
        defs.sort_by(|a, b| {
            a.serialization_ordinal
                .cmp(&b.serialization_ordinal)
                .then_with(|| a.key.cmp(&b.key))
        });
        defs
    }
}
