//! Purpose: Project the option registry into a category-grouped schema document.
//! Exports: `SchemaDocument`, `SchemaCategory`, `OptionDescriptor`, `project`, `slugify`, `timestamp_now`.
//! Role: Read-only view consumed by presentation tooling; never fed back into a store.
//! Invariants: Descriptors are ordered by (serialization ordinal, key).
//! Invariants: Categories appear in the order their first descriptor does.
//! Invariants: Optional descriptor fields are omitted when absent, never null.
use crate::core::error::{Error, ErrorKind};
use crate::core::option_type::Technology;
use crate::core::registry::{OptionDef, OptionRegistry};
use crate::core::value::Serialized;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    pub generated_at: String,
    pub option_count: usize,
    pub categories: Vec<SchemaCategory>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaCategory {
    pub id: String,
    pub label: String,
    pub options: Vec<OptionDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDescriptor {
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_label: Option<String>,
    #[serde(rename = "type")]
    pub option_type: &'static str,
    pub mode: &'static str,
    pub nullable: bool,
    pub is_vector: bool,
    pub category: String,
    pub gui_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gui_flags: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shortcut: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_literal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Serialized>,
    pub serialization_ordinal: u32,
}

impl SchemaDocument {
    pub fn empty(generated_at: impl Into<String>) -> Self {
        Self {
            generated_at: generated_at.into(),
            option_count: 0,
            categories: Vec::new(),
        }
    }

    pub fn find(&self, key: &str) -> Option<&OptionDescriptor> {
        self.categories
            .iter()
            .flat_map(|category| category.options.iter())
            .find(|option| option.key == key)
    }
}

/// Build the schema for `profile`; a missing registry yields an empty document.
pub fn project(
    registry: Option<&OptionRegistry>,
    profile: Technology,
    generated_at: &str,
) -> SchemaDocument {
    let Some(registry) = registry else {
        tracing::warn!("option registry unavailable; returning empty schema");
        return SchemaDocument::empty(generated_at);
    };

    let mut categories: Vec<SchemaCategory> = Vec::new();
    let mut option_count = 0;
    for def in registry.ordered() {
        if def.readonly || !def.technology.applies_to(profile) {
            continue;
        }
        let label = def.category_label();
        let index = match categories.iter().position(|c| c.label == label) {
            Some(index) => index,
            None => {
                categories.push(SchemaCategory {
                    id: slugify(label),
                    label: label.to_string(),
                    options: Vec::new(),
                });
                categories.len() - 1
            }
        };
        categories[index].options.push(describe(def));
        option_count += 1;
    }
    tracing::debug!(option_count, categories = categories.len(), "schema projected");

    SchemaDocument {
        generated_at: generated_at.to_string(),
        option_count,
        categories,
    }
}

fn describe(def: &OptionDef) -> OptionDescriptor {
    let (enum_values, enum_labels) = match def.enum_symbols.as_deref() {
        Some(symbols) if !symbols.is_empty() => {
            let values = symbols.iter().map(|s| s.value.clone()).collect();
            let labels = symbols
                .iter()
                .any(|s| s.label.is_some())
                .then(|| {
                    symbols
                        .iter()
                        .map(|s| s.label.clone().unwrap_or_else(|| s.value.clone()))
                        .collect()
                });
            (Some(values), labels)
        }
        _ => (None, None),
    };
    OptionDescriptor {
        key: def.key.clone(),
        label: def.label.clone(),
        full_label: def.full_label.clone(),
        option_type: def.option_type.as_str(),
        mode: def.mode.as_str(),
        nullable: def.nullable,
        is_vector: def.is_vector(),
        category: def.category_label().to_string(),
        gui_type: def.gui_type.as_str(),
        tooltip: def.tooltip.clone(),
        unit: def.sidetext.clone(),
        gui_flags: def.gui_flags.clone(),
        aliases: def.aliases.clone(),
        shortcut: def.shortcut.clone(),
        height: def.height,
        width: def.width,
        min: def.min,
        max: def.max,
        max_literal: def.max_literal,
        enum_values,
        enum_labels,
        default: def.default.as_ref().map(|value| def.serialize_value(value)),
        serialization_ordinal: def.serialization_ordinal,
    }
}

/// URL-safe category id: lower-cased alphanumerics, separators collapsed to one hyphen.
pub fn slugify(label: &str) -> String {
    let mut id = String::with_capacity(label.len());
    for ch in label.chars() {
        if ch.is_ascii_alphanumeric() {
            id.push(ch.to_ascii_lowercase());
        } else if matches!(ch, ' ' | '-' | '_') && !id.is_empty() && !id.ends_with('-') {
            id.push('-');
        }
    }
    let trimmed = id.trim_end_matches('-');
    if trimmed.is_empty() {
        "general".to_string()
    } else {
        trimmed.to_string()
    }
}

/// RFC 3339 at whole-second precision, e.g. `2026-02-01T03:04:05Z`.
pub fn format_timestamp(at: OffsetDateTime) -> Result<String, Error> {
    let at = at.to_offset(time::UtcOffset::UTC);
    let at = at.replace_nanosecond(0).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to truncate timestamp")
            .with_source(err)
    })?;
    at.format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to format timestamp")
            .with_source(err)
    })
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn timestamp_now() -> Result<String, Error> {
    format_timestamp(OffsetDateTime::now_utc())
}
