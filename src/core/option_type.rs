//! Purpose: Name the closed set of value shapes an option can hold.
//! Exports: `OptionType`, `OptionMode`, `GuiType`, `Technology`.
//! Role: Pure data definitions shared by the registry, coercer, and schema projector.
//! Invariants: Wire names are stable; they appear verbatim in registry files and schemas.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Float,
    Floats,
    Int,
    Ints,
    String,
    Strings,
    Percent,
    Percents,
    FloatOrPercent,
    FloatsOrPercents,
    Point,
    Points,
    Point3,
    Bool,
    Bools,
    Enum,
    Enums,
}

impl OptionType {
    pub fn is_vector(self) -> bool {
        matches!(
            self,
            OptionType::Floats
                | OptionType::Ints
                | OptionType::Strings
                | OptionType::Percents
                | OptionType::FloatsOrPercents
                | OptionType::Points
                | OptionType::Bools
                | OptionType::Enums
        )
    }

    pub fn is_enum(self) -> bool {
        matches!(self, OptionType::Enum | OptionType::Enums)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::Float => "float",
            OptionType::Floats => "floats",
            OptionType::Int => "int",
            OptionType::Ints => "ints",
            OptionType::String => "string",
            OptionType::Strings => "strings",
            OptionType::Percent => "percent",
            OptionType::Percents => "percents",
            OptionType::FloatOrPercent => "float_or_percent",
            OptionType::FloatsOrPercents => "floats_or_percents",
            OptionType::Point => "point",
            OptionType::Points => "points",
            OptionType::Point3 => "point3",
            OptionType::Bool => "bool",
            OptionType::Bools => "bools",
            OptionType::Enum => "enum",
            OptionType::Enums => "enums",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionMode {
    #[default]
    Simple,
    Advanced,
    Develop,
}

impl OptionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionMode::Simple => "simple",
            OptionMode::Advanced => "advanced",
            OptionMode::Develop => "develop",
        }
    }
}

/// UI widget hint carried through to the schema untouched.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuiType {
    #[default]
    Undefined,
    IEnumOpen,
    FEnumOpen,
    Color,
    SelectOpen,
    Slider,
    Legend,
    OneString,
}

impl GuiType {
    pub fn as_str(self) -> &'static str {
        match self {
            GuiType::Undefined => "undefined",
            GuiType::IEnumOpen => "i_enum_open",
            GuiType::FEnumOpen => "f_enum_open",
            GuiType::Color => "color",
            GuiType::SelectOpen => "select_open",
            GuiType::Slider => "slider",
            GuiType::Legend => "legend",
            GuiType::OneString => "one_string",
        }
    }
}

/// Job profile an option applies to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Technology {
    #[default]
    Any,
    Fff,
    Sla,
    Unknown,
}

impl Technology {
    /// True when an option tagged `self` is valid for a job targeting `profile`.
    pub fn applies_to(self, profile: Technology) -> bool {
        matches!(self, Technology::Any | Technology::Unknown) || self == profile
    }
}
