//! Purpose: Convert untyped JSON override values into typed option values.
//! Exports: `coerce`, `write`, `apply_value`, `default_value`, `Coerced`, `CoercionFailure`.
//! Role: Type-directed marshalling at the heart of override application.
//! Invariants: `coerce` is pure; failures are returned, never raised.
//! Invariants: `write` mutates at most one representation and nothing on failure.
//! Invariants: Array inputs are all-or-nothing; one bad element rejects the whole array.
use crate::core::diagnostic::DiagnosticKind;
use crate::core::option_type::OptionType;
use crate::core::registry::{OptionDef, OptionRegistry};
use crate::core::store::OptionStore;
use crate::core::value::{self, FloatOrPercent, OptionValue, Slots, Vec2d, Vec3d};
use serde_json::Value;
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum CoercionFailure {
    ShapeMismatch {
        expected: OptionType,
        found: &'static str,
    },
    ElementMismatch {
        expected: OptionType,
        index: usize,
        found: &'static str,
    },
    UnparsableNumber {
        text: String,
    },
    UnresolvableSymbol {
        symbol: String,
    },
    UnknownKey {
        key: String,
    },
    RepresentationMismatch {
        expected: OptionType,
        stored: OptionType,
    },
}

impl CoercionFailure {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            CoercionFailure::UnresolvableSymbol { .. } => DiagnosticKind::UnresolvableSymbol,
            CoercionFailure::UnknownKey { .. } => DiagnosticKind::UnknownKey,
            CoercionFailure::ShapeMismatch { .. }
            | CoercionFailure::ElementMismatch { .. }
            | CoercionFailure::UnparsableNumber { .. }
            | CoercionFailure::RepresentationMismatch { .. } => DiagnosticKind::ShapeMismatch,
        }
    }
}

impl fmt::Display for CoercionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercionFailure::ShapeMismatch { expected, found } => {
                write!(f, "expected {expected} value, found {found}")
            }
            CoercionFailure::ElementMismatch {
                expected,
                index,
                found,
            } => write!(f, "{expected} element {index} has wrong shape ({found})"),
            CoercionFailure::UnparsableNumber { text } => {
                write!(f, "cannot parse number from {text:?}")
            }
            CoercionFailure::UnresolvableSymbol { symbol } => {
                write!(f, "unknown enum symbol {symbol:?}")
            }
            CoercionFailure::UnknownKey { key } => write!(f, "unknown option key {key}"),
            CoercionFailure::RepresentationMismatch { expected, stored } => {
                write!(f, "cannot store {expected} value in {stored} option")
            }
        }
    }
}

/// A raw value after type-directed conversion, before it lands in the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Coerced {
    Float(f64),
    Floats(Vec<f64>),
    Int(i32),
    Ints(Vec<i32>),
    String(String),
    Strings(Vec<String>),
    Percent(f64),
    Percents(Vec<f64>),
    FloatOrPercent(FloatOrPercent),
    FloatsOrPercents(Vec<FloatOrPercent>),
    Point(Vec2d),
    Points(Vec<Vec2d>),
    Point3(Vec3d),
    Bool(bool),
    Bools(Vec<bool>),
    Enum(i32),
    Enums(Vec<i32>),
}

impl Coerced {
    pub fn option_type(&self) -> OptionType {
        match self {
            Coerced::Float(_) => OptionType::Float,
            Coerced::Floats(_) => OptionType::Floats,
            Coerced::Int(_) => OptionType::Int,
            Coerced::Ints(_) => OptionType::Ints,
            Coerced::String(_) => OptionType::String,
            Coerced::Strings(_) => OptionType::Strings,
            Coerced::Percent(_) => OptionType::Percent,
            Coerced::Percents(_) => OptionType::Percents,
            Coerced::FloatOrPercent(_) => OptionType::FloatOrPercent,
            Coerced::FloatsOrPercents(_) => OptionType::FloatsOrPercents,
            Coerced::Point(_) => OptionType::Point,
            Coerced::Points(_) => OptionType::Points,
            Coerced::Point3(_) => OptionType::Point3,
            Coerced::Bool(_) => OptionType::Bool,
            Coerced::Bools(_) => OptionType::Bools,
            Coerced::Enum(_) => OptionType::Enum,
            Coerced::Enums(_) => OptionType::Enums,
        }
    }
}

impl Coerced {
    /// The value this coercion describes, with no existing store to merge into.
    pub fn into_value(self, nullable: bool, present: Option<&[bool]>) -> OptionValue {
        fn slots<T: Clone>(values: Vec<T>, nullable: bool, present: Option<&[bool]>) -> Slots<T> {
            match present {
                Some(present) => Slots::from_present(values, present),
                None => Slots::from_values(values, nullable),
            }
        }
        match self {
            Coerced::Float(value) => OptionValue::Float(value),
            Coerced::Floats(values) => OptionValue::Floats(slots(values, nullable, present)),
            Coerced::Int(value) => OptionValue::Int(value),
            Coerced::Ints(values) => OptionValue::Ints(slots(values, nullable, present)),
            Coerced::String(value) => OptionValue::String(value),
            Coerced::Strings(values) => OptionValue::Strings(values),
            Coerced::Percent(value) => OptionValue::Percent(value),
            Coerced::Percents(values) => OptionValue::Percents(slots(values, nullable, present)),
            Coerced::FloatOrPercent(value) => OptionValue::FloatOrPercent(value),
            Coerced::FloatsOrPercents(values) => {
                OptionValue::FloatsOrPercents(slots(values, nullable, present))
            }
            Coerced::Point(value) => OptionValue::Point(value),
            Coerced::Points(values) => OptionValue::Points(values),
            Coerced::Point3(value) => OptionValue::Point3(value),
            Coerced::Bool(value) => OptionValue::Bool(value),
            Coerced::Bools(values) => OptionValue::Bools(slots(values, nullable, present)),
            Coerced::Enum(code) => OptionValue::Enum(code),
            Coerced::Enums(codes) => OptionValue::Enums(slots(codes, nullable, present)),
        }
    }
}

pub fn coerce(def: &OptionDef, raw: &Value) -> Result<Coerced, CoercionFailure> {
    let ty = def.option_type;
    let coerced = match ty {
        OptionType::Float => Coerced::Float(number(raw, ty)?),
        OptionType::Floats => Coerced::Floats(numbers(raw, ty)?),
        OptionType::Int => Coerced::Int(round_int(number(raw, ty)?)),
        OptionType::Ints => {
            Coerced::Ints(numbers(raw, ty)?.into_iter().map(round_int).collect())
        }
        OptionType::String => match raw {
            Value::String(text) => Coerced::String(text.clone()),
            other => return Err(shape(ty, other)),
        },
        OptionType::Strings => Coerced::Strings(array(raw, ty, |item| match item {
            Value::String(text) => Some(text.clone()),
            _ => None,
        })?),
        OptionType::Percent => match raw {
            Value::Number(_) => Coerced::Percent(number(raw, ty)?),
            Value::String(text) => Coerced::Percent(percent_text(text)?),
            other => return Err(shape(ty, other)),
        },
        OptionType::Percents => Coerced::Percents(numbers(raw, ty)?),
        OptionType::FloatOrPercent => Coerced::FloatOrPercent(float_or_percent(raw, ty)?),
        OptionType::FloatsOrPercents => {
            let items = raw.as_array().ok_or_else(|| shape(ty, raw))?;
            let mut parsed = Vec::with_capacity(items.len());
            for item in items {
                parsed.push(float_or_percent(item, ty)?);
            }
            Coerced::FloatsOrPercents(parsed)
        }
        OptionType::Point => {
            let [x, y] = components::<2>(raw).ok_or_else(|| shape(ty, raw))?;
            Coerced::Point(Vec2d { x, y })
        }
        OptionType::Points => Coerced::Points(array(raw, ty, |item| {
            components::<2>(item).map(|[x, y]| Vec2d { x, y })
        })?),
        OptionType::Point3 => {
            let [x, y, z] = components::<3>(raw).ok_or_else(|| shape(ty, raw))?;
            Coerced::Point3(Vec3d { x, y, z })
        }
        OptionType::Bool => match raw {
            Value::Bool(flag) => Coerced::Bool(*flag),
            other => return Err(shape(ty, other)),
        },
        OptionType::Bools => Coerced::Bools(array(raw, ty, Value::as_bool)?),
        OptionType::Enum => Coerced::Enum(enum_code(def, raw)?),
        OptionType::Enums => {
            let items = raw.as_array().ok_or_else(|| shape(ty, raw))?;
            let mut codes = Vec::with_capacity(items.len());
            for item in items {
                codes.push(enum_code(def, item)?);
            }
            Coerced::Enums(codes)
        }
    };
    Ok(coerced)
}

/// Store `coerced` into `slot`, honoring broadcast rules and representation fallbacks.
///
/// The slot's current variant decides the representation. Vector slots accept a single
/// incoming value; scalar slots accept a one-element list; percent values may land in
/// float storage.
pub fn write(slot: &mut OptionValue, coerced: Coerced) -> Result<(), CoercionFailure> {
    let stored = slot.option_type();
    match (slot, coerced) {
        (OptionValue::Float(target), Coerced::Float(value)) => *target = value,
        (OptionValue::Floats(slots), Coerced::Float(value)) => slots.assign(&[value], 0.0),
        (OptionValue::Floats(slots), Coerced::Floats(values)) => slots.assign(&values, 0.0),
        (OptionValue::Float(target), Coerced::Floats(values)) if values.len() == 1 => {
            *target = values[0]
        }

        (OptionValue::Int(target), Coerced::Int(value)) => *target = value,
        (OptionValue::Ints(slots), Coerced::Int(value)) => slots.assign(&[value], 0),
        (OptionValue::Ints(slots), Coerced::Ints(values)) => slots.assign(&values, 0),
        (OptionValue::Int(target), Coerced::Ints(values)) if values.len() == 1 => {
            *target = values[0]
        }

        (OptionValue::String(target), Coerced::String(value)) => *target = value,
        (OptionValue::Strings(target), Coerced::String(value)) => {
            if target.is_empty() {
                target.push(value);
            } else {
                target.iter_mut().for_each(|slot| *slot = value.clone());
            }
        }
        (OptionValue::Strings(target), Coerced::Strings(values)) => *target = values,

        (OptionValue::Percent(target), Coerced::Percent(value)) => *target = value,
        (OptionValue::Percents(slots), Coerced::Percent(value)) => slots.assign(&[value], 0.0),
        (OptionValue::Percents(slots), Coerced::Percents(values)) => slots.assign(&values, 0.0),
        (OptionValue::Percent(target), Coerced::Percents(values)) if values.len() == 1 => {
            *target = values[0]
        }
        (OptionValue::Float(target), Coerced::Percent(value)) => *target = value,
        (OptionValue::Floats(slots), Coerced::Percent(value)) => slots.assign(&[value], 0.0),

        (OptionValue::FloatOrPercent(target), Coerced::FloatOrPercent(value)) => *target = value,
        (OptionValue::FloatsOrPercents(slots), Coerced::FloatOrPercent(value)) => slots.fill(value),
        (OptionValue::FloatsOrPercents(slots), Coerced::FloatsOrPercents(values)) => {
            slots.assign(&values, FloatOrPercent::default())
        }

        (OptionValue::Point(target), Coerced::Point(value)) => *target = value,
        (OptionValue::Points(target), Coerced::Points(values)) => *target = values,
        (OptionValue::Point3(target), Coerced::Point3(value)) => *target = value,

        (OptionValue::Bool(target), Coerced::Bool(value)) => *target = value,
        (OptionValue::Bools(slots), Coerced::Bool(value)) => slots.fill(value),
        (OptionValue::Bools(slots), Coerced::Bools(values)) => slots.replace(values),

        (OptionValue::Enum(target), Coerced::Enum(code)) => *target = code,
        (OptionValue::Enums(slots), Coerced::Enums(codes)) => slots.replace(codes),

        (_, coerced) => {
            return Err(CoercionFailure::RepresentationMismatch {
                expected: coerced.option_type(),
                stored,
            });
        }
    }
    Ok(())
}

/// Coerce `raw` against the registry entry for `key` and store it.
pub fn apply_value(
    registry: &OptionRegistry,
    store: &mut OptionStore,
    key: &str,
    raw: &Value,
) -> Result<(), CoercionFailure> {
    let def = registry
        .get(key)
        .ok_or_else(|| CoercionFailure::UnknownKey {
            key: key.to_string(),
        })?;
    let coerced = coerce(def, raw)?;
    store.write(def, coerced)
}

/// Build a registry default from `raw`, holding exactly what it declares.
///
/// Unlike `write`, no broadcast or empty-list seeding applies. For nullable slot vectors a
/// JSON `null` element marks an unset slot.
pub fn default_value(def: &OptionDef, raw: &Value) -> Result<OptionValue, CoercionFailure> {
    let present = match raw {
        Value::Array(items) if def.nullable && has_slots(def.option_type) => {
            Some(items.iter().map(|item| !item.is_null()).collect::<Vec<_>>())
        }
        _ => None,
    };
    let coerced = match (&present, raw) {
        (Some(_), Value::Array(items)) => {
            let set: Vec<Value> = items
                .iter()
                .filter(|item| !item.is_null())
                .cloned()
                .collect();
            coerce(def, &Value::Array(set))?
        }
        _ => coerce(def, raw)?,
    };
    Ok(coerced.into_value(def.nullable, present.as_deref()))
}

fn has_slots(ty: OptionType) -> bool {
    matches!(
        ty,
        OptionType::Floats
            | OptionType::Ints
            | OptionType::Percents
            | OptionType::FloatsOrPercents
            | OptionType::Bools
            | OptionType::Enums
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn shape(expected: OptionType, found: &Value) -> CoercionFailure {
    CoercionFailure::ShapeMismatch {
        expected,
        found: json_kind(found),
    }
}

fn number(raw: &Value, ty: OptionType) -> Result<f64, CoercionFailure> {
    raw.as_f64().ok_or_else(|| shape(ty, raw))
}

/// A lone number broadcasts; an array must hold numbers only.
fn numbers(raw: &Value, ty: OptionType) -> Result<Vec<f64>, CoercionFailure> {
    match raw {
        Value::Number(_) => Ok(vec![number(raw, ty)?]),
        Value::Array(_) => array(raw, ty, Value::as_f64),
        other => Err(shape(ty, other)),
    }
}

fn array<T>(
    raw: &Value,
    ty: OptionType,
    convert: impl Fn(&Value) -> Option<T>,
) -> Result<Vec<T>, CoercionFailure> {
    let items = raw.as_array().ok_or_else(|| shape(ty, raw))?;
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let converted = convert(item).ok_or_else(|| CoercionFailure::ElementMismatch {
            expected: ty,
            index,
            found: json_kind(item),
        })?;
        out.push(converted);
    }
    Ok(out)
}

fn round_int(value: f64) -> i32 {
    // f64::round rounds half away from zero; the cast saturates.
    value.round() as i32
}

/// A trailing `%` is stripped; the magnitude is stored unscaled whether or not it was present.
fn percent_text(text: &str) -> Result<f64, CoercionFailure> {
    let number = text.strip_suffix('%').unwrap_or(text);
    value::parse_number(number)
}

fn float_or_percent(raw: &Value, ty: OptionType) -> Result<FloatOrPercent, CoercionFailure> {
    match raw {
        Value::Object(map) => {
            let value = map
                .get("value")
                .and_then(Value::as_f64)
                .ok_or_else(|| shape(ty, raw))?;
            let percent = map.get("percent").and_then(Value::as_bool).unwrap_or(false);
            Ok(FloatOrPercent { value, percent })
        }
        Value::Number(_) => Ok(FloatOrPercent {
            value: number(raw, ty)?,
            percent: false,
        }),
        Value::String(text) => value::parse_float_or_percent(text),
        other => Err(shape(ty, other)),
    }
}

fn components<const N: usize>(raw: &Value) -> Option<[f64; N]> {
    let items = raw.as_array()?;
    if items.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64()?;
    }
    Some(out)
}

/// Integers pass through as codes; strings must name a symbol exactly.
fn enum_code(def: &OptionDef, raw: &Value) -> Result<i32, CoercionFailure> {
    match raw {
        Value::Number(number) => {
            let code = number
                .as_i64()
                .and_then(|code| i32::try_from(code).ok())
                .ok_or_else(|| shape(def.option_type, raw))?;
            Ok(code)
        }
        Value::String(symbol) => def
            .symbols()
            .iter()
            .find(|entry| entry.value == *symbol)
            .map(|entry| entry.code)
            .ok_or_else(|| CoercionFailure::UnresolvableSymbol {
                symbol: symbol.clone(),
            }),
        other => Err(shape(def.option_type, other)),
    }
}
