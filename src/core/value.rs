//! Purpose: Hold typed option values and their text serialization.
//! Exports: `OptionValue`, `Slots`, `FloatOrPercent`, `Vec2d`, `Vec3d`, `Serialized`.
//! Role: Storage representation used by the instance store and the schema's default column.
//! Invariants: One variant per taxonomy tag; vector slots are either plain or nullable.
//! Invariants: `serialize` followed by `deserialize` reproduces scalar values exactly.
use crate::core::coerce::CoercionFailure;
use crate::core::option_type::OptionType;
use crate::core::registry::{EnumSymbol, OptionDef};
use serde::Serialize;

const NIL: &str = "nil";

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FloatOrPercent {
    pub value: f64,
    pub percent: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2d {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Vector storage: plain values, or values whose slots may be individually unset.
#[derive(Clone, Debug, PartialEq)]
pub enum Slots<T> {
    Plain(Vec<T>),
    Nullable(Vec<Option<T>>),
}

impl<T: Clone> Slots<T> {
    pub fn new(nullable: bool) -> Self {
        if nullable {
            Slots::Nullable(Vec::new())
        } else {
            Slots::Plain(Vec::new())
        }
    }

    pub fn plain(values: Vec<T>) -> Self {
        Slots::Plain(values)
    }

    /// Exactly `values`, in plain or nullable form.
    pub fn from_values(values: Vec<T>, nullable: bool) -> Self {
        if nullable {
            Slots::Nullable(values.into_iter().map(Some).collect())
        } else {
            Slots::Plain(values)
        }
    }

    /// Nullable slots shaped by `present`; set slots take `values` in order.
    pub fn from_present(values: Vec<T>, present: &[bool]) -> Self {
        let mut values = values.into_iter();
        Slots::Nullable(
            present
                .iter()
                .map(|set| if *set { values.next() } else { None })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            Slots::Plain(values) => values.len(),
            Slots::Nullable(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Option<&T>> + '_> {
        match self {
            Slots::Plain(values) => Box::new(values.iter().map(Some)),
            Slots::Nullable(values) => Box::new(values.iter().map(|slot| slot.as_ref())),
        }
    }

    /// Replace every slot with `values`, keeping the plain/nullable form.
    pub fn replace(&mut self, values: Vec<T>) {
        match self {
            Slots::Plain(target) => *target = values,
            Slots::Nullable(target) => *target = values.into_iter().map(Some).collect(),
        }
    }

    /// Set every existing slot to `value`, or seed a single slot when empty.
    pub fn fill(&mut self, value: T) {
        if self.is_empty() {
            self.replace(vec![value]);
            return;
        }
        match self {
            Slots::Plain(target) => target.iter_mut().for_each(|slot| *slot = value.clone()),
            Slots::Nullable(target) => target
                .iter_mut()
                .for_each(|slot| *slot = Some(value.clone())),
        }
    }

    /// Broadcast-aware assignment of an incoming list.
    ///
    /// A single incoming value spreads over every slot of a multi-slot store; an empty list
    /// leaves existing slots alone and seeds `zero` into an empty store; anything else
    /// replaces the slots wholesale.
    pub fn assign(&mut self, values: &[T], zero: T) {
        match values {
            [] => {
                if self.is_empty() {
                    self.replace(vec![zero]);
                }
            }
            [single] if self.len() > 1 => self.fill(single.clone()),
            _ => self.replace(values.to_vec()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Float(f64),
    Floats(Slots<f64>),
    Int(i32),
    Ints(Slots<i32>),
    String(String),
    Strings(Vec<String>),
    Percent(f64),
    Percents(Slots<f64>),
    FloatOrPercent(FloatOrPercent),
    FloatsOrPercents(Slots<FloatOrPercent>),
    Point(Vec2d),
    Points(Vec<Vec2d>),
    Point3(Vec3d),
    Bool(bool),
    Bools(Slots<bool>),
    Enum(i32),
    Enums(Slots<i32>),
}

/// Text form of a value: one string for scalars, one string per slot for vectors.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Serialized {
    Scalar(String),
    Vector(Vec<String>),
}

impl OptionValue {
    /// Zero value of `ty`; vectors start empty in the requested slot form.
    pub fn empty(ty: OptionType, nullable: bool) -> Self {
        match ty {
            OptionType::Float => OptionValue::Float(0.0),
            OptionType::Floats => OptionValue::Floats(Slots::new(nullable)),
            OptionType::Int => OptionValue::Int(0),
            OptionType::Ints => OptionValue::Ints(Slots::new(nullable)),
            OptionType::String => OptionValue::String(String::new()),
            OptionType::Strings => OptionValue::Strings(Vec::new()),
            OptionType::Percent => OptionValue::Percent(0.0),
            OptionType::Percents => OptionValue::Percents(Slots::new(nullable)),
            OptionType::FloatOrPercent => OptionValue::FloatOrPercent(FloatOrPercent::default()),
            OptionType::FloatsOrPercents => OptionValue::FloatsOrPercents(Slots::new(nullable)),
            OptionType::Point => OptionValue::Point(Vec2d::default()),
            OptionType::Points => OptionValue::Points(Vec::new()),
            OptionType::Point3 => OptionValue::Point3(Vec3d::default()),
            OptionType::Bool => OptionValue::Bool(false),
            OptionType::Bools => OptionValue::Bools(Slots::new(nullable)),
            OptionType::Enum => OptionValue::Enum(0),
            OptionType::Enums => OptionValue::Enums(Slots::new(nullable)),
        }
    }

    pub fn option_type(&self) -> OptionType {
        match self {
            OptionValue::Float(_) => OptionType::Float,
            OptionValue::Floats(_) => OptionType::Floats,
            OptionValue::Int(_) => OptionType::Int,
            OptionValue::Ints(_) => OptionType::Ints,
            OptionValue::String(_) => OptionType::String,
            OptionValue::Strings(_) => OptionType::Strings,
            OptionValue::Percent(_) => OptionType::Percent,
            OptionValue::Percents(_) => OptionType::Percents,
            OptionValue::FloatOrPercent(_) => OptionType::FloatOrPercent,
            OptionValue::FloatsOrPercents(_) => OptionType::FloatsOrPercents,
            OptionValue::Point(_) => OptionType::Point,
            OptionValue::Points(_) => OptionType::Points,
            OptionValue::Point3(_) => OptionType::Point3,
            OptionValue::Bool(_) => OptionType::Bool,
            OptionValue::Bools(_) => OptionType::Bools,
            OptionValue::Enum(_) => OptionType::Enum,
            OptionValue::Enums(_) => OptionType::Enums,
        }
    }

    pub fn is_vector(&self) -> bool {
        self.option_type().is_vector()
    }

    /// Render the value; enum codes are named through `symbols` when possible.
    pub fn serialize(&self, symbols: &[EnumSymbol]) -> Serialized {
        match self {
            OptionValue::Float(value) => Serialized::Scalar(format_float(*value)),
            OptionValue::Floats(slots) => slots_text(slots, |v| format_float(*v)),
            OptionValue::Int(value) => Serialized::Scalar(value.to_string()),
            OptionValue::Ints(slots) => slots_text(slots, |v| v.to_string()),
            OptionValue::String(value) => Serialized::Scalar(value.clone()),
            OptionValue::Strings(values) => Serialized::Vector(values.clone()),
            OptionValue::Percent(value) => Serialized::Scalar(format_percent(*value)),
            OptionValue::Percents(slots) => slots_text(slots, |v| format_percent(*v)),
            OptionValue::FloatOrPercent(fp) => Serialized::Scalar(format_float_or_percent(fp)),
            OptionValue::FloatsOrPercents(slots) => slots_text(slots, format_float_or_percent),
            OptionValue::Point(point) => Serialized::Scalar(format_point(point)),
            OptionValue::Points(points) => {
                Serialized::Vector(points.iter().map(format_point).collect())
            }
            OptionValue::Point3(point) => Serialized::Scalar(format!(
                "{}x{}x{}",
                format_float(point.x),
                format_float(point.y),
                format_float(point.z)
            )),
            OptionValue::Bool(value) => Serialized::Scalar(format_bool(*value)),
            OptionValue::Bools(slots) => slots_text(slots, |v| format_bool(*v)),
            OptionValue::Enum(code) => Serialized::Scalar(enum_text(*code, symbols)),
            OptionValue::Enums(slots) => slots_text(slots, |code| enum_text(*code, symbols)),
        }
    }

    /// Parse the text form produced by `serialize` back into a value of `def`'s type.
    ///
    /// Vector text is comma separated (semicolon separated for string lists); `nil` marks an
    /// unset slot of a nullable vector.
    pub fn deserialize(def: &OptionDef, text: &str) -> Result<OptionValue, CoercionFailure> {
        let symbols = def.enum_symbols.as_deref();
        let value = match def.option_type {
            OptionType::Float => OptionValue::Float(parse_number(text)?),
            OptionType::Floats => {
                OptionValue::Floats(parse_slots(text, def.nullable, parse_number)?)
            }
            OptionType::Int => OptionValue::Int(parse_int(text)?),
            OptionType::Ints => OptionValue::Ints(parse_slots(text, def.nullable, parse_int)?),
            OptionType::String => OptionValue::String(text.to_string()),
            OptionType::Strings => OptionValue::Strings(if text.is_empty() {
                Vec::new()
            } else {
                text.split(';').map(str::to_string).collect()
            }),
            OptionType::Percent => OptionValue::Percent(parse_percent(text)?),
            OptionType::Percents => {
                OptionValue::Percents(parse_slots(text, def.nullable, parse_percent)?)
            }
            OptionType::FloatOrPercent => {
                OptionValue::FloatOrPercent(parse_float_or_percent(text)?)
            }
            OptionType::FloatsOrPercents => OptionValue::FloatsOrPercents(parse_slots(
                text,
                def.nullable,
                parse_float_or_percent,
            )?),
            OptionType::Point => {
                let [x, y] = parse_components::<2>(text)?;
                OptionValue::Point(Vec2d { x, y })
            }
            OptionType::Points => {
                let mut points = Vec::new();
                for item in split_list(text) {
                    let [x, y] = parse_components::<2>(item)?;
                    points.push(Vec2d { x, y });
                }
                OptionValue::Points(points)
            }
            OptionType::Point3 => {
                let [x, y, z] = parse_components::<3>(text)?;
                OptionValue::Point3(Vec3d { x, y, z })
            }
            OptionType::Bool => OptionValue::Bool(parse_bool(text)?),
            OptionType::Bools => OptionValue::Bools(parse_slots(text, def.nullable, parse_bool)?),
            OptionType::Enum => OptionValue::Enum(parse_enum(text, symbols)?),
            OptionType::Enums => OptionValue::Enums(parse_slots(text, def.nullable, |item| {
                parse_enum(item, symbols)
            })?),
        };
        Ok(value)
    }
}

pub(crate) fn format_float(value: f64) -> String {
    format!("{value}")
}

fn format_percent(value: f64) -> String {
    format!("{}%", format_float(value))
}

fn format_float_or_percent(fp: &FloatOrPercent) -> String {
    if fp.percent {
        format_percent(fp.value)
    } else {
        format_float(fp.value)
    }
}

fn format_point(point: &Vec2d) -> String {
    format!("{}x{}", format_float(point.x), format_float(point.y))
}

fn format_bool(value: bool) -> String {
    let text = if value { "1" } else { "0" };
    text.to_string()
}

fn enum_text(code: i32, symbols: &[EnumSymbol]) -> String {
    symbols
        .iter()
        .find(|symbol| symbol.code == code)
        .map(|symbol| symbol.value.clone())
        .unwrap_or_else(|| code.to_string())
}

fn slots_text<T: Clone>(slots: &Slots<T>, render: impl Fn(&T) -> String) -> Serialized {
    Serialized::Vector(
        slots
            .iter()
            .map(|slot| slot.map(&render).unwrap_or_else(|| NIL.to_string()))
            .collect(),
    )
}

fn split_list(text: &str) -> impl Iterator<Item = &str> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn parse_slots<T: Clone>(
    text: &str,
    nullable: bool,
    parse: impl Fn(&str) -> Result<T, CoercionFailure>,
) -> Result<Slots<T>, CoercionFailure> {
    let mut plain = Vec::new();
    let mut slots = Vec::new();
    for item in split_list(text) {
        if nullable && item == NIL {
            slots.push(None);
            continue;
        }
        let value = parse(item)?;
        plain.push(value.clone());
        slots.push(Some(value));
    }
    Ok(if nullable {
        Slots::Nullable(slots)
    } else {
        Slots::Plain(plain)
    })
}

pub(crate) fn parse_number(text: &str) -> Result<f64, CoercionFailure> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| CoercionFailure::UnparsableNumber {
            text: text.to_string(),
        })
}

fn parse_int(text: &str) -> Result<i32, CoercionFailure> {
    if let Ok(value) = text.trim().parse::<i32>() {
        return Ok(value);
    }
    parse_number(text).map(|value| value.round() as i32)
}

fn parse_percent(text: &str) -> Result<f64, CoercionFailure> {
    parse_number(text.strip_suffix('%').unwrap_or(text))
}

/// Shared by deserialization and the string branch of float-or-percent coercion.
pub(crate) fn parse_float_or_percent(text: &str) -> Result<FloatOrPercent, CoercionFailure> {
    if text.is_empty() {
        return Ok(FloatOrPercent::default());
    }
    match text.strip_suffix('%') {
        Some(number) => Ok(FloatOrPercent {
            value: parse_number(number)?,
            percent: true,
        }),
        None => Ok(FloatOrPercent {
            value: parse_number(text)?,
            percent: false,
        }),
    }
}

fn parse_components<const N: usize>(text: &str) -> Result<[f64; N], CoercionFailure> {
    let parts: Vec<&str> = text.split(['x', ',']).collect();
    if parts.len() != N {
        return Err(CoercionFailure::UnparsableNumber {
            text: text.to_string(),
        });
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = parse_number(part)?;
    }
    Ok(out)
}

fn parse_bool(text: &str) -> Result<bool, CoercionFailure> {
    match text.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        other => Err(CoercionFailure::UnparsableNumber {
            text: other.to_string(),
        }),
    }
}

fn parse_enum(text: &str, symbols: Option<&[EnumSymbol]>) -> Result<i32, CoercionFailure> {
    if let Some(symbol) = symbols.and_then(|table| table.iter().find(|s| s.value == text)) {
        return Ok(symbol.code);
    }
    text.trim()
        .parse::<i32>()
        .map_err(|_| CoercionFailure::UnresolvableSymbol {
            symbol: text.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::{FloatOrPercent, OptionValue, Serialized, Slots, Vec2d};
    use crate::core::option_type::OptionType;
    use crate::core::registry::{EnumSymbol, OptionDef};

    fn symbols() -> Vec<EnumSymbol> {
        vec![EnumSymbol::new("grid", 0), EnumSymbol::new("gyroid", 1)]
    }

    #[test]
    fn slots_assign_broadcasts_single_value() {
        let mut slots = Slots::plain(vec![1.0, 2.0, 3.0]);
        slots.assign(&[7.5], 0.0);
        assert_eq!(slots, Slots::Plain(vec![7.5, 7.5, 7.5]));

        let mut single = Slots::plain(vec![1.0]);
        single.assign(&[4.0], 0.0);
        assert_eq!(single, Slots::Plain(vec![4.0]));

        let mut empty: Slots<f64> = Slots::new(false);
        empty.assign(&[4.0], 0.0);
        assert_eq!(empty, Slots::Plain(vec![4.0]));
    }

    #[test]
    fn slots_assign_empty_list_keeps_or_seeds() {
        let mut populated = Slots::plain(vec![1, 2]);
        populated.assign(&[], 0);
        assert_eq!(populated, Slots::Plain(vec![1, 2]));

        let mut empty: Slots<i32> = Slots::new(true);
        empty.assign(&[], 0);
        assert_eq!(empty, Slots::Nullable(vec![Some(0)]));
    }

    #[test]
    fn nullable_slots_fill_unset_entries() {
        let mut slots = Slots::Nullable(vec![None, Some(2)]);
        slots.fill(9);
        assert_eq!(slots, Slots::Nullable(vec![Some(9), Some(9)]));
    }

    #[test]
    fn serialize_uses_symbol_names_and_nil() {
        let table = symbols();
        assert_eq!(
            OptionValue::Enum(1).serialize(&table),
            Serialized::Scalar("gyroid".to_string())
        );
        assert_eq!(
            OptionValue::Enum(7).serialize(&table),
            Serialized::Scalar("7".to_string())
        );
        assert_eq!(
            OptionValue::Floats(Slots::Nullable(vec![Some(0.4), None])).serialize(&[]),
            Serialized::Vector(vec!["0.4".to_string(), "nil".to_string()])
        );
        assert_eq!(
            OptionValue::FloatOrPercent(FloatOrPercent {
                value: 15.0,
                percent: true
            })
            .serialize(&[]),
            Serialized::Scalar("15%".to_string())
        );
        assert_eq!(
            OptionValue::Point(Vec2d { x: 1.5, y: -2.0 }).serialize(&[]),
            Serialized::Scalar("1.5x-2".to_string())
        );
    }

    #[test]
    fn deserialize_vector_text() {
        let mut def = OptionDef::new("retraction_length", OptionType::Floats);
        def.nullable = true;
        let value = OptionValue::deserialize(&def, "0.8,nil,1").expect("deserialize");
        assert_eq!(
            value,
            OptionValue::Floats(Slots::Nullable(vec![Some(0.8), None, Some(1.0)]))
        );

        let mut def = OptionDef::new("sparse_infill_pattern", OptionType::Enum);
        def.enum_symbols = Some(symbols());
        assert_eq!(
            OptionValue::deserialize(&def, "gyroid").expect("enum"),
            OptionValue::Enum(1)
        );
        assert!(OptionValue::deserialize(&def, "hexagon").is_err());
    }
}
