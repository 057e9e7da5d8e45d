//! Runtime checks of a compiled [`ClassSchema`].
//!
//! Parsing strips unknown keys, fills defaults for absent fields, applies
//! coercion where a rule asks for it and reports every failing field in an
//! [`ErrorTree`].

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime};
use regex::Regex;
use serde_json::{Map, Number, Value};

use super::error_tree::ErrorTree;
use super::rule::{FieldKind, Format, Primitive};
use super::synth::{ClassSchema, CompiledField, Shape};

static ISO_DURATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(\d+(?:[.,]\d+)?)Y)?(?:(\d+(?:[.,]\d+)?)M)?(?:(\d+(?:[.,]\d+)?)W)?(?:(\d+(?:[.,]\d+)?)D)?(?:T(?:(\d+(?:[.,]\d+)?)H)?(?:(\d+(?:[.,]\d+)?)M)?(?:(\d+(?:[.,]\d+)?)S)?)?$",
    )
    .ok()
});

impl ClassSchema {
    /// Validates `input` and returns the cleaned object.
    ///
    /// # Errors
    ///
    /// Returns the tree of every failing field.
    pub fn parse(&self, input: &Value) -> Result<Value, ErrorTree> {
        let Value::Object(map) = input else {
            return Err(ErrorTree::message(mismatch("object", input)));
        };

        let mut tree = ErrorTree::new();
        let mut out = Map::new();
        for field in self.fields() {
            // `null` counts as absent for fields that may be absent.
            let present = map
                .get(&field.name)
                .filter(|v| !(v.is_null() && !field.is_required()));
            match present {
                None => {
                    if let Some(default) = &field.default {
                        out.insert(field.name.clone(), default.clone());
                    } else if !field.rule.is_optional() {
                        tree.property(&field.name).push("Required");
                    }
                }
                Some(value) => match check_field(field, value) {
                    Ok(clean) => {
                        out.insert(field.name.clone(), clean);
                    }
                    Err(sub) => tree.property(&field.name).merge(sub),
                },
            }
        }

        if tree.is_empty() {
            Ok(Value::Object(out))
        } else {
            Err(tree)
        }
    }

    /// Returns `true` when `input` passes [`ClassSchema::parse`].
    #[must_use]
    pub fn accepts(&self, input: &Value) -> bool {
        self.parse(input).is_ok()
    }
}

fn check_field(field: &CompiledField, value: &Value) -> Result<Value, ErrorTree> {
    let coerce = field.rule.coerces();
    match field.rule.kind() {
        FieldKind::String {
            format,
            min_length,
            max_length,
        } => check_string(value, *format, *min_length, *max_length),
        FieldKind::Number { integer, min, max } => {
            check_number(value, coerce, *integer, *min, *max)
        }
        FieldKind::Boolean => check_boolean(value, coerce),
        FieldKind::Enum { values } => check_enum(value, values),
        FieldKind::Array {
            min_items,
            max_items,
            ..
        } => check_array(value, field.nested.as_ref(), *min_items, *max_items),
        FieldKind::Object { .. } => match &field.nested {
            Some(shape) => check_shape(shape, value),
            None => check_primitive(Primitive::Object, value),
        },
        FieldKind::File {
            min_size,
            max_size,
            mime,
        } => check_file(value, *min_size, *max_size, mime),
    }
}

fn check_shape(shape: &Shape, value: &Value) -> Result<Value, ErrorTree> {
    match shape {
        Shape::Class(schema) => schema.parse(value),
        Shape::Primitive(primitive) => check_primitive(*primitive, value),
    }
}

fn check_primitive(primitive: Primitive, value: &Value) -> Result<Value, ErrorTree> {
    let ok = match primitive {
        Primitive::String => value.is_string(),
        Primitive::Number => value.is_number(),
        Primitive::Boolean => value.is_boolean(),
        Primitive::Date => value
            .as_str()
            .is_some_and(|s| is_datetime(s) || is_date(s)),
        Primitive::Object => value.is_object(),
        Primitive::Array => value.is_array(),
    };
    if ok {
        Ok(value.clone())
    } else {
        let expected = match primitive {
            Primitive::String => "string",
            Primitive::Number => "number",
            Primitive::Boolean => "boolean",
            Primitive::Date => "date",
            Primitive::Object => "object",
            Primitive::Array => "array",
        };
        Err(ErrorTree::message(mismatch(expected, value)))
    }
}

fn check_string(
    value: &Value,
    format: Option<Format>,
    min_length: Option<usize>,
    max_length: Option<usize>,
) -> Result<Value, ErrorTree> {
    let Some(text) = value.as_str() else {
        return Err(ErrorTree::message(mismatch("string", value)));
    };

    if let Some(format) = format {
        return if matches_format(format, text) {
            Ok(value.clone())
        } else {
            Err(ErrorTree::message(format_message(format)))
        };
    }

    let mut tree = ErrorTree::new();
    let length = text.chars().count();
    if let Some(min) = min_length
        && length < min
    {
        tree.push(format!("Must be at least {min} characters long"));
    }
    if let Some(max) = max_length
        && length > max
    {
        tree.push(format!("Must be at most {max} characters long"));
    }
    if tree.is_empty() {
        Ok(value.clone())
    } else {
        Err(tree)
    }
}

fn check_number(
    value: &Value,
    coerce: bool,
    integer: bool,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Value, ErrorTree> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if coerce => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    };
    let Some(number) = parsed else {
        return Err(ErrorTree::message(mismatch("number", value)));
    };

    let mut tree = ErrorTree::new();
    if integer && number.fract() != 0.0 {
        tree.push("Expected integer, received float");
    }
    if let Some(min) = min
        && number < min
    {
        tree.push(format!("Must be greater than or equal to {min}"));
    }
    if let Some(max) = max
        && number > max
    {
        tree.push(format!("Must be less than or equal to {max}"));
    }
    if !tree.is_empty() {
        return Err(tree);
    }

    match value {
        Value::Number(_) => Ok(value.clone()),
        _ => Ok(number_value(number)),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn number_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 {
        Value::from(number as i64)
    } else {
        Number::from_f64(number).map_or(Value::Null, Value::Number)
    }
}

fn check_boolean(value: &Value, coerce: bool) -> Result<Value, ErrorTree> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if coerce => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(ErrorTree::message(mismatch("boolean", value))),
        },
        Value::Number(n) if coerce => match n.as_f64() {
            Some(f) if f == 1.0 => Ok(Value::Bool(true)),
            Some(f) if f == 0.0 => Ok(Value::Bool(false)),
            _ => Err(ErrorTree::message(mismatch("boolean", value))),
        },
        _ => Err(ErrorTree::message(mismatch("boolean", value))),
    }
}

fn check_enum(value: &Value, values: &[String]) -> Result<Value, ErrorTree> {
    match value.as_str() {
        Some(s) if values.iter().any(|v| v == s) => Ok(value.clone()),
        _ => {
            let options = values
                .iter()
                .map(|v| format!("\"{v}\""))
                .collect::<Vec<_>>()
                .join("|");
            Err(ErrorTree::message(format!(
                "Invalid option: expected one of {options}"
            )))
        }
    }
}

fn check_array(
    value: &Value,
    items: Option<&Shape>,
    min_items: Option<usize>,
    max_items: Option<usize>,
) -> Result<Value, ErrorTree> {
    let Value::Array(elements) = value else {
        return Err(ErrorTree::message(mismatch("array", value)));
    };

    let mut tree = ErrorTree::new();
    if let Some(min) = min_items
        && elements.len() < min
    {
        tree.push(format!("Must contain at least {min} items"));
    }
    if let Some(max) = max_items
        && elements.len() > max
    {
        tree.push(format!("Must contain at most {max} items"));
    }

    let mut out = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let checked = match items {
            Some(shape) => check_shape(shape, element),
            None => Ok(element.clone()),
        };
        match checked {
            Ok(clean) => out.push(clean),
            Err(sub) => tree.item(index).merge(sub),
        }
    }

    if tree.is_empty() {
        Ok(Value::Array(out))
    } else {
        Err(tree)
    }
}

fn check_file(
    value: &Value,
    min_size: Option<u64>,
    max_size: Option<u64>,
    mime: &[String],
) -> Result<Value, ErrorTree> {
    let size = value.get("size").and_then(Value::as_u64);
    let (Some(size), true) = (size, value.is_object()) else {
        return Err(ErrorTree::message(mismatch("file", value)));
    };

    let mut tree = ErrorTree::new();
    if let Some(min) = min_size
        && size < min
    {
        tree.push(format!("File must be at least {min} bytes"));
    }
    if let Some(max) = max_size
        && size > max
    {
        tree.push(format!("File must be at most {max} bytes"));
    }
    if !mime.is_empty() {
        let content_type = value
            .get("content_type")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !mime.iter().any(|m| m == content_type) {
            tree.push(format!("File type must be one of {}", mime.join(", ")));
        }
    }
    if tree.is_empty() {
        Ok(value.clone())
    } else {
        Err(tree)
    }
}

fn matches_format(format: Format, text: &str) -> bool {
    match format {
        Format::Email => is_email(text),
        Format::Uuid => uuid::Uuid::parse_str(text).is_ok(),
        Format::Url => url::Url::parse(text).is_ok_and(|u| u.has_host()),
        Format::Ipv4 => text.parse::<Ipv4Addr>().is_ok(),
        Format::Ipv6 => text.parse::<Ipv6Addr>().is_ok(),
        Format::IsoDate => is_date(text),
        Format::IsoTime => is_time(text),
        Format::IsoDateTime => is_datetime(text),
        Format::IsoDuration => is_duration(text),
    }
}

fn format_message(format: Format) -> &'static str {
    match format {
        Format::Email => "Invalid email address",
        Format::Uuid => "Invalid UUID",
        Format::Url => "Invalid URL",
        Format::Ipv4 => "Invalid IPv4 address",
        Format::Ipv6 => "Invalid IPv6 address",
        Format::IsoDate => "Invalid ISO date",
        Format::IsoTime => "Invalid ISO time",
        Format::IsoDateTime => "Invalid ISO datetime",
        Format::IsoDuration => "Invalid ISO duration",
    }
}

fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !text.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_date(text: &str) -> bool {
    text.len() == 10 && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

fn is_time(text: &str) -> bool {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f").is_ok()
        || NaiveTime::parse_from_str(text, "%H:%M").is_ok()
}

fn is_datetime(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
}

fn is_duration(text: &str) -> bool {
    text.len() > 1
        && !text.ends_with('T')
        && ISO_DURATION
            .as_ref()
            .is_some_and(|re| re.is_match(text))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("Expected {expected}, received {}", json_type(value))
}
