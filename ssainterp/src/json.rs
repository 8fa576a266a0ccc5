//! JSON encoding of values for the command line
//!
//! Plain JSON maps onto the common representations (`int`, `float64`,
//! `string`, `bool`, `[]byte`). Anything else is written as a one-key tagged
//! object such as `{"int32": 5}` or `{"ptr": {"uint32": 0}}`. Strings that
//! are not valid UTF-8 travel as `{"string": [byte, ...]}`.

use crate::config::ConfigError;
use crate::externals::marshal::{bytes_to_value, error_value};
use crate::interp::Value;
use serde_json::{Map, Number, Value as Json, json};
use thiserror::Error;

/// Command line error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Argument error: argument {position}: {message}")]
    Argument { position: usize, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CliError {
    pub fn argument(position: usize, message: impl Into<String>) -> Self {
        Self::Argument {
            position,
            message: message.into(),
        }
    }
}

/// Decode one command line argument
pub fn parse_arg(position: usize, text: &str) -> Result<Value, CliError> {
    let json: Json =
        serde_json::from_str(text).map_err(|e| CliError::argument(position, e.to_string()))?;
    value_from_json(&json).map_err(|message| CliError::argument(position, message))
}

pub fn value_from_json(json: &Json) -> Result<Value, String> {
    match json {
        Json::Null => Ok(Value::Iface(None)),
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => Ok(number(n)),
        Json::String(s) => Ok(Value::str(s)),
        Json::Array(items) => {
            if let Some(bytes) = small_ints(items) {
                return Ok(bytes_to_value(&bytes));
            }
            let elems = items.iter().map(value_from_json).collect::<Result<_, _>>()?;
            Ok(Value::slice(elems))
        }
        Json::Object(fields) => tagged(fields),
    }
}

fn number(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Int(i)
    } else if let Some(u) = n.as_u64() {
        Value::Uint(u)
    } else {
        Value::Float64(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn small_ints(items: &[Json]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
        .collect()
}

fn integer<T: TryFrom<i128>>(tag: &str, json: &Json) -> Result<T, String> {
    let n = json
        .as_i64()
        .map(i128::from)
        .or_else(|| json.as_u64().map(i128::from))
        .ok_or_else(|| format!("{tag}: expected an integer, got {json}"))?;
    T::try_from(n).map_err(|_| format!("{tag}: {n} out of range"))
}

fn float(tag: &str, json: &Json) -> Result<f64, String> {
    json.as_f64()
        .ok_or_else(|| format!("{tag}: expected a number, got {json}"))
}

fn list<'a>(tag: &str, json: &'a Json) -> Result<&'a [Json], String> {
    json.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| format!("{tag}: expected an array, got {json}"))
}

fn tagged(fields: &Map<String, Json>) -> Result<Value, String> {
    let mut entries = fields.iter();
    let (Some((tag, inner)), None) = (entries.next(), entries.next()) else {
        return Err("tagged value must have exactly one key".to_string());
    };
    let tag = tag.as_str();
    let value = match tag {
        "int" => Value::Int(integer(tag, inner)?),
        "int8" => Value::Int8(integer(tag, inner)?),
        "int16" => Value::Int16(integer(tag, inner)?),
        "int32" => Value::Int32(integer(tag, inner)?),
        "int64" => Value::Int64(integer(tag, inner)?),
        "uint" => Value::Uint(integer(tag, inner)?),
        "uint8" => Value::Uint8(integer(tag, inner)?),
        "uint16" => Value::Uint16(integer(tag, inner)?),
        "uint32" => Value::Uint32(integer(tag, inner)?),
        "uint64" => Value::Uint64(integer(tag, inner)?),
        "uintptr" => Value::Uintptr(integer(tag, inner)?),
        "float32" => Value::Float32(float(tag, inner)? as f32),
        "float64" => Value::Float64(float(tag, inner)?),
        "string" => match small_ints(list(tag, inner)?) {
            Some(bytes) => Value::str_from_bytes(&bytes),
            None => return Err(format!("string: expected byte values, got {inner}")),
        },
        "bytes" => match inner.as_str() {
            Some(text) => bytes_to_value(text.as_bytes()),
            None => return Err(format!("bytes: expected a string, got {inner}")),
        },
        "error" => match inner.as_str() {
            Some(message) => error_value(message),
            None => return Err(format!("error: expected a string, got {inner}")),
        },
        "nil" => Value::Nil,
        "ptr" => Value::pointer(value_from_json(inner)?),
        "array" => Value::Array(
            list(tag, inner)?
                .iter()
                .map(value_from_json)
                .collect::<Result<_, _>>()?,
        ),
        "struct" => Value::Struct(
            list(tag, inner)?
                .iter()
                .map(value_from_json)
                .collect::<Result<_, _>>()?,
        ),
        other => return Err(format!("unknown tag `{other}`")),
    };
    Ok(value)
}

/// Encode a shim result for printing
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Bool(b) => json!(b),
        Value::Int(n) | Value::Int64(n) => json!(n),
        Value::Int8(n) => json!(n),
        Value::Int16(n) => json!(n),
        Value::Int32(n) => json!(n),
        Value::Uint(n) | Value::Uint64(n) | Value::Uintptr(n) => json!(n),
        Value::Uint8(n) => json!(n),
        Value::Uint16(n) => json!(n),
        Value::Uint32(n) => json!(n),
        Value::Float32(x) => float_json(f64::from(*x)),
        Value::Float64(x) => float_json(*x),
        Value::Str(s) => match std::str::from_utf8(s) {
            Ok(text) => json!(text),
            Err(_) => json!({ "string": &s[..] }),
        },
        Value::Nil | Value::Iface(None) => Json::Null,
        Value::Slice(elems) => seq_json(&elems.borrow()),
        Value::Array(elems) | Value::Struct(elems) | Value::Tuple(elems) => seq_json(elems),
        Value::Map(entries) => Json::Array(
            entries
                .borrow()
                .iter()
                .map(|(k, v)| json!([value_to_json(k), value_to_json(v)]))
                .collect(),
        ),
        Value::Pointer(cell) => json!({ "ptr": value_to_json(&cell.borrow()) }),
        Value::Iface(Some(iface)) => json!({
            "type": iface.ty.to_string(),
            "value": value_to_json(&iface.value),
        }),
        Value::Func(closure) => json!({ "func": closure.name }),
        Value::Type(ty) => json!(ty.to_string()),
    }
}

fn float_json(x: f64) -> Json {
    Number::from_f64(x).map_or(Json::Null, Json::Number)
}

fn seq_json(elems: &[Value]) -> Json {
    Json::Array(elems.iter().map(value_to_json).collect())
}
