//! bytes, strings and hash/crc32 shims

use super::Args;
use crate::interp::{Frame, InterpResult, Value};

/// func Equal(a, b []byte) bool
pub fn equal(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let a = args.bytes(0)?;
    let b = args.bytes(1)?;
    if a.len() != b.len() {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(a.iter().zip(&b).all(|(x, y)| x == y)))
}

/// func IndexByte(s []byte, c byte) int
pub fn index_byte(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let s = args.bytes(0)?;
    let c = args.byte(1)?;
    Ok(Value::Int(position(&s, c)))
}

/// func IndexByte(s string, c byte) int
pub fn string_index_byte(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let s = args.string(0)?;
    let c = args.byte(1)?;
    Ok(Value::Int(position(s, c)))
}

/// The table-driven crc32 path is always used.
pub fn have_sse42(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Bool(false))
}

fn position(haystack: &[u8], needle: u8) -> i64 {
    haystack
        .iter()
        .position(|&b| b == needle)
        .map_or(-1, |i| i as i64)
}
