//! Conversions between interpreter values and host data

use crate::interp::{Elements, Type, Value};
use std::fmt::Display;
use std::io;

/// Host bytes of a `[]byte` value; nil reads as empty.
/// `None` when the value is not a byte slice.
pub fn value_to_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Nil => Some(Vec::new()),
        Value::Slice(elems) => elems
            .borrow()
            .iter()
            .map(|v| match v {
                Value::Uint8(b) => Some(*b),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

/// Fresh `[]byte` holding `bytes`
pub fn bytes_to_value(bytes: &[u8]) -> Value {
    Value::slice(bytes.iter().map(|&b| Value::Uint8(b)).collect())
}

/// Write `bytes` into the front of a shared byte slice, so the caller sees
/// the data. Returns how many bytes fit.
pub fn copy_into_slice(dst: &Elements, bytes: &[u8]) -> usize {
    let mut elems = dst.borrow_mut();
    let n = elems.len().min(bytes.len());
    for (slot, &b) in elems.iter_mut().zip(&bytes[..n]) {
        *slot = Value::Uint8(b);
    }
    n
}

/// Interpreted `error` carrying `message`
pub fn error_value(message: impl Into<String>) -> Value {
    Value::iface(Type::error(), Value::Str(message.into().into_bytes().into()))
}

/// Nil interface for `None`, an interpreted `error` otherwise
pub fn wrap_error<E: Display>(err: Option<E>) -> Value {
    match err {
        None => Value::Iface(None),
        Some(err) => error_value(err.to_string()),
    }
}

/// Interpreted error for an OS error number, worded like the host's
/// `strerror` in lower case
pub fn errno_error(errno: i32) -> Value {
    io_error(&io::Error::from_raw_os_error(errno))
}

pub fn io_error(err: &io::Error) -> Value {
    error_value(describe_io_error(err))
}

/// `(value, nil)` on success, `(zero, err)` on failure
pub fn wrap_io_result(result: io::Result<Value>, zero: Value) -> Value {
    match result {
        Ok(value) => Value::Tuple(vec![value, Value::Iface(None)]),
        Err(err) => Value::Tuple(vec![zero, io_error(&err)]),
    }
}

fn describe_io_error(err: &io::Error) -> String {
    let text = err.to_string();
    let text = match text.find(" (os error") {
        Some(pos) => &text[..pos],
        None => &text,
    };
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Current errno of the calling thread
pub fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_round_trip() {
        let value = bytes_to_value(b"go");
        assert_eq!(value_to_bytes(&value).unwrap(), b"go");
        assert_eq!(value_to_bytes(&Value::Nil).unwrap(), Vec::<u8>::new());
        assert!(value_to_bytes(&Value::slice(vec![Value::Int(1)])).is_none());
        assert!(value_to_bytes(&Value::str("go")).is_none());
    }

    #[test]
    fn test_copy_into_slice_is_visible_to_caller() {
        let value = bytes_to_value(&[0; 4]);
        let Value::Slice(elems) = &value else {
            panic!("expected slice");
        };
        let alias = value.clone();
        assert_eq!(copy_into_slice(elems, b"abcdef"), 4);
        assert_eq!(value_to_bytes(&alias).unwrap(), b"abcd");
        assert_eq!(copy_into_slice(elems, b"z"), 1);
        assert_eq!(value_to_bytes(&alias).unwrap(), b"zbcd");
    }

    #[test]
    fn test_wrap_error_none_is_nil_interface() {
        assert_eq!(wrap_error::<&str>(None), Value::Iface(None));
    }

    #[test]
    fn test_wrap_error_some_is_error_value() {
        let value = wrap_error(Some("disk full"));
        let Value::Iface(Some(iface)) = value else {
            panic!("expected non-nil interface");
        };
        assert_eq!(iface.ty, Type::error());
        assert_eq!(iface.value, Value::str("disk full"));
    }

    #[test]
    fn test_errno_messages() {
        let Value::Iface(Some(iface)) = errno_error(libc::ENOENT) else {
            panic!("expected error");
        };
        assert_eq!(iface.value, Value::str("no such file or directory"));
    }

    #[test]
    fn test_wrap_io_result() {
        let ok = wrap_io_result(Ok(Value::Int(3)), Value::Int(-1));
        assert_eq!(ok, Value::Tuple(vec![Value::Int(3), Value::Iface(None)]));
        let err = wrap_io_result(
            Err(io::Error::from_raw_os_error(libc::EBADF)),
            Value::Int(-1),
        );
        let Value::Tuple(parts) = err else {
            panic!("expected tuple");
        };
        assert_eq!(parts[0], Value::Int(-1));
        assert_eq!(parts[1], error_value("bad file descriptor"));
    }
}
