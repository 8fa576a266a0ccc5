//! Argument downcasting for shims
//!
//! Every accessor names the expected representation; a mismatch means the
//! evaluator handed over a value its own type checker should have rejected.

use super::Host;
use super::marshal;
use crate::config::BridgeConfig;
use crate::interp::{Cell, Elements, Iface, InterpResult, RuntimeError, Value};

/// Evaluated arguments of one external call, receiver first
pub struct Args<'a> {
    name: &'a str,
    values: &'a [Value],
    host: &'a Host,
}

macro_rules! scalar_accessor {
    ($(#[$doc:meta])* $method:ident, $variant:ident, $ty:ty, $label:literal) => {
        $(#[$doc])*
        pub fn $method(&self, index: usize) -> InterpResult<$ty> {
            match self.get(index)? {
                Value::$variant(v) => Ok(*v),
                other => Err(self.shape_error(index, $label, other)),
            }
        }
    };
}

impl<'a> Args<'a> {
    pub(crate) fn new(name: &'a str, values: &'a [Value], host: &'a Host) -> Self {
        Args { name, values, host }
    }

    /// Qualified name of the function being emulated
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn host(&self) -> &'a Host {
        self.host
    }

    pub fn config(&self) -> &'a BridgeConfig {
        &self.host.config
    }

    pub fn get(&self, index: usize) -> InterpResult<&'a Value> {
        self.values
            .get(index)
            .ok_or_else(|| RuntimeError::arity_mismatch(self.name, index + 1, self.values.len()))
    }

    pub fn shape_error(&self, index: usize, expected: &str, got: &Value) -> RuntimeError {
        RuntimeError::argument_shape(self.name, index, expected, got.type_name())
    }

    scalar_accessor!(
        /// Platform `int`
        int, Int, i64, "int"
    );
    scalar_accessor!(i32, Int32, i32, "int32");
    scalar_accessor!(i64, Int64, i64, "int64");
    scalar_accessor!(u32, Uint32, u32, "uint32");
    scalar_accessor!(u64, Uint64, u64, "uint64");
    scalar_accessor!(uintptr, Uintptr, u64, "uintptr");
    scalar_accessor!(byte, Uint8, u8, "byte");
    scalar_accessor!(f32, Float32, f32, "float32");
    scalar_accessor!(f64, Float64, f64, "float64");
    scalar_accessor!(bool, Bool, bool, "bool");

    /// Bytes of a string argument
    pub fn string(&self, index: usize) -> InterpResult<&'a [u8]> {
        match self.get(index)? {
            Value::Str(s) => Ok(&s[..]),
            other => Err(self.shape_error(index, "string", other)),
        }
    }

    /// Copy of a byte slice argument; nil reads as empty
    pub fn bytes(&self, index: usize) -> InterpResult<Vec<u8>> {
        let value = self.get(index)?;
        marshal::value_to_bytes(value).ok_or_else(|| self.shape_error(index, "[]byte", value))
    }

    /// Shared backing array of a slice argument, `None` for a nil slice
    pub fn slice(&self, index: usize) -> InterpResult<Option<&'a Elements>> {
        match self.get(index)? {
            Value::Slice(elems) => Ok(Some(elems)),
            Value::Nil => Ok(None),
            other => Err(self.shape_error(index, "slice", other)),
        }
    }

    /// Target cell of a non-nil pointer argument
    pub fn pointer(&self, index: usize) -> InterpResult<&'a Cell> {
        match self.get(index)? {
            Value::Pointer(cell) => Ok(cell),
            Value::Nil => Err(RuntimeError::nil_dereference(self.name)),
            other => Err(self.shape_error(index, "pointer", other)),
        }
    }

    /// Interface argument, `None` for the nil interface
    pub fn iface(&self, index: usize) -> InterpResult<Option<&'a Iface>> {
        match self.get(index)? {
            Value::Iface(iface) => Ok(iface.as_deref()),
            other => Err(self.shape_error(index, "interface", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::{ErrorKind, Type};

    fn with_args<R>(values: &[Value], f: impl FnOnce(&Args<'_>) -> R) -> R {
        let host = Host::new(BridgeConfig::default());
        let args = Args::new("test.Func", values, &host);
        f(&args)
    }

    #[test]
    fn test_scalar_accessors() {
        let values = [Value::Int(3), Value::Int32(-4), Value::Uint8(9), Value::str("s")];
        with_args(&values, |args| {
            assert_eq!(args.int(0).unwrap(), 3);
            assert_eq!(args.i32(1).unwrap(), -4);
            assert_eq!(args.byte(2).unwrap(), 9);
            assert_eq!(args.string(3).unwrap(), b"s");
        });
    }

    #[test]
    fn test_shape_mismatch_is_labeled() {
        with_args(&[Value::Int64(1)], |args| {
            let err = args.int(0).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ArgumentShape);
            assert_eq!(
                err.message,
                "internal error: test.Func: argument 0: expected int, got int64"
            );
        });
    }

    #[test]
    fn test_missing_argument_is_arity_error() {
        with_args(&[], |args| {
            let err = args.get(1).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ArityMismatch);
        });
    }

    #[test]
    fn test_nil_pointer_and_nil_slice() {
        with_args(&[Value::Nil], |args| {
            let err = args.pointer(0).unwrap_err();
            assert_eq!(err.kind, ErrorKind::NilDereference);
            assert!(args.slice(0).unwrap().is_none());
            assert!(args.bytes(0).unwrap().is_empty());
        });
    }

    #[test]
    fn test_iface_accessor() {
        let values = [Value::Iface(None), Value::iface(Type::int(), Value::Int(1))];
        with_args(&values, |args| {
            assert!(args.iface(0).unwrap().is_none());
            assert_eq!(args.iface(1).unwrap().unwrap().value, Value::Int(1));
        });
    }
}
