//! Runtime values for the interpreter

use super::types::Type;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared, mutable storage cell behind pointers
pub type Cell = Rc<RefCell<Value>>;

/// Shared backing array of a slice
pub type Elements = Rc<RefCell<Vec<Value>>>;

/// Shared entries of a map; key order is irrelevant
pub type Entries = Rc<RefCell<Vec<(Value, Value)>>>;

/// Runtime value
///
/// `Value` is built on `Rc`, so it is neither `Send` nor `Sync`: interpreted
/// tasks that share values must run on one host thread.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    /// Platform `int` (64-bit)
    Int(i64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    /// Platform `uint` (64-bit)
    Uint(u64),
    /// Also `byte`
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Uintptr(u64),
    Float32(f32),
    Float64(f64),
    /// Go string: immutable bytes, not necessarily UTF-8
    Str(Rc<[u8]>),
    /// Nil pointer, slice, map, channel or func
    Nil,
    Slice(Elements),
    Array(Vec<Value>),
    Map(Entries),
    /// Struct value: fields by position
    Struct(Vec<Value>),
    Pointer(Cell),
    /// Multiple return values, in call order
    Tuple(Vec<Value>),
    /// Interface value; `None` is the nil interface
    Iface(Option<Rc<Iface>>),
    /// Interpreted function value, callable only through a frame
    Func(Rc<Closure>),
    /// Reflected type descriptor
    Type(Type),
}

/// Non-nil interface value: dynamic type plus payload
#[derive(Debug, Clone, PartialEq)]
pub struct Iface {
    pub ty: Type,
    pub value: Value,
}

/// Interpreted function value
#[derive(Debug)]
pub struct Closure {
    /// Qualified name of the underlying function
    pub name: String,
    /// Captured free variables
    pub env: Vec<Value>,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s.as_bytes()))
    }

    /// String value holding arbitrary bytes
    pub fn str_from_bytes(bytes: &[u8]) -> Self {
        Value::Str(Rc::from(bytes))
    }

    pub fn slice(elements: Vec<Value>) -> Self {
        Value::Slice(Rc::new(RefCell::new(elements)))
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn pointer(value: Value) -> Self {
        Value::Pointer(Rc::new(RefCell::new(value)))
    }

    pub fn iface(ty: Type, value: Value) -> Self {
        Value::Iface(Some(Rc::new(Iface { ty, value })))
    }

    pub fn func(name: impl Into<String>, env: Vec<Value>) -> Self {
        Value::Func(Rc::new(Closure {
            name: name.into(),
            env,
        }))
    }

    /// The unit result of shims for functions without results
    pub fn unit() -> Self {
        Value::Tuple(Vec::new())
    }

    /// Get representation name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Uint(_) => "uint",
            Value::Uint8(_) => "uint8",
            Value::Uint16(_) => "uint16",
            Value::Uint32(_) => "uint32",
            Value::Uint64(_) => "uint64",
            Value::Uintptr(_) => "uintptr",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Str(_) => "string",
            Value::Nil => "nil",
            Value::Slice(_) => "slice",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Pointer(_) => "pointer",
            Value::Tuple(_) => "tuple",
            Value::Iface(_) => "interface",
            Value::Func(_) => "func",
            Value::Type(_) => "type",
        }
    }

    /// Widen any signed integer to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) | Value::Int64(n) => Some(*n),
            Value::Int8(n) => Some(i64::from(*n)),
            Value::Int16(n) => Some(i64::from(*n)),
            Value::Int32(n) => Some(i64::from(*n)),
            _ => None,
        }
    }

    /// Widen any unsigned integer to u64
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(n) | Value::Uint64(n) | Value::Uintptr(n) => Some(*n),
            Value::Uint8(n) => Some(u64::from(*n)),
            Value::Uint16(n) => Some(u64::from(*n)),
            Value::Uint32(n) => Some(u64::from(*n)),
            _ => None,
        }
    }

    /// Widen any float to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(x) => Some(f64::from(*x)),
            Value::Float64(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Raw bytes of a string value
    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(s) => Some(&s[..]),
            _ => None,
        }
    }

    /// Identity of reference-like values, 0 for nil
    pub fn address(&self) -> Option<u64> {
        let addr = match self {
            Value::Nil | Value::Iface(None) => 0,
            Value::Pointer(cell) => Rc::as_ptr(cell) as usize,
            Value::Slice(elems) => Rc::as_ptr(elems) as usize,
            Value::Map(entries) => Rc::as_ptr(entries) as usize,
            Value::Func(closure) => Rc::as_ptr(closure) as usize,
            _ => return None,
        };
        Some(addr as u64)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) | Value::Int64(n) => write!(f, "{n}"),
            Value::Int8(n) => write!(f, "{n}"),
            Value::Int16(n) => write!(f, "{n}"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::Uint(n) | Value::Uint64(n) => write!(f, "{n}"),
            Value::Uintptr(n) => write!(f, "{n:#x}"),
            Value::Uint8(n) => write!(f, "{n}"),
            Value::Uint16(n) => write!(f, "{n}"),
            Value::Uint32(n) => write!(f, "{n}"),
            Value::Float32(x) => write!(f, "{x}"),
            Value::Float64(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            Value::Nil => write!(f, "<nil>"),
            Value::Slice(elems) => write_seq(f, "[", &elems.borrow(), "]"),
            Value::Array(elems) => write_seq(f, "[", elems, "]"),
            Value::Struct(fields) => write_seq(f, "{", fields, "}"),
            Value::Tuple(elems) => write_seq(f, "(", elems, ")"),
            Value::Map(entries) => {
                write!(f, "map[")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                write!(f, "]")
            }
            Value::Pointer(cell) => write!(f, "{:p}", Rc::as_ptr(cell)),
            Value::Iface(None) => write!(f, "<nil>"),
            Value::Iface(Some(iface)) => write!(f, "{}", iface.value),
            Value::Func(closure) => write!(f, "func {}", closure.name),
            Value::Type(ty) => write!(f, "{ty}"),
        }
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, open: &str, elems: &[Value], close: &str) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, v) in elems.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{v}")?;
    }
    write!(f, "{close}")
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Uint8(a), Value::Uint8(b)) => a == b,
            (Value::Uint16(a), Value::Uint16(b)) => a == b,
            (Value::Uint32(a), Value::Uint32(b)) => a == b,
            (Value::Uint64(a), Value::Uint64(b)) => a == b,
            (Value::Uintptr(a), Value::Uintptr(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            // Reference-like values compare by identity.
            (Value::Slice(a), Value::Slice(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Pointer(a), Value::Pointer(b)) => Rc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Struct(a), Value::Struct(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Iface(a), Value::Iface(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => a.ty == b.ty && a.value == b.value,
                _ => false,
            },
            (Value::Type(a), Value::Type(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Int(42)), "42");
        assert_eq!(format!("{}", Value::Float64(3.5)), "3.5");
        assert_eq!(format!("{}", Value::Bool(true)), "true");
        assert_eq!(format!("{}", Value::Iface(None)), "<nil>");
        assert_eq!(
            format!("{}", Value::slice(vec![Value::Uint8(1), Value::Uint8(2)])),
            "[1 2]"
        );
        assert_eq!(
            format!("{}", Value::Tuple(vec![Value::str("a"), Value::Int(-1)])),
            "(a -1)"
        );
    }

    #[test]
    fn test_scalars_compare_by_value_and_width() {
        assert_eq!(Value::Int32(5), Value::Int32(5));
        assert_ne!(Value::Int32(5), Value::Int64(5));
        assert_ne!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
        assert_eq!(Value::str("go"), Value::str("go"));
    }

    #[test]
    fn test_strings_hold_arbitrary_bytes() {
        let raw = Value::str_from_bytes(b"f\xff");
        assert_eq!(raw.as_str_bytes(), Some(&[b'f', 0xff][..]));
        assert_ne!(raw, Value::str("f\u{fffd}"));
        assert_eq!(Value::str_from_bytes(b"go"), Value::str("go"));
        assert_eq!(format!("{raw}"), "f\u{fffd}");
    }

    #[test]
    fn test_references_compare_by_identity() {
        let p = Value::pointer(Value::Int(1));
        let q = Value::pointer(Value::Int(1));
        assert_eq!(p, p.clone());
        assert_ne!(p, q);
        let s = Value::slice(vec![]);
        assert_eq!(s, s.clone());
        assert_ne!(s, Value::slice(vec![]));
    }

    #[test]
    fn test_interfaces_compare_type_then_value() {
        let a = Value::iface(Type::int(), Value::Int(3));
        let b = Value::iface(Type::int(), Value::Int(3));
        let c = Value::iface(Type::named("main.Celsius", Type::int()), Value::Int(3));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, Value::Iface(None));
    }

    #[test]
    fn test_widening_accessors() {
        assert_eq!(Value::Int8(-3).as_i64(), Some(-3));
        assert_eq!(Value::Uint16(7).as_u64(), Some(7));
        assert_eq!(Value::Float32(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::Uint8(1).as_i64(), None);
        assert_eq!(Value::str("x").as_str_bytes(), Some(&b"x"[..]));
    }

    #[test]
    fn test_address_identity() {
        let p = Value::pointer(Value::Nil);
        assert_eq!(p.address(), p.clone().address());
        assert_ne!(p.address(), Some(0));
        assert_eq!(Value::Nil.address(), Some(0));
        assert_eq!(Value::Int(1).address(), None);
    }
}
