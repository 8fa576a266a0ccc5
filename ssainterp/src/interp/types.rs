//! Type descriptors for reflection
//!
//! The interpreter hands typed values to reflective shims as `Value::Type`
//! payloads and as the dynamic type of interface values. Only the parts of
//! the source type system that reflection observes are modeled: kinds,
//! element and field types, method counts, sizes and type strings.

use super::Value;
use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

/// Reflect kind, numbered as the source language's `reflect.Kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Kind {
    Invalid = 0,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Array,
    Chan,
    Func,
    Interface,
    Map,
    Ptr,
    Slice,
    String,
    Struct,
    UnsafePointer,
}

impl Kind {
    /// Numeric value as seen by interpreted code (`reflect.Kind` is a `uint`)
    pub fn as_u64(self) -> u64 {
        self as u64
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Uintptr => "uintptr",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Complex64 => "complex64",
            Kind::Complex128 => "complex128",
            Kind::Array => "array",
            Kind::Chan => "chan",
            Kind::Func => "func",
            Kind::Interface => "interface",
            Kind::Map => "map",
            Kind::Ptr => "ptr",
            Kind::Slice => "slice",
            Kind::String => "string",
            Kind::Struct => "struct",
            Kind::UnsafePointer => "unsafe.Pointer",
        }
    }
}

/// Predeclared types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Basic {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    String,
    UnsafePointer,
}

impl Basic {
    fn kind(self) -> Kind {
        match self {
            Basic::Bool => Kind::Bool,
            Basic::Int => Kind::Int,
            Basic::Int8 => Kind::Int8,
            Basic::Int16 => Kind::Int16,
            Basic::Int32 => Kind::Int32,
            Basic::Int64 => Kind::Int64,
            Basic::Uint => Kind::Uint,
            Basic::Uint8 => Kind::Uint8,
            Basic::Uint16 => Kind::Uint16,
            Basic::Uint32 => Kind::Uint32,
            Basic::Uint64 => Kind::Uint64,
            Basic::Uintptr => Kind::Uintptr,
            Basic::Float32 => Kind::Float32,
            Basic::Float64 => Kind::Float64,
            Basic::String => Kind::String,
            Basic::UnsafePointer => Kind::UnsafePointer,
        }
    }

    fn size(self) -> u64 {
        match self {
            Basic::Bool | Basic::Int8 | Basic::Uint8 => 1,
            Basic::Int16 | Basic::Uint16 => 2,
            Basic::Int32 | Basic::Uint32 | Basic::Float32 => 4,
            Basic::String => 16,
            _ => 8,
        }
    }

    fn is_numeric(self) -> bool {
        !matches!(self, Basic::Bool | Basic::String | Basic::UnsafePointer)
    }

    fn zero_value(self) -> Value {
        match self {
            Basic::Bool => Value::Bool(false),
            Basic::Int => Value::Int(0),
            Basic::Int8 => Value::Int8(0),
            Basic::Int16 => Value::Int16(0),
            Basic::Int32 => Value::Int32(0),
            Basic::Int64 => Value::Int64(0),
            Basic::Uint => Value::Uint(0),
            Basic::Uint8 => Value::Uint8(0),
            Basic::Uint16 => Value::Uint16(0),
            Basic::Uint32 => Value::Uint32(0),
            Basic::Uint64 => Value::Uint64(0),
            Basic::Uintptr => Value::Uintptr(0),
            Basic::Float32 => Value::Float32(0.0),
            Basic::Float64 => Value::Float64(0.0),
            Basic::String => Value::str(""),
            Basic::UnsafePointer => Value::Nil,
        }
    }
}

/// Struct field descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub tag: String,
    pub embedded: bool,
    /// Package path for unexported fields, empty for exported ones
    pub pkg_path: String,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Field {
            name: name.into(),
            ty,
            tag: String::new(),
            embedded: false,
            pkg_path: String::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn unexported(mut self, pkg_path: impl Into<String>) -> Self {
        self.pkg_path = pkg_path.into();
        self
    }

    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    pub variadic: bool,
}

/// Interface method
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub sig: Signature,
}

/// Named (defined) type
///
/// The underlying type is set once, possibly after the name has been handed
/// out, so declarations like `type Node struct{ Next *Node }` can refer to
/// themselves. Such descriptors form `Rc` cycles and live for the whole run,
/// like the program's type table.
#[derive(Clone)]
pub struct Named {
    /// Qualified name, e.g. `main.Point` or `error`
    pub name: String,
    underlying: OnceCell<Type>,
    /// Methods with value receivers
    pub methods: Vec<String>,
    /// Methods declared on the pointer receiver only
    pub pointer_methods: Vec<String>,
}

impl Named {
    /// `None` until the declaration is completed with `Type::define`
    pub fn underlying(&self) -> Option<&Type> {
        self.underlying.get()
    }
}

impl fmt::Debug for Named {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The underlying type may lead back here.
        f.debug_struct("Named")
            .field("name", &self.name)
            .field("defined", &self.underlying.get().is_some())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Named {
    fn eq(&self, other: &Self) -> bool {
        // Defined types are identical only to themselves.
        self.name == other.name
    }
}

/// Interpreter type
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Basic(Basic),
    Array(Rc<Type>, u64),
    Slice(Rc<Type>),
    Map(Rc<Type>, Rc<Type>),
    Pointer(Rc<Type>),
    Chan(Rc<Type>),
    Struct(Rc<[Field]>),
    Func(Rc<Signature>),
    Interface(Rc<[Method]>),
    Named(Rc<Named>),
}

impl Type {
    pub fn bool() -> Self {
        Type::Basic(Basic::Bool)
    }

    pub fn int() -> Self {
        Type::Basic(Basic::Int)
    }

    pub fn uint8() -> Self {
        Type::Basic(Basic::Uint8)
    }

    pub fn string() -> Self {
        Type::Basic(Basic::String)
    }

    pub fn uintptr() -> Self {
        Type::Basic(Basic::Uintptr)
    }

    pub fn slice(elem: Type) -> Self {
        Type::Slice(Rc::new(elem))
    }

    pub fn array(elem: Type, len: u64) -> Self {
        Type::Array(Rc::new(elem), len)
    }

    pub fn pointer(elem: Type) -> Self {
        Type::Pointer(Rc::new(elem))
    }

    pub fn map(key: Type, elem: Type) -> Self {
        Type::Map(Rc::new(key), Rc::new(elem))
    }

    pub fn chan(elem: Type) -> Self {
        Type::Chan(Rc::new(elem))
    }

    pub fn structure(fields: Vec<Field>) -> Self {
        Type::Struct(fields.into())
    }

    pub fn func(params: Vec<Type>, results: Vec<Type>) -> Self {
        Type::Func(Rc::new(Signature {
            params,
            results,
            variadic: false,
        }))
    }

    pub fn interface(methods: Vec<Method>) -> Self {
        Type::Interface(methods.into())
    }

    pub fn named(name: impl Into<String>, underlying: Type) -> Self {
        Type::named_with_methods(name, underlying, &[], &[])
    }

    pub fn named_with_methods(
        name: impl Into<String>,
        underlying: Type,
        methods: &[&str],
        pointer_methods: &[&str],
    ) -> Self {
        let ty = Type::declare(name, methods, pointer_methods);
        ty.define(underlying);
        ty
    }

    /// Named type whose underlying type is supplied later by `define`
    pub fn declare(name: impl Into<String>, methods: &[&str], pointer_methods: &[&str]) -> Self {
        Type::Named(Rc::new(Named {
            name: name.into(),
            underlying: OnceCell::new(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            pointer_methods: pointer_methods.iter().map(|m| m.to_string()).collect(),
        }))
    }

    /// Complete a declared named type. Returns false if `self` is not named
    /// or was already defined.
    pub fn define(&self, underlying: Type) -> bool {
        match self {
            Type::Named(named) => named.underlying.set(underlying).is_ok(),
            _ => false,
        }
    }

    /// The predeclared `error` interface
    pub fn error() -> Self {
        Type::named(
            "error",
            Type::interface(vec![Method {
                name: "Error".to_string(),
                sig: Signature {
                    params: vec![],
                    results: vec![Type::string()],
                    variadic: false,
                },
            }]),
        )
    }

    /// Dynamic type of `reflect.Type` interface values
    pub fn rtype() -> Self {
        Type::named_with_methods(
            "reflect.rtype",
            Type::structure(vec![]),
            &[
                "Bits",
                "Elem",
                "Field",
                "Kind",
                "NumField",
                "NumMethod",
                "NumOut",
                "Out",
                "Size",
                "String",
            ],
            &[],
        )
    }

    /// The `reflect.Type` interface
    pub fn reflect_type() -> Self {
        Type::named("reflect.Type", Type::interface(vec![]))
    }

    /// `reflect.StructField`, laid out as the shims populate it
    pub fn struct_field() -> Self {
        Type::named(
            "reflect.StructField",
            Type::structure(vec![
                Field::new("Name", Type::string()),
                Field::new("PkgPath", Type::string()),
                Field::new("Type", Type::reflect_type()),
                Field::new("Tag", Type::named("reflect.StructTag", Type::string())),
                Field::new("Offset", Type::uintptr()),
                Field::new("Index", Type::slice(Type::int())),
                Field::new("Anonymous", Type::bool()),
            ]),
        )
    }

    /// Strip any number of named layers. A declared but undefined named
    /// type is its own underlying type and has kind `Invalid`.
    pub fn underlying(&self) -> &Type {
        match self {
            Type::Named(named) => match named.underlying() {
                Some(underlying) => underlying.underlying(),
                None => self,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> Kind {
        match self.underlying() {
            Type::Basic(b) => b.kind(),
            Type::Array(..) => Kind::Array,
            Type::Slice(_) => Kind::Slice,
            Type::Map(..) => Kind::Map,
            Type::Pointer(_) => Kind::Ptr,
            Type::Chan(_) => Kind::Chan,
            Type::Struct(_) => Kind::Struct,
            Type::Func(_) => Kind::Func,
            Type::Interface(_) => Kind::Interface,
            Type::Named(_) => Kind::Invalid,
        }
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.underlying(), Type::Interface(_))
    }

    /// Element type of arrays, slices, pointers, channels and maps
    pub fn elem(&self) -> Option<&Type> {
        match self.underlying() {
            Type::Array(elem, _)
            | Type::Slice(elem)
            | Type::Pointer(elem)
            | Type::Chan(elem)
            | Type::Map(_, elem) => Some(elem.as_ref()),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&Type> {
        match self.underlying() {
            Type::Map(key, _) => Some(key.as_ref()),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[Field]> {
        match self.underlying() {
            Type::Struct(fields) => Some(&fields[..]),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&Signature> {
        match self.underlying() {
            Type::Func(sig) => Some(sig.as_ref()),
            _ => None,
        }
    }

    /// Size of the method set
    pub fn num_method(&self) -> usize {
        match self {
            Type::Named(named) => match named.underlying() {
                Some(Type::Interface(methods)) => methods.len(),
                _ => named.methods.len(),
            },
            Type::Pointer(elem) => match elem.as_ref() {
                Type::Named(named) if !elem.is_interface() => {
                    named.methods.len() + named.pointer_methods.len()
                }
                _ => 0,
            },
            Type::Interface(methods) => methods.len(),
            _ => 0,
        }
    }

    /// Size in bytes under the 64-bit gc layout
    pub fn size(&self) -> u64 {
        match self.underlying() {
            Type::Basic(b) => b.size(),
            Type::Array(elem, len) => elem.size() * len,
            Type::Slice(_) => 24,
            Type::Interface(_) => 16,
            Type::Map(..) | Type::Pointer(_) | Type::Chan(_) | Type::Func(_) => 8,
            Type::Struct(fields) => {
                let mut offset = 0;
                for field in fields.iter() {
                    offset = align_up(offset, field.ty.align()) + field.ty.size();
                }
                align_up(offset, self.align())
            }
            Type::Named(_) => 0,
        }
    }

    pub fn align(&self) -> u64 {
        match self.underlying() {
            Type::Basic(Basic::String) => 8,
            Type::Basic(b) => b.size(),
            Type::Array(elem, _) => elem.align(),
            Type::Struct(fields) => fields.iter().map(|f| f.ty.align()).max().unwrap_or(1),
            Type::Named(_) => 1,
            _ => 8,
        }
    }

    /// Byte offset of struct field `index`
    pub fn field_offset(&self, index: usize) -> Option<u64> {
        let fields = self.fields()?;
        let mut offset = 0;
        for (i, field) in fields.iter().enumerate() {
            offset = align_up(offset, field.ty.align());
            if i == index {
                return Some(offset);
            }
            offset += field.ty.size();
        }
        None
    }

    /// Width in bits for arithmetic types, `None` otherwise
    pub fn bits(&self) -> Option<u64> {
        match self.underlying() {
            Type::Basic(b) if b.is_numeric() => Some(b.size() * 8),
            _ => None,
        }
    }

    /// Zero value of this type, as a fresh interpreter value
    pub fn zero_value(&self) -> Value {
        match self.underlying() {
            Type::Basic(b) => b.zero_value(),
            Type::Array(elem, len) => Value::Array((0..*len).map(|_| elem.zero_value()).collect()),
            Type::Struct(fields) => Value::Struct(fields.iter().map(|f| f.ty.zero_value()).collect()),
            Type::Interface(_) => Value::Iface(None),
            Type::Slice(_) | Type::Map(..) | Type::Pointer(_) | Type::Chan(_) | Type::Func(_) => {
                Value::Nil
            }
            Type::Named(_) => Value::Nil,
        }
    }
}

fn align_up(offset: u64, align: u64) -> u64 {
    offset.div_ceil(align) * align
}

fn write_tuple(f: &mut fmt::Formatter<'_>, types: &[Type], variadic: bool) -> fmt::Result {
    write!(f, "(")?;
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        if variadic && i + 1 == types.len() {
            match ty {
                Type::Slice(elem) => write!(f, "...{elem}")?,
                other => write!(f, "...{other}")?,
            }
        } else {
            write!(f, "{ty}")?;
        }
    }
    write!(f, ")")
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_tuple(f, &self.params, self.variadic)?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " {single}"),
            many => {
                write!(f, " ")?;
                write_tuple(f, many, false)
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(b) => match b {
                Basic::UnsafePointer => write!(f, "unsafe.Pointer"),
                other => write!(f, "{}", other.kind().name()),
            },
            Type::Array(elem, len) => write!(f, "[{len}]{elem}"),
            Type::Slice(elem) => write!(f, "[]{elem}"),
            Type::Map(key, elem) => write!(f, "map[{key}]{elem}"),
            Type::Pointer(elem) => write!(f, "*{elem}"),
            Type::Chan(elem) => write!(f, "chan {elem}"),
            Type::Struct(fields) => {
                write!(f, "struct{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    if field.embedded {
                        write!(f, "{}", field.ty)?;
                    } else {
                        write!(f, "{} {}", field.name, field.ty)?;
                    }
                    if !field.tag.is_empty() {
                        write!(f, " {:?}", field.tag)?;
                    }
                }
                write!(f, "}}")
            }
            Type::Func(sig) => write!(f, "func{sig}"),
            Type::Interface(methods) => {
                write!(f, "interface{{")?;
                for (i, method) in methods.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}{}", method.name, method.sig)?;
                }
                write!(f, "}}")
            }
            Type::Named(named) => write!(f, "{}", named.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Type {
        Type::named_with_methods(
            "main.Point",
            Type::structure(vec![
                Field::new("X", Type::Basic(Basic::Int32)),
                Field::new("y", Type::Basic(Basic::Int64)).unexported("main"),
                Field::new("Label", Type::string()).with_tag("json:\"label\""),
            ]),
            &["String"],
            &["Scale", "Move"],
        )
    }

    #[test]
    fn test_kind_of_named_follows_underlying() {
        assert_eq!(point().kind(), Kind::Struct);
        assert_eq!(Type::error().kind(), Kind::Interface);
        assert_eq!(Type::pointer(point()).kind(), Kind::Ptr);
        assert_eq!(Kind::Ptr.as_u64(), 22);
        assert_eq!(Kind::UnsafePointer.as_u64(), 26);
    }

    #[test]
    fn test_struct_layout() {
        let p = point();
        assert_eq!(p.field_offset(0), Some(0));
        assert_eq!(p.field_offset(1), Some(8));
        assert_eq!(p.field_offset(2), Some(16));
        assert_eq!(p.field_offset(3), None);
        assert_eq!(p.size(), 32);
        assert_eq!(p.align(), 8);
    }

    #[test]
    fn test_sizes_of_composites() {
        assert_eq!(Type::array(Type::uint8(), 5).size(), 5);
        assert_eq!(Type::slice(Type::int()).size(), 24);
        assert_eq!(Type::error().size(), 16);
        assert_eq!(Type::structure(vec![]).size(), 0);
        let padded = Type::structure(vec![
            Field::new("a", Type::Basic(Basic::Int64)),
            Field::new("b", Type::bool()),
        ]);
        assert_eq!(padded.size(), 16);
    }

    #[test]
    fn test_bits_only_for_arithmetic_types() {
        assert_eq!(Type::Basic(Basic::Float32).bits(), Some(32));
        assert_eq!(Type::named("main.Celsius", Type::Basic(Basic::Float64)).bits(), Some(64));
        assert_eq!(Type::string().bits(), None);
        assert_eq!(Type::bool().bits(), None);
    }

    #[test]
    fn test_method_counts() {
        let p = point();
        assert_eq!(p.num_method(), 1);
        assert_eq!(Type::pointer(p).num_method(), 3);
        assert_eq!(Type::error().num_method(), 1);
        assert_eq!(Type::int().num_method(), 0);
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(Type::Basic(Basic::Uint32).zero_value(), Value::Uint32(0));
        assert_eq!(Type::error().zero_value(), Value::Iface(None));
        assert!(matches!(Type::slice(Type::uint8()).zero_value(), Value::Nil));
        assert_eq!(
            point().zero_value(),
            Value::Struct(vec![Value::Int32(0), Value::Int64(0), Value::str("")])
        );
    }

    #[test]
    fn test_self_referential_named_type() {
        let node = Type::declare("main.Node", &[], &[]);
        assert_eq!(node.kind(), Kind::Invalid);
        assert!(node.define(Type::structure(vec![
            Field::new("Value", Type::int()),
            Field::new("Next", Type::pointer(node.clone())),
        ])));
        assert!(!node.define(Type::int()));

        assert_eq!(node.kind(), Kind::Struct);
        assert_eq!(node.size(), 16);
        assert_eq!(node.field_offset(1), Some(8));
        assert_eq!(node.zero_value(), Value::Struct(vec![Value::Int(0), Value::Nil]));
        let next = &node.fields().unwrap()[1].ty;
        assert_eq!(next.elem(), Some(&node));
        assert_eq!(next.elem().and_then(Type::fields).map(<[Field]>::len), Some(2));
        insta::assert_snapshot!(node.underlying().to_string(), @"struct{Value int; Next *main.Node}");
        assert!(format!("{node:?}").contains("main.Node"));
    }

    #[test]
    fn test_type_strings() {
        insta::assert_snapshot!(
            Type::map(Type::string(), Type::slice(Type::pointer(point()))).to_string(),
            @"map[string][]*main.Point"
        );
        insta::assert_snapshot!(
            Type::func(vec![Type::int(), Type::string()], vec![Type::bool(), Type::error()]).to_string(),
            @"func(int, string) (bool, error)"
        );
        insta::assert_snapshot!(
            Type::error().underlying().to_string(),
            @"interface{Error() string}"
        );
        insta::assert_snapshot!(
            point().underlying().to_string(),
            @r#"struct{X int32; y int64; Label string "json:\"label\""}"#
        );
    }
}
