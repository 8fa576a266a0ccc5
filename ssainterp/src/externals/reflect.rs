//! reflect shims
//!
//! A `reflect.Value` is represented as `Struct[descriptor, payload]`, where
//! the descriptor is a `Value::Type` or `Nil` for the zero Value. A
//! `reflect.Type` is an interface holding a `Value::Type` with dynamic type
//! `reflect.rtype`.
//!
//! Handles hold copies of what they were made from. `Set` checks
//! assignability but cannot write through to the original storage: that
//! needs handles that reference locations, which the value model lacks.

use super::Args;
use crate::interp::{Frame, InterpResult, Kind, RuntimeError, Type, Value};

const VALUE_DESCRIPTOR: usize = 0;
const VALUE_PAYLOAD: usize = 1;

fn make_value(ty: Type, payload: Value) -> Value {
    Value::Struct(vec![Value::Type(ty), payload])
}

/// The zero `reflect.Value`
fn invalid_value() -> Value {
    Value::Struct(vec![Value::Nil, Value::Nil])
}

fn make_type(ty: Type) -> Value {
    Value::iface(Type::rtype(), Value::Type(ty))
}

/// Decode a `reflect.Value` argument; `None` is the zero Value
fn value_arg(args: &Args<'_>, index: usize) -> InterpResult<Option<(Type, Value)>> {
    let arg = args.get(index)?;
    if let Value::Struct(fields) = arg
        && fields.len() == 2
    {
        match &fields[VALUE_DESCRIPTOR] {
            Value::Type(ty) => return Ok(Some((ty.clone(), fields[VALUE_PAYLOAD].clone()))),
            Value::Nil => return Ok(None),
            _ => {}
        }
    }
    Err(args.shape_error(index, "reflect.Value", arg))
}

/// Receiver of a method that panics on the zero Value
fn receiver(args: &Args<'_>, method: &str) -> InterpResult<(Type, Value)> {
    value_arg(args, 0)?.ok_or_else(|| RuntimeError::invalid_reflect(method, "zero"))
}

/// Decode a `reflect.Type` argument or an `rtype` receiver
fn type_arg(args: &Args<'_>, index: usize) -> InterpResult<Type> {
    let arg = args.get(index)?;
    match arg {
        Value::Type(ty) => Ok(ty.clone()),
        Value::Iface(Some(iface)) => match &iface.value {
            Value::Type(ty) => Ok(ty.clone()),
            _ => Err(args.shape_error(index, "reflect.Type", arg)),
        },
        Value::Iface(None) => Err(RuntimeError::nil_dereference(args.name())),
        _ => Err(args.shape_error(index, "reflect.Type", arg)),
    }
}

fn expect_kind(method: &str, ty: &Type, kinds: &[Kind]) -> InterpResult<Kind> {
    let kind = ty.kind();
    if kinds.contains(&kind) {
        Ok(kind)
    } else {
        Err(RuntimeError::invalid_reflect(method, kind.name()))
    }
}

fn elem_type(method: &str, ty: &Type) -> InterpResult<Type> {
    ty.elem()
        .cloned()
        .ok_or_else(|| RuntimeError::invalid_reflect(method, ty.kind().name()))
}

fn checked_index(i: i64, len: usize) -> Option<usize> {
    usize::try_from(i).ok().filter(|&i| i < len)
}

fn element(items: &[Value], i: i64, what: &str) -> InterpResult<Value> {
    checked_index(i, items.len())
        .map(|i| items[i].clone())
        .ok_or_else(|| RuntimeError::reflect_panic(format!("{what} index out of range")))
}

const SIGNED: &[Kind] = &[Kind::Int, Kind::Int8, Kind::Int16, Kind::Int32, Kind::Int64];
const UNSIGNED: &[Kind] = &[
    Kind::Uint,
    Kind::Uint8,
    Kind::Uint16,
    Kind::Uint32,
    Kind::Uint64,
    Kind::Uintptr,
];
const NILLABLE: &[Kind] = &[
    Kind::Chan,
    Kind::Func,
    Kind::Interface,
    Kind::Map,
    Kind::Ptr,
    Kind::Slice,
    Kind::UnsafePointer,
];

// ============ Package functions ============

/// func TypeOf(i interface{}) Type
pub fn type_of(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(match args.iface(0)? {
        Some(iface) => make_type(iface.ty.clone()),
        None => Value::Iface(None),
    })
}

/// func ValueOf(i interface{}) Value
pub fn value_of(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(match args.iface(0)? {
        Some(iface) => make_value(iface.ty.clone(), iface.value.clone()),
        None => invalid_value(),
    })
}

/// func New(typ Type) Value
pub fn new(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    if matches!(args.get(0)?, Value::Iface(None)) {
        return Err(RuntimeError::reflect_panic("New(nil)"));
    }
    let ty = type_arg(args, 0)?;
    let cell = Value::pointer(ty.zero_value());
    Ok(make_value(Type::pointer(ty), cell))
}

pub fn init(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::unit())
}

/// func valueInterface(v Value, safe bool) interface{}
pub fn value_interface_internal(frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    args.bool(1)?;
    value_interface(frame, args)
}

// ============ (reflect.Value) methods ============

pub fn value_bool(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Bool";
    let (ty, payload) = receiver(args, method)?;
    expect_kind(method, &ty, &[Kind::Bool])?;
    payload
        .as_bool()
        .map(Value::Bool)
        .ok_or_else(|| args.shape_error(0, "bool", &payload))
}

pub fn value_can_addr(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    value_arg(args, 0)?;
    Ok(Value::Bool(false))
}

pub fn value_can_interface(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    value_arg(args, 0)?;
    Ok(Value::Bool(true))
}

/// Pointee of a pointer, or the dynamic value of an interface
pub fn value_elem(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Elem";
    let (ty, payload) = receiver(args, method)?;
    match expect_kind(method, &ty, &[Kind::Ptr, Kind::Interface])? {
        Kind::Ptr => match &payload {
            Value::Nil => Ok(invalid_value()),
            Value::Pointer(cell) => Ok(make_value(elem_type(method, &ty)?, cell.borrow().clone())),
            other => Err(args.shape_error(0, "pointer", other)),
        },
        _ => match &payload {
            Value::Iface(Some(iface)) => Ok(make_value(iface.ty.clone(), iface.value.clone())),
            Value::Iface(None) => Ok(invalid_value()),
            other => Err(args.shape_error(0, "interface", other)),
        },
    }
}

pub fn value_field(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Field";
    let (ty, payload) = receiver(args, method)?;
    let i = args.int(1)?;
    let fields = ty
        .fields()
        .ok_or_else(|| RuntimeError::invalid_reflect(method, ty.kind().name()))?;
    let Value::Struct(values) = &payload else {
        return Err(args.shape_error(0, "struct", &payload));
    };
    let index = checked_index(i, fields.len().min(values.len()))
        .ok_or_else(|| RuntimeError::reflect_panic("Field index out of range"))?;
    Ok(make_value(fields[index].ty.clone(), values[index].clone()))
}

pub fn value_float(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Float";
    let (ty, payload) = receiver(args, method)?;
    expect_kind(method, &ty, &[Kind::Float32, Kind::Float64])?;
    payload
        .as_f64()
        .map(Value::Float64)
        .ok_or_else(|| args.shape_error(0, "float", &payload))
}

pub fn value_index(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Index";
    let (ty, payload) = receiver(args, method)?;
    let i = args.int(1)?;
    match expect_kind(method, &ty, &[Kind::Slice, Kind::Array, Kind::String])? {
        Kind::String => {
            let s = payload
                .as_str_bytes()
                .ok_or_else(|| args.shape_error(0, "string", &payload))?;
            let index = checked_index(i, s.len())
                .ok_or_else(|| RuntimeError::reflect_panic("string index out of range"))?;
            Ok(make_value(Type::uint8(), Value::Uint8(s[index])))
        }
        Kind::Array => {
            let Value::Array(items) = &payload else {
                return Err(args.shape_error(0, "array", &payload));
            };
            Ok(make_value(elem_type(method, &ty)?, element(items, i, "array")?))
        }
        _ => {
            let item = match &payload {
                Value::Slice(elems) => element(&elems.borrow(), i, "slice")?,
                Value::Nil => element(&[], i, "slice")?,
                other => return Err(args.shape_error(0, "slice", other)),
            };
            Ok(make_value(elem_type(method, &ty)?, item))
        }
    }
}

pub fn value_int(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Int";
    let (ty, payload) = receiver(args, method)?;
    expect_kind(method, &ty, SIGNED)?;
    payload
        .as_i64()
        .map(Value::Int64)
        .ok_or_else(|| args.shape_error(0, "signed integer", &payload))
}

pub fn value_interface(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let (ty, payload) = receiver(args, "reflect.Value.Interface")?;
    if ty.is_interface() {
        return match payload {
            Value::Iface(_) => Ok(payload),
            other => Err(args.shape_error(0, "interface", &other)),
        };
    }
    Ok(Value::iface(ty, payload))
}

pub fn value_is_nil(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.IsNil";
    let (ty, payload) = receiver(args, method)?;
    expect_kind(method, &ty, NILLABLE)?;
    Ok(Value::Bool(matches!(payload, Value::Nil | Value::Iface(None))))
}

pub fn value_is_valid(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Bool(value_arg(args, 0)?.is_some()))
}

/// reflect.Kind is a uint
pub fn value_kind(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let kind = value_arg(args, 0)?.map_or(Kind::Invalid, |(ty, _)| ty.kind());
    Ok(Value::Uint(kind.as_u64()))
}

pub fn value_len(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Len";
    let (ty, payload) = receiver(args, method)?;
    expect_kind(method, &ty, &[Kind::Slice, Kind::Array, Kind::String, Kind::Map])?;
    let len = match &payload {
        Value::Nil => 0,
        Value::Slice(elems) => elems.borrow().len(),
        Value::Array(items) => items.len(),
        Value::Str(s) => s.len(),
        Value::Map(entries) => entries.borrow().len(),
        other => return Err(args.shape_error(0, "sequence", other)),
    };
    Ok(Value::Int(len as i64))
}

/// Element stored under `key`, or the zero Value when absent
pub fn value_map_index(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.MapIndex";
    let (ty, payload) = receiver(args, method)?;
    expect_kind(method, &ty, &[Kind::Map])?;
    let (key_ty, key) = value_arg(args, 1)?.ok_or_else(|| RuntimeError::invalid_reflect(method, "zero"))?;
    let key = match ty.key() {
        Some(map_key) if map_key.is_interface() && !key_ty.is_interface() => Value::iface(key_ty, key),
        _ => key,
    };
    let elem = elem_type(method, &ty)?;
    let found = match &payload {
        Value::Nil => None,
        Value::Map(entries) => entries
            .borrow()
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.clone()),
        other => return Err(args.shape_error(0, "map", other)),
    };
    Ok(match found {
        Some(value) => make_value(elem, value),
        None => invalid_value(),
    })
}

pub fn value_map_keys(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.MapKeys";
    let (ty, payload) = receiver(args, method)?;
    expect_kind(method, &ty, &[Kind::Map])?;
    let key_ty = ty
        .key()
        .cloned()
        .ok_or_else(|| RuntimeError::invalid_reflect(method, ty.kind().name()))?;
    let keys = match &payload {
        Value::Nil => Vec::new(),
        Value::Map(entries) => entries
            .borrow()
            .iter()
            .map(|(k, _)| make_value(key_ty.clone(), k.clone()))
            .collect(),
        other => return Err(args.shape_error(0, "map", other)),
    };
    Ok(Value::slice(keys))
}

pub fn value_num_field(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.NumField";
    let (ty, _) = receiver(args, method)?;
    let fields = ty
        .fields()
        .ok_or_else(|| RuntimeError::invalid_reflect(method, ty.kind().name()))?;
    Ok(Value::Int(fields.len() as i64))
}

pub fn value_num_method(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let (ty, _) = receiver(args, "reflect.Value.NumMethod")?;
    Ok(Value::Int(ty.num_method() as i64))
}

/// Identity of the referenced storage as an integer, 0 for nil
pub fn value_pointer(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Pointer";
    let (ty, payload) = receiver(args, method)?;
    expect_kind(
        method,
        &ty,
        &[Kind::Ptr, Kind::Map, Kind::Slice, Kind::Func, Kind::Chan, Kind::UnsafePointer],
    )?;
    Ok(Value::Uintptr(payload.address().unwrap_or(0)))
}

/// Checks validity and assignability, then discards the value: handles are
/// copies with no storage to write back to.
pub fn value_set(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Set";
    let (ty, _) = receiver(args, method)?;
    let (x_ty, _) = value_arg(args, 1)?.ok_or_else(|| RuntimeError::invalid_reflect(method, "zero"))?;
    if x_ty != ty && !ty.is_interface() {
        return Err(RuntimeError::reflect_panic(format!(
            "{method}: value of type {x_ty} is not assignable to type {ty}"
        )));
    }
    Ok(Value::unit())
}

/// Strings yield their contents; other kinds a `<T Value>` placeholder
pub fn value_string(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let Some((ty, payload)) = value_arg(args, 0)? else {
        return Ok(Value::str("<invalid Value>"));
    };
    if ty.kind() == Kind::String {
        return match payload {
            Value::Str(_) => Ok(payload),
            other => Err(args.shape_error(0, "string", &other)),
        };
    }
    Ok(Value::str(&format!("<{ty} Value>")))
}

pub fn value_type(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let (ty, _) = receiver(args, "reflect.Value.Type")?;
    Ok(make_type(ty))
}

pub fn value_uint(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let method = "reflect.Value.Uint";
    let (ty, payload) = receiver(args, method)?;
    expect_kind(method, &ty, UNSIGNED)?;
    payload
        .as_u64()
        .map(Value::Uint64)
        .ok_or_else(|| args.shape_error(0, "unsigned integer", &payload))
}

/// The receiver is the message itself
pub fn error_error(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::str_from_bytes(args.string(0)?))
}

// ============ (reflect.rtype) methods ============

pub fn rtype_bits(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let ty = type_arg(args, 0)?;
    match ty.bits() {
        Some(bits) => Ok(Value::Int(bits as i64)),
        None => Err(RuntimeError::reflect_panic(format!(
            "Bits of non-arithmetic Type {ty}"
        ))),
    }
}

pub fn rtype_elem(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let ty = type_arg(args, 0)?;
    match ty.elem() {
        Some(elem) => Ok(make_type(elem.clone())),
        None => Err(RuntimeError::reflect_panic(format!("Elem of invalid type {ty}"))),
    }
}

/// Builds a `reflect.StructField` for field `i`
pub fn rtype_field(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let ty = type_arg(args, 0)?;
    let i = args.int(1)?;
    let fields = ty
        .fields()
        .ok_or_else(|| RuntimeError::reflect_panic(format!("Field of non-struct type {ty}")))?;
    let index = checked_index(i, fields.len())
        .ok_or_else(|| RuntimeError::reflect_panic("Field index out of bounds"))?;
    let field = &fields[index];
    Ok(Value::Struct(vec![
        Value::str(&field.name),
        Value::str(&field.pkg_path),
        make_type(field.ty.clone()),
        Value::str(&field.tag),
        Value::Uintptr(ty.field_offset(index).unwrap_or(0)),
        Value::slice(vec![Value::Int(i)]),
        Value::Bool(field.embedded),
    ]))
}

pub fn rtype_kind(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Uint(type_arg(args, 0)?.kind().as_u64()))
}

pub fn rtype_num_field(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let ty = type_arg(args, 0)?;
    match ty.fields() {
        Some(fields) => Ok(Value::Int(fields.len() as i64)),
        None => Err(RuntimeError::reflect_panic(format!("NumField of non-struct type {ty}"))),
    }
}

pub fn rtype_num_method(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Int(type_arg(args, 0)?.num_method() as i64))
}

pub fn rtype_num_out(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let ty = type_arg(args, 0)?;
    match ty.signature() {
        Some(sig) => Ok(Value::Int(sig.results.len() as i64)),
        None => Err(RuntimeError::reflect_panic(format!("NumOut of non-func type {ty}"))),
    }
}

pub fn rtype_out(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let ty = type_arg(args, 0)?;
    let i = args.int(1)?;
    let sig = ty
        .signature()
        .ok_or_else(|| RuntimeError::reflect_panic(format!("Out of non-func type {ty}")))?;
    let index = checked_index(i, sig.results.len())
        .ok_or_else(|| RuntimeError::reflect_panic("Out index out of range"))?;
    Ok(make_type(sig.results[index].clone()))
}

pub fn rtype_size(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Uintptr(type_arg(args, 0)?.size()))
}

pub fn rtype_string(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::str(&type_arg(args, 0)?.to_string()))
}
