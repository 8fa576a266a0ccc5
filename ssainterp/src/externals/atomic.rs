//! sync/atomic shims
//!
//! Plain read-modify-write on the pointed-to cell. Interpreted tasks share
//! values only on one host thread (`Value` is `!Send`), so no operation can
//! interleave with another.

use super::Args;
use crate::interp::{Frame, InterpResult, Value};

/// Integer width handled by the atomic shims
pub trait AtomicWord: Copy + PartialEq {
    const NAME: &'static str;

    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
    fn wrapping_add(self, delta: Self) -> Self;
}

macro_rules! atomic_word {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl AtomicWord for $ty {
            const NAME: &'static str = $name;

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(n) => Some(*n),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn wrapping_add(self, delta: Self) -> Self {
                <$ty>::wrapping_add(self, delta)
            }
        }
    };
}

atomic_word!(i32, Int32, "int32");
atomic_word!(u32, Uint32, "uint32");
atomic_word!(i64, Int64, "int64");
atomic_word!(u64, Uint64, "uint64");

fn operand<T: AtomicWord>(args: &Args<'_>, index: usize) -> InterpResult<T> {
    let value = args.get(index)?;
    T::from_value(value).ok_or_else(|| args.shape_error(index, T::NAME, value))
}

fn current<T: AtomicWord>(args: &Args<'_>, value: &Value) -> InterpResult<T> {
    T::from_value(value).ok_or_else(|| args.shape_error(0, T::NAME, value))
}

/// func AddT(addr *T, delta T) (new T)
pub fn add<T: AtomicWord>(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let cell = args.pointer(0)?;
    let delta = operand::<T>(args, 1)?;
    let mut slot = cell.borrow_mut();
    let new = current::<T>(args, &slot)?.wrapping_add(delta);
    *slot = new.into_value();
    Ok(new.into_value())
}

/// func CompareAndSwapT(addr *T, old, new T) (swapped bool)
pub fn compare_and_swap<T: AtomicWord>(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let cell = args.pointer(0)?;
    let old = operand::<T>(args, 1)?;
    let new = operand::<T>(args, 2)?;
    let mut slot = cell.borrow_mut();
    if current::<T>(args, &slot)? == old {
        *slot = new.into_value();
        Ok(Value::Bool(true))
    } else {
        Ok(Value::Bool(false))
    }
}

/// func LoadT(addr *T) (val T)
pub fn load<T: AtomicWord>(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let cell = args.pointer(0)?;
    let slot = cell.borrow();
    Ok(current::<T>(args, &slot)?.into_value())
}

/// func StoreT(addr *T, val T)
pub fn store<T: AtomicWord>(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let cell = args.pointer(0)?;
    let val = operand::<T>(args, 1)?;
    *cell.borrow_mut() = val.into_value();
    Ok(Value::unit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::externals::call_detached;
    use crate::interp::ErrorKind;

    #[test]
    fn test_compare_and_swap_succeeds() {
        let p = Value::pointer(Value::Int32(5));
        let swapped = call_detached(
            compare_and_swap::<i32>,
            &[p.clone(), Value::Int32(5), Value::Int32(9)],
        )
        .unwrap();
        assert_eq!(swapped, Value::Bool(true));
        let Value::Pointer(cell) = &p else { unreachable!() };
        assert_eq!(*cell.borrow(), Value::Int32(9));
    }

    #[test]
    fn test_compare_and_swap_fails() {
        let p = Value::pointer(Value::Int32(5));
        let swapped = call_detached(
            compare_and_swap::<i32>,
            &[p.clone(), Value::Int32(4), Value::Int32(9)],
        )
        .unwrap();
        assert_eq!(swapped, Value::Bool(false));
        let Value::Pointer(cell) = &p else { unreachable!() };
        assert_eq!(*cell.borrow(), Value::Int32(5));
    }

    #[test]
    fn test_add_returns_new_value_and_wraps() {
        let p = Value::pointer(Value::Int32(i32::MAX));
        let new = call_detached(add::<i32>, &[p.clone(), Value::Int32(1)]).unwrap();
        assert_eq!(new, Value::Int32(i32::MIN));

        let q = Value::pointer(Value::Uint64(40));
        assert_eq!(
            call_detached(add::<u64>, &[q.clone(), Value::Uint64(2)]).unwrap(),
            Value::Uint64(42)
        );
        assert_eq!(call_detached(load::<u64>, &[q]).unwrap(), Value::Uint64(42));
    }

    #[test]
    fn test_store_then_load() {
        let p = Value::pointer(Value::Uint32(0));
        assert_eq!(
            call_detached(store::<u32>, &[p.clone(), Value::Uint32(7)]).unwrap(),
            Value::unit()
        );
        assert_eq!(call_detached(load::<u32>, &[p]).unwrap(), Value::Uint32(7));
    }

    #[test]
    fn test_store_is_seen_through_aliases() {
        let p = Value::pointer(Value::Int64(1));
        let alias = p.clone();
        call_detached(store::<i64>, &[p, Value::Int64(-3)]).unwrap();
        assert_eq!(call_detached(load::<i64>, &[alias]).unwrap(), Value::Int64(-3));
    }

    #[test]
    fn test_nil_address() {
        let err = call_detached(load::<i32>, &[Value::Nil]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NilDereference);
    }

    #[test]
    fn test_width_mismatch_in_cell() {
        let p = Value::pointer(Value::Int64(1));
        let err = call_detached(load::<i32>, &[p]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ArgumentShape);
    }
}
