//! math shims

use super::Args;
use crate::interp::{Frame, InterpResult, Value};

pub fn abs(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Float64(args.f64(0)?.abs()))
}

pub fn exp(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Float64(args.f64(0)?.exp()))
}

pub fn min(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Float64(go_min(args.f64(0)?, args.f64(1)?)))
}

pub fn float32_bits(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Uint32(args.f32(0)?.to_bits()))
}

pub fn float32_from_bits(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Float32(f32::from_bits(args.u32(0)?)))
}

pub fn float64_bits(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Uint64(args.f64(0)?.to_bits()))
}

pub fn float64_from_bits(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Float64(f64::from_bits(args.u64(0)?)))
}

/// Minimum with the special cases of the source library:
/// -Inf beats everything (NaN included), then NaN propagates, and -0 < +0.
/// `f64::min` ignores NaN and does not order signed zeros.
fn go_min(x: f64, y: f64) -> f64 {
    if x == f64::NEG_INFINITY || y == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    if x.is_nan() || y.is_nan() {
        return f64::NAN;
    }
    if x == 0.0 && x == y {
        return if x.is_sign_negative() { x } else { y };
    }
    if x < y { x } else { y }
}
