//! runtime, sync and time shims
//!
//! Stack introspection answers with fixed placeholders. Memory management
//! hints are accepted and ignored.

use super::Args;
use crate::config::host_cpu_count;
use crate::interp::{Frame, InterpResult, Value};
use std::os::unix::ffi::OsStrExt;
use std::time::Duration;
use tracing::debug;

const STACK_RED_ZONE: usize = 128 * 1024; // 128KB remaining triggers growth
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024; // Grow by 4MB each time

/// Position of `New func() interface{}` in the interpreted `sync.Pool`
const POOL_NEW_FIELD: usize = 4;

// ============ runtime.Func ============

pub fn func_entry(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Uintptr(0))
}

pub fn func_file_line(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Tuple(vec![Value::str("unknown.go"), Value::Int(-1)]))
}

pub fn func_name(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::str("unknown"))
}

// ============ sync.Pool ============

/// Never returns a pooled object: calls `p.New` when set, else nil
pub fn pool_get(frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let pool = args.pointer(0)?;
    let factory = {
        let pool = pool.borrow();
        match &*pool {
            Value::Struct(fields) if fields.len() > POOL_NEW_FIELD => fields[POOL_NEW_FIELD].clone(),
            other => return Err(args.shape_error(0, "*sync.Pool", other)),
        }
    };
    match factory {
        Value::Nil => Ok(Value::Iface(None)),
        new @ Value::Func(_) => {
            stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || frame.call(&new, Vec::new()))
        }
        other => Err(args.shape_error(0, "*sync.Pool", &other)),
    }
}

pub fn pool_put(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    args.pointer(0)?;
    Ok(Value::unit())
}

pub fn sync_semcheck(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::unit())
}

pub fn register_pool(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    debug!("sync.runtime_registerPool ignored");
    Ok(Value::unit())
}

// ============ runtime ============

pub fn breakpoint(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    if args.config().trap_breakpoints {
        // SAFETY: raise only delivers a signal to the calling thread.
        unsafe {
            libc::raise(libc::SIGTRAP);
        }
    } else {
        debug!("runtime.Breakpoint ignored");
    }
    Ok(Value::unit())
}

/// func Caller(skip int) (pc uintptr, file string, line int, ok bool)
pub fn caller(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    args.int(0)?;
    Ok(Value::Tuple(vec![
        Value::Uintptr(0),
        Value::str("somefile.go"),
        Value::Int(42),
        Value::Bool(true),
    ]))
}

pub fn func_for_pc(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    args.uintptr(0)?;
    Ok(Value::Nil)
}

pub fn gc(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    debug!("runtime.GC ignored");
    Ok(Value::unit())
}

/// func GOMAXPROCS(n int) int
pub fn gomaxprocs(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let n = args.int(0)?;
    let prev = args.host().set_gomaxprocs(n);
    Ok(Value::Int(prev as i64))
}

pub fn gosched(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    std::thread::yield_now();
    Ok(Value::unit())
}

pub fn num_cpu(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::Int(host_cpu_count() as i64))
}

pub fn read_mem_stats(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    args.pointer(0)?;
    debug!("runtime.ReadMemStats left the statistics zeroed");
    Ok(Value::unit())
}

pub fn set_finalizer(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    debug!("runtime.SetFinalizer ignored");
    Ok(Value::unit())
}

pub fn getgoroot(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    Ok(Value::str_from_bytes(args.config().goroot().as_bytes()))
}

// ============ time ============

/// func Sleep(d Duration); non-positive durations return at once
pub fn sleep(_frame: &mut dyn Frame, args: &Args<'_>) -> InterpResult<Value> {
    let nanos = args.i64(0)?;
    if nanos > 0 {
        std::thread::sleep(Duration::from_nanos(nanos as u64));
    }
    Ok(Value::unit())
}

/// func now() (sec int64, nsec int32)
pub fn now(_frame: &mut dyn Frame, _args: &Args<'_>) -> InterpResult<Value> {
    let now = chrono::Utc::now();
    Ok(Value::Tuple(vec![
        Value::Int64(now.timestamp()),
        Value::Int32(now.timestamp_subsec_nanos() as i32),
    ]))
}
