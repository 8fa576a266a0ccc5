//! Top-level driver
//!
//! The only place the exit signal stops unwinding. Everything between the
//! shim that raised it and this point passes it through untouched.

use crate::interp::{InterpResult, Value};
use tracing::debug;

/// Host exit status for programs stopped by a runtime error
pub const FAILURE_EXIT_CODE: i32 = 2;

/// Host exit status for the outcome of an interpreted program
pub fn exit_code(result: &InterpResult<Value>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => err.exit_code().unwrap_or(FAILURE_EXIT_CODE),
    }
}

/// Run `entry`, report any runtime error on stderr, and return the host
/// exit status
pub fn run(entry: impl FnOnce() -> InterpResult<Value>) -> i32 {
    let result = entry();
    match &result {
        Err(err) if err.is_exit() => debug!(code = err.exit_code(), "program exited"),
        Err(err) if err.is_internal() => eprintln!("{err} (interpreter bug)"),
        Err(err) => eprintln!("{err}"),
        Ok(_) => {}
    }
    exit_code(&result)
}
