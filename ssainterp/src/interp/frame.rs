//! The evaluator's call context as seen by shims

use super::error::{InterpResult, RuntimeError};
use super::value::Value;

/// Reentrancy handle into the evaluator
///
/// A frame is borrowed for exactly one shim invocation. Calls made through it
/// run to completion before returning.
pub trait Frame {
    /// Call an interpreted function value with already evaluated arguments
    fn call(&mut self, callee: &Value, args: Vec<Value>) -> InterpResult<Value>;
}

/// Frame for contexts with no evaluator behind them (the command line,
/// host-only tests). Every reentrant call fails.
#[derive(Debug, Default)]
pub struct DetachedFrame;

impl Frame for DetachedFrame {
    fn call(&mut self, callee: &Value, _args: Vec<Value>) -> InterpResult<Value> {
        let name = match callee {
            Value::Func(closure) => closure.name.as_str(),
            other => other.type_name(),
        };
        Err(RuntimeError::no_evaluator(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_frame_refuses_calls() {
        let mut frame = DetachedFrame;
        let err = frame
            .call(&Value::func("main.newBuffer", vec![]), vec![])
            .unwrap_err();
        assert_eq!(err.kind, crate::interp::ErrorKind::NoEvaluator);
        assert!(err.message.contains("main.newBuffer"));
    }
}
