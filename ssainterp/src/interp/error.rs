//! Runtime errors for the interpreter bridge
//!
//! Only conditions that stop interpretation travel on this channel. Host
//! failures (a missing file, a bad descriptor) are ordinary interpreted error
//! values built by `externals::marshal` and returned as results.

use std::fmt;

/// Runtime error raised while dispatching to an external function
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone)]
pub enum ErrorKind {
    /// An argument did not have the representation the shim expects.
    /// The evaluator's type checking is broken if this happens.
    ArgumentShape,
    /// Argument count disagrees with the registered signature
    ArityMismatch,
    /// A reflective operation was misused (wrong kind, index out of range)
    InvalidReflect,
    /// Interpreted code passed a nil pointer where a shim dereferences it
    NilDereference,
    /// No shim is registered under the requested name
    UnsupportedExternal,
    /// A shim tried to call back into interpreted code but no evaluator is
    /// attached (command line, host-only tests)
    NoEvaluator,
    /// Control flow: process termination requested by interpreted code.
    /// Only the top-level driver may stop this from unwinding.
    Exit(i32),
}

impl PartialEq for ErrorKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ErrorKind::Exit(a), ErrorKind::Exit(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl RuntimeError {
    pub fn argument_shape(function: &str, position: usize, expected: &str, got: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::ArgumentShape,
            message: format!(
                "internal error: {function}: argument {position}: expected {expected}, got {got}"
            ),
        }
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        RuntimeError {
            kind: ErrorKind::ArityMismatch,
            message: format!("internal error: function {name} expects {expected} argument(s), got {got}"),
        }
    }

    pub fn invalid_reflect(method: &str, kind: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::InvalidReflect,
            message: format!("reflect: call of {method} on {kind} Value"),
        }
    }

    pub fn reflect_panic(message: impl Into<String>) -> Self {
        RuntimeError {
            kind: ErrorKind::InvalidReflect,
            message: format!("reflect: {}", message.into()),
        }
    }

    pub fn nil_dereference(function: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NilDereference,
            message: format!("{function}: invalid memory address or nil pointer dereference"),
        }
    }

    pub fn unsupported_external(name: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::UnsupportedExternal,
            message: format!("unsupported external function: {name}"),
        }
    }

    pub fn no_evaluator(callee: &str) -> Self {
        RuntimeError {
            kind: ErrorKind::NoEvaluator,
            message: format!("cannot call {callee}: no evaluator attached"),
        }
    }

    pub fn exit(code: i32) -> Self {
        RuntimeError {
            kind: ErrorKind::Exit(code),
            message: format!("exit status {code}"),
        }
    }

    /// Exit code carried by the exit signal
    pub fn exit_code(&self) -> Option<i32> {
        match self.kind {
            ErrorKind::Exit(code) => Some(code),
            _ => None,
        }
    }

    pub fn is_exit(&self) -> bool {
        self.exit_code().is_some()
    }

    /// True for errors that indicate a bug in the evaluator rather than in
    /// the interpreted program
    pub fn is_internal(&self) -> bool {
        matches!(self.kind, ErrorKind::ArgumentShape | ErrorKind::ArityMismatch)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error: {}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for interpreter operations
pub type InterpResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_shape() {
        let err = RuntimeError::argument_shape("bytes.Equal", 1, "slice", "int");
        assert_eq!(err.kind, ErrorKind::ArgumentShape);
        assert_eq!(
            err.message,
            "internal error: bytes.Equal: argument 1: expected slice, got int"
        );
        assert!(err.is_internal());
        assert!(!err.is_exit());
    }

    #[test]
    fn test_arity_mismatch_message_format() {
        let err = RuntimeError::arity_mismatch("math.Min", 2, 1);
        assert_eq!(
            err.message,
            "internal error: function math.Min expects 2 argument(s), got 1"
        );
        assert!(err.is_internal());
    }

    #[test]
    fn test_no_evaluator_is_its_own_kind() {
        let err = RuntimeError::no_evaluator("main.newBuffer");
        assert_eq!(err.kind, ErrorKind::NoEvaluator);
        assert_ne!(err.kind, ErrorKind::UnsupportedExternal);
        assert_eq!(err.message, "cannot call main.newBuffer: no evaluator attached");
        assert!(!err.is_internal());
        assert!(!err.is_exit());
    }

    #[test]
    fn test_unsupported_is_not_internal() {
        let err = RuntimeError::unsupported_external("os.Pipe");
        assert_eq!(err.kind, ErrorKind::UnsupportedExternal);
        assert!(err.message.contains("os.Pipe"));
        assert!(!err.is_internal());
        assert!(!err.is_exit());
    }

    #[test]
    fn test_exit_carries_code() {
        let err = RuntimeError::exit(7);
        assert_eq!(err.exit_code(), Some(7));
        assert_eq!(err.kind, ErrorKind::Exit(7));
        assert_ne!(err.kind, ErrorKind::Exit(8));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_invalid_reflect_message() {
        let err = RuntimeError::invalid_reflect("reflect.Value.IsNil", "int");
        assert_eq!(err.message, "reflect: call of reflect.Value.IsNil on int Value");
    }

    #[test]
    fn test_reflect_panic_prefix() {
        let err = RuntimeError::reflect_panic("slice index out of range");
        assert_eq!(err.kind, ErrorKind::InvalidReflect);
        assert_eq!(err.message, "reflect: slice index out of range");
    }

    #[test]
    fn test_nil_dereference() {
        let err = RuntimeError::nil_dereference("sync/atomic.AddInt32");
        assert_eq!(err.kind, ErrorKind::NilDereference);
        assert!(err.message.contains("nil pointer dereference"));
        assert!(!err.is_internal());
    }

    #[test]
    fn test_display() {
        let err = RuntimeError::unsupported_external("os.Pipe");
        let display = format!("{}", err);
        assert!(display.starts_with("Runtime error:"));
    }

    #[test]
    fn test_error_is_std_error() {
        let err = RuntimeError::exit(0);
        let std_err: &dyn std::error::Error = &err;
        assert!(std_err.source().is_none());
    }
}
