//! ssainterp: external-function bridge for an SSA interpreter
//!
//! Calls to library and runtime routines that cannot be interpreted are
//! resolved by qualified name to native shims.

pub mod config;
pub mod driver;
pub mod externals;
pub mod interp;
pub mod json;

pub use config::{BridgeConfig, ConfigError};
pub use externals::{Args, External, ExternalFn, Externals, Host};
pub use interp::{DetachedFrame, ErrorKind, Frame, InterpResult, RuntimeError, Type, Value};
