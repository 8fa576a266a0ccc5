//! Interpreter-side data model shared with the external-function bridge

mod error;
mod frame;
pub mod types;
mod value;

pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use frame::{DetachedFrame, Frame};
pub use types::{Basic, Field, Kind, Method, Named, Signature, Type};
pub use value::{Cell, Closure, Elements, Entries, Iface, Value};
