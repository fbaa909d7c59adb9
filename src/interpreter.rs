//! Interpreter for field code
//!
//! - [`value`]: the dynamically typed values fields compute with
//! - [`builtins`]: the function table (`len`, `range`, `str`, ...)
//! - [`methods`]: string, list and dict methods
//! - [`evaluator`]: runs a compiled [`Program`](crate::parser::Program) against
//!   a [`Host`] that owns the environment

pub mod builtins;
pub mod evaluator;
pub mod methods;
pub mod value;

pub use builtins::FunctionTable;
pub use evaluator::{Evaluator, Host};
pub use value::{Function, Value};
