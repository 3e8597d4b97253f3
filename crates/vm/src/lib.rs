//! The fig runtime: a small Lisp interpreter with a mark-and-sweep collected
//! heap.

pub mod builtins;
pub mod config;
pub mod env;
pub mod error;
mod eval;
pub mod gc;
pub mod num;
mod print;
pub mod read;
pub mod symbol;
#[cfg(test)]
mod test;
pub mod value;
mod vm;

pub use config::VmConfig;
pub use error::{Error, Exit, Result};
pub use gc::ObjRef;
pub use num::Number;
pub use symbol::Symbol;
pub use value::{Obj, Val};
pub use vm::Vm;
