//! naco-expr - sandboxed expression language for filters and updates
//!
//! This crate compiles a small Python-flavored expression dialect into a
//! reusable syntax tree and evaluates it against an external scope.
//! Extensibility is confined to the operator and function tables; the
//! grammar has no statements, definitions, or imports, and the only side
//! effects are the two restricted mutation forms available to update
//! expressions.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod tables;
pub mod value;

pub use error::{ExprError, ExprResult};
pub use eval::{Engine, MapScope, Scope, ScopeMut};
pub use parser::Expression;
pub use tables::{BinFn, CallFn, FunctionTable, OpKey, OperatorTable};
pub use value::Value;
