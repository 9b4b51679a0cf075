//! Program tree, builders, traversal and code generation
//!
//! Everything the passes need to read, build and print trees. The parser lives in
//! `crate::parser` and produces `ast::Program`.

pub mod ast;
pub mod build;
pub mod names;
pub mod printer;
pub mod visit;

pub use ast::{Expr, Function, Program, Stmt};
pub use names::NameGen;
pub use printer::print_program;
