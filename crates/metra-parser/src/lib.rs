//! Metra parser: converts a token stream into an AST.

mod parse_expr;
mod parse_stmt;
mod parse_unit;
mod parser;

pub use parser::{ParseResult, Parser};
