//! Parsing.

mod expressions;
#[allow(clippy::module_inception)]
mod parser;
mod typescript;

pub use parser::Parser;

use crate::ast::Program;
use crate::Error;

/// Parses JavaScript source into a program.
pub fn parse(source: &str) -> Result<Program, Error> {
    Parser::new(source).parse_program()
}

/// Parses TypeScript source into a program, erasing type syntax.
pub fn parse_typescript(source: &str) -> Result<Program, Error> {
    Parser::new_typescript(source).parse_program()
}
