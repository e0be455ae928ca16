pub mod ast;
mod lexer;
#[allow(clippy::module_inception)]
mod parser;

pub use parser::Parser;
