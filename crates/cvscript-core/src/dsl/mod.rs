//! cvscript DSL implementation
//!
//! Lexing, parsing and evaluation of the document generation language.

pub mod ast;
pub mod context;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod printer;


pub use ast::*;
pub use context::{Binding, Context};
pub use evaluator::{evaluate, Evaluator, Fragment};
pub use lexer::{tokenize, tokenize_with_extensions, Keyword, Lexer, Token, TokenType};
pub use parser::{parse, Parser};
pub use printer::print_program;
