//! Tokenisation and object parsing.

pub mod lexer;
pub mod objects;

pub use lexer::{Lexer, Token};
pub use objects::ObjectParser;
