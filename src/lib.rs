//! Compiler from tokimun, a Lua superset, to plain Lua.
//!
//! tokimun adds template strings, optional chaining (`?.`),
//! nil-coalescing (`??`), compound assignment, `switch`, `continue`,
//! `!=`, and binary/octal numerals on top of Lua. The compiler lowers
//! all of it to source any Lua 5.2+ or `LuaJIT` interpreter accepts,
//! with no runtime library.
//!
//! # Quick start
//!
//! ```
//! let lua = tokimun::compile("local greeting = `hi ${name ?? \"you\"}`").unwrap();
//! assert!(lua.starts_with("local greeting = \"hi \" .. tostring("));
//! ```
//!
//! ## Stage by stage
//!
//! ```
//! use tokimun::{generate, parse, tokenize};
//!
//! let tokens = tokenize("x += 0b101").unwrap();
//! let chunk = parse(&tokens).unwrap();
//! assert_eq!(generate(&chunk).unwrap(), "x = x + 5\n");
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod codegen;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Block, Chunk, Expr, ExprKind, Stmt, StmtKind};
pub use codegen::{CodegenError, CodegenErrorKind, generate};
pub use lexer::{LexError, LexErrorKind, tokenize};
pub use parser::{ParseError, ParseErrorKind, parse};
pub use token::{Span, Token, TokenKind};

/// Unified error type covering every compilation stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A lexer error.
    #[error("{0}")]
    Lex(#[from] LexError),
    /// A parser error.
    #[error("{0}")]
    Parse(#[from] ParseError),
    /// A code generation error.
    #[error("{0}")]
    Codegen(#[from] CodegenError),
}

impl Error {
    /// Location of the offending token.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Lex(e) => e.span,
            Self::Parse(e) => e.span,
            Self::Codegen(e) => e.span,
        }
    }
}

/// Tokenize and parse a source string in one step.
pub fn parse_str(input: &str) -> Result<Chunk, Error> {
    let tokens = tokenize(input)?;
    Ok(parse(&tokens)?)
}

/// Compile tokimun source to Lua source.
///
/// Stops at the first error of any stage; no partial output.
pub fn compile(source: &str) -> Result<String, Error> {
    let tokens = tokenize(source)?;
    tracing::debug!(tokens = tokens.len(), "tokenized");

    let chunk = parse(&tokens)?;
    tracing::debug!(statements = chunk.block.stmts.len(), "parsed");

    let lua = generate(&chunk)?;
    tracing::debug!(bytes = lua.len(), "generated");
    Ok(lua)
}
