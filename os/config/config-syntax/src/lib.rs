//! # Kernel configuration syntax
//!
//! Turns configuration text into calls on a [`config_model::Session`].
//!
//! ```text
//!   text ──lexer──► tokens ──parser──► Line<Statement> ──Compiler──► Session
//!                                          │                 ▲
//!                                          └── include ──────┘
//! ```
//!
//! The input is line oriented. A line ending in `\` or followed by a line
//! that starts with white space continues on the next line; `#` starts a
//! comment. A line that fails to parse is reported through
//! [`Session::on_syntax_error`](config_model::Session::on_syntax_error)
//! and skipped, so one run reports every broken line.

pub mod ast;
pub mod error;
pub mod frontend;
pub mod lexer;
pub mod parser;

pub use ast::{Line, Statement};
pub use error::{FrontendError, ParseError};
pub use frontend::Compiler;
pub use parser::parse;
