use crate::lexer::LexError;
use std::io;
use std::path::PathBuf;

/// Why a line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
    #[error("`{0}` is not supported")]
    Unsupported(&'static str),
    #[error("{what} {value} is out of range")]
    OutOfRange { what: &'static str, value: i64 },
}

/// Failures that stop the front end altogether.
#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    #[error("cannot read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
