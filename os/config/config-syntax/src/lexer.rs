//! Tokens of the configuration language.
//!
//! Statements end at a newline. A backslash before the newline, or
//! indentation at the start of the next line, continues the statement:
//!
//! ```text
//!   file dev/ic/foo.c        foo \
//!       needs-flag            ─► one statement
//!   options DIAGNOSTIC
//!       , DEBUG               ─► one statement
//! ```
//!
//! Keywords are reserved; a word that spells a keyword is never a
//! [`Token::Word`].

use core::fmt;
use core::ops::Range;
use logos::Logos;

/// An integer literal together with its spelling.
///
/// Values such as `0x20` keep their original text when they end up in
/// generated files.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Num<'src> {
    pub value: i64,
    pub text: &'src str,
}

impl<'src> Num<'src> {
    /// Parses decimal, `0x` hexadecimal and leading-zero octal literals.
    #[must_use]
    pub fn parse(text: &'src str) -> Option<Self> {
        let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).ok()?
        } else if text.len() > 1 && text.starts_with('0') {
            i64::from_str_radix(&text[1..], 8).ok()?
        } else {
            text.parse().ok()?
        };
        Some(Self { value, text })
    }
}

#[derive(Logos, Debug, Copy, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"\\\r?\n")]
#[logos(skip r"\n[ \t]+")]
pub enum Token<'src> {
    #[token("\n")]
    Newline,

    // === Top matter ===
    #[token("source")]
    Source,
    #[token("build")]
    Build,
    #[token("machine")]
    Machine,
    #[token("ioconf")]
    Ioconf,
    #[token("include")]
    Include,
    #[token("cinclude")]
    CInclude,
    #[token("package")]
    Package,
    #[token("version")]
    Version,

    // === Definitions ===
    #[token("file")]
    File,
    #[token("object")]
    Object,
    #[token("device-major")]
    DeviceMajor,
    #[token("char")]
    Char,
    #[token("block")]
    Block,
    #[token("single")]
    Single,
    #[token("vector")]
    Vector,
    #[token("linkzero")]
    LinkZero,
    #[token("prefix")]
    Prefix,
    #[token("buildprefix")]
    BuildPrefix,
    #[token("devclass")]
    DevClass,
    #[token("deffs")]
    DefFs,
    #[token("define")]
    Define,
    #[token("defopt")]
    DefOpt,
    #[token("defflag")]
    DefFlag,
    #[token("defparam")]
    DefParam,
    #[token("obsolete")]
    Obsolete,
    #[token("device")]
    Device,
    #[token("defpseudo")]
    DefPseudo,
    #[token("defpseudodev")]
    DefPseudoDev,
    #[token("attach")]
    Attach,
    #[token("with")]
    With,
    #[token("maxpartitions")]
    MaxPartitions,
    #[token("major")]
    Major,
    #[token("minor")]
    Minor,
    #[token("needs-count")]
    NeedsCount,
    #[token("needs-flag")]
    NeedsFlag,
    #[token("compile-with")]
    CompileWith,

    // === Selections ===
    #[token("no")]
    No,
    #[token("select")]
    Select,
    #[token("file-system")]
    FileSystem,
    #[token("makeoptions")]
    MakeOptions,
    #[token("options")]
    Options,
    #[token("maxusers")]
    MaxUsers,
    #[token("ident")]
    Ident,
    #[token("config")]
    Config,
    #[token("root")]
    Root,
    #[token("on")]
    On,
    #[token("type")]
    Type,
    #[token("dumps")]
    Dumps,
    #[token("pseudo-device")]
    PseudoDevice,
    #[token("pseudo-root")]
    PseudoRoot,
    #[token("at")]
    At,
    #[token("flags")]
    Flags,

    // === Literals ===
    #[regex(r"0[xX][0-9a-fA-F]+|[0-9]+", |lex| Num::parse(lex.slice()))]
    Number(Num<'src>),

    /// A double-quoted string without its quotes.
    #[regex(r#""[^"\n]*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len() - 1]
    })]
    QString(&'src str),

    /// Anything containing `/` or `.`.
    #[regex(r"[A-Za-z_0-9]*[./][-A-Za-z_0-9./]*", |lex| lex.slice())]
    Path(&'src str),

    #[regex(r"[A-Za-z_][-A-Za-z_0-9]*", |lex| lex.slice())]
    Word(&'src str),

    // === Punctuation ===
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token("=")]
    Equals,
    #[token("+=")]
    PlusEq,
    #[token(":=")]
    ColonEq,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("*")]
    Star,
    #[token("!")]
    Bang,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("-")]
    Minus,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Newline => f.write_str("end of line"),
            Self::Number(n) => write!(f, "`{}`", n.text),
            Self::QString(s) => write!(f, "\"{s}\""),
            Self::Path(s) | Self::Word(s) => write!(f, "`{s}`"),
            other => write!(f, "`{}`", other.keyword()),
        }
    }
}

impl Token<'_> {
    /// Spelling of keyword and punctuation tokens.
    const fn keyword(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Build => "build",
            Self::Machine => "machine",
            Self::Ioconf => "ioconf",
            Self::Include => "include",
            Self::CInclude => "cinclude",
            Self::Package => "package",
            Self::Version => "version",
            Self::File => "file",
            Self::Object => "object",
            Self::DeviceMajor => "device-major",
            Self::Char => "char",
            Self::Block => "block",
            Self::Single => "single",
            Self::Vector => "vector",
            Self::LinkZero => "linkzero",
            Self::Prefix => "prefix",
            Self::BuildPrefix => "buildprefix",
            Self::DevClass => "devclass",
            Self::DefFs => "deffs",
            Self::Define => "define",
            Self::DefOpt => "defopt",
            Self::DefFlag => "defflag",
            Self::DefParam => "defparam",
            Self::Obsolete => "obsolete",
            Self::Device => "device",
            Self::DefPseudo => "defpseudo",
            Self::DefPseudoDev => "defpseudodev",
            Self::Attach => "attach",
            Self::With => "with",
            Self::MaxPartitions => "maxpartitions",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::NeedsCount => "needs-count",
            Self::NeedsFlag => "needs-flag",
            Self::CompileWith => "compile-with",
            Self::No => "no",
            Self::Select => "select",
            Self::FileSystem => "file-system",
            Self::MakeOptions => "makeoptions",
            Self::Options => "options",
            Self::MaxUsers => "maxusers",
            Self::Ident => "ident",
            Self::Config => "config",
            Self::Root => "root",
            Self::On => "on",
            Self::Type => "type",
            Self::Dumps => "dumps",
            Self::PseudoDevice => "pseudo-device",
            Self::PseudoRoot => "pseudo-root",
            Self::At => "at",
            Self::Flags => "flags",
            Self::BraceOpen => "{",
            Self::BraceClose => "}",
            Self::BracketOpen => "[",
            Self::BracketClose => "]",
            Self::ParenOpen => "(",
            Self::ParenClose => ")",
            Self::Comma => ",",
            Self::Equals => "=",
            Self::PlusEq => "+=",
            Self::ColonEq => ":=",
            Self::Colon => ":",
            Self::Question => "?",
            Self::Star => "*",
            Self::Bang => "!",
            Self::Amp => "&",
            Self::Pipe => "|",
            Self::Minus => "-",
            Self::Newline | Self::Number(_) | Self::QString(_) | Self::Path(_) | Self::Word(_) => "",
        }
    }
}

/// Input the lexer cannot make sense of.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected input `{slice}`")]
pub struct LexError {
    pub span: Range<usize>,
    pub slice: String,
}

/// A token with its byte range in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub token: T,
    pub span: Range<usize>,
}

/// Splits `source` into tokens. Input that does not form a token is kept
/// in the stream as an error so that the parser can discard just the
/// statement it appears in.
#[must_use]
pub fn lex(source: &str) -> Vec<Spanned<Result<Token<'_>, LexError>>> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let token = result.map_err(|()| LexError {
            span: span.clone(),
            slice: lexer.slice().to_string(),
        });
        tokens.push(Spanned { token, span });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token<'_>> {
        lex(source)
            .into_iter()
            .map(|t| t.token.expect("lexes"))
            .collect()
    }

    #[test]
    fn keywords_words_and_paths() {
        assert_eq!(
            tokens("file dev/ic/com.c com | sab needs-flag"),
            [
                Token::File,
                Token::Path("dev/ic/com.c"),
                Token::Word("com"),
                Token::Pipe,
                Token::Word("sab"),
                Token::NeedsFlag,
            ]
        );
        assert_eq!(tokens("opt_ddb.h"), [Token::Path("opt_ddb.h")]);
        assert_eq!(tokens("device-major"), [Token::DeviceMajor]);
        assert_eq!(tokens("devices"), [Token::Word("devices")]);
    }

    #[test]
    fn numbers_keep_their_spelling() {
        let [Token::Number(hex), Token::Number(oct), Token::Number(dec)] = tokens("0x1f 017 42")[..]
        else {
            panic!("expected three numbers");
        };
        assert_eq!((hex.value, hex.text), (31, "0x1f"));
        assert_eq!(oct.value, 15);
        assert_eq!(dec.value, 42);
    }

    #[test]
    fn device_names_split_at_star_and_question_mark() {
        assert_eq!(
            tokens("sd* at scsibus? target ?"),
            [
                Token::Word("sd"),
                Token::Star,
                Token::At,
                Token::Word("scsibus"),
                Token::Question,
                Token::Word("target"),
                Token::Question,
            ]
        );
    }

    #[test]
    fn comments_and_continuations() {
        assert_eq!(
            tokens("options A # comment\n\t, B\nident \\\n X\n"),
            [
                Token::Options,
                Token::Word("A"),
                Token::Comma,
                Token::Word("B"),
                Token::Newline,
                Token::Ident,
                Token::Word("X"),
                Token::Newline,
            ]
        );
    }

    #[test]
    fn strings_and_operators() {
        assert_eq!(
            tokens(r#"makeoptions COPTS+="-O2" CC:=gcc"#),
            [
                Token::MakeOptions,
                Token::Word("COPTS"),
                Token::PlusEq,
                Token::QString("-O2"),
                Token::Word("CC"),
                Token::ColonEq,
                Token::Word("gcc"),
            ]
        );
    }

    #[test]
    fn bad_input_is_an_error_token() {
        let lexed = lex("ident @\n");
        assert_eq!(lexed[0].token, Ok(Token::Ident));
        assert!(matches!(&lexed[1].token, Err(LexError { slice, .. }) if slice == "@"));
        assert_eq!(lexed[2].token, Ok(Token::Newline));
    }
}
