//! Recursive-descent parser, one statement per line.
//!
//! Every line is parsed on its own. A line that does not parse is reported
//! and dropped; parsing resumes on the next line.

use crate::ast::{Line, Statement};
use crate::error::ParseError;
use crate::lexer::{Num, Token, lex};
use config_model::value::ARRAY_SEPARATOR;
use config_model::{
    AtSite, CondExpr, CondMkOption, DefOpt, DevNodes, DevSpec, DeviceKind, FileFlags, Interner,
    LocatorBinding, LocatorSpec, OptionKind, Sym,
};

type Result<T> = core::result::Result<T, ParseError>;

/// Largest accepted locator array size.
pub const MAX_LOCATOR_ARRAY: usize = 256;

/// Parses a whole file. Names are interned into `names`.
pub fn parse(source: &str, names: &mut Interner) -> Vec<Line<Result<Statement>>> {
    let line_starts: Vec<usize> = core::iter::once(0)
        .chain(source.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let line_of = |offset: usize| {
        u32::try_from(line_starts.partition_point(|&start| start <= offset)).unwrap_or(u32::MAX)
    };

    let mut out = Vec::new();
    let mut tokens = lex(source).into_iter().peekable();
    while tokens.peek().is_some() {
        let mut line = None;
        let mut current = Vec::new();
        let mut failed = None;
        for spanned in tokens.by_ref() {
            line.get_or_insert_with(|| line_of(spanned.span.start));
            match spanned.token {
                Ok(Token::Newline) => break,
                Ok(token) => current.push(token),
                Err(e) => {
                    failed.get_or_insert(e);
                }
            }
        }
        let Some(line) = line else { break };
        if current.is_empty() && failed.is_none() {
            continue;
        }
        let item = match failed {
            Some(e) => Err(e.into()),
            None => LineParser::new(&current, names).statement(),
        };
        out.push(Line { line, item });
    }
    out
}

struct LineParser<'t, 'src, 'n> {
    tokens: &'t [Token<'src>],
    pos: usize,
    names: &'n mut Interner,
}

impl<'t, 'src, 'n> LineParser<'t, 'src, 'n> {
    const fn new(tokens: &'t [Token<'src>], names: &'n mut Interner) -> Self {
        Self {
            tokens,
            pos: 0,
            names,
        }
    }

    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_second(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<Token<'src>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, want: Token<'src>) -> bool {
        if self.peek() == Some(want) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::Unexpected {
            expected,
            found: self
                .peek()
                .map_or_else(|| "end of line".to_string(), |t| t.to_string()),
        }
    }

    fn expect(&mut self, want: Token<'src>, expected: &'static str) -> Result<()> {
        if self.eat(want) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.tokens.len()
    }

    fn end(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of line"))
        }
    }

    fn intern(&mut self, text: &str) -> Sym {
        self.names.intern(text)
    }

    fn word(&mut self, expected: &'static str) -> Result<Sym> {
        match self.peek() {
            Some(Token::Word(w)) => {
                self.pos += 1;
                Ok(self.intern(w))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn number(&mut self, what: &'static str) -> Result<i64> {
        match self.peek() {
            Some(Token::Number(Num { value, .. })) => {
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn u32_number(&mut self, what: &'static str) -> Result<u32> {
        let value = self.number(what)?;
        u32::try_from(value).map_err(|_| ParseError::OutOfRange { what, value })
    }

    /// `"quoted"` or a path name.
    fn filename(&mut self) -> Result<Sym> {
        match self.peek() {
            Some(Token::QString(s) | Token::Path(s)) => {
                self.pos += 1;
                Ok(self.intern(s))
            }
            _ => Err(self.unexpected("file name")),
        }
    }

    fn opt_filename(&mut self) -> Option<Sym> {
        match self.peek() {
            Some(Token::QString(s) | Token::Path(s)) => {
                self.pos += 1;
                Some(self.intern(s))
            }
            _ => None,
        }
    }

    /// A word or a quoted string.
    fn string_value(&mut self, expected: &'static str) -> Result<Sym> {
        match self.peek() {
            Some(Token::QString(s) | Token::Word(s)) => {
                self.pos += 1;
                Ok(self.intern(s))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// A string, word or possibly negative number, as written.
    fn value(&mut self) -> Result<Sym> {
        match self.peek() {
            Some(Token::QString(s) | Token::Word(s) | Token::Path(s)) => {
                self.pos += 1;
                Ok(self.intern(s))
            }
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(self.intern(n.text))
            }
            Some(Token::Minus) => match self.peek_second() {
                Some(Token::Number(n)) => {
                    self.pos += 2;
                    Ok(self.intern(&format!("-{}", n.text)))
                }
                _ => {
                    self.pos += 1;
                    Err(self.unexpected("number"))
                }
            },
            _ => Err(self.unexpected("value")),
        }
    }

    /// `value , value , …`
    fn values(&mut self) -> Result<Vec<Sym>> {
        let mut values = vec![self.value()?];
        while self.eat(Token::Comma) {
            values.push(self.value()?);
        }
        Ok(values)
    }

    /// `WORD , WORD , …`
    fn word_list(&mut self, expected: &'static str) -> Result<Vec<Sym>> {
        let mut words = vec![self.word(expected)?];
        while self.eat(Token::Comma) {
            words.push(self.word(expected)?);
        }
        Ok(words)
    }

    /// Optional `: WORD , …`
    fn depends(&mut self) -> Result<Vec<Sym>> {
        if self.eat(Token::Colon) {
            self.word_list("dependency name")
        } else {
            Ok(Vec::new())
        }
    }

    fn starts_cond(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Word(_) | Token::Bang | Token::ParenOpen)
        )
    }

    /// `and ('|' and)*`
    fn cond(&mut self) -> Result<CondExpr> {
        let mut lhs = self.cond_and()?;
        while self.eat(Token::Pipe) {
            lhs = CondExpr::or(lhs, self.cond_and()?);
        }
        Ok(lhs)
    }

    fn cond_and(&mut self) -> Result<CondExpr> {
        let mut lhs = self.cond_base()?;
        while self.eat(Token::Amp) {
            lhs = CondExpr::and(lhs, self.cond_base()?);
        }
        Ok(lhs)
    }

    fn cond_base(&mut self) -> Result<CondExpr> {
        if self.eat(Token::Bang) {
            return Ok(CondExpr::not(self.cond_base()?));
        }
        if self.eat(Token::ParenOpen) {
            let inner = self.cond()?;
            self.expect(Token::ParenClose, "`)`")?;
            return Ok(inner);
        }
        Ok(CondExpr::Atom(self.word("condition")?))
    }

    fn opt_cond(&mut self) -> Result<Option<CondExpr>> {
        if self.starts_cond() {
            self.cond().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Optional `{ locator definitions }`.
    fn interface(&mut self) -> Result<Option<Vec<LocatorSpec>>> {
        if !self.eat(Token::BraceOpen) {
            return Ok(None);
        }
        let mut locators = Vec::new();
        if !self.eat(Token::BraceClose) {
            loop {
                self.locdef(&mut locators)?;
                if !self.eat(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::BraceClose, "`}`")?;
        }
        Ok(Some(locators))
    }

    fn locname(&mut self) -> Result<Sym> {
        self.string_value("locator name")
    }

    /// `= { value , … }`
    fn locdefaults(&mut self) -> Result<Vec<Sym>> {
        self.expect(Token::Equals, "`=`")?;
        self.expect(Token::BraceOpen, "`{`")?;
        let values = self.values()?;
        self.expect(Token::BraceClose, "`}`")?;
        Ok(values)
    }

    fn array_size(&mut self) -> Result<usize> {
        self.expect(Token::BracketOpen, "`[`")?;
        let size = self.number("array size")?;
        self.expect(Token::BracketClose, "`]`")?;
        usize::try_from(size)
            .ok()
            .filter(|&n| n > 0 && n <= MAX_LOCATOR_ARRAY)
            .ok_or(ParseError::OutOfRange {
                what: "locator array size",
                value: size,
            })
    }

    fn locdef(&mut self, out: &mut Vec<LocatorSpec>) -> Result<()> {
        if self.eat(Token::BracketOpen) {
            let name = self.locname()?;
            if self.peek() == Some(Token::BracketOpen) {
                let size = self.array_size()?;
                let defaults = self.locdefaults()?;
                out.extend(self.locator_array(name, size, &defaults, true));
            } else {
                self.expect(Token::Equals, "`=`")?;
                let default = self.value()?;
                out.push(LocatorSpec::with_default(name, default));
            }
            return self.expect(Token::BracketClose, "`]`");
        }

        let name = self.locname()?;
        if self.peek() == Some(Token::BracketOpen) {
            let size = self.array_size()?;
            let defaults = if self.peek() == Some(Token::Equals) {
                self.locdefaults()?
            } else {
                Vec::new()
            };
            out.extend(self.locator_array(name, size, &defaults, false));
        } else if self.eat(Token::Equals) {
            out.push(LocatorSpec {
                name,
                default: Some(self.value()?),
                required: true,
            });
        } else {
            out.push(LocatorSpec::required(name));
        }
        Ok(())
    }

    /// Expands `name[size]` into `name`, `name#1`, … Every element without
    /// an explicit default defaults to `0`. Only the first element can be
    /// required, and only when the array is not optional.
    fn locator_array(
        &mut self,
        name: Sym,
        size: usize,
        defaults: &[Sym],
        optional: bool,
    ) -> Vec<LocatorSpec> {
        let zero = self.intern("0");
        (0..size)
            .map(|i| LocatorSpec {
                name: self.element_name(name, i),
                default: Some(defaults.get(i).copied().unwrap_or(zero)),
                required: i == 0 && !optional,
            })
            .collect()
    }

    fn element_name(&mut self, name: Sym, index: usize) -> Sym {
        if index == 0 {
            name
        } else {
            self.intern(&format!("{name}{ARRAY_SEPARATOR}{index}"))
        }
    }

    /// `sd0` or `sd*`.
    fn device_instance(&mut self) -> Result<Sym> {
        match self.peek() {
            Some(Token::Word(w)) => {
                self.pos += 1;
                if self.eat(Token::Star) {
                    Ok(self.intern(&format!("{w}*")))
                } else {
                    Ok(self.intern(w))
                }
            }
            _ => Err(self.unexpected("device name")),
        }
    }

    /// `root`, `pci0` or `pci?`; `None` is root.
    fn attachment(&mut self) -> Result<Option<Sym>> {
        if self.eat(Token::Root) {
            return Ok(None);
        }
        match self.peek() {
            Some(Token::Word(w)) => {
                self.pos += 1;
                if self.eat(Token::Question) {
                    Ok(Some(self.intern(&format!("{w}?"))))
                } else {
                    Ok(Some(self.intern(w)))
                }
            }
            _ => Err(self.unexpected("attachment")),
        }
    }

    /// `?`, `"string"`, `none`, a device name, or `major N minor M`.
    fn dev_spec(&mut self) -> Result<DevSpec> {
        match self.peek() {
            Some(Token::Question) => {
                self.pos += 1;
                Ok(DevSpec::Wildcard)
            }
            Some(Token::QString(s)) => {
                self.pos += 1;
                Ok(DevSpec::Literal(self.intern(s)))
            }
            Some(Token::Word("none")) => {
                self.pos += 1;
                Ok(DevSpec::None)
            }
            Some(Token::Word(w)) => {
                self.pos += 1;
                Ok(DevSpec::Name(self.intern(w)))
            }
            Some(Token::Major) => {
                self.pos += 1;
                let major = self.u32_number("major")?;
                self.expect(Token::Minor, "`minor`")?;
                let minor = self.u32_number("minor")?;
                Ok(DevSpec::Number { major, minor })
            }
            _ => Err(self.unexpected("device specification")),
        }
    }

    fn statement(mut self) -> Result<Statement> {
        let Some(first) = self.bump() else {
            return Err(self.unexpected("statement"));
        };
        let statement = match first {
            Token::Include | Token::CInclude => {
                let path = match self.peek() {
                    Some(Token::QString(s)) => {
                        self.pos += 1;
                        self.intern(s)
                    }
                    _ => return Err(self.unexpected("quoted file name")),
                };
                Statement::Include {
                    path,
                    optional: first == Token::CInclude,
                }
            }
            Token::Source => Statement::Source(self.filename()?),
            Token::Build => Statement::Build(self.filename()?),
            Token::Machine => {
                let name = self.word("machine name")?;
                let mut rest = Vec::new();
                while !self.at_end() {
                    rest.push(self.word("architecture name")?);
                }
                let mut rest = rest.into_iter();
                Statement::Machine {
                    name,
                    arch: rest.next(),
                    subarches: rest.collect(),
                }
            }
            Token::Ioconf => Statement::Ioconf(self.word("ioconf name")?),
            Token::Version => Statement::Version(self.number("version")?),
            Token::Package => return Err(ParseError::Unsupported("package")),
            Token::PseudoRoot => return Err(ParseError::Unsupported("pseudo-root")),

            Token::File => {
                let path = self.filename()?;
                let cond = self.opt_cond()?;
                let mut flags = FileFlags::default();
                loop {
                    if self.eat(Token::NeedsCount) {
                        flags.needs_count = true;
                    } else if self.eat(Token::NeedsFlag) {
                        flags.needs_flag = true;
                    } else {
                        break;
                    }
                }
                let rule = if self.eat(Token::CompileWith) {
                    Some(self.string_value("compile rule")?)
                } else {
                    None
                };
                Statement::File {
                    path,
                    cond,
                    flags,
                    rule,
                }
            }
            Token::Object => {
                let path = self.filename()?;
                let cond = self.opt_cond()?;
                let mut flags = FileFlags::default();
                while self.eat(Token::NeedsFlag) {
                    flags.needs_flag = true;
                }
                Statement::Object { path, cond, flags }
            }
            Token::DeviceMajor => self.device_major()?,
            Token::Prefix => Statement::Prefix(self.opt_filename()),
            Token::BuildPrefix => {
                let path = match self.peek() {
                    Some(Token::Word(w)) => {
                        self.pos += 1;
                        Some(self.intern(w))
                    }
                    _ => self.opt_filename(),
                };
                Statement::BuildPrefix(path)
            }
            Token::DevClass => Statement::DevClass(self.word("device class")?),
            Token::DefFs => {
                let mut names = vec![self.word("file system name")?];
                while let Some(Token::Word(_)) = self.peek() {
                    names.push(self.word("file system name")?);
                }
                let deps = self.depends()?;
                Statement::DefFs { names, deps }
            }
            Token::Define => {
                let name = self.word("attribute name")?;
                let locators = self.interface()?;
                let deps = self.depends()?;
                Statement::Define {
                    name,
                    locators,
                    deps,
                }
            }
            Token::DefOpt => self.def_options(OptionKind::Option, false)?,
            Token::DefFlag => self.def_options(OptionKind::Flag, false)?,
            Token::DefParam => self.def_options(OptionKind::Param, false)?,
            Token::Obsolete => match self.bump() {
                Some(Token::DefFlag) => self.def_options(OptionKind::Flag, true)?,
                Some(Token::DefParam) => self.def_options(OptionKind::Param, true)?,
                _ => {
                    self.pos -= 1;
                    return Err(self.unexpected("`defflag` or `defparam`"));
                }
            },
            Token::Device => self.device(DeviceKind::Device)?,
            Token::DefPseudo => self.device(DeviceKind::Pseudo)?,
            Token::DefPseudoDev => self.device(DeviceKind::PseudoDev)?,
            Token::Attach => {
                let device = self.word("device name")?;
                self.expect(Token::At, "`at`")?;
                let mut sites = vec![self.at_site()?];
                while self.eat(Token::Comma) {
                    sites.push(self.at_site()?);
                }
                let with = if self.eat(Token::With) {
                    Some(self.word("attachment name")?)
                } else {
                    None
                };
                let attrs = self.depends()?;
                Statement::Attach {
                    device,
                    sites,
                    with,
                    attrs,
                }
            }
            Token::MaxPartitions => Statement::MaxPartitions(self.number("partition count")?),
            Token::MaxUsers => {
                let first = self.number("maxusers")?;
                if self.at_end() {
                    Statement::Maxusers(first)
                } else {
                    let default = self.number("default maxusers")?;
                    let max = self.number("maximum maxusers")?;
                    Statement::DefMaxusers {
                        min: first,
                        default,
                        max,
                    }
                }
            }
            Token::MakeOptions => self.make_options()?,
            Token::Major => {
                self.expect(Token::BraceOpen, "`{`")?;
                let mut majors = Vec::new();
                loop {
                    let name = self.word("device name")?;
                    self.expect(Token::Equals, "`=`")?;
                    majors.push((name, self.number("major")?));
                    if !self.eat(Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::BraceClose, "`}`")?;
                Statement::Majors(majors)
            }

            Token::Select => Statement::Select(self.word("attribute name")?),
            Token::FileSystem => Statement::FileSystems(self.word_list("file system name")?),
            Token::Options => {
                let mut options = Vec::new();
                loop {
                    let name = self.word("option name")?;
                    let value = if self.eat(Token::Equals) {
                        Some(self.value()?)
                    } else {
                        None
                    };
                    options.push((name, value));
                    if !self.eat(Token::Comma) {
                        break;
                    }
                }
                Statement::Options(options)
            }
            Token::Ident => Statement::Ident(Some(self.string_value("identifier")?)),
            Token::Config => self.config()?,
            Token::PseudoDevice => {
                let name = self.word("pseudo-device name")?;
                let count = if self.at_end() {
                    1
                } else {
                    self.number("unit count")?
                };
                Statement::PseudoDevice { name, count }
            }
            Token::No => self.no()?,
            Token::Word(_) => {
                self.pos -= 1;
                let name = self.device_instance()?;
                self.expect(Token::At, "`at`")?;
                let at = self.attachment()?;
                let mut locators = Vec::new();
                while let Some(Token::Word(_)) = self.peek() {
                    self.locator(&mut locators)?;
                }
                let flags = if self.eat(Token::Flags) {
                    self.number("flags")?
                } else {
                    0
                };
                Statement::Instance {
                    name,
                    at,
                    locators,
                    flags,
                }
            }
            _ => {
                self.pos -= 1;
                return Err(self.unexpected("statement"));
            }
        };
        self.end()?;
        Ok(statement)
    }

    fn at_site(&mut self) -> Result<AtSite> {
        if self.eat(Token::Root) {
            Ok(AtSite::Root)
        } else {
            Ok(AtSite::Attr(self.word("attachment site")?))
        }
    }

    /// `name ?` or `name value , …`; a list binds `name`, `name#1`, …
    fn locator(&mut self, out: &mut Vec<LocatorBinding>) -> Result<()> {
        let name = self.word("locator name")?;
        if self.eat(Token::Question) {
            out.push(LocatorBinding { name, value: None });
            return Ok(());
        }
        for (i, value) in self.values()?.into_iter().enumerate() {
            out.push(LocatorBinding {
                name: self.element_name(name, i),
                value: Some(value),
            });
        }
        Ok(())
    }

    fn device(&mut self, kind: DeviceKind) -> Result<Statement> {
        let name = self.word("device name")?;
        let locators = self.interface()?;
        let attrs = self.depends()?;
        Ok(Statement::Device {
            name,
            kind,
            locators,
            attrs,
        })
    }

    /// `[file] NAME[=value][:=lint] … [: deps]`
    fn def_options(&mut self, kind: OptionKind, obsolete: bool) -> Result<Statement> {
        let file = self.opt_filename();
        let mut opts = Vec::new();
        while let Some(Token::Word(_)) = self.peek() {
            let mut opt = DefOpt::plain(self.word("option name")?);
            if self.eat(Token::Equals) {
                opt.value = Some(self.value()?);
            }
            if self.eat(Token::ColonEq) {
                opt.lint_value = Some(self.value()?);
            }
            opts.push(opt);
        }
        if opts.is_empty() {
            return Err(self.unexpected("option name"));
        }
        let deps = if obsolete { Vec::new() } else { self.depends()? };
        Ok(Statement::DefOptions {
            kind,
            file,
            opts,
            deps,
            obsolete,
        })
    }

    fn device_major(&mut self) -> Result<Statement> {
        let name = self.word("device name")?;
        let char_major = if self.eat(Token::Char) {
            Some(self.number("character major")?)
        } else {
            None
        };
        let block_major = if self.eat(Token::Block) {
            Some(self.number("block major")?)
        } else {
            None
        };
        let cond = self.opt_cond()?;
        let nodes = if self.eat(Token::Single) {
            Some(DevNodes::Single)
        } else if self.eat(Token::Vector) {
            self.expect(Token::Equals, "`=`")?;
            let count = self.number("vector size")?;
            let start = if self.eat(Token::Colon) {
                self.number("vector start")?
            } else {
                0
            };
            Some(DevNodes::Vector { count, start })
        } else {
            None
        };
        // Node naming hints only matter to device node scripts.
        if nodes.is_some() && self.eat(Token::Comma) {
            self.expect(Token::LinkZero, "`linkzero`")?;
        }
        Ok(Statement::DeviceMajor {
            name,
            char_major,
            block_major,
            cond,
            nodes,
        })
    }

    fn mk_var_name(&mut self) -> Result<Sym> {
        self.string_value("make variable")
    }

    /// Selection form `NAME = value, NAME += value`, or definition form
    /// `cond NAME += value, …`.
    fn make_options(&mut self) -> Result<Statement> {
        let selection = matches!(self.peek(), Some(Token::Word(_) | Token::QString(_)))
            && matches!(
                self.peek_second(),
                Some(Token::Equals | Token::PlusEq | Token::ColonEq)
            );
        if selection {
            let mut options = Vec::new();
            loop {
                let name = self.mk_var_name()?;
                let append = match self.bump() {
                    Some(Token::Equals | Token::ColonEq) => false,
                    Some(Token::PlusEq) => true,
                    _ => {
                        self.pos -= 1;
                        return Err(self.unexpected("`=` or `+=`"));
                    }
                };
                options.push((name, self.value()?, append));
                if !self.eat(Token::Comma) {
                    break;
                }
            }
            return Ok(Statement::MakeOptions(options));
        }

        let mut options = Vec::new();
        loop {
            let cond = self.cond()?;
            let name = self.mk_var_name()?;
            self.expect(Token::PlusEq, "`+=`")?;
            let value = self.value()?;
            options.push(CondMkOption { cond, name, value });
            if !self.eat(Token::Comma) {
                break;
            }
        }
        Ok(Statement::DefMakeoptions(options))
    }

    /// `config NAME root [on] DEV [type FS] [dumps [on] DEV]…`
    fn config(&mut self) -> Result<Statement> {
        let name = self.word("configuration name")?;
        self.expect(Token::Root, "`root`")?;
        self.eat(Token::On);
        let root = self.dev_spec()?;
        let fstype = if self.eat(Token::Type) {
            if self.eat(Token::Question) {
                Some(self.intern("?"))
            } else {
                Some(self.word("file system type")?)
            }
        } else {
            None
        };
        let mut dumps = Vec::new();
        while self.eat(Token::Dumps) {
            self.eat(Token::On);
            dumps.push(self.dev_spec()?);
        }
        Ok(Statement::Config {
            name,
            root,
            fstype,
            dumps,
        })
    }

    fn no(&mut self) -> Result<Statement> {
        let statement = match self.peek() {
            Some(Token::Select) => {
                self.pos += 1;
                Statement::NoSelect(self.word("attribute name")?)
            }
            Some(Token::FileSystem) => {
                self.pos += 1;
                Statement::NoFileSystems(self.word_list("file system name")?)
            }
            Some(Token::MakeOptions) => {
                self.pos += 1;
                let mut names = vec![self.mk_var_name()?];
                while self.eat(Token::Comma) {
                    names.push(self.mk_var_name()?);
                }
                Statement::NoMakeOptions(names)
            }
            Some(Token::Options) => {
                self.pos += 1;
                Statement::NoOptions(self.word_list("option name")?)
            }
            Some(Token::Ident) => {
                self.pos += 1;
                Statement::Ident(None)
            }
            Some(Token::Config) => {
                self.pos += 1;
                Statement::NoConfig(self.word("configuration name")?)
            }
            Some(Token::PseudoDevice) => {
                self.pos += 1;
                Statement::NoPseudoDevice(self.word("pseudo-device name")?)
            }
            Some(Token::Device) => {
                self.pos += 1;
                self.expect(Token::At, "`at`")?;
                Statement::NoDeviceAt(self.attachment()?)
            }
            Some(Token::Word(_)) => {
                let name = self.device_instance()?;
                if self.eat(Token::At) {
                    Statement::NoInstanceAt {
                        name,
                        at: self.attachment()?,
                    }
                } else {
                    Statement::NoInstance(name)
                }
            }
            _ => return Err(self.unexpected("what to remove")),
        };
        Ok(statement)
    }
}
