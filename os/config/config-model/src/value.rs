//! Typed arguments handed to the session by the parser.

use crate::cond::CondExpr;
use crate::symbol::Sym;
use core::fmt;

/// Unit number of a device instance or attachment target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Unit {
    /// A concrete unit, as in `sd0`.
    Num(u32),
    /// Any number of units, as in `sd*`.
    Star,
    /// Any single unit, as in `scsibus?`.
    Wild,
}

impl Unit {
    #[must_use]
    pub const fn number(self) -> Option<u32> {
        match self {
            Self::Num(n) => Some(n),
            Self::Star | Self::Wild => None,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Star => f.write_str("*"),
            Self::Wild => f.write_str("?"),
        }
    }
}

/// Splits a device name such as `sd0`, `sd*` or `scsibus?` into its base
/// name and unit.
///
/// Returns `None` when the name has no unit suffix, is shorter than two
/// characters or starts with a digit.
#[must_use]
pub fn split_unit(name: &str) -> Option<(&str, Unit)> {
    let bytes = name.as_bytes();
    if bytes.len() < 2 || bytes[0].is_ascii_digit() {
        return None;
    }
    match bytes[bytes.len() - 1] {
        b'*' => Some((&name[..name.len() - 1], Unit::Star)),
        b'?' => Some((&name[..name.len() - 1], Unit::Wild)),
        c if c.is_ascii_digit() => {
            let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
            let unit = name[base.len()..].parse().ok()?;
            Some((base, Unit::Num(unit)))
        }
        _ => None,
    }
}

/// Separator between a locator array name and its element index.
pub const ARRAY_SEPARATOR: char = '#';

/// One locator slot declared by an interface attribute.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LocatorSpec {
    pub name: Sym,
    /// Value used when the instance omits or wildcards the locator.
    pub default: Option<Sym>,
    /// The instance must name this locator even though it has a default.
    pub required: bool,
}

impl LocatorSpec {
    /// A locator that every instance must supply.
    #[must_use]
    pub const fn required(name: Sym) -> Self {
        Self {
            name,
            default: None,
            required: true,
        }
    }

    /// A locator that falls back to `default` when omitted.
    #[must_use]
    pub const fn with_default(name: Sym, default: Sym) -> Self {
        Self {
            name,
            default: Some(default),
            required: false,
        }
    }

    /// Whether an instance may leave this locator out.
    #[must_use]
    pub const fn may_omit(&self) -> bool {
        !self.required && self.default.is_some()
    }
}

/// A locator value supplied by a device instance.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LocatorBinding {
    pub name: Sym,
    /// `None` for the `?` wildcard.
    pub value: Option<Sym>,
}

/// One name of a `defflag`/`defparam`/`defopt` directive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DefOpt {
    pub name: Sym,
    pub value: Option<Sym>,
    pub lint_value: Option<Sym>,
}

impl DefOpt {
    #[must_use]
    pub const fn plain(name: Sym) -> Self {
        Self {
            name,
            value: None,
            lint_value: None,
        }
    }
}

/// A place a device attachment may hang off.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AtSite {
    Root,
    Attr(Sym),
}

/// A root or dump device as written in a `config` line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DevSpec {
    /// `?`
    Wildcard,
    /// `none`
    None,
    /// A quoted string passed through verbatim.
    Literal(Sym),
    /// A device name such as `sd0a` or `wm0`.
    Name(Sym),
    /// An explicit `major minor` pair.
    Number { major: u32, minor: u32 },
}

/// Kind of an option definition.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OptionKind {
    /// `defopt`: value optional.
    Option,
    /// `defflag`: never has a value.
    Flag,
    /// `defparam`: always has a value.
    Param,
    /// `deffs`: a file system.
    FileSystem,
}

impl OptionKind {
    #[must_use]
    pub const fn directive(self) -> &'static str {
        match self {
            Self::Option => "defopt",
            Self::Flag => "defflag",
            Self::Param => "defparam",
            Self::FileSystem => "deffs",
        }
    }
}

/// Flavour of a device declaration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// `device`: attached through `attach … at`.
    Device,
    /// `defpseudo`: instantiated with `pseudo-device`.
    Pseudo,
    /// `defpseudodev`: a pseudo-device with device nodes.
    PseudoDev,
}

impl DeviceKind {
    #[must_use]
    pub const fn is_pseudo(self) -> bool {
        !matches!(self, Self::Device)
    }
}

/// Build flags of a `file` or `object` line.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FileFlags {
    pub needs_count: bool,
    pub needs_flag: bool,
}

/// Device node creation hints of a `device-major` line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DevNodes {
    Single,
    Vector { count: i64, start: i64 },
}

/// A `makeoptions` definition guarded by a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondMkOption {
    pub cond: CondExpr,
    pub name: Sym,
    pub value: Sym,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_numbered() {
        assert_eq!(split_unit("sd0"), Some(("sd", Unit::Num(0))));
        assert_eq!(split_unit("scsibus12"), Some(("scsibus", Unit::Num(12))));
    }

    #[test]
    fn split_star_and_wild() {
        assert_eq!(split_unit("sd*"), Some(("sd", Unit::Star)));
        assert_eq!(split_unit("pci?"), Some(("pci", Unit::Wild)));
    }

    #[test]
    fn split_rejects_bad_names() {
        assert_eq!(split_unit("sd"), None);
        assert_eq!(split_unit("0sd"), None);
        assert_eq!(split_unit("x"), None);
        assert_eq!(split_unit(""), None);
    }

    #[test]
    fn locator_omission() {
        let mut names = crate::symbol::Interner::new();
        let size = names.intern("size");
        let zero = names.intern("0");
        assert!(LocatorSpec::with_default(size, zero).may_omit());
        assert!(!LocatorSpec::required(size).may_omit());
        let first = LocatorSpec {
            required: true,
            ..LocatorSpec::with_default(size, zero)
        };
        assert!(!first.may_omit());
    }
}
