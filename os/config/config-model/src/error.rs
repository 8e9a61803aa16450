//! Errors and diagnostics.
//!
//! Every directive reports problems as [`ConfigError`] values. A directive
//! that fails is rolled back, its errors are recorded in the session's
//! [`Diagnostics`] together with the current [`Location`], and processing
//! continues with the next directive. The caller inspects the diagnostics
//! once the whole input has been consumed.

use crate::symbol::Sym;
use core::fmt;

/// Result type used by all model operations.
pub type Result<T, E = Errors> = core::result::Result<T, E>;

/// Coarse classification of a [`ConfigError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bad or conflicting definitions.
    Definition,
    /// Problems in the attribute or device graph.
    Graph,
    /// Locator mismatches on a device instance.
    Locator,
    /// A device reference that cannot be resolved.
    Resolution,
    /// Whole-configuration consistency checks.
    Consistency,
    /// Input that does not parse.
    Syntax,
}

/// A single configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{what} `{name}` is already defined")]
    DuplicateDefinition { what: &'static str, name: String },
    #[error("unknown {what} `{name}`")]
    UnknownName { what: &'static str, name: String },
    #[error("invalid device name `{0}`")]
    InvalidDeviceName(String),
    #[error("bad device base name `{0}`")]
    BadBaseName(String),
    #[error("option `{0}` requires a value")]
    ValueRequired(String),
    #[error("option `{0}` must not have a value")]
    ValueForbidden(String),
    #[error("`{0}` is a file system, not an option")]
    IsFileSystem(String),
    #[error("`{0}` is not a defined file system")]
    NotFileSystem(String),
    #[error("`{0}` is a pseudo-device")]
    IsPseudoDevice(String),
    #[error("`{0}` is not a pseudo-device")]
    NotPseudoDevice(String),
    #[error("`{0}` is not a plain attribute")]
    NotPlainAttribute(String),
    #[error("{0} already specified")]
    AlreadySpecified(&'static str),
    #[error("`{0}` is not allowed in this section")]
    Misplaced(&'static str),
    #[error("version {found} is not supported (need {min} to {max})")]
    BadVersion { found: i64, min: u32, max: u32 },
    #[error("{what} {value} is out of range")]
    OutOfRange { what: &'static str, value: i64 },
    #[error("device-major `{0}` needs a character or block major")]
    NoMajors(String),
    #[error("{what} major {major} is used by both `{first}` and `{second}`")]
    DuplicateMajor {
        what: &'static str,
        major: u32,
        first: String,
        second: String,
    },
    #[error("file `{0}` needs a condition for needs-count or needs-flag")]
    CountWithoutCondition(String),
    #[error("file `{0}` has no suffix")]
    BadFileName(String),
    #[error("no {0} to pop")]
    NothingToPop(&'static str),

    #[error("circular dependency on attribute `{0}`")]
    CircularDependency(String),
    #[error("`{name}` cannot depend on interface attribute `{dep}`")]
    BadDependency { name: String, dep: String },
    #[error("pseudo-device `{0}` cannot attach")]
    PseudoCannotAttach(String),
    #[error("`{device}` cannot be attached at plain attribute `{attr}`")]
    IllegalAttachment { device: String, attr: String },
    #[error("attaching `{device}` at `{site}` is already done by `{by}`")]
    DuplicateAttachmentSite {
        device: String,
        site: String,
        by: String,
    },
    #[error("`{device}` cannot attach to `{target}`")]
    CannotAttach { device: String, target: String },
    #[error("`{0}` cannot attach at root")]
    CannotAttachAtRoot(String),
    #[error("device `{device}` has both class `{first}` and class `{second}`")]
    MultipleDeviceClasses {
        device: String,
        first: String,
        second: String,
    },

    #[error("{device}: must specify {}", .names.join(", "))]
    MissingLocator { device: String, names: Vec<String> },
    #[error("{device}: extraneous locator {}", .names.join(", "))]
    ExtraneousLocator { device: String, names: Vec<String> },
    #[error("{device}: cannot wildcard {}", .names.join(", "))]
    NoDefaultForWildcard { device: String, names: Vec<String> },

    #[error("{context}: device `{device}` does not exist")]
    UnknownDevice { context: String, device: String },
    #[error("{context}: invalid {what} device name `{spec}`")]
    InvalidDeviceSpec {
        context: String,
        what: &'static str,
        spec: String,
    },
    #[error("{context}: cannot make {what} device from `{spec}`")]
    NoMajorForDevice {
        context: String,
        what: &'static str,
        spec: String,
    },
    #[error("{context} says {what} on `{spec}`, but there is no `{spec}`")]
    DanglingReference {
        context: String,
        what: &'static str,
        spec: String,
    },
    #[error("{0}'s cannot be *'d until its driver is fixed")]
    BadStar(String),
    #[error("`{instance} at {at}` is orphaned (no `{at}` found)")]
    OrphanedInstance { instance: String, at: String },
    #[error("{context}: file system `{fstype}` is not configured")]
    FileSystemNotConfigured { context: String, fstype: String },

    #[error("no configurations defined")]
    NoConfiguration,
    #[error("no file systems configured")]
    NoFileSystem,
    #[error("need \"maxusers\" line")]
    MaxusersUnset,
    #[error("maxusers {value} is out of range ({min} to {max})")]
    MaxusersOutOfRange { value: i64, min: u32, max: u32 },
    #[error("invalid maxusers defaults (minimum {min}, default {default}, maximum {max})")]
    BadMaxusersDefaults { min: i64, default: i64, max: i64 },
    #[error("cannot proceed without maxpartitions specifier")]
    NoMaxpartitions,
    #[error("cannot proceed without machine or ioconf specifier")]
    NoMachine,
    #[error("{what} `{name}` used but not defined")]
    UsedNotDefined { what: &'static str, name: String },

    #[error("{0}")]
    Syntax(String),
}

impl ConfigError {
    /// The coarse class of the error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::DuplicateDefinition { .. }
            | Self::UnknownName { .. }
            | Self::InvalidDeviceName(_)
            | Self::BadBaseName(_)
            | Self::ValueRequired(_)
            | Self::ValueForbidden(_)
            | Self::IsFileSystem(_)
            | Self::NotFileSystem(_)
            | Self::IsPseudoDevice(_)
            | Self::NotPseudoDevice(_)
            | Self::NotPlainAttribute(_)
            | Self::AlreadySpecified(_)
            | Self::Misplaced(_)
            | Self::BadVersion { .. }
            | Self::OutOfRange { .. }
            | Self::NoMajors(_)
            | Self::DuplicateMajor { .. }
            | Self::CountWithoutCondition(_)
            | Self::BadFileName(_)
            | Self::NothingToPop(_)
            | Self::UsedNotDefined { .. } => ErrorClass::Definition,
            Self::CircularDependency(_)
            | Self::BadDependency { .. }
            | Self::PseudoCannotAttach(_)
            | Self::IllegalAttachment { .. }
            | Self::DuplicateAttachmentSite { .. }
            | Self::CannotAttach { .. }
            | Self::CannotAttachAtRoot(_)
            | Self::MultipleDeviceClasses { .. } => ErrorClass::Graph,
            Self::MissingLocator { .. }
            | Self::ExtraneousLocator { .. }
            | Self::NoDefaultForWildcard { .. } => ErrorClass::Locator,
            Self::UnknownDevice { .. }
            | Self::InvalidDeviceSpec { .. }
            | Self::NoMajorForDevice { .. }
            | Self::DanglingReference { .. }
            | Self::BadStar(_)
            | Self::OrphanedInstance { .. }
            | Self::FileSystemNotConfigured { .. } => ErrorClass::Resolution,
            Self::NoConfiguration
            | Self::NoFileSystem
            | Self::MaxusersUnset
            | Self::MaxusersOutOfRange { .. }
            | Self::BadMaxusersDefaults { .. }
            | Self::NoMaxpartitions
            | Self::NoMachine => ErrorClass::Consistency,
            Self::Syntax(_) => ErrorClass::Syntax,
        }
    }

    pub(crate) fn duplicate(what: &'static str, name: Sym) -> Self {
        Self::DuplicateDefinition {
            what,
            name: name.to_string(),
        }
    }

    pub(crate) fn unknown(what: &'static str, name: Sym) -> Self {
        Self::UnknownName {
            what,
            name: name.to_string(),
        }
    }
}

/// Errors collected while running one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors(Vec<ConfigError>);

impl Errors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, error: ConfigError) {
        self.0.push(error);
    }

    /// Moves all errors of `other` into `self`.
    pub fn absorb(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, ConfigError> {
        self.0.iter()
    }

    /// `Ok(value)` when no error was collected, `Err(self)` otherwise.
    ///
    /// # Errors
    /// Returns `self` if it holds at least one error.
    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.0.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl From<ConfigError> for Errors {
    fn from(value: ConfigError) -> Self {
        Self(vec![value])
    }
}

impl IntoIterator for Errors {
    type Item = ConfigError;
    type IntoIter = std::vec::IntoIter<ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Errors {
    type Item = &'a ConfigError;
    type IntoIter = core::slice::Iter<'a, ConfigError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Where a directive came from.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub file: Option<Sym>,
    pub line: u32,
}

impl Location {
    #[must_use]
    pub const fn new(file: Sym, line: u32) -> Self {
        Self {
            file: Some(file),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file {
            Some(file) => write!(f, "{file}:{}", self.line),
            None if self.line == 0 => f.write_str("<internal>"),
            None => write!(f, "<input>:{}", self.line),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A recorded error or warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Location,
    pub message: String,
    /// The structured error for [`Severity::Error`] entries.
    pub error: Option<ConfigError>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "{}: {}", self.location, self.message),
            Severity::Warning => write!(f, "{}: warning: {}", self.location, self.message),
        }
    }
}

/// Ordered list of everything reported during a session.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    errors: usize,
}

impl Diagnostics {
    pub fn error(&mut self, location: Location, error: ConfigError) {
        log::error!("{location}: {error}");
        self.errors += 1;
        self.entries.push(Diagnostic {
            severity: Severity::Error,
            location,
            message: error.to_string(),
            error: Some(error),
        });
    }

    pub fn warn(&mut self, location: Location, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{location}: {message}");
        self.entries.push(Diagnostic {
            severity: Severity::Warning,
            location,
            message,
            error: None,
        });
    }

    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors
    }

    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.errors > 0
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    /// All recorded errors in report order.
    pub fn errors(&self) -> impl Iterator<Item = &ConfigError> {
        self.entries.iter().filter_map(|d| d.error.as_ref())
    }

    /// All recorded warning messages in report order.
    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| d.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_errors_list_all_names() {
        let e = ConfigError::MissingLocator {
            device: "foo0".into(),
            names: vec!["base".into(), "irq".into()],
        };
        assert_eq!(e.to_string(), "foo0: must specify base, irq");
        assert_eq!(e.class(), ErrorClass::Locator);
    }

    #[test]
    fn undefined_names_are_definition_errors() {
        let e = ConfigError::UsedNotDefined {
            what: "device",
            name: "com".into(),
        };
        assert_eq!(e.class(), ErrorClass::Definition);
        assert_eq!(ConfigError::NoMachine.class(), ErrorClass::Consistency);
    }

    #[test]
    fn errors_into_result() {
        assert_eq!(Errors::new().into_result(3), Ok(3));
        let errs = Errors::from(ConfigError::NoConfiguration);
        assert_eq!(errs.clone().into_result(()), Err(errs));
    }

    #[test]
    fn diagnostics_count_only_errors() {
        let mut diag = Diagnostics::default();
        diag.warn(Location::default(), "already have options FOO");
        diag.error(Location::default(), ConfigError::MaxusersUnset);
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.iter().count(), 2);
        assert_eq!(diag.warnings().collect::<Vec<_>>(), ["already have options FOO"]);
    }
}
