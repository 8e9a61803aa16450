//! The compiler session and its directive entry points.
//!
//! A [`Session`] owns every registry of one configuration run. The parser
//! calls one `on_*` method per top-level directive; each method runs inside
//! a statement transaction, so a directive either applies completely or
//! leaves no trace except its diagnostics.
//!
//! ```text
//!  Preamble ──machine/ioconf──► Definitions ──end of definitions──►
//!  Selections ──end of selections──► Finished
//! ```

use crate::cond::CondExpr;
use crate::error::{ConfigError, Diagnostics, Errors, Location, Result};
use crate::graph::Graph;
use crate::registry::Registry;
use crate::symbol::{Interner, Sym};
use crate::txn::{Slot, Transactional};
use crate::value::{
    AtSite, CondMkOption, DefOpt, DevNodes, DevSpec, DeviceKind, FileFlags, LocatorBinding,
    LocatorSpec, OptionKind,
};

/// Newest configuration language version understood.
pub const CONFIG_VERSION: u32 = 20_200_711;

/// Oldest configuration language version still accepted.
pub const CONFIG_MIN_VERSION: u32 = 20_090_313;

/// Largest device major accepted by `device-major`.
pub const MAX_MAJOR: i64 = 4096;

/// Knobs chosen by the caller, not by the input.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Source tree; overrides a `source` line when set.
    pub srcdir: Option<String>,
    /// Build directory; overrides a `build` line when set.
    pub builddir: Option<String>,
    /// Report undeclared options and ignored instances.
    pub verbose: bool,
    /// `maxusers` used when neither the input nor a `maxusers` definition
    /// provides one.
    pub default_maxusers: Option<u32>,
    /// Device bases allowed to have `*` instances in addition to those
    /// named by `needs-count` files.
    pub needs_count: Vec<String>,
    /// Accepted range of the `version` directive.
    pub min_version: u32,
    pub max_version: u32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            srcdir: None,
            builddir: None,
            verbose: false,
            default_maxusers: None,
            needs_count: Vec::new(),
            min_version: CONFIG_MIN_VERSION,
            max_version: CONFIG_VERSION,
        }
    }
}

/// Processing stage of a session.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Preamble,
    Definitions,
    Selections,
    Finished,
}

/// Bounds from a `maxusers min default max` definition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MaxusersBounds {
    pub min: u32,
    pub default: u32,
    pub max: u32,
}

/// Scalar settings collected from the input.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub machine: Option<Sym>,
    pub machine_arch: Option<Sym>,
    pub subarches: Vec<Sym>,
    pub ioconf: Option<Sym>,
    pub srcdir: Option<Sym>,
    pub builddir: Option<Sym>,
    pub maxpartitions: Option<u32>,
    pub maxusers: Option<u32>,
    pub maxusers_bounds: Option<MaxusersBounds>,
    pub ident: Option<Sym>,
    pub version: Option<u32>,
    pub prefixes: Vec<Sym>,
    pub build_prefixes: Vec<Sym>,
}

/// Names the model looks for by identity.
#[derive(Debug, Copy, Clone)]
pub(crate) struct WellKnown {
    pub(crate) qmark: Sym,
    pub(crate) ifnet: Sym,
}

/// Owner of all state for one configuration run.
#[derive(Debug)]
pub struct Session {
    pub(crate) names: Interner,
    pub(crate) graph: Graph,
    pub(crate) registry: Registry,
    pub(crate) settings: Slot<Settings>,
    pub(crate) diag: Diagnostics,
    pub(crate) options: SessionOptions,
    pub(crate) location: Location,
    pub(crate) phase: Phase,
    pub(crate) wk: WellKnown,
    open: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl Transactional for Session {
    fn begin(&mut self) {
        assert!(!self.open, "nested statement transaction");
        self.open = true;
        self.graph.begin();
        self.registry.begin();
        self.settings.begin();
    }

    fn commit(&mut self) {
        self.open = false;
        self.graph.commit();
        self.registry.commit();
        self.settings.commit();
    }

    fn rollback(&mut self) {
        self.open = false;
        self.graph.rollback();
        self.registry.rollback();
        self.settings.rollback();
    }
}

impl Session {
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        let mut names = Interner::new();
        let wk = WellKnown {
            qmark: names.intern("?"),
            ifnet: names.intern("ifnet"),
        };
        let mut registry = Registry::default();
        for base in &options.needs_count {
            registry.needs_count.insert(names.intern(base), ());
        }
        let settings = Settings {
            srcdir: options.srcdir.as_deref().map(|d| names.intern(d)),
            builddir: options.builddir.as_deref().map(|d| names.intern(d)),
            ..Settings::default()
        };
        Self {
            names,
            graph: Graph::default(),
            registry,
            settings: Slot::new(settings),
            diag: Diagnostics::default(),
            options,
            location: Location::default(),
            phase: Phase::Preamble,
            wk,
            open: false,
        }
    }

    pub fn intern(&mut self, text: &str) -> Sym {
        self.names.intern(text)
    }

    pub const fn interner_mut(&mut self) -> &mut Interner {
        &mut self.names
    }

    #[must_use]
    pub const fn interner(&self) -> &Interner {
        &self.names
    }

    #[must_use]
    pub const fn graph(&self) -> &Graph {
        &self.graph
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        self.settings.get()
    }

    #[must_use]
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn location(&self) -> Location {
        self.location
    }

    /// Sets the source position attached to subsequent diagnostics.
    pub const fn set_location(&mut self, location: Location) {
        self.location = location;
    }

    /// Records a warning at the current location.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.diag.warn(self.location, message);
    }

    /// Records an error at the current location.
    pub fn report(&mut self, error: ConfigError) {
        self.diag.error(self.location, error);
    }

    /// Runs `f` as one directive: commits on success, rolls back and records
    /// the errors otherwise.
    pub(crate) fn statement<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Option<T> {
        self.begin();
        match f(self) {
            Ok(value) => {
                self.commit();
                Some(value)
            }
            Err(errors) => {
                self.rollback();
                log::debug!("{}: directive rolled back", self.location);
                for error in errors {
                    self.report(error);
                }
                None
            }
        }
    }

    pub(crate) fn require_definitions(&self, directive: &'static str) -> Result<()> {
        match self.phase {
            Phase::Definitions | Phase::Selections => Ok(()),
            Phase::Preamble | Phase::Finished => Err(ConfigError::Misplaced(directive).into()),
        }
    }

    pub(crate) fn require_selections(&self, directive: &'static str) -> Result<()> {
        if self.phase == Phase::Selections {
            Ok(())
        } else {
            Err(ConfigError::Misplaced(directive).into())
        }
    }

    fn require_preamble(&self, directive: &'static str) -> Result<()> {
        if self.phase == Phase::Preamble {
            Ok(())
        } else {
            Err(ConfigError::Misplaced(directive).into())
        }
    }

    /// Handles `source DIR`; a source tree given by the caller wins.
    pub fn on_source(&mut self, dir: Sym) -> bool {
        self.statement(|s| {
            s.require_preamble("source")?;
            if s.options.srcdir.is_none() {
                s.settings.get_mut().srcdir = Some(dir);
            }
            Ok(())
        })
        .is_some()
    }

    /// Handles `build DIR`; a build directory given by the caller wins.
    pub fn on_build(&mut self, dir: Sym) -> bool {
        self.statement(|s| {
            s.require_preamble("build")?;
            if s.options.builddir.is_none() {
                s.settings.get_mut().builddir = Some(dir);
            }
            Ok(())
        })
        .is_some()
    }

    /// Handles `machine NAME [ARCH [SUBARCH …]]` and opens the definitions
    /// section. Every machine name becomes a defined attribute so that
    /// `file` conditions can test it.
    pub fn on_machine(&mut self, name: Sym, arch: Option<Sym>, subarches: &[Sym]) -> bool {
        let ok = self
            .statement(|s| {
                s.require_preamble("machine")?;
                for &n in core::iter::once(&name).chain(arch.iter()).chain(subarches) {
                    s.define_attribute(n, None, &[])?;
                    s.select_attr(n)?;
                }
                let settings = s.settings.get_mut();
                settings.machine = Some(name);
                settings.machine_arch = arch;
                settings.subarches = subarches.to_vec();
                Ok(())
            })
            .is_some();
        if ok {
            self.phase = Phase::Definitions;
        }
        ok
    }

    /// Handles `ioconf NAME`: generate only the device tables, with no
    /// machine definitions to read.
    pub fn on_ioconf(&mut self, name: Sym) -> bool {
        let ok = self
            .statement(|s| {
                s.require_preamble("ioconf")?;
                s.settings.get_mut().ioconf = Some(name);
                Ok(())
            })
            .is_some();
        if ok {
            self.phase = Phase::Definitions;
        }
        ok
    }

    /// Handles `version N`.
    pub fn on_version(&mut self, version: i64) -> bool {
        self.statement(|s| {
            let (min, max) = (s.options.min_version, s.options.max_version);
            let found = u32::try_from(version)
                .ok()
                .filter(|v| (min..=max).contains(v))
                .ok_or(ConfigError::BadVersion {
                    found: version,
                    min,
                    max,
                })?;
            s.settings.get_mut().version = Some(found);
            Ok(())
        })
        .is_some()
    }

    /// Handles `define NAME [{ locators }] [: deps]`.
    pub fn on_define_attribute(
        &mut self,
        name: Sym,
        locators: Option<Vec<LocatorSpec>>,
        deps: &[Sym],
    ) -> bool {
        self.statement(|s| {
            s.require_definitions("define")?;
            s.define_attribute(name, locators, deps)
        })
        .is_some()
    }

    /// Handles `devclass NAME`.
    pub fn on_define_devclass(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_definitions("devclass")?;
            s.define_devclass(name)
        })
        .is_some()
    }

    /// Handles `device`, `defpseudo` and `defpseudodev`.
    pub fn on_define_device(
        &mut self,
        name: Sym,
        kind: DeviceKind,
        locators: Option<Vec<LocatorSpec>>,
        attrs: &[Sym],
    ) -> bool {
        self.statement(|s| {
            s.require_definitions("device")?;
            s.define_device(name, kind, locators, attrs)
        })
        .is_some()
    }

    /// Handles `attach DEVICE at SITES [with NAME] [: attrs]`.
    pub fn on_define_attachment(
        &mut self,
        device: Sym,
        sites: &[AtSite],
        with: Option<Sym>,
        attrs: &[Sym],
    ) -> bool {
        self.statement(|s| {
            s.require_definitions("attach")?;
            s.define_attachment(with, device, sites, attrs)
        })
        .is_some()
    }

    /// Handles `defopt`, `defflag`, `defparam` and their `obsolete` forms.
    pub fn on_define_options(
        &mut self,
        kind: OptionKind,
        file: Option<Sym>,
        opts: &[DefOpt],
        deps: &[Sym],
        obsolete: bool,
    ) -> bool {
        self.statement(|s| {
            s.require_definitions(kind.directive())?;
            s.define_options(kind, file, opts, deps, obsolete)
        })
        .is_some()
    }

    /// Handles `deffs NAME … [: deps]`.
    pub fn on_define_filesystems(&mut self, names: &[Sym], deps: &[Sym]) -> bool {
        self.statement(|s| {
            s.require_definitions("deffs")?;
            s.define_filesystems(names, deps)
        })
        .is_some()
    }

    /// Handles `file PATH [cond] [flags] [compile-with RULE]`.
    pub fn on_define_file(
        &mut self,
        path: Sym,
        cond: Option<CondExpr>,
        flags: FileFlags,
        rule: Option<Sym>,
    ) -> bool {
        self.statement(|s| {
            s.require_definitions("file")?;
            s.add_file(path, cond, flags, rule)
        })
        .is_some()
    }

    /// Handles `object PATH [cond] [flags]`.
    pub fn on_define_object(&mut self, path: Sym, cond: Option<CondExpr>, flags: FileFlags) -> bool {
        self.statement(|s| {
            s.require_definitions("object")?;
            s.add_object(path, cond, flags)
        })
        .is_some()
    }

    /// Handles `device-major NAME [char N] [block N] [cond] [devnodes]`.
    pub fn on_define_device_major(
        &mut self,
        name: Sym,
        char_major: Option<i64>,
        block_major: Option<i64>,
        cond: Option<CondExpr>,
        nodes: Option<DevNodes>,
    ) -> bool {
        self.statement(|s| {
            s.require_definitions("device-major")?;
            s.add_devm(name, char_major, block_major, cond, nodes)
        })
        .is_some()
    }

    /// Handles `prefix [PATH]`; no path pops the innermost prefix.
    pub fn on_prefix(&mut self, path: Option<Sym>) -> bool {
        self.statement(|s| {
            s.require_definitions("prefix")?;
            s.push_or_pop_prefix(path, false)
        })
        .is_some()
    }

    /// Handles `buildprefix [PATH]`.
    pub fn on_build_prefix(&mut self, path: Option<Sym>) -> bool {
        self.statement(|s| {
            s.require_definitions("buildprefix")?;
            s.push_or_pop_prefix(path, true)
        })
        .is_some()
    }

    /// Handles `maxpartitions N`.
    pub fn on_define_maxpartitions(&mut self, count: i64) -> bool {
        self.statement(|s| {
            s.require_definitions("maxpartitions")?;
            if s.settings().maxpartitions.is_some() {
                return Err(ConfigError::AlreadySpecified("maxpartitions").into());
            }
            let count = u32::try_from(count)
                .ok()
                .filter(|&n| (1..=26).contains(&n))
                .ok_or(ConfigError::OutOfRange {
                    what: "maxpartitions",
                    value: count,
                })?;
            s.settings.get_mut().maxpartitions = Some(count);
            Ok(())
        })
        .is_some()
    }

    /// Handles the `maxusers MIN DEFAULT MAX` definition.
    pub fn on_define_maxusers(&mut self, min: i64, default: i64, max: i64) -> bool {
        self.statement(|s| {
            s.require_definitions("maxusers")?;
            if s.settings().maxusers_bounds.is_some() {
                return Err(ConfigError::AlreadySpecified("maxusers bounds").into());
            }
            let bad = || ConfigError::BadMaxusersDefaults { min, default, max };
            let to_u32 = |v: i64| u32::try_from(v).map_err(|_| bad());
            let bounds = MaxusersBounds {
                min: to_u32(min)?,
                default: to_u32(default)?,
                max: to_u32(max)?,
            };
            if bounds.min < 1 || bounds.min > bounds.default || bounds.default > bounds.max {
                return Err(bad().into());
            }
            s.settings.get_mut().maxusers_bounds = Some(bounds);
            Ok(())
        })
        .is_some()
    }

    /// Handles the conditional `makeoptions COND NAME=VALUE, …` definition.
    pub fn on_define_makeoptions(&mut self, options: Vec<CondMkOption>) -> bool {
        self.statement(|s| {
            s.require_definitions("makeoptions")?;
            for option in options {
                s.registry.cond_mk_options.alloc(option);
            }
            Ok(())
        })
        .is_some()
    }

    /// Handles `major { NAME = N … }`.
    pub fn on_define_majors(&mut self, majors: &[(Sym, i64)]) -> bool {
        self.statement(|s| {
            s.require_definitions("major")?;
            let mut errors = Errors::new();
            for &(name, major) in majors {
                if let Err(e) = s.set_major(name, major) {
                    errors.absorb(e);
                }
            }
            errors.into_result(())
        })
        .is_some()
    }

    /// Handles `select NAME`.
    pub fn on_select_attribute(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_selections("select")?;
            s.select_attr(name)
        })
        .is_some()
    }

    /// Handles `no select NAME`.
    pub fn on_select_no_attribute(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_selections("no select")?;
            s.deselect_attr(name)
        })
        .is_some()
    }

    /// Handles `file-system NAME`.
    pub fn on_select_file_system(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_selections("file-system")?;
            s.add_fs_option(name)
        })
        .is_some()
    }

    /// Handles `no file-system NAME`.
    pub fn on_select_no_file_system(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_selections("no file-system")?;
            s.del_fs_option(name)
        })
        .is_some()
    }

    /// Handles `makeoptions NAME=VALUE` and `makeoptions NAME+=VALUE`.
    pub fn on_select_makeoption(&mut self, name: Sym, value: Sym, append: bool) -> bool {
        self.statement(|s| {
            s.require_selections("makeoptions")?;
            if append {
                s.append_mk_option(name, value);
            } else {
                s.add_mk_option(name, value);
            }
            Ok(())
        })
        .is_some()
    }

    /// Handles `no makeoptions NAME`.
    pub fn on_select_no_makeoption(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_selections("no makeoptions")?;
            s.del_mk_option(name)
        })
        .is_some()
    }

    /// Handles `options NAME[=VALUE]`.
    pub fn on_select_option(&mut self, name: Sym, value: Option<Sym>) -> bool {
        self.statement(|s| {
            s.require_selections("options")?;
            s.add_option(name, value)
        })
        .is_some()
    }

    /// Handles `no options NAME`.
    pub fn on_select_no_option(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_selections("no options")?;
            s.del_option(name)
        })
        .is_some()
    }

    /// Handles the `maxusers N` selection.
    pub fn on_select_maxusers(&mut self, value: i64) -> bool {
        self.statement(|s| {
            s.require_selections("maxusers")?;
            s.set_maxusers(value)
        })
        .is_some()
    }

    /// Handles `ident NAME` and `no ident`.
    pub fn on_select_ident(&mut self, ident: Option<Sym>) -> bool {
        self.statement(|s| {
            s.require_selections("ident")?;
            s.settings.get_mut().ident = ident;
            Ok(())
        })
        .is_some()
    }

    /// Handles `config NAME root on DEV [type FS] [dumps on DEV]`.
    pub fn on_add_config(
        &mut self,
        name: Sym,
        root: DevSpec,
        fstype: Option<Sym>,
        dumps: &[DevSpec],
    ) -> bool {
        self.statement(|s| {
            s.require_selections("config")?;
            s.add_config(name, root, fstype, dumps)
        })
        .is_some()
    }

    /// Handles `no config NAME`.
    pub fn on_select_no_config(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_selections("no config")?;
            s.del_config(name)
        })
        .is_some()
    }

    /// Handles `pseudo-device NAME [COUNT]`.
    pub fn on_add_pseudo_device(&mut self, name: Sym, count: i64) -> bool {
        self.statement(|s| {
            s.require_selections("pseudo-device")?;
            s.add_pseudo(name, count)
        })
        .is_some()
    }

    /// Handles `no pseudo-device NAME`.
    pub fn on_select_no_pseudo_device(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_selections("no pseudo-device")?;
            s.del_pseudo(name)
        })
        .is_some()
    }

    /// Handles `NAME at PARENT [locators] [flags N]` and `NAME at root`.
    pub fn on_add_device_instance(
        &mut self,
        name: Sym,
        at: Option<Sym>,
        locators: &[LocatorBinding],
        flags: i64,
    ) -> bool {
        self.statement(|s| {
            s.require_selections("device instance")?;
            s.add_instance(name, at, locators, flags).map(|_| ())
        })
        .is_some()
    }

    /// Handles `no NAME`.
    pub fn on_select_no_device_instance(&mut self, name: Sym) -> bool {
        self.statement(|s| {
            s.require_selections("no device instance")?;
            s.del_instance(name)
        })
        .is_some()
    }

    /// Handles `no NAME at PARENT`.
    pub fn on_select_no_device_instance_at(&mut self, name: Sym, at: Option<Sym>) -> bool {
        self.statement(|s| {
            s.require_selections("no device instance")?;
            s.del_instance_at(name, at)
        })
        .is_some()
    }

    /// Handles `no device at PARENT`.
    pub fn on_select_no_device_at(&mut self, at: Option<Sym>) -> bool {
        self.statement(|s| {
            s.require_selections("no device at")?;
            s.del_instances_at(at)
        })
        .is_some()
    }

    /// Records a directive the parser could not make sense of.
    ///
    /// The parser rejects a directive before any of it reaches the model,
    /// so there is nothing to roll back.
    pub fn on_syntax_error(&mut self, message: impl Into<String>) {
        assert!(!self.open, "syntax error inside a statement transaction");
        self.report(ConfigError::Syntax(message.into()));
    }

    /// Closes the definitions section.
    ///
    /// Returns `false` when the definitions are too broken to go on with
    /// the selections.
    pub fn on_end_of_definitions(&mut self) -> bool {
        let before = self.diag.error_count();
        let undefined: Vec<ConfigError> = self
            .graph
            .bases()
            .filter(|(_, b)| !b.defined)
            .map(|(_, b)| ("device", b.name))
            .chain(
                self.graph
                    .attrs()
                    .filter(|(_, a)| !a.defined)
                    .map(|(_, a)| ("attribute", a.name)),
            )
            .map(|(what, name)| ConfigError::UsedNotDefined {
                what,
                name: name.to_string(),
            })
            .collect();
        for error in undefined {
            self.report(error);
        }
        if self.phase == Phase::Preamble {
            self.report(ConfigError::NoMachine);
        } else if self.settings().maxpartitions.is_none() && self.settings().ioconf.is_none() {
            self.report(ConfigError::NoMaxpartitions);
        }
        self.phase = Phase::Selections;
        log::debug!(
            "end of definitions: {} attributes, {} device bases",
            self.graph.attrs.len(),
            self.graph.bases.len()
        );
        self.diag.error_count() == before
    }

    /// Closes the selections section and runs all whole-configuration
    /// passes. Returns `true` if the run recorded no error at all.
    pub fn on_end_of_selections(&mut self) -> bool {
        if self.phase < Phase::Selections {
            self.on_end_of_definitions();
        }
        self.finish();
        self.phase = Phase::Finished;
        !self.diag.has_errors()
    }
}
