//! One parsed line of configuration input.

use config_model::{
    AtSite, CondExpr, CondMkOption, DefOpt, DevNodes, DevSpec, DeviceKind, FileFlags,
    LocatorBinding, LocatorSpec, OptionKind, Sym,
};

/// A top-level statement.
///
/// Directives that take a list (`options A, B`) keep the list; the front
/// end applies each element as a statement of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `include "path"`, or `cinclude "path"` when `optional`.
    Include { path: Sym, optional: bool },
    Source(Sym),
    Build(Sym),
    Machine {
        name: Sym,
        arch: Option<Sym>,
        subarches: Vec<Sym>,
    },
    Ioconf(Sym),
    Version(i64),

    Define {
        name: Sym,
        locators: Option<Vec<LocatorSpec>>,
        deps: Vec<Sym>,
    },
    DevClass(Sym),
    Device {
        name: Sym,
        kind: DeviceKind,
        locators: Option<Vec<LocatorSpec>>,
        attrs: Vec<Sym>,
    },
    Attach {
        device: Sym,
        sites: Vec<AtSite>,
        with: Option<Sym>,
        attrs: Vec<Sym>,
    },
    DefOptions {
        kind: OptionKind,
        file: Option<Sym>,
        opts: Vec<DefOpt>,
        deps: Vec<Sym>,
        obsolete: bool,
    },
    DefFs {
        names: Vec<Sym>,
        deps: Vec<Sym>,
    },
    File {
        path: Sym,
        cond: Option<CondExpr>,
        flags: FileFlags,
        rule: Option<Sym>,
    },
    Object {
        path: Sym,
        cond: Option<CondExpr>,
        flags: FileFlags,
    },
    DeviceMajor {
        name: Sym,
        char_major: Option<i64>,
        block_major: Option<i64>,
        cond: Option<CondExpr>,
        nodes: Option<DevNodes>,
    },
    /// `prefix [path]`; no path pops.
    Prefix(Option<Sym>),
    BuildPrefix(Option<Sym>),
    MaxPartitions(i64),
    DefMaxusers {
        min: i64,
        default: i64,
        max: i64,
    },
    DefMakeoptions(Vec<CondMkOption>),
    Majors(Vec<(Sym, i64)>),

    Select(Sym),
    NoSelect(Sym),
    FileSystems(Vec<Sym>),
    NoFileSystems(Vec<Sym>),
    /// `(name, value, append)` triples.
    MakeOptions(Vec<(Sym, Sym, bool)>),
    NoMakeOptions(Vec<Sym>),
    Options(Vec<(Sym, Option<Sym>)>),
    NoOptions(Vec<Sym>),
    Maxusers(i64),
    /// `ident NAME`, or `no ident`.
    Ident(Option<Sym>),
    Config {
        name: Sym,
        root: DevSpec,
        fstype: Option<Sym>,
        dumps: Vec<DevSpec>,
    },
    NoConfig(Sym),
    PseudoDevice {
        name: Sym,
        count: i64,
    },
    NoPseudoDevice(Sym),
    Instance {
        name: Sym,
        at: Option<Sym>,
        locators: Vec<LocatorBinding>,
        flags: i64,
    },
    /// `no NAME`.
    NoInstance(Sym),
    /// `no NAME at PARENT`; `None` is root.
    NoInstanceAt { name: Sym, at: Option<Sym> },
    /// `no device at PARENT`.
    NoDeviceAt(Option<Sym>),
}

/// A parsed item and the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<T> {
    pub line: u32,
    pub item: T,
}
