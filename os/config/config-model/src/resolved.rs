//! Read-only view of a finished session for the code generators.

use crate::config::Config;
use crate::files::{Devm, FileSpec};
use crate::graph::{DevBaseId, PSpecId};
use crate::session::{Phase, Session, Settings};
use crate::symbol::Sym;
use crate::value::{CondMkOption, LocatorSpec, OptionKind, Unit};
use std::collections::HashMap;

/// One option line of an `opt_*.h` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderOption {
    pub name: Sym,
    /// `None` when the option is not selected.
    pub value: Option<OptionValue>,
    pub lint_value: Option<Sym>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OptionValue {
    /// Selected without a value.
    Set,
    Value(Sym),
}

/// An `opt_*.h` header and the options it announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionHeader {
    pub file: Sym,
    pub options: Vec<HeaderOption>,
}

/// A make variable: base value and additions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeVar {
    pub name: Sym,
    pub value: Option<Sym>,
    pub appends: Vec<Sym>,
}

/// A `<name>.h` count header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CountHeader {
    pub name: Sym,
    pub count: u32,
}

/// A parent spec that survived orphan elimination.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParentEntry {
    pub id: PSpecId,
    pub attr: Sym,
    pub parent: Option<Sym>,
    pub unit: Unit,
}

/// One row of the device configuration table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfEntry {
    pub name: Sym,
    pub base: Sym,
    pub attachment: Sym,
    pub unit: Unit,
    pub locators: Vec<Sym>,
    pub flags: i64,
    /// Index into [`Resolved::parents`]; `None` for root.
    pub parent: Option<usize>,
}

/// An interface attribute and its locator list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub name: Sym,
    pub locators: Vec<LocatorSpec>,
}

/// The device switch: selected majors and table sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSwitch<'a> {
    pub entries: Vec<&'a Devm>,
    /// One past the highest character major, `0` when there is none.
    pub char_len: u32,
    pub block_len: u32,
}

/// Answers what the generators need to know about a finished session.
#[derive(Debug, Copy, Clone)]
pub struct Resolved<'a> {
    session: &'a Session,
}

impl<'a> Resolved<'a> {
    /// Returns `None` until the selections were closed.
    #[must_use]
    pub fn new(session: &'a Session) -> Option<Self> {
        (session.phase() == Phase::Finished).then_some(Self { session })
    }

    #[must_use]
    pub const fn session(&self) -> &'a Session {
        self.session
    }

    #[must_use]
    pub const fn settings(&self) -> &'a Settings {
        self.session.settings()
    }

    /// Files that are part of the build, in declaration order.
    pub fn files(&self) -> impl Iterator<Item = &'a FileSpec> + 'a {
        self.session.registry().files().map(|(_, f)| f).filter(|f| f.selected)
    }

    /// Every declared header file with the state of each of its options.
    #[must_use]
    pub fn option_headers(&self) -> Vec<OptionHeader> {
        let registry = self.session.registry();
        registry
            .option_files
            .iter()
            .map(|(&file, names)| OptionHeader {
                file,
                options: names
                    .iter()
                    .filter_map(|&name| registry.option_def(name))
                    .map(|def| HeaderOption {
                        name: def.name,
                        value: registry
                            .option(def.name)
                            .map(|s| s.value.map_or(OptionValue::Set, OptionValue::Value)),
                        lint_value: def.lint_value,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Options passed to the compiler on the command line: selected options
    /// nobody declared, and selected file systems.
    #[must_use]
    pub fn command_line_options(&self) -> Vec<(Sym, Option<Sym>)> {
        let registry = self.session.registry();
        registry
            .options()
            .filter(|s| registry.option_def(s.name).is_none())
            .chain(registry.file_systems().filter(|s| {
                registry
                    .option_def(s.name)
                    .is_some_and(|d| d.kind == OptionKind::FileSystem)
            }))
            .map(|s| (s.name, s.value))
            .collect()
    }

    /// Make variables, conditional ones only when their condition holds.
    #[must_use]
    pub fn make_vars(&self) -> Vec<MakeVar> {
        let registry = self.session.registry();
        let mut vars: Vec<MakeVar> = registry
            .make_options()
            .map(|(name, option)| MakeVar {
                name,
                value: option.value,
                appends: option.appends.clone(),
            })
            .collect();
        for CondMkOption { cond, name, value } in registry.cond_make_options() {
            if !self.session.cond_holds(Some(cond)) {
                continue;
            }
            if let Some(var) = vars.iter_mut().find(|v| v.name == *name) {
                var.appends.push(*value);
            } else {
                vars.push(MakeVar {
                    name: *name,
                    value: None,
                    appends: vec![*value],
                });
            }
        }
        vars
    }

    /// Selected device majors and the switch table sizes.
    #[must_use]
    pub fn device_switch(&self) -> DeviceSwitch<'a> {
        let entries: Vec<&Devm> = self
            .session
            .registry()
            .devms()
            .map(|(_, d)| d)
            .filter(|d| d.selected)
            .collect();
        let len = |major: fn(&Devm) -> Option<u32>| {
            entries.iter().filter_map(|d| major(d)).max().map_or(0, |m| m + 1)
        };
        DeviceSwitch {
            char_len: len(|d| d.char_major),
            block_len: len(|d| d.block_major),
            entries,
        }
    }

    pub fn configs(&self) -> impl Iterator<Item = &'a Config> + 'a {
        self.session.registry().configs()
    }

    /// Attachment sites with at least one included instance.
    #[must_use]
    pub fn parents(&self) -> Vec<ParentEntry> {
        let graph = self.session.graph();
        graph
            .pspecs()
            .filter(|&(id, _)| self.session.pspec_in_use(id))
            .map(|(id, p)| ParentEntry {
                id,
                attr: graph.attr(p.attr).name,
                parent: p.parent.map(|b| graph.base(b).name),
                unit: p.unit,
            })
            .collect()
    }

    /// Included, non-pseudo instances in declaration order.
    #[must_use]
    pub fn cfdata(&self) -> Vec<CfEntry> {
        let graph = self.session.graph();
        let index: HashMap<PSpecId, usize> = self
            .parents()
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id, i))
            .collect();
        graph
            .devis()
            .map(|(_, d)| d)
            .filter(|d| d.is_included())
            .filter_map(|d| {
                let deva = graph.deva(d.deva?);
                Some(CfEntry {
                    name: d.name,
                    base: graph.base(d.base).name,
                    attachment: deva.name,
                    unit: d.unit,
                    locators: d.locators.clone(),
                    flags: d.flags,
                    parent: d.pspec.and_then(|p| index.get(&p).copied()),
                })
            })
            .collect()
    }

    /// Pseudo-devices with their unit counts.
    #[must_use]
    pub fn pseudo_devices(&self) -> Vec<(Sym, u32)> {
        let graph = self.session.graph();
        graph
            .devis()
            .map(|(_, d)| d)
            .filter(|d| d.is_included() && graph.base(d.base).kind.is_pseudo())
            .filter_map(|d| d.unit.number().map(|n| (d.name, n + 1)))
            .collect()
    }

    /// Count headers for every `needs-count` or `needs-flag` atom.
    ///
    /// A device counts one past its highest included unit, a `*` instance
    /// counting as one unit past the explicit ones. Anything else counts
    /// `1` when selected. `needs-flag` atoms are clamped to `0` or `1`.
    #[must_use]
    pub fn count_headers(&self) -> Vec<CountHeader> {
        let mut headers: Vec<(CountHeader, bool)> = Vec::new();
        for file in self.session.registry().files().map(|(_, f)| f) {
            if !(file.flags.needs_count || file.flags.needs_flag) {
                continue;
            }
            let Some(cond) = &file.cond else { continue };
            for atom in cond.atoms() {
                let count = self.count_of(atom);
                match headers.iter_mut().find(|(h, _)| h.name == atom) {
                    Some((_, counted)) => *counted |= file.flags.needs_count,
                    None => headers.push((CountHeader { name: atom, count }, file.flags.needs_count)),
                }
            }
        }
        headers
            .into_iter()
            .map(|(h, counted)| CountHeader {
                count: if counted { h.count } else { h.count.min(1) },
                ..h
            })
            .collect()
    }

    fn count_of(&self, atom: Sym) -> u32 {
        let graph = self.session.graph();
        match graph.find_base(atom) {
            Some(base) if graph.base(base).defined => self.unit_count(base),
            _ => u32::from(self.session.is_selected_name(atom)),
        }
    }

    fn unit_count(&self, base: DevBaseId) -> u32 {
        let graph = self.session.graph();
        let b = graph.base(base);
        b.instances
            .iter()
            .map(|&i| graph.devi(i))
            .filter(|d| d.is_included())
            .map(|d| match d.unit {
                Unit::Num(n) => n.saturating_add(1),
                Unit::Star => b.umax.saturating_add(1),
                Unit::Wild => 0,
            })
            .max()
            .unwrap_or(0)
    }

    /// Defined interface attributes in definition order.
    #[must_use]
    pub fn interfaces(&self) -> Vec<Interface> {
        self.session
            .graph()
            .attrs()
            .filter(|(_, a)| a.defined && a.is_interface())
            .map(|(_, a)| Interface {
                name: a.name,
                locators: a.locators().to_vec(),
            })
            .collect()
    }
}
