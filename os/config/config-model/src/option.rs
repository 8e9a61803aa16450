//! Option, file system and make option registries.
//!
//! Declarations (`defopt`, `defflag`, `defparam`, `deffs`) describe which
//! options exist, which header file announces them and what they depend on.
//! Selections (`options`, `file-system`, `makeoptions`) pick from them.
//! Selecting an option also puts its lower-case name into the selected set
//! that `file` conditions are evaluated against.

use crate::error::{ConfigError, Errors, Result};
use crate::session::Session;
use crate::symbol::Sym;
use crate::value::{DefOpt, OptionKind};
use crate::Location;
use std::collections::HashSet;

/// A declared option or file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDef {
    pub name: Sym,
    pub kind: OptionKind,
    /// Default value.
    pub value: Option<Sym>,
    /// Value used instead of the default when generating for lint.
    pub lint_value: Option<Sym>,
    /// Options and plain attributes pulled in by selecting this one.
    pub deps: Vec<Sym>,
    /// Header file announcing the option; `None` for file systems and
    /// obsolete options.
    pub file: Option<Sym>,
    pub obsolete: bool,
    pub location: Location,
}

/// A selected option or file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: Sym,
    pub value: Option<Sym>,
    pub location: Location,
}

/// A selected make option: a base value and `+=` additions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MkOption {
    pub value: Option<Sym>,
    pub appends: Vec<Sym>,
}

impl Session {
    fn check_option_dep(&self, owner: Sym, dep: Sym) -> core::result::Result<(), ConfigError> {
        if self.registry.option_defs.contains_key(&dep) {
            return Ok(());
        }
        match self.graph.find_attr(dep).map(|id| self.graph.attr(id)) {
            Some(attr) if attr.defined && attr.is_interface() => Err(ConfigError::BadDependency {
                name: owner.to_string(),
                dep: dep.to_string(),
            }),
            Some(attr) if attr.defined => Ok(()),
            _ => Err(ConfigError::unknown("option or attribute", dep)),
        }
    }

    fn default_option_file(&mut self, name: Sym) -> Sym {
        let file = format!("opt_{}.h", name.as_str().to_ascii_lowercase());
        self.names.intern(&file)
    }

    /// Declares options of one kind.
    ///
    /// Without a `file`, each option gets its own `opt_<name>.h`. Obsolete
    /// options get no header at all.
    ///
    /// # Errors
    /// - [`ConfigError::DuplicateDefinition`] for a name declared before.
    /// - [`ConfigError::ValueForbidden`] for a flag with a default.
    /// - [`ConfigError::BadDependency`] for an interface attribute
    ///   dependency, [`ConfigError::UnknownName`] for an unknown one.
    pub fn define_options(
        &mut self,
        kind: OptionKind,
        file: Option<Sym>,
        opts: &[DefOpt],
        deps: &[Sym],
        obsolete: bool,
    ) -> Result<()> {
        let mut errors = Errors::new();
        for opt in opts {
            if let Some(existing) = self.registry.option_defs.get(&opt.name) {
                log::debug!(
                    "`{}` was declared by {} at {}",
                    opt.name,
                    existing.kind.directive(),
                    existing.location
                );
                errors.push(ConfigError::duplicate("option", opt.name));
                continue;
            }
            if kind == OptionKind::Flag && (opt.value.is_some() || opt.lint_value.is_some()) {
                errors.push(ConfigError::ValueForbidden(opt.name.to_string()));
                continue;
            }
            for &dep in deps {
                if let Err(e) = self.check_option_dep(opt.name, dep) {
                    errors.push(e);
                }
            }
            let header = match (obsolete, file) {
                (true, _) => None,
                (false, Some(file)) => Some(file),
                (false, None) => Some(self.default_option_file(opt.name)),
            };
            self.registry.option_defs.insert(
                opt.name,
                OptionDef {
                    name: opt.name,
                    kind,
                    value: opt.value,
                    lint_value: opt.lint_value,
                    deps: deps.to_vec(),
                    file: header,
                    obsolete,
                    location: self.location,
                },
            );
            if let Some(header) = header {
                if let Some(list) = self.registry.option_files.get_mut(&header) {
                    list.push(opt.name);
                } else {
                    self.registry.option_files.insert(header, vec![opt.name]);
                }
            }
            log::trace!("{} `{}` declared", kind.directive(), opt.name);
        }
        errors.into_result(())
    }

    /// Declares file systems.
    ///
    /// # Errors
    /// As [`Session::define_options`].
    pub fn define_filesystems(&mut self, names: &[Sym], deps: &[Sym]) -> Result<()> {
        let mut errors = Errors::new();
        for &name in names {
            if self.registry.option_defs.contains_key(&name) {
                errors.push(ConfigError::duplicate("file system", name));
                continue;
            }
            for &dep in deps {
                if let Err(e) = self.check_option_dep(name, dep) {
                    errors.push(e);
                }
            }
            self.registry.option_defs.insert(
                name,
                OptionDef {
                    name,
                    kind: OptionKind::FileSystem,
                    value: None,
                    lint_value: None,
                    deps: deps.to_vec(),
                    file: None,
                    obsolete: false,
                    location: self.location,
                },
            );
        }
        errors.into_result(())
    }

    /// Finds a declared file system, ignoring case.
    pub(crate) fn find_file_system(&self, name: Sym) -> Option<Sym> {
        self.registry
            .option_defs
            .values()
            .find(|d| d.kind == OptionKind::FileSystem && d.name.as_str().eq_ignore_ascii_case(name.as_str()))
            .map(|d| d.name)
    }

    fn mark_selected(&mut self, name: Sym) {
        let lower = self.names.lowercase(name);
        self.registry.selected.insert(lower, ());
    }

    fn unmark_selected(&mut self, name: Sym) {
        let lower = self.names.lowercase(name);
        self.registry.selected.remove(&lower);
    }

    /// Selects an option.
    ///
    /// Obsolete options are ignored with a warning, and so is selecting an
    /// option twice; the first selection stays.
    ///
    /// # Errors
    /// - [`ConfigError::IsFileSystem`] for a declared file system.
    /// - [`ConfigError::ValueRequired`] for a `defparam` without value.
    /// - [`ConfigError::ValueForbidden`] for a `defflag` with a value.
    pub fn add_option(&mut self, name: Sym, value: Option<Sym>) -> Result<()> {
        match self.registry.option_defs.get(&name) {
            Some(def) if def.obsolete => {
                self.warn(format!("obsolete option `{name}` will be ignored"));
                return Ok(());
            }
            Some(def) if def.kind == OptionKind::FileSystem => {
                return Err(ConfigError::IsFileSystem(name.to_string()).into());
            }
            Some(def) if def.kind == OptionKind::Param && value.is_none() => {
                return Err(ConfigError::ValueRequired(name.to_string()).into());
            }
            Some(def) if def.kind == OptionKind::Flag && value.is_some() => {
                return Err(ConfigError::ValueForbidden(name.to_string()).into());
            }
            Some(_) => {}
            None if self.options.verbose => self.warn(format!("undeclared option `{name}` added")),
            None => {}
        }
        if self.registry.options.contains_key(&name) {
            self.warn(format!("already have options `{name}`"));
            return Ok(());
        }
        self.registry.options.insert(
            name,
            Selection {
                name,
                value,
                location: self.location,
            },
        );
        self.mark_selected(name);
        Ok(())
    }

    /// Removes a selected option.
    ///
    /// # Errors
    /// [`ConfigError::UnknownName`] if the option is not selected.
    pub fn del_option(&mut self, name: Sym) -> Result<()> {
        self.registry
            .options
            .remove(&name)
            .ok_or_else(|| ConfigError::unknown("option", name))?;
        self.unmark_selected(name);
        Ok(())
    }

    /// Selects a file system.
    ///
    /// # Errors
    /// [`ConfigError::NotFileSystem`] unless `name` is a declared file system.
    pub fn add_fs_option(&mut self, name: Sym) -> Result<()> {
        let declared = self
            .registry
            .option_defs
            .get(&name)
            .is_some_and(|d| d.kind == OptionKind::FileSystem);
        if !declared {
            return Err(ConfigError::NotFileSystem(name.to_string()).into());
        }
        if self.registry.fs_options.contains_key(&name) {
            self.warn(format!("already have file-system `{name}`"));
            return Ok(());
        }
        self.registry.fs_options.insert(
            name,
            Selection {
                name,
                value: None,
                location: self.location,
            },
        );
        self.mark_selected(name);
        Ok(())
    }

    /// Removes a selected file system.
    ///
    /// # Errors
    /// [`ConfigError::UnknownName`] if the file system is not selected.
    pub fn del_fs_option(&mut self, name: Sym) -> Result<()> {
        self.registry
            .fs_options
            .remove(&name)
            .ok_or_else(|| ConfigError::unknown("file-system", name))?;
        self.unmark_selected(name);
        Ok(())
    }

    /// `makeoptions NAME=VALUE`: replaces any earlier value.
    pub fn add_mk_option(&mut self, name: Sym, value: Sym) {
        if self.registry.mk_options.contains_key(&name) {
            self.warn(format!("replacing makeoptions `{name}`"));
        }
        self.registry.mk_options.insert(
            name,
            MkOption {
                value: Some(value),
                appends: Vec::new(),
            },
        );
    }

    /// `makeoptions NAME+=VALUE`.
    pub fn append_mk_option(&mut self, name: Sym, value: Sym) {
        if let Some(option) = self.registry.mk_options.get_mut(&name) {
            option.appends.push(value);
        } else {
            self.registry.mk_options.insert(
                name,
                MkOption {
                    value: None,
                    appends: vec![value],
                },
            );
        }
    }

    /// # Errors
    /// [`ConfigError::UnknownName`] if the make option is not set.
    pub fn del_mk_option(&mut self, name: Sym) -> Result<()> {
        self.registry
            .mk_options
            .remove(&name)
            .map(|_| ())
            .ok_or_else(|| ConfigError::unknown("makeoptions", name).into())
    }

    /// The `maxusers N` selection.
    ///
    /// # Errors
    /// - [`ConfigError::AlreadySpecified`] on a second `maxusers` line.
    /// - [`ConfigError::OutOfRange`] for a value below one.
    pub fn set_maxusers(&mut self, value: i64) -> Result<()> {
        if self.settings().maxusers.is_some() {
            return Err(ConfigError::AlreadySpecified("maxusers").into());
        }
        let value = u32::try_from(value)
            .ok()
            .filter(|&v| v >= 1)
            .ok_or(ConfigError::OutOfRange {
                what: "maxusers",
                value,
            })?;
        self.settings.get_mut().maxusers = Some(value);
        Ok(())
    }

    /// Adds the dependencies of every selected option and file system.
    ///
    /// Option dependencies are selected with their default value, attribute
    /// dependencies are expanded into the selected set. Each option is
    /// processed once no matter how often it is reached.
    pub(crate) fn close_option_dependencies(&mut self) {
        let mut pending: Vec<Sym> = self
            .registry
            .options
            .keys()
            .chain(self.registry.fs_options.keys())
            .copied()
            .collect();
        let mut done: HashSet<Sym> = HashSet::new();
        while let Some(name) = pending.pop() {
            if !done.insert(name) {
                continue;
            }
            let Some(def) = self.registry.option_defs.get(&name).cloned() else {
                continue;
            };
            for dep in def.deps {
                if let Some(dep_def) = self.registry.option_defs.get(&dep).cloned() {
                    if let Err(e) = self.select_dependency(&dep_def, def.location) {
                        self.diag.error(def.location, e);
                        continue;
                    }
                    pending.push(dep);
                } else if let Some(attr) = self.graph.find_attr(dep) {
                    if let Err(errors) = self.select_expansion(attr) {
                        for e in errors {
                            self.diag.error(def.location, e);
                        }
                    }
                }
            }
        }
    }

    fn select_dependency(&mut self, def: &OptionDef, location: Location) -> core::result::Result<(), ConfigError> {
        let table = match def.kind {
            OptionKind::FileSystem => &mut self.registry.fs_options,
            OptionKind::Option | OptionKind::Flag | OptionKind::Param => &mut self.registry.options,
        };
        if table.contains_key(&def.name) || def.obsolete {
            return Ok(());
        }
        if def.kind == OptionKind::Param && def.value.is_none() {
            return Err(ConfigError::ValueRequired(def.name.to_string()));
        }
        table.insert(
            def.name,
            Selection {
                name: def.name,
                value: def.value,
                location,
            },
        );
        self.mark_selected(def.name);
        log::debug!("option `{}` selected as a dependency", def.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ConfigError;
    use crate::session::Session;
    use crate::value::{DefOpt, OptionKind};

    fn selecting() -> Session {
        let mut s = Session::default();
        let m = s.intern("testmach");
        assert!(s.on_machine(m, None, &[]));
        assert!(s.on_define_maxpartitions(8));
        s
    }

    #[test]
    fn flag_rejects_value() {
        let mut s = selecting();
        let flag = s.intern("DIAGNOSTIC");
        let one = s.intern("1");
        assert!(s.on_define_options(OptionKind::Flag, None, &[DefOpt::plain(flag)], &[], false));
        assert!(s.on_end_of_definitions());
        assert!(!s.on_select_option(flag, Some(one)));
        assert!(matches!(
            s.diagnostics().errors().next(),
            Some(ConfigError::ValueForbidden(_))
        ));
        assert!(s.on_select_option(flag, None));
        let lower = s.intern("diagnostic");
        assert!(s.registry().is_selected(lower));
    }

    #[test]
    fn param_needs_value() {
        let mut s = selecting();
        let param = s.intern("NMBCLUSTERS");
        assert!(s.on_define_options(OptionKind::Param, None, &[DefOpt::plain(param)], &[], false));
        assert!(s.on_end_of_definitions());
        assert!(!s.on_select_option(param, None));
        assert!(matches!(
            s.diagnostics().errors().next(),
            Some(ConfigError::ValueRequired(_))
        ));
    }

    #[test]
    fn file_system_is_not_an_option() {
        let mut s = selecting();
        let ffs = s.intern("FFS");
        assert!(s.on_define_filesystems(&[ffs], &[]));
        assert!(s.on_end_of_definitions());
        assert!(!s.on_select_option(ffs, None));
        assert!(s.on_select_file_system(ffs));
        assert_eq!(s.registry().file_systems().count(), 1);
    }

    #[test]
    fn reselecting_warns_and_keeps_first() {
        let mut s = selecting();
        assert!(s.on_end_of_definitions());
        let opt = s.intern("HZ");
        let first = s.intern("100");
        let second = s.intern("1000");
        assert!(s.on_select_option(opt, Some(first)));
        assert!(s.on_select_option(opt, Some(second)));
        assert_eq!(s.registry().option(opt).and_then(|o| o.value), Some(first));
        assert_eq!(
            s.diagnostics().warnings().collect::<Vec<_>>(),
            ["already have options `HZ`"]
        );
    }

    #[test]
    fn obsolete_option_is_ignored() {
        let mut s = selecting();
        let old = s.intern("OLDOPT");
        assert!(s.on_define_options(OptionKind::Flag, None, &[DefOpt::plain(old)], &[], true));
        assert!(s.on_end_of_definitions());
        assert!(s.on_select_option(old, None));
        assert!(s.registry().option(old).is_none());
        assert_eq!(s.diagnostics().warnings().count(), 1);
    }

    #[test]
    fn default_header_is_per_option() {
        let mut s = selecting();
        let opt = s.intern("KTRACE");
        assert!(s.on_define_options(OptionKind::Flag, None, &[DefOpt::plain(opt)], &[], false));
        let header = s.registry().option_def(opt).and_then(|d| d.file);
        assert_eq!(header.map(|h| h.as_str()), Some("opt_ktrace.h"));
    }

    #[test]
    fn redeclaration_across_kinds_is_rejected() {
        let mut s = selecting();
        let opt = s.intern("MULTIPROCESSOR");
        assert!(s.on_define_options(OptionKind::Flag, None, &[DefOpt::plain(opt)], &[], false));
        assert!(!s.on_define_options(OptionKind::Param, None, &[DefOpt::plain(opt)], &[], false));
        assert_eq!(
            s.registry().option_def(opt).map(|d| d.kind),
            Some(OptionKind::Flag)
        );
    }

    #[test]
    fn makeoptions_replace_append_and_remove() {
        let mut s = selecting();
        assert!(s.on_end_of_definitions());
        let copts = s.intern("COPTS");
        let o2 = s.intern("-O2");
        let g = s.intern("-g");
        assert!(s.on_select_makeoption(copts, o2, false));
        assert!(s.on_select_makeoption(copts, g, true));
        let (_, option) = s.registry().make_options().next().unwrap();
        assert_eq!(option.value, Some(o2));
        assert_eq!(option.appends, [g]);
        assert!(s.on_select_no_makeoption(copts));
        assert!(!s.on_select_no_makeoption(copts));
    }

    #[test]
    fn maxusers_only_once() {
        let mut s = selecting();
        assert!(s.on_end_of_definitions());
        assert!(!s.on_select_maxusers(0));
        assert!(s.on_select_maxusers(32));
        assert!(!s.on_select_maxusers(64));
        assert_eq!(s.settings().maxusers, Some(32));
    }
}
