//! Name tables for everything that is not part of the device graph.

use crate::config::Config;
use crate::files::{Devm, FileSpec};
use crate::option::{MkOption, OptionDef, Selection};
use crate::symbol::Sym;
use crate::txn::{Arena, Id, Table, Transactional};
use crate::value::CondMkOption;

pub type FileId = Id<FileSpec>;
pub type DevmId = Id<Devm>;

/// Options, file systems, make options, files, majors and configurations.
#[derive(Debug, Default)]
pub struct Registry {
    /// Declared options and file systems by name.
    pub(crate) option_defs: Table<Sym, OptionDef>,
    /// Header file to the options it declares, in declaration order.
    pub(crate) option_files: Table<Sym, Vec<Sym>>,
    pub(crate) options: Table<Sym, Selection>,
    pub(crate) fs_options: Table<Sym, Selection>,
    pub(crate) mk_options: Table<Sym, MkOption>,
    pub(crate) cond_mk_options: Arena<CondMkOption>,
    /// Lower-case names that `file` conditions test against.
    pub(crate) selected: Table<Sym, ()>,
    pub(crate) files: Arena<FileSpec>,
    pub(crate) file_paths: Table<Sym, FileId>,
    pub(crate) devms: Arena<Devm>,
    pub(crate) configs: Table<Sym, Config>,
    /// Bases that may have `*` instances.
    pub(crate) needs_count: Table<Sym, ()>,
}

impl Transactional for Registry {
    fn begin(&mut self) {
        self.option_defs.begin();
        self.option_files.begin();
        self.options.begin();
        self.fs_options.begin();
        self.mk_options.begin();
        self.cond_mk_options.begin();
        self.selected.begin();
        self.files.begin();
        self.file_paths.begin();
        self.devms.begin();
        self.configs.begin();
        self.needs_count.begin();
    }

    fn commit(&mut self) {
        self.option_defs.commit();
        self.option_files.commit();
        self.options.commit();
        self.fs_options.commit();
        self.mk_options.commit();
        self.cond_mk_options.commit();
        self.selected.commit();
        self.files.commit();
        self.file_paths.commit();
        self.devms.commit();
        self.configs.commit();
        self.needs_count.commit();
    }

    fn rollback(&mut self) {
        self.option_defs.rollback();
        self.option_files.rollback();
        self.options.rollback();
        self.fs_options.rollback();
        self.mk_options.rollback();
        self.cond_mk_options.rollback();
        self.selected.rollback();
        self.files.rollback();
        self.file_paths.rollback();
        self.devms.rollback();
        self.configs.rollback();
        self.needs_count.rollback();
    }
}

impl Registry {
    #[must_use]
    pub fn option_def(&self, name: Sym) -> Option<&OptionDef> {
        self.option_defs.get(&name)
    }

    pub fn option_defs(&self) -> impl Iterator<Item = &OptionDef> {
        self.option_defs.values()
    }

    /// Selected options in selection order.
    pub fn options(&self) -> impl Iterator<Item = &Selection> {
        self.options.values()
    }

    /// Selected file systems in selection order.
    pub fn file_systems(&self) -> impl Iterator<Item = &Selection> {
        self.fs_options.values()
    }

    #[must_use]
    pub fn option(&self, name: Sym) -> Option<&Selection> {
        self.options.get(&name)
    }

    pub fn make_options(&self) -> impl Iterator<Item = (Sym, &MkOption)> {
        self.mk_options.iter().map(|(&name, option)| (name, option))
    }

    pub fn cond_make_options(&self) -> impl Iterator<Item = &CondMkOption> {
        self.cond_mk_options.iter().map(|(_, option)| option)
    }

    /// Whether the lower-case `name` is in the selected set.
    #[must_use]
    pub fn is_selected(&self, name: Sym) -> bool {
        self.selected.contains_key(&name)
    }

    pub fn selected(&self) -> impl Iterator<Item = Sym> + '_ {
        self.selected.keys().copied()
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileSpec)> {
        self.files.iter()
    }

    #[must_use]
    pub fn file(&self, path: Sym) -> Option<&FileSpec> {
        self.file_paths.get(&path).map(|&id| &self.files[id])
    }

    pub fn devms(&self) -> impl Iterator<Item = (DevmId, &Devm)> {
        self.devms.iter()
    }

    pub fn configs(&self) -> impl Iterator<Item = &Config> {
        self.configs.values()
    }

    #[must_use]
    pub fn config(&self, name: Sym) -> Option<&Config> {
        self.configs.get(&name)
    }

    #[must_use]
    pub fn allows_star(&self, base: Sym) -> bool {
        self.needs_count.contains_key(&base)
    }
}
