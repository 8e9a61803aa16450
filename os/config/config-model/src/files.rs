//! Source files, prebuilt objects and device majors.

use crate::cond::CondExpr;
use crate::error::{ConfigError, Result};
use crate::session::{MAX_MAJOR, Session};
use crate::symbol::Sym;
use crate::value::{DevNodes, FileFlags};
use crate::Location;
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileKind {
    /// Compiled from source.
    Source,
    /// Linked as is.
    Object,
}

/// A `file` or `object` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    /// Path with the innermost `prefix` applied.
    pub path: Sym,
    pub kind: FileKind,
    pub cond: Option<CondExpr>,
    pub flags: FileFlags,
    /// Custom `compile-with` rule.
    pub rule: Option<Sym>,
    /// Innermost `buildprefix` at the point of declaration.
    pub build_prefix: Option<Sym>,
    pub location: Location,
    /// Decided at the end of the run from the condition.
    pub selected: bool,
}

impl FileSpec {
    /// The last path component.
    #[must_use]
    pub fn tail(&self) -> &'static str {
        let path = self.path.as_str();
        path.rsplit_once('/').map_or(path, |(_, tail)| tail)
    }

    /// The last path component without its suffix.
    #[must_use]
    pub fn stem(&self) -> &'static str {
        let tail = self.tail();
        tail.rsplit_once('.').map_or(tail, |(stem, _)| stem)
    }

    /// The suffix without the dot.
    #[must_use]
    pub fn suffix(&self) -> &'static str {
        self.tail().rsplit_once('.').map_or("", |(_, suffix)| suffix)
    }
}

/// A `device-major` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Devm {
    pub name: Sym,
    pub char_major: Option<u32>,
    pub block_major: Option<u32>,
    pub cond: Option<CondExpr>,
    pub nodes: Option<DevNodes>,
    pub location: Location,
    pub selected: bool,
}

fn has_suffix(path: &str) -> bool {
    let tail = path.rsplit_once('/').map_or(path, |(_, tail)| tail);
    tail.rsplit_once('.')
        .is_some_and(|(stem, suffix)| !stem.is_empty() && !suffix.is_empty())
}

fn check_major(major: Option<i64>) -> core::result::Result<Option<u32>, ConfigError> {
    major
        .map(|m| {
            u32::try_from(m)
                .ok()
                .filter(|_| m < MAX_MAJOR)
                .ok_or(ConfigError::OutOfRange {
                    what: "major",
                    value: m,
                })
        })
        .transpose()
}

impl Session {
    fn prefixed(&mut self, path: Sym) -> Sym {
        match self.settings().prefixes.last().copied() {
            Some(prefix) if !path.as_str().starts_with('/') => {
                let joined = format!("{prefix}/{path}");
                self.names.intern(&joined)
            }
            _ => path,
        }
    }

    fn add_file_spec(
        &mut self,
        path: Sym,
        kind: FileKind,
        cond: Option<CondExpr>,
        flags: FileFlags,
        rule: Option<Sym>,
    ) -> Result<()> {
        if (flags.needs_count || flags.needs_flag) && cond.is_none() {
            return Err(ConfigError::CountWithoutCondition(path.to_string()).into());
        }
        if !has_suffix(path.as_str()) {
            return Err(ConfigError::BadFileName(path.to_string()).into());
        }
        let path = self.prefixed(path);
        if self.registry.file_paths.contains_key(&path) {
            return Err(ConfigError::duplicate("file", path).into());
        }
        if flags.needs_count
            && let Some(cond) = &cond
        {
            for atom in cond.atoms() {
                self.registry.needs_count.insert(atom, ());
            }
        }
        let id = self.registry.files.alloc(FileSpec {
            path,
            kind,
            cond,
            flags,
            rule,
            build_prefix: self.settings().build_prefixes.last().copied(),
            location: self.location,
            selected: false,
        });
        self.registry.file_paths.insert(path, id);
        log::trace!("file `{path}` declared");
        Ok(())
    }

    /// Declares a source file.
    ///
    /// # Errors
    /// - [`ConfigError::CountWithoutCondition`] for `needs-count` or
    ///   `needs-flag` without a condition.
    /// - [`ConfigError::BadFileName`] for a path without suffix.
    /// - [`ConfigError::DuplicateDefinition`] for a path declared before.
    pub fn add_file(
        &mut self,
        path: Sym,
        cond: Option<CondExpr>,
        flags: FileFlags,
        rule: Option<Sym>,
    ) -> Result<()> {
        self.add_file_spec(path, FileKind::Source, cond, flags, rule)
    }

    /// Declares a prebuilt object.
    ///
    /// # Errors
    /// As [`Session::add_file`].
    pub fn add_object(&mut self, path: Sym, cond: Option<CondExpr>, flags: FileFlags) -> Result<()> {
        self.add_file_spec(path, FileKind::Object, cond, flags, None)
    }

    /// Declares the majors of a device switch entry.
    ///
    /// # Errors
    /// - [`ConfigError::NoMajors`] with neither a character nor a block major.
    /// - [`ConfigError::OutOfRange`] for a major outside `0..4096`.
    pub fn add_devm(
        &mut self,
        name: Sym,
        char_major: Option<i64>,
        block_major: Option<i64>,
        cond: Option<CondExpr>,
        nodes: Option<DevNodes>,
    ) -> Result<()> {
        if char_major.is_none() && block_major.is_none() {
            return Err(ConfigError::NoMajors(name.to_string()).into());
        }
        let char_major = check_major(char_major)?;
        let block_major = check_major(block_major)?;
        self.registry.devms.alloc(Devm {
            name,
            char_major,
            block_major,
            cond,
            nodes,
            location: self.location,
            selected: false,
        });
        Ok(())
    }

    /// Pushes a `prefix` (or `buildprefix`), or pops the innermost one when
    /// `path` is `None`. Relative prefixes nest inside the current one.
    ///
    /// # Errors
    /// [`ConfigError::NothingToPop`] when popping an empty stack.
    pub fn push_or_pop_prefix(&mut self, path: Option<Sym>, build: bool) -> Result<()> {
        let current = {
            let settings = self.settings();
            let stack = if build { &settings.build_prefixes } else { &settings.prefixes };
            stack.last().copied()
        };
        let pushed = match (path, current) {
            (None, _) => None,
            (Some(path), Some(top)) if !path.as_str().starts_with('/') => {
                Some(self.names.intern(&format!("{top}/{path}")))
            }
            (Some(path), _) => Some(path),
        };
        let settings = self.settings.get_mut();
        let stack = if build {
            &mut settings.build_prefixes
        } else {
            &mut settings.prefixes
        };
        match pushed {
            Some(prefix) => stack.push(prefix),
            None => {
                stack
                    .pop()
                    .ok_or(ConfigError::NothingToPop(if build { "buildprefix" } else { "prefix" }))?;
            }
        }
        Ok(())
    }

    /// Block major of a device base: from `device-major`, else from `major`.
    #[must_use]
    pub fn block_major(&self, base: Sym) -> Option<u32> {
        self.registry
            .devms
            .iter()
            .find_map(|(_, d)| d.block_major.filter(|_| d.name == base))
            .or_else(|| {
                self.graph
                    .find_base(base)
                    .and_then(|id| self.graph.base(id).major)
            })
    }

    /// Whether the input assigns any block major at all.
    pub(crate) fn majors_known(&self) -> bool {
        self.registry.devms.iter().any(|(_, d)| d.block_major.is_some())
            || self.graph.bases().any(|(_, b)| b.major.is_some())
    }

    /// Whether `atom` names something selected, ignoring case.
    pub(crate) fn is_selected_name(&self, atom: Sym) -> bool {
        let lower = atom.as_str().to_ascii_lowercase();
        self.names
            .lookup(&lower)
            .is_some_and(|lower| self.registry.is_selected(lower))
    }

    pub(crate) fn cond_holds(&self, cond: Option<&CondExpr>) -> bool {
        cond.is_none_or(|c| c.eval(&mut |atom| self.is_selected_name(atom)))
    }

    /// Decides which files are part of the build.
    pub(crate) fn fix_files(&mut self) {
        let decided: Vec<bool> = self
            .registry
            .files
            .iter()
            .map(|(_, f)| self.cond_holds(f.cond.as_ref()))
            .collect();
        let ids: Vec<_> = self.registry.files.ids().collect();
        for (id, selected) in ids.into_iter().zip(decided) {
            self.registry.files.get_mut(id).selected = selected;
        }
        log::debug!(
            "{} of {} files selected",
            self.registry.files.iter().filter(|(_, f)| f.selected).count(),
            self.registry.files.len()
        );
    }

    /// Decides which device majors are part of the build and rejects a
    /// major used twice.
    pub(crate) fn fix_devsw(&mut self) {
        let decided: Vec<bool> = self
            .registry
            .devms
            .iter()
            .map(|(_, d)| self.cond_holds(d.cond.as_ref()))
            .collect();
        let ids: Vec<_> = self.registry.devms.ids().collect();
        for (id, selected) in ids.into_iter().zip(decided) {
            self.registry.devms.get_mut(id).selected = selected;
        }

        let mut char_seen: HashMap<u32, Sym> = HashMap::new();
        let mut block_seen: HashMap<u32, Sym> = HashMap::new();
        let mut errors = Vec::new();
        for (_, devm) in self.registry.devms.iter().filter(|(_, d)| d.selected) {
            for (what, major, seen) in [
                ("character", devm.char_major, &mut char_seen),
                ("block", devm.block_major, &mut block_seen),
            ] {
                let Some(major) = major else { continue };
                match seen.get(&major) {
                    Some(&first) if first != devm.name => errors.push((
                        devm.location,
                        ConfigError::DuplicateMajor {
                            what,
                            major,
                            first: first.to_string(),
                            second: devm.name.to_string(),
                        },
                    )),
                    Some(_) => {}
                    None => {
                        seen.insert(major, devm.name);
                    }
                }
            }
        }
        for (location, error) in errors {
            self.diag.error(location, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    fn defining() -> Session {
        let mut s = Session::default();
        let m = s.intern("testmach");
        assert!(s.on_machine(m, None, &[]));
        s
    }

    #[test]
    fn suffix_is_required() {
        assert!(has_suffix("kern/init_main.c"));
        assert!(has_suffix("a.b/c.S"));
        assert!(!has_suffix("kern/init_main"));
        assert!(!has_suffix("dev/.c"));
        assert!(!has_suffix("a.b/c"));
    }

    #[test]
    fn needs_count_requires_condition() {
        let mut s = defining();
        let path = s.intern("dev/sd.c");
        let flags = FileFlags {
            needs_count: true,
            needs_flag: false,
        };
        assert!(!s.on_define_file(path, None, flags, None));
        assert!(matches!(
            s.diagnostics().errors().next(),
            Some(ConfigError::CountWithoutCondition(_))
        ));
    }

    #[test]
    fn needs_count_allows_star() {
        let mut s = defining();
        let path = s.intern("dev/sd.c");
        let sd = s.intern("sd");
        let flags = FileFlags {
            needs_count: true,
            needs_flag: false,
        };
        assert!(s.on_define_file(path, Some(CondExpr::Atom(sd)), flags, None));
        assert!(s.registry().allows_star(sd));
    }

    #[test]
    fn prefixes_nest_and_apply_to_relative_paths() {
        let mut s = defining();
        let outer = s.intern("external/bsd");
        let inner = s.intern("lib");
        let rel = s.intern("foo.c");
        let abs = s.intern("/abs/bar.c");
        assert!(s.on_prefix(Some(outer)));
        assert!(s.on_prefix(Some(inner)));
        assert!(s.on_define_file(rel, None, FileFlags::default(), None));
        assert!(s.on_prefix(None));
        assert!(s.on_define_file(abs, None, FileFlags::default(), None));
        assert!(s.on_prefix(None));
        assert!(!s.on_prefix(None));
        let paths: Vec<_> = s.registry().files().map(|(_, f)| f.path.as_str()).collect();
        assert_eq!(paths, ["external/bsd/lib/foo.c", "/abs/bar.c"]);
    }

    #[test]
    fn duplicate_file_is_rejected() {
        let mut s = defining();
        let path = s.intern("kern/subr.c");
        assert!(s.on_define_file(path, None, FileFlags::default(), None));
        assert!(!s.on_define_file(path, None, FileFlags::default(), None));
        assert_eq!(s.registry().files().count(), 1);
    }

    #[test]
    fn device_major_needs_a_major() {
        let mut s = defining();
        let sd = s.intern("sd");
        assert!(!s.on_define_device_major(sd, None, None, None, None));
        assert!(!s.on_define_device_major(sd, Some(4096), None, None, None));
        assert!(s.on_define_device_major(sd, Some(13), Some(4), None, None));
        assert_eq!(s.block_major(sd), Some(4));
    }

    #[test]
    fn file_names() {
        let mut s = defining();
        let path = s.intern("dev/ic/com.c");
        assert!(s.on_define_file(path, None, FileFlags::default(), None));
        let file = s.registry().file(path).unwrap();
        assert_eq!((file.tail(), file.stem(), file.suffix()), ("com.c", "com", "c"));
    }
}
