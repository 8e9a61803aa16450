//! Include stack and statement dispatch.
//!
//! The [`Compiler`] reads a configuration file, follows `include` lines and
//! the machine definition files a `machine` line pulls in, and hands every
//! statement to the [`Session`]:
//!
//! ```text
//!   GENERIC ── machine amd64 x86 ──► conf/files
//!                                    arch/x86/conf/files.x86
//!                                    arch/amd64/conf/files.amd64
//!                                    ── end of definitions
//!           ── selections … ──────► end of selections
//! ```

use crate::ast::{Line, Statement};
use crate::error::FrontendError;
use crate::parser::parse;
use config_model::{Location, Session, Sym};
use std::fs;
use std::path::{Path, PathBuf};

/// How deep `include` lines may nest.
pub const MAX_INCLUDE_DEPTH: usize = 32;

/// Drives one configuration run from source text to a finished session.
#[derive(Debug)]
pub struct Compiler {
    session: Session,
    srcdir: PathBuf,
    /// Directories of the files being read, innermost last.
    stack: Vec<PathBuf>,
    /// Set once the definitions failed; nothing else is processed.
    halted: bool,
}

impl Compiler {
    /// `srcdir` is where machine definition files are looked up unless the
    /// input names a source tree of its own.
    #[must_use]
    pub fn new(session: Session, srcdir: impl Into<PathBuf>) -> Self {
        Self {
            session,
            srcdir: srcdir.into(),
            stack: Vec::new(),
            halted: false,
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        self.session
    }

    /// Compiles the configuration file at `path`.
    ///
    /// Returns whether the run finished without errors; the problems
    /// themselves are in the session's diagnostics.
    ///
    /// # Errors
    /// Returns [`FrontendError::Io`] if `path` cannot be read.
    pub fn compile_file(&mut self, path: &Path) -> Result<bool, FrontendError> {
        let text = fs::read_to_string(path).map_err(|source| FrontendError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.compile_source(path, &text))
    }

    /// Compiles `text` as if read from `path`.
    pub fn compile_source(&mut self, path: &Path, text: &str) -> bool {
        self.read(path, text);
        if self.halted {
            log::warn!("definitions failed; selections skipped");
            return false;
        }
        self.session.on_end_of_selections()
    }

    fn srcdir(&self) -> PathBuf {
        self.session
            .settings()
            .srcdir
            .map_or_else(|| self.srcdir.clone(), |dir| PathBuf::from(dir.as_str()))
    }

    fn read(&mut self, path: &Path, text: &str) {
        log::debug!("reading {}", path.display());
        let file = self.session.intern(&path.display().to_string());
        self.stack.push(
            path.parent()
                .map_or_else(PathBuf::new, Path::to_path_buf),
        );
        let lines = parse(text, self.session.interner_mut());
        for Line { line, item } in lines {
            if self.halted {
                break;
            }
            self.session.set_location(Location::new(file, line));
            match item {
                Ok(statement) => self.dispatch(statement),
                Err(e) => self.session.on_syntax_error(e.to_string()),
            }
        }
        self.stack.pop();
    }

    /// Reads a file pulled in by `include` or by the machine definitions.
    /// A missing optional file is skipped silently.
    fn include(&mut self, path: &Path, optional: bool) {
        if self.stack.len() >= MAX_INCLUDE_DEPTH {
            self.session.on_syntax_error(format!(
                "includes nested too deeply at `{}`",
                path.display()
            ));
            return;
        }
        match fs::read_to_string(path) {
            Ok(text) => self.read(path, &text),
            Err(e) if optional => {
                log::debug!("skipping {}: {e}", path.display());
            }
            Err(e) => self
                .session
                .on_syntax_error(format!("cannot open `{}`: {e}", path.display())),
        }
    }

    /// Relative includes are looked up next to the including file first,
    /// then in the source tree.
    fn resolve_include(&self, name: Sym) -> PathBuf {
        let name = Path::new(name.as_str());
        if name.is_absolute() {
            return name.to_path_buf();
        }
        if let Some(here) = self.stack.last() {
            let local = here.join(name);
            if local.exists() {
                return local;
            }
        }
        self.srcdir().join(name)
    }

    /// Reads the definition files of a machine and closes the definitions.
    fn read_machine(&mut self, machine: Sym, arch: Option<Sym>, subarches: &[Sym]) {
        let srcdir = self.srcdir();
        let arch_files = |name: Sym| {
            srcdir
                .join("arch")
                .join(name.as_str())
                .join("conf")
                .join(format!("files.{name}"))
        };
        let mut files = vec![srcdir.join("conf").join("files")];
        files.extend(arch.map(arch_files));
        files.extend(subarches.iter().rev().map(|&s| arch_files(s)));
        files.push(arch_files(machine));

        let location = self.session.location();
        for path in files {
            self.include(&path, false);
        }
        self.session.set_location(location);
        self.end_definitions();
    }

    fn end_definitions(&mut self) {
        if !self.session.on_end_of_definitions() {
            self.halted = true;
        }
    }

    fn dispatch(&mut self, statement: Statement) {
        log::trace!("{}: {statement:?}", self.session.location());
        let s = &mut self.session;
        match statement {
            Statement::Include { path, optional } => {
                let path = self.resolve_include(path);
                self.include(&path, optional);
            }
            Statement::Source(dir) => {
                s.on_source(dir);
            }
            Statement::Build(dir) => {
                s.on_build(dir);
            }
            Statement::Machine {
                name,
                arch,
                subarches,
            } => {
                if s.on_machine(name, arch, &subarches) {
                    self.read_machine(name, arch, &subarches);
                }
            }
            Statement::Ioconf(name) => {
                if s.on_ioconf(name) {
                    self.end_definitions();
                }
            }
            Statement::Version(version) => {
                s.on_version(version);
            }
            Statement::Define {
                name,
                locators,
                deps,
            } => {
                s.on_define_attribute(name, locators, &deps);
            }
            Statement::DevClass(name) => {
                s.on_define_devclass(name);
            }
            Statement::Device {
                name,
                kind,
                locators,
                attrs,
            } => {
                s.on_define_device(name, kind, locators, &attrs);
            }
            Statement::Attach {
                device,
                sites,
                with,
                attrs,
            } => {
                s.on_define_attachment(device, &sites, with, &attrs);
            }
            Statement::DefOptions {
                kind,
                file,
                opts,
                deps,
                obsolete,
            } => {
                s.on_define_options(kind, file, &opts, &deps, obsolete);
            }
            Statement::DefFs { names, deps } => {
                s.on_define_filesystems(&names, &deps);
            }
            Statement::File {
                path,
                cond,
                flags,
                rule,
            } => {
                s.on_define_file(path, cond, flags, rule);
            }
            Statement::Object { path, cond, flags } => {
                s.on_define_object(path, cond, flags);
            }
            Statement::DeviceMajor {
                name,
                char_major,
                block_major,
                cond,
                nodes,
            } => {
                s.on_define_device_major(name, char_major, block_major, cond, nodes);
            }
            Statement::Prefix(path) => {
                s.on_prefix(path);
            }
            Statement::BuildPrefix(path) => {
                s.on_build_prefix(path);
            }
            Statement::MaxPartitions(count) => {
                s.on_define_maxpartitions(count);
            }
            Statement::DefMaxusers { min, default, max } => {
                s.on_define_maxusers(min, default, max);
            }
            Statement::DefMakeoptions(options) => {
                s.on_define_makeoptions(options);
            }
            Statement::Majors(majors) => {
                s.on_define_majors(&majors);
            }
            Statement::Select(name) => {
                s.on_select_attribute(name);
            }
            Statement::NoSelect(name) => {
                s.on_select_no_attribute(name);
            }
            Statement::FileSystems(names) => {
                for name in names {
                    s.on_select_file_system(name);
                }
            }
            Statement::NoFileSystems(names) => {
                for name in names {
                    s.on_select_no_file_system(name);
                }
            }
            Statement::MakeOptions(options) => {
                for (name, value, append) in options {
                    s.on_select_makeoption(name, value, append);
                }
            }
            Statement::NoMakeOptions(names) => {
                for name in names {
                    s.on_select_no_makeoption(name);
                }
            }
            Statement::Options(options) => {
                for (name, value) in options {
                    s.on_select_option(name, value);
                }
            }
            Statement::NoOptions(names) => {
                for name in names {
                    s.on_select_no_option(name);
                }
            }
            Statement::Maxusers(value) => {
                s.on_select_maxusers(value);
            }
            Statement::Ident(ident) => {
                s.on_select_ident(ident);
            }
            Statement::Config {
                name,
                root,
                fstype,
                dumps,
            } => {
                s.on_add_config(name, root, fstype, &dumps);
            }
            Statement::NoConfig(name) => {
                s.on_select_no_config(name);
            }
            Statement::PseudoDevice { name, count } => {
                s.on_add_pseudo_device(name, count);
            }
            Statement::NoPseudoDevice(name) => {
                s.on_select_no_pseudo_device(name);
            }
            Statement::Instance {
                name,
                at,
                locators,
                flags,
            } => {
                s.on_add_device_instance(name, at, &locators, flags);
            }
            Statement::NoInstance(name) => {
                s.on_select_no_device_instance(name);
            }
            Statement::NoInstanceAt { name, at } => {
                s.on_select_no_device_instance_at(name, at);
            }
            Statement::NoDeviceAt(at) => {
                s.on_select_no_device_at(at);
            }
        }
    }
}
