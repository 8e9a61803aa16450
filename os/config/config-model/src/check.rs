//! Whole-configuration passes run once all selections are in.

use crate::config::{Config, DevRef};
use crate::error::ConfigError;
use crate::graph::{DevBaseId, PSpecId};
use crate::session::Session;
use crate::value::{OptionKind, Unit};

impl Session {
    /// Runs every end-of-input pass in order. Problems are recorded in the
    /// diagnostics; the passes keep going so that one run reports as much
    /// as possible.
    pub(crate) fn finish(&mut self) {
        self.fix_maxusers();
        self.kill_orphans();
        self.report_orphans();
        self.select_instances();
        self.close_option_dependencies();
        self.check_configurations();
        self.check_file_systems();
        self.badstar();
        self.crosscheck();
        self.fix_files();
        self.fix_devsw();
        log::info!(
            "resolved {} instances, {} configurations, {} errors",
            self.graph.devis().filter(|(_, d)| d.is_included()).count(),
            self.registry.configs.len(),
            self.diag.error_count()
        );
    }

    fn fix_maxusers(&mut self) {
        if self.settings().ioconf.is_some() {
            return;
        }
        let bounds = self.settings().maxusers_bounds;
        match (self.settings().maxusers, bounds) {
            (Some(value), Some(b)) if value < b.min || value > b.max => {
                self.report(ConfigError::MaxusersOutOfRange {
                    value: i64::from(value),
                    min: b.min,
                    max: b.max,
                });
            }
            (Some(_), _) => {}
            (None, Some(b)) => {
                self.warn(format!("maxusers not specified; {} assumed", b.default));
                self.settings.get_mut().maxusers = Some(b.default);
            }
            (None, None) => match self.options.default_maxusers {
                Some(default) => {
                    self.warn(format!("maxusers not specified; {default} assumed"));
                    self.settings.get_mut().maxusers = Some(default);
                }
                None => self.report(ConfigError::MaxusersUnset),
            },
        }
    }

    /// Puts the names and attributes of every included instance into the
    /// selected set.
    fn select_instances(&mut self) {
        let included: Vec<_> = self
            .graph
            .devis()
            .filter(|(_, d)| d.is_included())
            .map(|(_, d)| (d.base, d.deva, d.location))
            .collect();
        for (base, deva, location) in included {
            let name = self.graph.base(base).name;
            self.registry.selected.insert(name, ());
            let mut attrs = self.graph.base(base).attrs.clone();
            if let Some(deva) = deva {
                let deva = self.graph.deva(deva);
                self.registry.selected.insert(deva.name, ());
                attrs.extend(deva.attrs.iter().copied());
            }
            for attr in attrs {
                if let Err(errors) = self.select_expansion(attr) {
                    for e in errors {
                        self.diag.error(location, e);
                    }
                }
            }
        }
    }

    fn check_configurations(&mut self) {
        if self.registry.configs.is_empty() && self.settings().ioconf.is_none() {
            self.report(ConfigError::NoConfiguration);
        }
    }

    fn check_file_systems(&mut self) {
        let any_defined = self
            .registry
            .option_defs
            .values()
            .any(|d| d.kind == OptionKind::FileSystem);
        if any_defined && self.registry.fs_options.is_empty() && self.settings().ioconf.is_none() {
            self.report(ConfigError::NoFileSystem);
        }
        let unconfigured: Vec<_> = self
            .registry
            .configs
            .values()
            .filter_map(|c| c.fstype.map(|fs| (c.location, c.name, fs)))
            .filter(|&(_, _, fs)| !self.registry.fs_options.contains_key(&fs))
            .collect();
        for (location, name, fstype) in unconfigured {
            self.diag.error(
                location,
                ConfigError::FileSystemNotConfigured {
                    context: name.to_string(),
                    fstype: fstype.to_string(),
                },
            );
        }
    }

    /// Rejects `*` instances of bases that are not counted.
    fn badstar(&mut self) {
        let offenders: Vec<_> = self
            .graph
            .bases()
            .filter(|(_, b)| !self.registry.allows_star(b.name))
            .filter_map(|(_, b)| {
                b.instances
                    .iter()
                    .map(|&i| self.graph.devi(i))
                    .find(|d| d.is_included() && d.unit == Unit::Star)
                    .map(|d| (d.location, b.name))
            })
            .collect();
        for (location, name) in offenders {
            self.diag.error(location, ConfigError::BadStar(name.to_string()));
        }
    }

    /// Whether a surviving instance of `base` provides `unit`.
    #[must_use]
    pub fn has_instance(&self, base: DevBaseId, unit: u32) -> bool {
        let b = self.graph.base(base);
        b.instances
            .iter()
            .map(|&i| self.graph.devi(i))
            .filter(|d| d.is_included())
            .any(|d| match d.unit {
                Unit::Num(n) if b.kind.is_pseudo() => unit <= n,
                Unit::Num(n) => unit == n,
                Unit::Star => unit >= b.umax,
                Unit::Wild => false,
            })
    }

    /// Every non-wildcard root and dump device must name a surviving
    /// instance.
    fn crosscheck(&mut self) {
        let configs: Vec<Config> = self.registry.configs.values().cloned().collect();
        for config in configs {
            for (what, dev) in [("root", config.root), ("dumps", config.dump)] {
                let Some((base, unit)) = dev.instance() else {
                    continue;
                };
                if self.has_instance(base, unit) {
                    continue;
                }
                let spec = match dev {
                    DevRef::Device { name, .. } | DevRef::Interface { name, .. } => name.to_string(),
                    _ => continue,
                };
                self.diag.error(
                    config.location,
                    ConfigError::DanglingReference {
                        context: config.name.to_string(),
                        what,
                        spec,
                    },
                );
            }
        }
    }

    /// Whether an attachment site ended up with an included instance.
    #[must_use]
    pub fn pspec_in_use(&self, pspec: PSpecId) -> bool {
        self.graph
            .pspec(pspec)
            .instances
            .iter()
            .any(|&i| self.graph.devi(i).is_included())
    }
}
