//! Named kernel configurations and their root and dump devices.
//!
//! A `config` line names a kernel image and where it finds its root file
//! system and dumps. Device names are resolved right away:
//!
//! ```text
//!   sd0b ──split──► base `sd`, unit 0, partition `b`
//!        ──major──► block major of `sd` (device-major, else `major {}`)
//!        ──devno──► (major, unit * maxpartitions + partition)
//! ```
//!
//! Network interfaces (bases carrying `ifnet`) have no device number and
//! keep only the unit.

use crate::error::{ConfigError, Errors, Result};
use crate::graph::DevBaseId;
use crate::session::Session;
use crate::symbol::Sym;
use crate::value::{DevSpec, Unit, split_unit};
use crate::Location;
use core::fmt;

/// A `(major, minor)` device number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DevNum {
    pub major: u32,
    pub minor: u32,
}

impl fmt::Display for DevNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "makedev({}, {})", self.major, self.minor)
    }
}

/// A resolved root or dump device.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DevRef {
    /// Ask at boot time.
    Wildcard,
    /// Explicitly none.
    None,
    /// A string handed to the kernel verbatim.
    Literal(Sym),
    /// A disk partition.
    Device {
        name: Sym,
        base: DevBaseId,
        unit: u32,
        /// Partition index, `0` for `a`.
        partition: u32,
        /// `None` when the input assigns no block majors at all.
        devno: Option<DevNum>,
    },
    /// A network interface.
    Interface { name: Sym, base: DevBaseId, unit: u32 },
    /// An explicit device number, with the device name when one is known.
    Number { devno: DevNum, name: Option<Sym> },
}

impl DevRef {
    /// The device base and unit a surviving instance must exist for.
    #[must_use]
    pub const fn instance(&self) -> Option<(DevBaseId, u32)> {
        match *self {
            Self::Device { base, unit, .. } | Self::Interface { base, unit, .. } => {
                Some((base, unit))
            }
            Self::Wildcard | Self::None | Self::Literal(_) | Self::Number { .. } => None,
        }
    }

    #[must_use]
    pub const fn devno(&self) -> Option<DevNum> {
        match *self {
            Self::Device { devno, .. } => devno,
            Self::Number { devno, .. } => Some(devno),
            Self::Wildcard | Self::None | Self::Literal(_) | Self::Interface { .. } => None,
        }
    }

    /// Partition letter of a disk partition.
    #[must_use]
    pub fn partition_letter(&self) -> Option<char> {
        match *self {
            Self::Device { partition, .. } => u8::try_from(partition)
                .ok()
                .map(|p| char::from(b'a' + p)),
            _ => None,
        }
    }
}

/// A `config` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub name: Sym,
    pub root: DevRef,
    pub dump: DevRef,
    /// Root file system type; `None` for `?` or not given.
    pub fstype: Option<Sym>,
    pub location: Location,
}

/// Splits `sd0a` into `("sd", 0, Some(0))`; the partition letter is
/// optional.
fn split_partition(name: &str) -> Option<(&str, u32, Option<u32>)> {
    let bytes = name.as_bytes();
    let (rest, partition) = match bytes {
        [.., d, p] if d.is_ascii_digit() && p.is_ascii_lowercase() => {
            (&name[..name.len() - 1], Some(u32::from(p - b'a')))
        }
        _ => (name, None),
    };
    match split_unit(rest)? {
        (base, Unit::Num(unit)) => Some((base, unit, partition)),
        (_, Unit::Star | Unit::Wild) => None,
    }
}

impl Session {
    fn partitions(&self) -> u32 {
        self.settings().maxpartitions.unwrap_or(1)
    }

    /// Resolves one root or dump device of configuration `context`.
    fn resolve_dev(&mut self, context: Sym, what: &'static str, spec: DevSpec) -> Result<DevRef> {
        let name = match spec {
            DevSpec::Wildcard => return Ok(DevRef::Wildcard),
            DevSpec::None => return Ok(DevRef::None),
            DevSpec::Literal(text) => return Ok(DevRef::Literal(text)),
            DevSpec::Number { major, minor } => {
                let devno = DevNum { major, minor };
                return Ok(DevRef::Number {
                    devno,
                    name: self.device_name_for(devno),
                });
            }
            DevSpec::Name(name) => name,
        };
        let invalid = || ConfigError::InvalidDeviceSpec {
            context: context.to_string(),
            what,
            spec: name.to_string(),
        };
        let (base_name, unit, partition) = split_partition(name.as_str()).ok_or_else(invalid)?;
        let base_sym = self.names.intern(base_name);
        let base = self
            .graph
            .find_base(base_sym)
            .filter(|&b| self.graph.base(b).defined)
            .ok_or_else(|| ConfigError::UnknownDevice {
                context: context.to_string(),
                device: base_name.to_string(),
            })?;

        let is_interface = self
            .graph
            .find_attr(self.wk.ifnet)
            .is_some_and(|ifnet| self.graph.has_attr(base, ifnet));
        if is_interface {
            return Ok(DevRef::Interface { name, base, unit });
        }

        let partition = partition.unwrap_or(0);
        if partition >= self.partitions() {
            return Err(invalid().into());
        }
        let devno = match self.block_major(base_sym) {
            Some(major) => Some(DevNum {
                major,
                minor: unit
                    .checked_mul(self.partitions())
                    .and_then(|m| m.checked_add(partition))
                    .ok_or_else(invalid)?,
            }),
            None if self.majors_known() => {
                return Err(ConfigError::NoMajorForDevice {
                    context: context.to_string(),
                    what,
                    spec: name.to_string(),
                }
                .into());
            }
            None => None,
        };
        Ok(DevRef::Device {
            name,
            base,
            unit,
            partition,
            devno,
        })
    }

    /// Finds the disk partition name of a device number.
    pub(crate) fn device_name_for(&mut self, devno: DevNum) -> Option<Sym> {
        let partitions = self.partitions();
        let base = self
            .graph
            .bases()
            .map(|(_, b)| b.name)
            .find(|&b| self.block_major(b) == Some(devno.major))?;
        let unit = devno.minor / partitions;
        let letter = u8::try_from(devno.minor % partitions).ok()?;
        let name = format!("{base}{unit}{}", char::from(b'a' + letter));
        Some(self.names.intern(&name))
    }

    /// Adds a named configuration.
    ///
    /// Without a `dumps` clause the dump device is `?`.
    ///
    /// # Errors
    /// - [`ConfigError::DuplicateDefinition`] for a name used before.
    /// - [`ConfigError::InvalidDeviceSpec`] for `root on none` or an
    ///   unparsable device.
    /// - [`ConfigError::AlreadySpecified`] for more than one dump device.
    /// - [`ConfigError::NotFileSystem`] for an unknown `type`.
    /// - [`ConfigError::UnknownDevice`] and [`ConfigError::NoMajorForDevice`]
    ///   from device resolution.
    pub fn add_config(
        &mut self,
        name: Sym,
        root: DevSpec,
        fstype: Option<Sym>,
        dumps: &[DevSpec],
    ) -> Result<()> {
        if self.registry.configs.contains_key(&name) {
            return Err(ConfigError::duplicate("configuration", name).into());
        }
        let mut errors = Errors::new();
        if root == DevSpec::None {
            errors.push(ConfigError::InvalidDeviceSpec {
                context: name.to_string(),
                what: "root",
                spec: "none".into(),
            });
        }
        if dumps.len() > 1 {
            errors.push(ConfigError::AlreadySpecified("dump device"));
        }
        let fstype = match fstype {
            None => None,
            Some(fs) if fs == self.wk.qmark => None,
            Some(fs) => {
                let found = self.find_file_system(fs);
                if found.is_none() {
                    errors.push(ConfigError::NotFileSystem(fs.to_string()));
                }
                found
            }
        };
        let root = self.resolve_dev(name, "root", root);
        let dump = self.resolve_dev(name, "dumps", dumps.first().copied().unwrap_or(DevSpec::Wildcard));
        let (root, dump) = match (root, dump) {
            (Ok(root), Ok(dump)) => (root, dump),
            (root, dump) => {
                for e in [root.err(), dump.err()].into_iter().flatten() {
                    errors.absorb(e);
                }
                return Err(errors);
            }
        };
        errors.into_result(())?;
        self.registry.configs.insert(
            name,
            Config {
                name,
                root,
                dump,
                fstype,
                location: self.location,
            },
        );
        log::debug!("configuration `{name}` added");
        Ok(())
    }

    /// # Errors
    /// [`ConfigError::UnknownName`] if no such configuration exists.
    pub fn del_config(&mut self, name: Sym) -> Result<()> {
        self.registry
            .configs
            .remove(&name)
            .map(|_| ())
            .ok_or_else(|| ConfigError::unknown("configuration", name).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_is_optional() {
        assert_eq!(split_partition("sd0a"), Some(("sd", 0, Some(0))));
        assert_eq!(split_partition("sd12b"), Some(("sd", 12, Some(1))));
        assert_eq!(split_partition("wm0"), Some(("wm", 0, None)));
        assert_eq!(split_partition("sd*"), None);
        assert_eq!(split_partition("sd"), None);
    }

    #[test]
    fn partition_letter() {
        let mut names = crate::symbol::Interner::new();
        let mut graph = crate::graph::Graph::default();
        let base = graph.ref_base(names.intern("sd"), Location::default());
        let dev = DevRef::Device {
            name: names.intern("sd0b"),
            base,
            unit: 0,
            partition: 1,
            devno: None,
        };
        assert_eq!(dev.partition_letter(), Some('b'));
        assert_eq!(dev.instance(), Some((base, 0)));
    }
}
