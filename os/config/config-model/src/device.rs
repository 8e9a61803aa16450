//! Device bases, attachments and instances.

use crate::error::{ConfigError, Errors, Result};
use crate::graph::{Activity, AttrId, DevBaseId, Deva, DevaId, Devi, DeviId, PSpec, PSpecId};
use crate::locator::fixloc;
use crate::session::{MAX_MAJOR, Session};
use crate::symbol::Sym;
use crate::value::{AtSite, DeviceKind, LocatorBinding, LocatorSpec, Unit, split_unit};

/// Alphabetic start, alphanumeric or `_` body, no trailing digit.
fn is_valid_base_name(name: &str) -> bool {
    name.as_bytes().first().is_some_and(u8::is_ascii_alphabetic)
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        && !name.ends_with(|c: char| c.is_ascii_digit())
}

impl Session {
    /// Returns the device base `name`, creating an undefined placeholder on
    /// first reference.
    ///
    /// # Errors
    /// [`ConfigError::BadBaseName`] if `name` is not a valid base name.
    pub fn get_or_create_device_base(&mut self, name: Sym) -> Result<DevBaseId> {
        if !is_valid_base_name(name.as_str()) {
            return Err(ConfigError::BadBaseName(name.to_string()).into());
        }
        Ok(self.graph.ref_base(name, self.location))
    }

    /// Defines a device base.
    ///
    /// The device carries an attribute of its own name: an interface
    /// attribute with `locators`, so children can attach at the device name
    /// itself, a plain one otherwise, so `file` conditions can test it.
    ///
    /// # Errors
    /// - [`ConfigError::DuplicateDefinition`] if the base is already defined.
    /// - [`ConfigError::MultipleDeviceClasses`] if two class attributes are
    ///   carried.
    pub fn define_device(
        &mut self,
        name: Sym,
        kind: DeviceKind,
        locators: Option<Vec<LocatorSpec>>,
        attrs: &[Sym],
    ) -> Result<DevBaseId> {
        let id = self.get_or_create_device_base(name)?;
        if self.graph.base(id).defined {
            return Err(ConfigError::duplicate("device", name).into());
        }

        let own = match self.graph.find_attr(name) {
            Some(id)
                if locators.is_none()
                    && self.graph.attr(id).defined
                    && !self.graph.attr(id).is_interface() =>
            {
                id
            }
            _ => self.define_attribute(name, locators, &[])?,
        };
        let mut carried = Vec::with_capacity(attrs.len() + 1);
        carried.push(own);
        for &attr in attrs {
            let attr = self.graph.ref_attr(attr);
            if !carried.contains(&attr) {
                carried.push(attr);
            }
        }

        let mut class: Option<AttrId> = None;
        let mut errors = Errors::new();
        for &attr in &carried {
            if !self.graph.attr(attr).devclass {
                continue;
            }
            match class {
                Some(first) if first != attr => errors.push(ConfigError::MultipleDeviceClasses {
                    device: name.to_string(),
                    first: self.graph.attr(first).name.to_string(),
                    second: self.graph.attr(attr).name.to_string(),
                }),
                _ => class = Some(attr),
            }
        }
        errors.into_result(())?;

        for &attr in &carried {
            self.graph.attrs.get_mut(attr).carriers.push(id);
        }
        let location = self.location;
        let base = self.graph.bases.get_mut(id);
        base.defined = true;
        base.kind = kind;
        base.attrs = carried;
        base.class = class;
        base.location = location;
        if kind.is_pseudo() {
            self.graph.roots.insert(name, id);
        }
        log::trace!("device `{name}` defined");
        Ok(id)
    }

    /// Defines how a device base attaches.
    ///
    /// The attachment is named `name`, or after the device when `None`.
    ///
    /// # Errors
    /// - [`ConfigError::UnknownName`] for an undefined device or site.
    /// - [`ConfigError::DuplicateDefinition`] for an attachment name in use.
    /// - [`ConfigError::PseudoCannotAttach`] for pseudo-devices.
    /// - [`ConfigError::NotPlainAttribute`] for an interface or class
    ///   attribute in `attrs`.
    /// - [`ConfigError::DuplicateAttachmentSite`] if another attachment of
    ///   the device already covers a site.
    /// - [`ConfigError::IllegalAttachment`] for a site that is a plain
    ///   attribute.
    pub fn define_attachment(
        &mut self,
        name: Option<Sym>,
        device: Sym,
        sites: &[AtSite],
        attrs: &[Sym],
    ) -> Result<DevaId> {
        let base_id = self
            .graph
            .find_base(device)
            .filter(|&id| self.graph.base(id).defined)
            .ok_or_else(|| ConfigError::unknown("device", device))?;
        let name = name.unwrap_or(device);
        if !is_valid_base_name(name.as_str()) {
            return Err(ConfigError::BadBaseName(name.to_string()).into());
        }
        if self.graph.find_deva(name).is_some() {
            return Err(ConfigError::duplicate("attachment", name).into());
        }
        if self.graph.base(base_id).kind.is_pseudo() {
            return Err(ConfigError::PseudoCannotAttach(device.to_string()).into());
        }

        let mut errors = Errors::new();
        let mut plain = Vec::with_capacity(attrs.len());
        for &attr in attrs {
            let id = self.graph.ref_attr(attr);
            let a = self.graph.attr(id);
            if a.is_interface() || a.devclass {
                errors.push(ConfigError::NotPlainAttribute(attr.to_string()));
            }
            plain.push(id);
        }

        let mut resolved: Vec<Option<AttrId>> = Vec::with_capacity(sites.len());
        for site in sites {
            let (site_name, attr) = match *site {
                AtSite::Root => ("root".to_string(), None),
                AtSite::Attr(attr) => {
                    let Some(id) = self
                        .graph
                        .find_attr(attr)
                        .filter(|&id| self.graph.attr(id).defined)
                    else {
                        errors.push(ConfigError::unknown("attribute", attr));
                        continue;
                    };
                    (attr.to_string(), Some(id))
                }
            };
            let existing = self.graph.base(base_id).attachments.iter().find(|&&d| {
                self.graph.deva(d).sites.contains(&attr)
            });
            if let Some(&by) = existing {
                errors.push(ConfigError::DuplicateAttachmentSite {
                    device: device.to_string(),
                    site: site_name,
                    by: self.graph.deva(by).name.to_string(),
                });
            } else if resolved.contains(&attr) {
                errors.push(ConfigError::DuplicateAttachmentSite {
                    device: device.to_string(),
                    site: site_name,
                    by: name.to_string(),
                });
            } else if let Some(id) = attr
                && !self.graph.attr(id).is_interface()
            {
                errors.push(ConfigError::IllegalAttachment {
                    device: device.to_string(),
                    attr: site_name,
                });
            }
            resolved.push(attr);
        }
        errors.into_result(())?;

        let deva = self.graph.devas.alloc(Deva {
            name,
            defined: true,
            base: Some(base_id),
            sites: resolved.clone(),
            attrs: plain,
            instances: Vec::new(),
        });
        self.graph.deva_names.insert(name, deva);
        self.graph.bases.get_mut(base_id).attachments.push(deva);
        for site in resolved {
            match site {
                None => {
                    self.graph.roots.insert(device, base_id);
                }
                Some(attr) => {
                    let children = &mut self.graph.attrs.get_mut(attr).children;
                    if !children.contains(&base_id) {
                        children.push(base_id);
                    }
                }
            }
        }
        log::trace!("attachment `{name}` of `{device}` defined");
        Ok(deva)
    }

    fn split_instance_name(&mut self, name: Sym) -> Result<(DevBaseId, Unit)> {
        let (base, unit) =
            split_unit(name.as_str()).ok_or_else(|| ConfigError::InvalidDeviceName(name.to_string()))?;
        let base = self.names.intern(base);
        let id = self
            .graph
            .find_base(base)
            .ok_or_else(|| ConfigError::unknown("device", base))?;
        if self.graph.base(id).kind.is_pseudo() {
            return Err(ConfigError::IsPseudoDevice(base.to_string()).into());
        }
        Ok((id, unit))
    }

    /// Returns the attachment site `(attr, parent, unit)`, creating it once.
    pub(crate) fn get_pspec(&mut self, attr: AttrId, parent: Option<DevBaseId>, unit: Unit) -> PSpecId {
        let existing = self
            .graph
            .pspecs()
            .find(|(_, p)| p.attr == attr && p.parent == parent && p.unit == unit)
            .map(|(id, _)| id);
        existing.unwrap_or_else(|| {
            self.graph.pspecs.alloc(PSpec {
                attr,
                parent,
                unit,
                instances: Vec::new(),
                active: Activity::Unset,
            })
        })
    }

    /// Resolves the parent of an instance of `base` written as `at`.
    ///
    /// The parent is first taken as an attribute `base` may attach at; failing
    /// that, as a device carrying such an attribute.
    fn resolve_parent(&mut self, base: DevBaseId, at: Sym) -> Result<(AttrId, Option<DevBaseId>, Unit)> {
        let (target, unit) =
            split_unit(at.as_str()).ok_or_else(|| ConfigError::InvalidDeviceName(at.to_string()))?;
        let target = self.names.intern(target);
        let parent = self.graph.find_base(target);
        let supervises = |graph: &crate::graph::Graph, attr: AttrId| graph.attr(attr).children.contains(&base);

        if let Some(attr) = self.graph.find_attr(target)
            && supervises(&self.graph, attr)
        {
            return Ok((attr, parent, unit));
        }
        let cannot_attach = || ConfigError::CannotAttach {
            device: self.graph.base(base).name.to_string(),
            target: target.to_string(),
        };
        let Some(parent) = parent else {
            if self.graph.find_attr(target).is_some_and(|a| self.graph.attr(a).defined) {
                return Err(cannot_attach().into());
            }
            return Err(ConfigError::unknown("device or attribute", target).into());
        };
        let attr = self
            .graph
            .base(parent)
            .attrs
            .iter()
            .copied()
            .find(|&attr| supervises(&self.graph, attr))
            .ok_or_else(cannot_attach)?;
        Ok((attr, Some(parent), unit))
    }

    /// Declares a device instance.
    ///
    /// # Errors
    /// - [`ConfigError::InvalidDeviceName`] for a name without unit.
    /// - [`ConfigError::UnknownName`] for an unknown device or parent.
    /// - [`ConfigError::IsPseudoDevice`] for pseudo-device bases.
    /// - [`ConfigError::CannotAttachAtRoot`] / [`ConfigError::CannotAttach`]
    ///   if no attachment of the device fits the parent.
    /// - Locator errors from [`fixloc`].
    pub fn add_instance(
        &mut self,
        name: Sym,
        at: Option<Sym>,
        locators: &[LocatorBinding],
        flags: i64,
    ) -> Result<DeviId> {
        let (base, unit) = self.split_instance_name(name)?;
        let (site, pspec) = match at {
            None => (None, None),
            Some(at) => {
                let (attr, parent, parent_unit) = self.resolve_parent(base, at)?;
                (Some(attr), Some(self.get_pspec(attr, parent, parent_unit)))
            }
        };
        let deva = self
            .graph
            .base(base)
            .attachments
            .iter()
            .copied()
            .find(|&d| self.graph.deva(d).sites.contains(&site))
            .ok_or_else(|| match at {
                None => ConfigError::CannotAttachAtRoot(self.graph.base(base).name.to_string()),
                Some(at) => ConfigError::CannotAttach {
                    device: self.graph.base(base).name.to_string(),
                    target: at.to_string(),
                },
            })?;

        let id = self.graph.devis.alloc(Devi {
            name,
            base,
            unit,
            at,
            deva: Some(deva),
            pspec,
            locators: Vec::new(),
            flags,
            active: Activity::Unset,
            dead: false,
            location: self.location,
        });
        self.link_instance(id);

        let spec = site.map(|a| self.graph.attr(a).locators().to_vec()).unwrap_or_default();
        let values = fixloc(name, &spec, locators)?;
        self.graph.devis.get_mut(id).locators = values;
        log::trace!("instance `{name}` added");
        Ok(id)
    }

    fn link_instance(&mut self, id: DeviId) {
        let devi = self.graph.devi(id).clone();
        let base = self.graph.bases.get_mut(devi.base);
        base.instances.push(id);
        if let Unit::Num(n) = devi.unit {
            base.umax = base.umax.max(n.saturating_add(1));
        }
        if let Some(deva) = devi.deva {
            self.graph.devas.get_mut(deva).instances.push(id);
        }
        if let Some(pspec) = devi.pspec {
            self.graph.pspecs.get_mut(pspec).instances.push(id);
        }
        if let Some(list) = self.graph.instance_names.get_mut(&devi.name) {
            list.push(id);
        } else {
            self.graph.instance_names.insert(devi.name, vec![id]);
        }
    }

    /// Unlinks an instance from every list and tags it dead.
    fn remove_instance(&mut self, id: DeviId) {
        let devi = self.graph.devis.get_mut(id);
        devi.dead = true;
        let devi = devi.clone();
        self.graph.bases.get_mut(devi.base).instances.retain(|&i| i != id);
        if let Some(deva) = devi.deva {
            self.graph.devas.get_mut(deva).instances.retain(|&i| i != id);
        }
        if let Some(pspec) = devi.pspec {
            self.graph.pspecs.get_mut(pspec).instances.retain(|&i| i != id);
        }
        let now_empty = self.graph.instance_names.get_mut(&devi.name).is_some_and(|list| {
            list.retain(|&i| i != id);
            list.is_empty()
        });
        if now_empty {
            self.graph.instance_names.remove(&devi.name);
        }
        log::trace!("instance `{}` removed", devi.name);
    }

    /// Removes every instance declared as `name`.
    ///
    /// # Errors
    /// [`ConfigError::UnknownName`] if there is none.
    pub fn del_instance(&mut self, name: Sym) -> Result<()> {
        self.split_instance_name(name)?;
        let ids = self.graph.find_instances(name).to_vec();
        if ids.is_empty() {
            return Err(ConfigError::unknown("device instance", name).into());
        }
        for id in ids {
            self.remove_instance(id);
        }
        Ok(())
    }

    /// Removes the instance declared as `name at at`.
    ///
    /// # Errors
    /// [`ConfigError::UnknownName`] if there is none.
    pub fn del_instance_at(&mut self, name: Sym, at: Option<Sym>) -> Result<()> {
        self.split_instance_name(name)?;
        let id = self
            .graph
            .find_instances(name)
            .iter()
            .copied()
            .find(|&id| self.graph.devi(id).at == at)
            .ok_or_else(|| ConfigError::UnknownName {
                what: "device instance",
                name: format!("{name} at {}", at.map_or("root", Sym::as_str)),
            })?;
        self.remove_instance(id);
        Ok(())
    }

    /// Removes all instances attached at `at` (`None` for root).
    ///
    /// With a unit (`pci0`, `pci?`) only instances written with exactly that
    /// parent go. Without one, every instance below the named device or, if
    /// there is no such device, below the named attribute goes.
    ///
    /// # Errors
    /// [`ConfigError::UnknownName`] if `at` names neither an interface
    /// attribute nor a device carrying one.
    pub fn del_instances_at(&mut self, at: Option<Sym>) -> Result<()> {
        let Some(at) = at else {
            let doomed: Vec<DeviId> = self
                .graph
                .devis()
                .filter(|(_, d)| !d.dead && d.at.is_none() && d.pspec.is_none() && d.deva.is_some())
                .map(|(id, _)| id)
                .collect();
            for id in doomed {
                self.remove_instance(id);
            }
            return Ok(());
        };

        let (target, unit) = match split_unit(at.as_str()) {
            Some((target, unit)) => (self.names.intern(target), unit),
            None => (at, Unit::Star),
        };
        let parent = self.graph.find_base(target);
        let is_interface = |a: &AttrId| self.graph.attr(*a).is_interface();
        let attrs: Vec<AttrId> = match self.graph.find_attr(target).filter(is_interface) {
            Some(attr) => vec![attr],
            None => parent
                .map(|p| self.graph.base(p).attrs.iter().copied().filter(is_interface).collect())
                .unwrap_or_default(),
        };
        if attrs.is_empty() {
            return Err(ConfigError::unknown("interface attribute", target).into());
        }

        let mut doomed = Vec::new();
        for &attr in &attrs {
            for &child in &self.graph.attr(attr).children {
                for &id in &self.graph.base(child).instances {
                    let devi = self.graph.devi(id);
                    let (Some(written), Some(pspec)) = (devi.at, devi.pspec) else {
                        continue;
                    };
                    let pspec = self.graph.pspec(pspec);
                    let hit = match (unit, parent) {
                        (Unit::Num(_) | Unit::Wild, _) => written == at,
                        (Unit::Star, Some(parent)) => pspec.parent == Some(parent),
                        (Unit::Star, None) => pspec.attr == attr,
                    };
                    if hit && !doomed.contains(&id) {
                        doomed.push(id);
                    }
                }
            }
        }
        for id in doomed {
            self.remove_instance(id);
        }
        Ok(())
    }

    /// Instantiates a pseudo-device with `count` units.
    ///
    /// # Errors
    /// - [`ConfigError::UnknownName`] if `name` is no device.
    /// - [`ConfigError::NotPseudoDevice`] for real devices.
    /// - [`ConfigError::DuplicateDefinition`] if already instantiated.
    /// - [`ConfigError::OutOfRange`] for a count below one.
    pub fn add_pseudo(&mut self, name: Sym, count: i64) -> Result<DeviId> {
        let base = self
            .graph
            .find_base(name)
            .ok_or_else(|| ConfigError::unknown("pseudo-device", name))?;
        if !self.graph.base(base).kind.is_pseudo() {
            return Err(ConfigError::NotPseudoDevice(name.to_string()).into());
        }
        if !self.graph.find_instances(name).is_empty() {
            return Err(ConfigError::duplicate("pseudo-device", name).into());
        }
        let units = u32::try_from(count)
            .ok()
            .filter(|&n| n >= 1)
            .ok_or(ConfigError::OutOfRange {
                what: "pseudo-device count",
                value: count,
            })?;
        let id = self.graph.devis.alloc(Devi {
            name,
            base,
            unit: Unit::Num(units - 1),
            at: None,
            deva: None,
            pspec: None,
            locators: Vec::new(),
            flags: 0,
            active: Activity::Active,
            dead: false,
            location: self.location,
        });
        self.link_instance(id);
        Ok(id)
    }

    /// Removes a pseudo-device instance.
    ///
    /// # Errors
    /// - [`ConfigError::UnknownName`] if `name` is no device or has no
    ///   instance.
    /// - [`ConfigError::NotPseudoDevice`] for real devices.
    pub fn del_pseudo(&mut self, name: Sym) -> Result<()> {
        let base = self
            .graph
            .find_base(name)
            .ok_or_else(|| ConfigError::unknown("pseudo-device", name))?;
        if !self.graph.base(base).kind.is_pseudo() {
            return Err(ConfigError::NotPseudoDevice(name.to_string()).into());
        }
        let Some(&id) = self.graph.find_instances(name).first() else {
            return Err(ConfigError::unknown("pseudo-device instance", name).into());
        };
        self.remove_instance(id);
        self.graph.bases.get_mut(base).umax = 0;
        Ok(())
    }

    /// Assigns the block major of a device base.
    ///
    /// # Errors
    /// - [`ConfigError::UnknownName`] for an undefined device.
    /// - [`ConfigError::AlreadySpecified`] if a major is already assigned.
    /// - [`ConfigError::OutOfRange`] for a major outside `0..4096`.
    pub fn set_major(&mut self, name: Sym, major: i64) -> Result<()> {
        let base = self
            .graph
            .find_base(name)
            .filter(|&b| self.graph.base(b).defined)
            .ok_or_else(|| ConfigError::unknown("device", name))?;
        let major = u32::try_from(major)
            .ok()
            .filter(|_| major < MAX_MAJOR)
            .ok_or(ConfigError::OutOfRange {
                what: "major",
                value: major,
            })?;
        if self.graph.base(base).major.is_some() {
            return Err(ConfigError::AlreadySpecified("major number").into());
        }
        self.graph.bases.get_mut(base).major = Some(major);
        Ok(())
    }
}
