//! Entities of the attribute and device graph.
//!
//! ```text
//!            carries                 attaches at
//!  DevBase ───────────► Attr ◄──────────────────── Deva ──► DevBase
//!     │                  │ children                  │
//!     │ instances        ▼                           │ instances
//!     └──────────────► Devi ──── pspec ──► PSpec ◄───┘
//!                                 (attr, parent base, parent unit)
//! ```
//!
//! All entities live in [`Arena`]s owned by the [`Graph`] and refer to each
//! other through typed ids, so a rolled back directive simply truncates the
//! arenas and restores the entries it touched.

use crate::error::{ConfigError, Errors, Result};
use crate::symbol::Sym;
use crate::txn::{Arena, Id, Table, Transactional};
use crate::value::{DeviceKind, LocatorSpec, Unit};
use crate::Location;
use std::collections::HashSet;

pub type AttrId = Id<Attr>;
pub type DevBaseId = Id<DevBase>;
pub type DevaId = Id<Deva>;
pub type PSpecId = Id<PSpec>;
pub type DeviId = Id<Devi>;

/// An attribute, plain or interface.
#[derive(Debug, Clone)]
pub struct Attr {
    pub name: Sym,
    /// `false` for placeholders created by a forward reference.
    pub defined: bool,
    /// Locator interface; `Some` makes this an interface attribute.
    pub locators: Option<Vec<LocatorSpec>>,
    pub deps: Vec<AttrId>,
    /// Device bases carrying the attribute.
    pub carriers: Vec<DevBaseId>,
    /// Device bases with an attachment at this attribute.
    pub children: Vec<DevBaseId>,
    /// Set for `devclass` attributes.
    pub devclass: bool,
}

impl Attr {
    const fn placeholder(name: Sym) -> Self {
        Self {
            name,
            defined: false,
            locators: None,
            deps: Vec::new(),
            carriers: Vec::new(),
            children: Vec::new(),
            devclass: false,
        }
    }

    #[must_use]
    pub const fn is_interface(&self) -> bool {
        self.locators.is_some()
    }

    #[must_use]
    pub fn locators(&self) -> &[LocatorSpec] {
        self.locators.as_deref().unwrap_or_default()
    }
}

/// The type of a device, such as `sd`.
#[derive(Debug, Clone)]
pub struct DevBase {
    pub name: Sym,
    pub defined: bool,
    pub kind: DeviceKind,
    pub attrs: Vec<AttrId>,
    pub class: Option<AttrId>,
    pub attachments: Vec<DevaId>,
    /// Live instances in declaration order.
    pub instances: Vec<DeviId>,
    /// One past the highest numbered unit ever declared.
    pub umax: u32,
    /// Block major assigned through a `major` block.
    pub major: Option<u32>,
    pub location: Location,
}

impl DevBase {
    const fn placeholder(name: Sym, location: Location) -> Self {
        Self {
            name,
            defined: false,
            kind: DeviceKind::Device,
            attrs: Vec::new(),
            class: None,
            attachments: Vec::new(),
            instances: Vec::new(),
            umax: 0,
            major: None,
            location,
        }
    }
}

/// One way of attaching a device base.
#[derive(Debug, Clone)]
pub struct Deva {
    pub name: Sym,
    pub defined: bool,
    pub base: Option<DevBaseId>,
    /// Attachment sites; `None` is root.
    pub sites: Vec<Option<AttrId>>,
    pub attrs: Vec<AttrId>,
    pub instances: Vec<DeviId>,
}

/// Instance activity decided by orphan elimination.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Activity {
    #[default]
    Unset,
    Active,
    Ignored,
}

/// A deduplicated attachment site: attribute, parent base and parent unit.
#[derive(Debug, Clone)]
pub struct PSpec {
    pub attr: AttrId,
    pub parent: Option<DevBaseId>,
    pub unit: Unit,
    pub instances: Vec<DeviId>,
    pub active: Activity,
}

/// A device instance such as `sd0 at scsibus0`.
#[derive(Debug, Clone)]
pub struct Devi {
    pub name: Sym,
    pub base: DevBaseId,
    pub unit: Unit,
    /// Parent as written, `None` for root and pseudo-devices.
    pub at: Option<Sym>,
    pub deva: Option<DevaId>,
    pub pspec: Option<PSpecId>,
    /// Locator values in the order of the attribute's locator list.
    pub locators: Vec<Sym>,
    pub flags: i64,
    pub active: Activity,
    /// Removed by a `no` directive; kept for orphan elimination.
    pub dead: bool,
    pub location: Location,
}

impl Devi {
    /// Live and not ignored by orphan elimination.
    #[must_use]
    pub fn is_included(&self) -> bool {
        !self.dead && self.active != Activity::Ignored
    }
}

/// The attribute and device graph.
#[derive(Debug, Default)]
pub struct Graph {
    pub(crate) attrs: Arena<Attr>,
    pub(crate) attr_names: Table<Sym, AttrId>,
    pub(crate) bases: Arena<DevBase>,
    pub(crate) base_names: Table<Sym, DevBaseId>,
    pub(crate) devas: Arena<Deva>,
    pub(crate) deva_names: Table<Sym, DevaId>,
    pub(crate) pspecs: Arena<PSpec>,
    pub(crate) devis: Arena<Devi>,
    /// Live instances by name; aliases follow the first declaration.
    pub(crate) instance_names: Table<Sym, Vec<DeviId>>,
    /// Bases that may attach at root, pseudo-devices included.
    pub(crate) roots: Table<Sym, DevBaseId>,
}

impl Transactional for Graph {
    fn begin(&mut self) {
        self.attrs.begin();
        self.attr_names.begin();
        self.bases.begin();
        self.base_names.begin();
        self.devas.begin();
        self.deva_names.begin();
        self.pspecs.begin();
        self.devis.begin();
        self.instance_names.begin();
        self.roots.begin();
    }

    fn commit(&mut self) {
        self.attrs.commit();
        self.attr_names.commit();
        self.bases.commit();
        self.base_names.commit();
        self.devas.commit();
        self.deva_names.commit();
        self.pspecs.commit();
        self.devis.commit();
        self.instance_names.commit();
        self.roots.commit();
    }

    fn rollback(&mut self) {
        self.attrs.rollback();
        self.attr_names.rollback();
        self.bases.rollback();
        self.base_names.rollback();
        self.devas.rollback();
        self.deva_names.rollback();
        self.pspecs.rollback();
        self.devis.rollback();
        self.instance_names.rollback();
        self.roots.rollback();
    }
}

impl Graph {
    #[must_use]
    pub fn attr(&self, id: AttrId) -> &Attr {
        &self.attrs[id]
    }

    #[must_use]
    pub fn base(&self, id: DevBaseId) -> &DevBase {
        &self.bases[id]
    }

    #[must_use]
    pub fn deva(&self, id: DevaId) -> &Deva {
        &self.devas[id]
    }

    #[must_use]
    pub fn pspec(&self, id: PSpecId) -> &PSpec {
        &self.pspecs[id]
    }

    #[must_use]
    pub fn devi(&self, id: DeviId) -> &Devi {
        &self.devis[id]
    }

    #[must_use]
    pub fn find_attr(&self, name: Sym) -> Option<AttrId> {
        self.attr_names.get(&name).copied()
    }

    #[must_use]
    pub fn find_base(&self, name: Sym) -> Option<DevBaseId> {
        self.base_names.get(&name).copied()
    }

    #[must_use]
    pub fn find_deva(&self, name: Sym) -> Option<DevaId> {
        self.deva_names.get(&name).copied()
    }

    /// Live instances declared under `name`, first declaration first.
    #[must_use]
    pub fn find_instances(&self, name: Sym) -> &[DeviId] {
        self.instance_names.get(&name).map_or(&[], Vec::as_slice)
    }

    pub fn attrs(&self) -> impl Iterator<Item = (AttrId, &Attr)> {
        self.attrs.iter()
    }

    pub fn bases(&self) -> impl Iterator<Item = (DevBaseId, &DevBase)> {
        self.bases.iter()
    }

    pub fn devas(&self) -> impl Iterator<Item = (DevaId, &Deva)> {
        self.devas.iter()
    }

    pub fn pspecs(&self) -> impl Iterator<Item = (PSpecId, &PSpec)> {
        self.pspecs.iter()
    }

    /// All instances ever declared, removed ones included.
    pub fn devis(&self) -> impl Iterator<Item = (DeviId, &Devi)> {
        self.devis.iter()
    }

    /// Bases reachable from root, in registration order.
    pub fn roots(&self) -> impl Iterator<Item = DevBaseId> + '_ {
        self.roots.values().copied()
    }

    /// Returns the attribute named `name`, creating an undefined
    /// placeholder on first reference.
    pub(crate) fn ref_attr(&mut self, name: Sym) -> AttrId {
        if let Some(id) = self.find_attr(name) {
            return id;
        }
        let id = self.attrs.alloc(Attr::placeholder(name));
        self.attr_names.insert(name, id);
        id
    }

    pub(crate) fn ref_base(&mut self, name: Sym, location: Location) -> DevBaseId {
        if let Some(id) = self.find_base(name) {
            return id;
        }
        let id = self.bases.alloc(DevBase::placeholder(name, location));
        self.base_names.insert(name, id);
        id
    }

    /// Whether `base` carries the attribute `attr`.
    #[must_use]
    pub fn has_attr(&self, base: DevBaseId, attr: AttrId) -> bool {
        self.bases[base].attrs.contains(&attr)
    }

    /// Depth-first, post-order walk over `root` and its dependencies.
    ///
    /// Every attribute in the transitive dependency set is passed to
    /// `visit` once, after all of its own dependencies. Re-entering an
    /// attribute that is still on the walk stack reports a
    /// [`ConfigError::CircularDependency`] and does not descend further.
    ///
    /// # Errors
    /// One error per cycle entry found; the walk still visits everything
    /// reachable.
    pub fn expand(&self, root: AttrId, mut visit: impl FnMut(AttrId)) -> Result<()> {
        let mut walk = Expansion::default();
        self.expand_from(root, &mut walk, &mut visit);
        walk.errors.into_result(())
    }

    fn expand_from(&self, id: AttrId, walk: &mut Expansion, visit: &mut impl FnMut(AttrId)) {
        if walk.stack.contains(&id) {
            walk.errors
                .push(ConfigError::CircularDependency(self.attrs[id].name.to_string()));
            return;
        }
        if !walk.done.insert(id) {
            return;
        }
        walk.stack.push(id);
        for &dep in &self.attrs[id].deps {
            self.expand_from(dep, walk, visit);
        }
        walk.stack.pop();
        visit(id);
    }
}

#[derive(Default)]
struct Expansion {
    stack: Vec<AttrId>,
    done: HashSet<AttrId>,
    errors: Errors,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Interner;

    fn graph_with(names: &mut Interner, edges: &[(&str, &[&str])]) -> Graph {
        let mut graph = Graph::default();
        for (name, deps) in edges {
            let id = graph.ref_attr(names.intern(name));
            let deps: Vec<_> = deps.iter().map(|d| graph.ref_attr(names.intern(d))).collect();
            graph.attrs.get_mut(id).deps = deps;
            graph.attrs.get_mut(id).defined = true;
        }
        graph
    }

    #[test]
    fn expansion_is_post_order_and_deduplicated() {
        let mut names = Interner::new();
        let graph = graph_with(
            &mut names,
            &[("a", &["b", "c"]), ("b", &["d"]), ("c", &["d"]), ("d", &[])],
        );
        let a = graph.find_attr(names.intern("a")).unwrap();
        let mut order = Vec::new();
        graph.expand(a, |id| order.push(graph.attr(id).name.as_str())).unwrap();
        assert_eq!(order, ["d", "b", "c", "a"]);
    }

    #[test]
    fn expansion_reports_cycle_once() {
        let mut names = Interner::new();
        let graph = graph_with(&mut names, &[("a", &["b"]), ("b", &["a"])]);
        let a = graph.find_attr(names.intern("a")).unwrap();
        let mut visited = Vec::new();
        let errors = graph.expand(a, |id| visited.push(id)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.iter().next(),
            Some(&ConfigError::CircularDependency("a".into()))
        );
        assert_eq!(visited.len(), 2);
    }
}
