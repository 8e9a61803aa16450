//! Attribute definitions and attribute selection.

use crate::error::{ConfigError, Errors, Result};
use crate::graph::AttrId;
use crate::session::Session;
use crate::symbol::Sym;
use crate::value::LocatorSpec;

impl Session {
    /// Defines a plain (`locators == None`) or interface attribute.
    ///
    /// Dependencies may be forward references. The new attribute is expanded
    /// once right away so that dependency cycles are reported at the
    /// directive that closes them.
    ///
    /// # Errors
    /// - [`ConfigError::DuplicateDefinition`] if `name` is already defined.
    /// - [`ConfigError::BadDependency`] if a dependency is an interface
    ///   attribute, or if an interface attribute has dependencies.
    /// - [`ConfigError::CircularDependency`] if the definition closes a cycle.
    pub fn define_attribute(
        &mut self,
        name: Sym,
        locators: Option<Vec<LocatorSpec>>,
        deps: &[Sym],
    ) -> Result<AttrId> {
        if self.graph.find_attr(name).is_some_and(|id| self.graph.attr(id).defined) {
            return Err(ConfigError::duplicate("attribute", name).into());
        }
        let mut errors = Errors::new();
        let mut dep_ids = Vec::with_capacity(deps.len());
        for &dep in deps {
            let id = self.graph.ref_attr(dep);
            if locators.is_some() || self.graph.attr(id).is_interface() {
                errors.push(ConfigError::BadDependency {
                    name: name.to_string(),
                    dep: dep.to_string(),
                });
            }
            dep_ids.push(id);
        }
        let id = errors.into_result(self.graph.ref_attr(name))?;
        let attr = self.graph.attrs.get_mut(id);
        attr.defined = true;
        attr.locators = locators;
        attr.deps = dep_ids;
        self.graph.expand(id, |_| ())?;
        log::trace!("attribute `{name}` defined");
        Ok(id)
    }

    /// Defines a device class attribute.
    ///
    /// # Errors
    /// - [`ConfigError::BadBaseName`] unless the name is lower-case
    ///   alphabetic.
    /// - Everything [`Session::define_attribute`] reports.
    pub fn define_devclass(&mut self, name: Sym) -> Result<AttrId> {
        if name.is_empty() || !name.as_str().bytes().all(|b| b.is_ascii_lowercase()) {
            return Err(ConfigError::BadBaseName(name.to_string()).into());
        }
        let id = self.define_attribute(name, None, &[])?;
        self.graph.attrs.get_mut(id).devclass = true;
        Ok(id)
    }

    /// Adds `attr` and its whole dependency closure to the selected set.
    pub(crate) fn select_expansion(&mut self, attr: AttrId) -> Result<()> {
        let mut picked = Vec::new();
        let outcome = self.graph.expand(attr, |id| picked.push(id));
        for id in picked {
            let name = self.graph.attr(id).name;
            if self.registry.selected.insert(name, ()).is_none() {
                log::trace!("selected attribute `{name}`");
            }
        }
        outcome
    }

    /// Selects a defined attribute by name.
    ///
    /// # Errors
    /// [`ConfigError::UnknownName`] if no such attribute is defined.
    pub fn select_attr(&mut self, name: Sym) -> Result<()> {
        let id = self
            .graph
            .find_attr(name)
            .filter(|&id| self.graph.attr(id).defined)
            .ok_or_else(|| ConfigError::unknown("attribute", name))?;
        self.select_expansion(id)
    }

    /// Removes an attribute and every selected attribute that depends on it
    /// from the selected set.
    ///
    /// # Errors
    /// [`ConfigError::UnknownName`] if no such attribute is defined.
    pub fn deselect_attr(&mut self, name: Sym) -> Result<()> {
        let id = self
            .graph
            .find_attr(name)
            .filter(|&id| self.graph.attr(id).defined)
            .ok_or_else(|| ConfigError::unknown("attribute", name))?;
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let name = self.graph.attr(id).name;
            if self.registry.selected.remove(&name).is_none() {
                continue;
            }
            pending.extend(
                self.graph
                    .attrs()
                    .filter(|(_, a)| a.deps.contains(&id))
                    .map(|(dependent, _)| dependent),
            );
        }
        Ok(())
    }
}
