//! Orphan elimination.
//!
//! Starting at the devices attached at root, the pass walks down the
//! attachment tree and marks every instance whose parent has a matching
//! instance. An instance below a device removed with `no` is marked
//! ignored instead, so it silently drops out of the build:
//!
//! ```text
//!   root ─► mainbus0 ─► pci0 ─► wm0        Active
//!                   └─► isa0 (removed) ─► com0   Ignored
//!           (no uhub) ──────────► umass0   Unset: orphan
//! ```
//!
//! States only ever move up (`Unset` < `Ignored` < `Active`), and a base
//! is only descended into again when one of its instances changed, so the
//! walk terminates on cyclic attachment graphs too. Every run starts by
//! resetting all states, which makes the pass idempotent.

use crate::error::ConfigError;
use crate::graph::{Activity, AttrId, DevBaseId, Devi, PSpec};
use crate::session::Session;
use crate::value::Unit;
use std::collections::HashSet;

const fn rank(state: Activity) -> u8 {
    match state {
        Activity::Unset => 0,
        Activity::Ignored => 1,
        Activity::Active => 2,
    }
}

fn unit_matches(wanted: Unit, have: Unit) -> bool {
    matches!(wanted, Unit::Wild) || wanted == have || have == Unit::Star
}

#[derive(Default)]
struct Walk {
    /// `(base, via, parent)` shapes already followed through dead instances.
    dead_paths: HashSet<(DevBaseId, Option<AttrId>, Option<DevBaseId>)>,
}

impl Session {
    /// Whether `parent` has an instance in `state` at `unit`. For the
    /// ignored state, removed instances count too.
    fn has_any_instance(&self, parent: DevBaseId, unit: Unit, state: Activity) -> bool {
        let base = self.graph.base(parent);
        if base
            .instances
            .iter()
            .map(|&id| self.graph.devi(id))
            .any(|d| d.active == state && unit_matches(unit, d.unit))
        {
            return true;
        }
        state == Activity::Ignored
            && self
                .graph
                .devis()
                .any(|(_, d)| d.dead && d.base == parent && unit_matches(unit, d.unit))
    }

    fn same_shape(&self, devi: &Devi, via: Option<AttrId>, parent: Option<DevBaseId>) -> bool {
        match (devi.pspec, via) {
            (None, None) => devi.deva.is_some(),
            (Some(pspec), Some(via)) => {
                let PSpec { attr, parent: p, .. } = *self.graph.pspec(pspec);
                attr == via && p == parent
            }
            _ => false,
        }
    }

    /// The state an instance of shape `(via, parent)` at `pspec` reaches
    /// in a walk carrying `state`, if any.
    fn reached_state(
        &self,
        devi: &Devi,
        parent: Option<DevBaseId>,
        state: Activity,
    ) -> Option<Activity> {
        let (Some(parent), Some(pspec)) = (parent, devi.pspec) else {
            return Some(state);
        };
        let unit = self.graph.pspec(pspec).unit;
        if self.has_any_instance(parent, unit, state) {
            Some(state)
        } else if state == Activity::Active
            && self.has_any_instance(parent, unit, Activity::Ignored)
        {
            Some(Activity::Ignored)
        } else {
            None
        }
    }

    fn kill_orphans_at(
        &mut self,
        walk: &mut Walk,
        base: DevBaseId,
        via: Option<AttrId>,
        parent: Option<DevBaseId>,
        state: Activity,
    ) {
        let mut matched = false;
        let mut raised = Vec::new();
        for id in self.graph.base(base).instances.clone() {
            let devi = self.graph.devi(id);
            if !self.same_shape(devi, via, parent) {
                continue;
            }
            let Some(target) = self.reached_state(devi, parent, state) else {
                continue;
            };
            matched = true;
            if rank(devi.active) < rank(target) {
                self.graph.devis.get_mut(id).active = target;
                if !raised.contains(&target) {
                    raised.push(target);
                }
            }
        }

        if !matched {
            let dead = self
                .graph
                .devis()
                .any(|(_, d)| d.dead && d.base == base && self.same_shape(d, via, parent));
            if dead && walk.dead_paths.insert((base, via, parent)) {
                self.descend(walk, base, Activity::Ignored);
            }
            return;
        }
        raised.sort_by_key(|&s| core::cmp::Reverse(rank(s)));
        for target in raised {
            self.descend(walk, base, target);
        }
    }

    fn descend(&mut self, walk: &mut Walk, base: DevBaseId, state: Activity) {
        for attr in self.graph.base(base).attrs.clone() {
            for child in self.graph.attr(attr).children.clone() {
                self.kill_orphans_at(walk, child, Some(attr), Some(base), state);
            }
        }
    }

    /// Runs orphan elimination over the whole device graph.
    pub fn kill_orphans(&mut self) {
        let live: Vec<_> = self
            .graph
            .devis()
            .filter(|(_, d)| !d.dead)
            .map(|(id, d)| (id, self.graph.base(d.base).kind.is_pseudo()))
            .collect();
        for (id, pseudo) in live {
            self.graph.devis.get_mut(id).active = if pseudo {
                Activity::Active
            } else {
                Activity::Unset
            };
        }

        let mut walk = Walk::default();
        for base in self.graph.roots().collect::<Vec<_>>() {
            if self.graph.base(base).kind.is_pseudo() {
                if !self.graph.base(base).instances.is_empty() {
                    self.descend(&mut walk, base, Activity::Active);
                }
            } else {
                self.kill_orphans_at(&mut walk, base, None, None, Activity::Active);
            }
        }

        let pspecs: Vec<_> = self.graph.pspecs.ids().collect();
        for id in pspecs {
            let best = self
                .graph
                .pspec(id)
                .instances
                .iter()
                .map(|&i| self.graph.devi(i).active)
                .max_by_key(|&a| rank(a))
                .unwrap_or_default();
            self.graph.pspecs.get_mut(id).active = best;
        }
    }

    /// Reports instances the pass never reached.
    ///
    /// An instance below a concrete parent device is an error. One attached
    /// at a bare attribute is kept with a warning.
    pub(crate) fn report_orphans(&mut self) {
        let unreached: Vec<_> = self
            .graph
            .devis()
            .filter(|(_, d)| !d.dead && d.active == Activity::Unset)
            .map(|(_, d)| (d.clone(), d.pspec.and_then(|p| self.graph.pspec(p).parent)))
            .collect();
        for (devi, parent) in unreached {
            let at = devi.at.map_or_else(|| "root".to_string(), |a| a.to_string());
            if parent.is_some() {
                self.diag.error(
                    devi.location,
                    ConfigError::OrphanedInstance {
                        instance: devi.name.to_string(),
                        at,
                    },
                );
            } else {
                self.diag.warn(
                    devi.location,
                    format!("`{} at {at}` is orphaned (nothing attaches at `{at}`)", devi.name),
                );
            }
        }
        if self.options.verbose {
            let ignored: Vec<_> = self
                .graph
                .devis()
                .filter(|(_, d)| !d.dead && d.active == Activity::Ignored)
                .map(|(_, d)| (d.location, d.name))
                .collect();
            for (location, name) in ignored {
                self.diag.warn(location, format!("`{name}` ignored (parent removed)"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_matching() {
        assert!(unit_matches(Unit::Wild, Unit::Num(3)));
        assert!(unit_matches(Unit::Num(3), Unit::Num(3)));
        assert!(unit_matches(Unit::Num(3), Unit::Star));
        assert!(!unit_matches(Unit::Num(3), Unit::Num(4)));
        assert!(!unit_matches(Unit::Star, Unit::Num(4)));
    }

    #[test]
    fn states_are_ordered() {
        assert!(rank(Activity::Unset) < rank(Activity::Ignored));
        assert!(rank(Activity::Ignored) < rank(Activity::Active));
    }
}
