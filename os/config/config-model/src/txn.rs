//! Statement-scoped transactions.
//!
//! A directive may allocate entities, link them into several registries
//! and only then discover an error (a bad locator on a device instance is
//! the typical case). All session state therefore lives in containers that
//! can take a checkpoint when a directive starts and either forget it on
//! success or restore it on failure:
//!
//! ```text
//!   begin ──► mutate … mutate ──► commit    (journal dropped)
//!                          └────► rollback  (allocations truncated,
//!                                            touched entries restored)
//! ```
//!
//! - **[`Arena`]** hands out typed [`Id`]s. Rollback truncates everything
//!   allocated after the checkpoint and restores the first-touch copy of
//!   every older entry mutated through [`Arena::get_mut`].
//! - **[`Table`]** is an insertion-ordered name table. Rollback restores
//!   the first-touch value (and position) of every key touched.
//! - **[`Slot`]** holds a plain value and snapshots it on first mutation.
//!
//! Checkpoints do not nest. Opening a second one before the first was
//! closed is a programming error and panics.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;
use core::ops::Index;
use indexmap::IndexMap;

/// Something that takes part in a statement transaction.
pub trait Transactional {
    /// Takes a checkpoint.
    fn begin(&mut self);
    /// Forgets the checkpoint and keeps all changes.
    fn commit(&mut self);
    /// Restores the state at the checkpoint.
    fn rollback(&mut self);
}

/// Typed index into an [`Arena`].
pub struct Id<T> {
    index: u32,
    marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    const fn new(index: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            index: index as u32,
            marker: PhantomData,
        }
    }

    /// Position of the entity in allocation order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)
    }
}

/// Append-only storage with checkpoint support.
#[derive(Debug, Clone)]
pub struct Arena<T> {
    items: Vec<T>,
    mark: Option<usize>,
    saved: IndexMap<usize, T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            mark: None,
            saved: IndexMap::new(),
        }
    }
}

impl<T: Clone> Arena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, value: T) -> Id<T> {
        let id = Id::new(self.items.len());
        self.items.push(value);
        id
    }

    #[must_use]
    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.items.get(id.index())
    }

    /// Mutable access; journals the entry if it predates the checkpoint.
    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        let index = id.index();
        if let Some(mark) = self.mark
            && index < mark
            && !self.saved.contains_key(&index)
        {
            self.saved.insert(index, self.items[index].clone());
        }
        &mut self.items[index]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Id<T>, &T)> {
        self.items.iter().enumerate().map(|(i, v)| (Id::new(i), v))
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = Id<T>> + use<T> {
        (0..self.items.len()).map(Id::new)
    }
}

impl<T> Index<Id<T>> for Arena<T> {
    type Output = T;

    fn index(&self, id: Id<T>) -> &T {
        &self.items[id.index()]
    }
}

impl<T> Transactional for Arena<T> {
    fn begin(&mut self) {
        assert!(self.mark.is_none(), "nested arena checkpoint");
        self.mark = Some(self.items.len());
    }

    fn commit(&mut self) {
        self.mark = None;
        self.saved.clear();
    }

    fn rollback(&mut self) {
        if let Some(mark) = self.mark.take() {
            self.items.truncate(mark);
            for (index, value) in self.saved.drain(..) {
                self.items[index] = value;
            }
        }
    }
}

/// Insertion-ordered name table with checkpoint support.
#[derive(Debug, Clone)]
pub struct Table<K, V> {
    map: IndexMap<K, V>,
    open: bool,
    saved: IndexMap<K, Option<(usize, V)>>,
}

impl<K, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            map: IndexMap::new(),
            open: false,
            saved: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> Table<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn save(&mut self, key: &K) {
        if self.open && !self.saved.contains_key(key) {
            let old = self.map.get_full(key).map(|(i, _, v)| (i, v.clone()));
            self.saved.insert(key.clone(), old);
        }
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.save(key);
        self.map.get_mut(key)
    }

    /// Inserts or replaces; a replaced key keeps its position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.save(&key);
        self.map.insert(key, value)
    }

    /// Removes `key`, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.save(key);
        self.map.shift_remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, K, V> {
        self.map.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, K, V> {
        self.map.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, K, V> {
        self.map.values()
    }
}

impl<K: Hash + Eq, V> Transactional for Table<K, V> {
    fn begin(&mut self) {
        assert!(!self.open, "nested table checkpoint");
        self.open = true;
    }

    fn commit(&mut self) {
        self.open = false;
        self.saved.clear();
    }

    fn rollback(&mut self) {
        self.open = false;
        while let Some((key, old)) = self.saved.pop() {
            self.map.shift_remove(&key);
            if let Some((index, value)) = old {
                let index = index.min(self.map.len());
                self.map.shift_insert(index, key, value);
            }
        }
    }
}

/// A single value with checkpoint support.
#[derive(Debug, Clone, Default)]
pub struct Slot<T> {
    value: T,
    saved: Option<T>,
    open: bool,
}

impl<T: Clone> Slot<T> {
    pub const fn new(value: T) -> Self {
        Self {
            value,
            saved: None,
            open: false,
        }
    }

    #[must_use]
    pub const fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        if self.open && self.saved.is_none() {
            self.saved = Some(self.value.clone());
        }
        &mut self.value
    }
}

impl<T> Transactional for Slot<T> {
    fn begin(&mut self) {
        assert!(!self.open, "nested slot checkpoint");
        self.open = true;
    }

    fn commit(&mut self) {
        self.open = false;
        self.saved = None;
    }

    fn rollback(&mut self) {
        self.open = false;
        if let Some(saved) = self.saved.take() {
            self.value = saved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_rollback_truncates_and_restores() {
        let mut arena = Arena::new();
        let a = arena.alloc(String::from("a"));
        arena.begin();
        arena.get_mut(a).push('!');
        arena.get_mut(a).push('?');
        let b = arena.alloc(String::from("b"));
        assert_eq!(arena[b], "b");
        arena.rollback();
        assert_eq!(arena.len(), 1);
        assert_eq!(arena[a], "a");
    }

    #[test]
    fn arena_commit_keeps_changes() {
        let mut arena = Arena::new();
        let a = arena.alloc(1);
        arena.begin();
        *arena.get_mut(a) = 2;
        arena.alloc(3);
        arena.commit();
        assert_eq!(arena.len(), 2);
        assert_eq!(arena[a], 2);
        arena.begin();
        *arena.get_mut(a) = 7;
        arena.rollback();
        assert_eq!(arena[a], 2);
    }

    #[test]
    fn table_rollback_restores_order() {
        let mut table = Table::new();
        table.insert("a", 1);
        table.insert("b", 2);
        table.insert("c", 3);
        table.begin();
        table.remove(&"b");
        table.insert("d", 4);
        *table.get_mut(&"a").unwrap() = 10;
        table.insert("b", 20);
        table.rollback();
        let entries: Vec<_> = table.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(entries, [("a", 1), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn slot_rollback() {
        let mut slot = Slot::new(Some(4));
        slot.begin();
        *slot.get_mut() = None;
        slot.rollback();
        assert_eq!(*slot.get(), Some(4));
    }

    #[test]
    #[should_panic(expected = "nested")]
    fn nested_checkpoint_panics() {
        let mut arena: Arena<u8> = Arena::new();
        arena.begin();
        arena.begin();
    }
}
