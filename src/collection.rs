use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use crate::models::{SourceItem, TargetRecord};

/// Entities that can be indexed by a stable identifier.
pub trait Keyed {
    type Key: Copy + Eq + Hash + fmt::Debug;

    fn key(&self) -> Self::Key;
}

/// Insertion-ordered collection with constant-time membership by key.
///
/// Duplicate keys are kept as separate entries; the index only answers
/// whether a key is present.
#[derive(Debug, Clone)]
pub struct IndexedSet<T: Keyed> {
    items: Vec<T>,
    index: HashSet<T::Key>,
}

pub type SourceCollection = IndexedSet<SourceItem>;
pub type TargetCollection = IndexedSet<TargetRecord>;

impl<T: Keyed> IndexedSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashSet::new(),
        }
    }

    pub fn push(&mut self, item: T) {
        self.index.insert(item.key());
        self.items.push(item);
    }

    pub fn contains(&self, key: T::Key) -> bool {
        self.index.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Keyed> Default for IndexedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> FromIterator<T> for IndexedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T: Keyed> Extend<T> for IndexedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<'a, T: Keyed> IntoIterator for &'a IndexedSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
