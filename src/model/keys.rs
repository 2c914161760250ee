//! Typed arena handles.
//!
//! Every model object lives in a per-type [`Arena`] owned by the
//! [`Model`](super::Model). Relationships between objects are stored as
//! [`Key`]s, so the object graph has a single owner and no ownership
//! cycles even when references point both ways.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use serde::{Serialize, Serializer};

/// Index of an object of type `T` inside its arena.
///
/// The type parameter is a marker only; a `Key<Channel>` cannot be used
/// where a `Key<Image>` is expected.
pub struct Key<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    #[inline]
    fn from_raw(index: u32) -> Self {
        Self {
            index,
            _marker: PhantomData,
        }
    }

    /// The key for arena position `index`, if it fits in a key.
    #[inline]
    fn try_new(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self::from_raw)
    }

    /// Returns the position of the object in its arena.
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Key<T> {}

impl<T> PartialOrd for Key<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Key<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.index.cmp(&other.index)
    }
}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.index)
    }
}

impl<T> Serialize for Key<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.index)
    }
}

/// Append-only storage for objects of one type.
#[derive(Clone, Debug)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Arena<T> {
    /// Stores a value and returns its key.
    ///
    /// # Panics
    ///
    /// Panics if the arena already holds `u32::MAX + 1` objects.
    pub fn alloc(&mut self, value: T) -> Key<T> {
        let Some(key) = Key::try_new(self.items.len()) else {
            panic!("arena for {} is full", std::any::type_name::<T>());
        };
        self.items.push(value);
        key
    }

    pub fn get(&self, key: Key<T>) -> Option<&T> {
        self.items.get(key.index())
    }

    pub fn get_mut(&mut self, key: Key<T>) -> Option<&mut T> {
        self.items.get_mut(key.index())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates over all objects with their keys, in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Key<T>, &T)> {
        self.items
            .iter()
            .zip(0..=u32::MAX)
            .map(|(item, index)| (Key::from_raw(index), item))
    }
}

impl<T> Index<Key<T>> for Arena<T> {
    type Output = T;

    fn index(&self, key: Key<T>) -> &T {
        &self.items[key.index()]
    }
}

impl<T> IndexMut<Key<T>> for Arena<T> {
    fn index_mut(&mut self, key: Key<T>) -> &mut T {
        &mut self.items[key.index()]
    }
}

/// Ordered list of reference targets (or back-reference sources).
///
/// Insertion keeps document order and ignores entries that are already
/// present. Mutation is reserved to the crate so that forward and back
/// edges can only change together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RefList<K> {
    items: Vec<K>,
}

impl<K> Default for RefList<K> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<K: Copy + PartialEq> RefList<K> {
    /// Appends `item` unless already present. Returns true if added.
    pub(crate) fn link(&mut self, item: K) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Removes `item`. Returns true if it was present.
    pub(crate) fn unlink(&mut self, item: K) -> bool {
        match self.items.iter().position(|existing| *existing == item) {
            Some(pos) => {
                self.items.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, item: K) -> bool {
        self.items.contains(&item)
    }

    pub fn get(&self, index: usize) -> Option<K> {
        self.items.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.items.iter().copied()
    }

    pub fn as_slice(&self) -> &[K] {
        &self.items
    }

    /// Copies the list, in stored order.
    pub fn to_vec(&self) -> Vec<K> {
        self.items.clone()
    }
}
