//! Unique handles to live arena objects.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Owning reference to one live object in an [`Arena`](crate::Arena).
///
/// Handles are neither `Clone` nor `Copy`. [`Arena::free`](crate::Arena::free)
/// takes the handle by value, so a freed slot cannot be freed again or
/// reached through a stale handle.
pub struct ArenaHandle<T> {
    pub(crate) arena: u32,
    pub(crate) index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ArenaHandle<T> {
    pub(crate) fn new(arena: u32, index: u32) -> Self {
        Self {
            arena,
            index,
            _marker: PhantomData,
        }
    }

    /// Slot index within the owning arena.
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl<T> fmt::Debug for ArenaHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaHandle")
            .field("arena", &self.arena)
            .field("index", &self.index)
            .finish()
    }
}

impl<T> PartialEq for ArenaHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.arena == other.arena && self.index == other.index
    }
}

impl<T> Eq for ArenaHandle<T> {}

impl<T> Hash for ArenaHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arena.hash(state);
        self.index.hash(state);
    }
}
