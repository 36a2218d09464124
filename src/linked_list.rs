//! Intrusive doubly-linked list over slotmap arenas.
//!
//! Items live in a [`SlotMap`] and embed a [`Links`] record naming their
//! owner and their neighbours. The list head, [`LinkedList`], only stores
//! the boundary keys and the length. It is `Copy`, so it can sit inside
//! another arena value (an object's children, an object's features).
//!
//! All structural operations are O(1). The list never frees memory: the
//! arena owns the items, and removing an item from the arena must be preceded
//! by [`LinkedList::cut`].

use std::iter::FusedIterator;

use slotmap::{Key, SlotMap};

/// Per-item link record: owning list holder plus previous/next sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Links<K: Key, O: Key> {
    owner: Option<O>,
    previous: Option<K>,
    next: Option<K>,
}

impl<K: Key, O: Key> Default for Links<K, O> {
    fn default() -> Self {
        Self {
            owner: None,
            previous: None,
            next: None,
        }
    }
}

impl<K: Key, O: Key> Links<K, O> {
    /// Holder of the list this item is linked into.
    #[inline]
    #[must_use]
    pub fn owner(&self) -> Option<O> {
        self.owner
    }

    #[inline]
    #[must_use]
    pub fn previous(&self) -> Option<K> {
        self.previous
    }

    #[inline]
    #[must_use]
    pub fn next(&self) -> Option<K> {
        self.next
    }

    /// Returns `true` when the item currently belongs to a list.
    #[inline]
    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.owner.is_some()
    }
}

/// Arena values that can be linked into a [`LinkedList`].
pub trait ListItem<K: Key> {
    /// Key type of the list holder.
    type Owner: Key;

    fn links(&self) -> &Links<K, Self::Owner>;
    fn links_mut(&mut self) -> &mut Links<K, Self::Owner>;
}

/// Head of an intrusive list whose items are stored in a `SlotMap<K, _>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedList<K: Key> {
    first: Option<K>,
    last: Option<K>,
    len: usize,
}

impl<K: Key> Default for LinkedList<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Key> LinkedList<K> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            first: None,
            last: None,
            len: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn first(&self) -> Option<K> {
        self.first
    }

    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<K> {
        self.last
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `key` at the end of the list.
    ///
    /// The item must not be linked into any list. Missing keys are ignored.
    pub fn push_back<V: ListItem<K>>(
        &mut self,
        arena: &mut SlotMap<K, V>,
        owner: V::Owner,
        key: K,
    ) {
        let previous_last = self.last;
        let Some(item) = arena.get_mut(key) else {
            return;
        };
        debug_assert!(!item.links().is_linked(), "list item is already linked");
        *item.links_mut() = Links {
            owner: Some(owner),
            previous: previous_last,
            next: None,
        };

        match previous_last.and_then(|last| arena.get_mut(last)) {
            Some(last) => last.links_mut().next = Some(key),
            None => self.first = Some(key),
        }
        self.last = Some(key);
        self.len += 1;
    }

    /// Prepends `key` at the start of the list.
    ///
    /// The item must not be linked into any list. Missing keys are ignored.
    pub fn push_front<V: ListItem<K>>(
        &mut self,
        arena: &mut SlotMap<K, V>,
        owner: V::Owner,
        key: K,
    ) {
        let previous_first = self.first;
        let Some(item) = arena.get_mut(key) else {
            return;
        };
        debug_assert!(!item.links().is_linked(), "list item is already linked");
        *item.links_mut() = Links {
            owner: Some(owner),
            previous: None,
            next: previous_first,
        };

        match previous_first.and_then(|first| arena.get_mut(first)) {
            Some(first) => first.links_mut().previous = Some(key),
            None => self.last = Some(key),
        }
        self.first = Some(key);
        self.len += 1;
    }

    /// Inserts `key` right before `before`, which must be an item of this list.
    ///
    /// Missing keys are ignored.
    pub fn insert_before<V: ListItem<K>>(
        &mut self,
        arena: &mut SlotMap<K, V>,
        owner: V::Owner,
        key: K,
        before: K,
    ) {
        let Some(anchor) = arena.get(before) else {
            return;
        };
        debug_assert_eq!(anchor.links().owner, Some(owner), "anchor belongs to another list");
        let Some(previous) = anchor.links().previous else {
            self.push_front(arena, owner, key);
            return;
        };

        let Some(item) = arena.get_mut(key) else {
            return;
        };
        debug_assert!(!item.links().is_linked(), "list item is already linked");
        *item.links_mut() = Links {
            owner: Some(owner),
            previous: Some(previous),
            next: Some(before),
        };

        if let Some(previous) = arena.get_mut(previous) {
            previous.links_mut().next = Some(key);
        }
        if let Some(anchor) = arena.get_mut(before) {
            anchor.links_mut().previous = Some(key);
        }
        self.len += 1;
    }

    /// Unlinks `key` from this list, relinking its neighbours.
    ///
    /// Returns `false` if the key is missing or not linked.
    pub fn cut<V: ListItem<K>>(&mut self, arena: &mut SlotMap<K, V>, key: K) -> bool {
        let Some(item) = arena.get_mut(key) else {
            return false;
        };
        if !item.links().is_linked() {
            return false;
        }
        let links = std::mem::take(item.links_mut());

        match links.previous.and_then(|previous| arena.get_mut(previous)) {
            Some(previous) => previous.links_mut().next = links.next,
            None => self.first = links.next,
        }
        match links.next.and_then(|next| arena.get_mut(next)) {
            Some(next) => next.links_mut().previous = links.previous,
            None => self.last = links.previous,
        }
        self.len -= 1;
        true
    }

    /// Iterates item keys front to back; use `.rev()` for back to front.
    #[must_use]
    pub fn iter<'a, V: ListItem<K>>(&self, arena: &'a SlotMap<K, V>) -> Iter<'a, K, V> {
        Iter {
            arena,
            front: self.first,
            back: self.last,
            remaining: self.len,
        }
    }
}

/// Double-ended cursor over the keys of a [`LinkedList`].
pub struct Iter<'a, K: Key, V> {
    arena: &'a SlotMap<K, V>,
    front: Option<K>,
    back: Option<K>,
    remaining: usize,
}

impl<K: Key, V: ListItem<K>> Iterator for Iter<'_, K, V> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.front?;
        self.front = self.arena.get(key).and_then(|item| item.links().next);
        self.remaining -= 1;
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Key, V: ListItem<K>> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<K> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.back?;
        self.back = self.arena.get(key).and_then(|item| item.links().previous);
        self.remaining -= 1;
        Some(key)
    }
}

impl<K: Key, V: ListItem<K>> ExactSizeIterator for Iter<'_, K, V> {}

impl<K: Key, V: ListItem<K>> FusedIterator for Iter<'_, K, V> {}
