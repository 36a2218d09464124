use crate::linked_list::{LinkedList, Links, ListItem};
use crate::scene::transformation::Transformation;
use crate::scene::{FeatureKey, ObjectKey};

/// A scene graph node.
///
/// # Hierarchy
///
/// Objects form a tree through two intrusive lists:
/// - `links`: this object's position in its parent's children list. The
///   link owner is the parent (`None` only for the scene root).
/// - `children`: head of the list of exclusively owned child objects.
/// - `features`: head of the list of exclusively owned features.
///
/// # Transformation
///
/// Each object stores its local transformation plus the absolute (and
/// optionally inverted absolute) transformation computed by the last clean.
/// Cached values are only meaningful while the object is clean; marking an
/// object dirty leaves them untouched.
///
/// Objects are created and mutated through [`Scene`](super::Scene), which
/// keeps the lists and dirty flags consistent.
#[derive(Debug, Clone)]
pub struct Object<T: Transformation> {
    pub(crate) links: Links<ObjectKey, ObjectKey>,
    pub(crate) children: LinkedList<ObjectKey>,
    pub(crate) features: LinkedList<FeatureKey>,

    pub(crate) transformation: T,
    pub(crate) absolute: T,
    pub(crate) inverted_absolute: Option<T>,
    pub(crate) dirty: bool,
}

impl<T: Transformation> Object<T> {
    /// New objects start dirty: nothing has been computed for them yet.
    pub(crate) fn new(transformation: T) -> Self {
        Self {
            links: Links::default(),
            children: LinkedList::new(),
            features: LinkedList::new(),
            transformation,
            absolute: T::identity(),
            inverted_absolute: None,
            dirty: true,
        }
    }

    /// The scene root: identity everywhere and permanently clean.
    pub(crate) fn root() -> Self {
        Self {
            dirty: false,
            inverted_absolute: Some(T::identity()),
            ..Self::new(T::identity())
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ObjectKey> {
        self.links.owner()
    }

    #[inline]
    #[must_use]
    pub fn next_sibling(&self) -> Option<ObjectKey> {
        self.links.next()
    }

    #[inline]
    #[must_use]
    pub fn previous_sibling(&self) -> Option<ObjectKey> {
        self.links.previous()
    }

    #[inline]
    #[must_use]
    pub fn first_child(&self) -> Option<ObjectKey> {
        self.children.first()
    }

    #[inline]
    #[must_use]
    pub fn last_child(&self) -> Option<ObjectKey> {
        self.children.last()
    }

    #[inline]
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    #[inline]
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    /// Local transformation relative to the parent.
    #[inline]
    #[must_use]
    pub fn transformation(&self) -> &T {
        &self.transformation
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Absolute transformation from the last clean, if still valid.
    #[inline]
    #[must_use]
    pub fn cached_absolute(&self) -> Option<&T> {
        (!self.dirty).then_some(&self.absolute)
    }

    /// Inverted absolute transformation, if the last clean computed it and it
    /// is still valid.
    #[inline]
    #[must_use]
    pub fn cached_inverted_absolute(&self) -> Option<&T> {
        if self.dirty {
            None
        } else {
            self.inverted_absolute.as_ref()
        }
    }
}

impl<T: Transformation> ListItem<ObjectKey> for Object<T> {
    type Owner = ObjectKey;

    #[inline]
    fn links(&self) -> &Links<ObjectKey, ObjectKey> {
        &self.links
    }

    #[inline]
    fn links_mut(&mut self) -> &mut Links<ObjectKey, ObjectKey> {
        &mut self.links
    }
}
