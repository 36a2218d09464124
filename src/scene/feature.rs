//! Object features
//!
//! A feature is a capability attached to exactly one object for its whole
//! lifetime (a renderable, a collider, a bounding volume...). The scene graph
//! only knows features through the [`Feature`] trait; concrete types are
//! recovered by downcasting ([`Scene::feature`](super::Scene::feature)).
//!
//! # Caching transformations
//!
//! Features can cache the absolute transformation of their object instead of
//! recomputing it every time. Caching is disabled by default; a feature opts
//! in by returning a non-empty set from
//! [`Feature::cached_transformations`] and overriding [`Feature::clean`],
//! [`Feature::clean_inverted`] or both:
//!
//! ```rust
//! use glam::{Affine3A, Mat4, Vec3};
//! use myth_scenegraph::scene::{CachedTransformations, Feature, Scene3D};
//!
//! #[derive(Default)]
//! struct CachedPosition {
//!     position: Vec3,
//! }
//!
//! impl Feature<Affine3A> for CachedPosition {
//!     fn cached_transformations(&self) -> CachedTransformations {
//!         CachedTransformations::ABSOLUTE
//!     }
//!
//!     fn clean(&mut self, absolute: &Mat4) {
//!         self.position = absolute.w_axis.truncate();
//!     }
//! }
//!
//! let mut scene = Scene3D::new();
//! let object = scene
//!     .add_object_with(scene.root(), Affine3A::from_translation(Vec3::X))
//!     .unwrap();
//! let feature = scene.add_feature(object, CachedPosition::default()).unwrap();
//!
//! // Cached values are refreshed only on an explicit clean.
//! scene.set_clean(object);
//! assert_eq!(scene.feature::<CachedPosition>(feature).unwrap().position, Vec3::X);
//! ```
//!
//! The declared set is read at every clean, so a feature can change it at
//! any time through its own API. Values cached under the old set are not
//! invalidated; call [`Scene::mark_dirty`](super::Scene::mark_dirty) on the
//! object if they must be refreshed.

use std::any::Any;

use bitflags::bitflags;

use crate::linked_list::{Links, ListItem};
use crate::scene::object::Object;
use crate::scene::scene::Scene;
use crate::scene::transform_system;
use crate::scene::transformation::Transformation;
use crate::scene::{FeatureKey, ObjectKey};

/// Which transformation a feature caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CachedTransformation {
    /// Absolute transformation, delivered to [`Feature::clean`].
    Absolute,
    /// Inverted absolute transformation, delivered to
    /// [`Feature::clean_inverted`].
    InvertedAbsolute,
}

bitflags! {
    /// Set of [`CachedTransformation`]s requested by a feature.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct CachedTransformations: u8 {
        const ABSOLUTE = 1 << 0;
        const INVERTED_ABSOLUTE = 1 << 1;
    }
}

impl From<CachedTransformation> for CachedTransformations {
    fn from(value: CachedTransformation) -> Self {
        match value {
            CachedTransformation::Absolute => Self::ABSOLUTE,
            CachedTransformation::InvertedAbsolute => Self::INVERTED_ABSOLUTE,
        }
    }
}

impl CachedTransformations {
    #[inline]
    #[must_use]
    pub fn has(self, transformation: CachedTransformation) -> bool {
        self.contains(transformation.into())
    }
}

/// Capability attached to a scene object.
///
/// Every hook has a no-op default. Hooks only receive `&mut self`, so the
/// graph is out of reach while a traversal is running.
pub trait Feature<T: Transformation>: Any {
    /// Transformations this feature wants delivered on clean.
    fn cached_transformations(&self) -> CachedTransformations {
        CachedTransformations::empty()
    }

    /// Called when the owning object turns from clean to dirty.
    ///
    /// Use it to invalidate data derived from the transformation (bounding
    /// volumes, spatial index entries) ahead of the next clean.
    fn mark_dirty(&mut self) {}

    /// Receives the absolute transformation matrix of the owning object.
    ///
    /// Only called when [`CachedTransformations::ABSOLUTE`] is requested.
    fn clean(&mut self, _absolute: &T::Matrix) {}

    /// Receives the inverted absolute transformation matrix of the owning
    /// object.
    ///
    /// Only called when [`CachedTransformations::INVERTED_ABSOLUTE`] is
    /// requested.
    fn clean_inverted(&mut self, _inverted_absolute: &T::Matrix) {}
}

/// Arena entry holding a type-erased feature and its list links.
pub struct FeatureSlot<T: Transformation> {
    pub(crate) links: Links<FeatureKey, ObjectKey>,
    pub(crate) feature: Box<dyn Feature<T>>,
}

impl<T: Transformation> FeatureSlot<T> {
    pub(crate) fn new(feature: Box<dyn Feature<T>>) -> Self {
        Self {
            links: Links::default(),
            feature,
        }
    }

    /// Object this feature is attached to.
    #[inline]
    #[must_use]
    pub fn object(&self) -> Option<ObjectKey> {
        self.links.owner()
    }

    #[inline]
    #[must_use]
    pub fn feature(&self) -> &dyn Feature<T> {
        self.feature.as_ref()
    }
}

impl<T: Transformation> ListItem<FeatureKey> for FeatureSlot<T> {
    type Owner = ObjectKey;

    #[inline]
    fn links(&self) -> &Links<FeatureKey, ObjectKey> {
        &self.links
    }

    #[inline]
    fn links_mut(&mut self) -> &mut Links<FeatureKey, ObjectKey> {
        &mut self.links
    }
}

/// Read access to the object a feature is being constructed for.
///
/// Handed to the builder closure of
/// [`Scene::add_feature_with`](super::Scene::add_feature_with), so a feature
/// can capture whatever it needs from its object's transformation up front.
pub struct FeatureContext<'a, T: Transformation> {
    pub(crate) scene: &'a Scene<T>,
    pub(crate) key: ObjectKey,
    pub(crate) object: &'a Object<T>,
}

impl<'a, T: Transformation> FeatureContext<'a, T> {
    #[inline]
    #[must_use]
    pub fn object(&self) -> ObjectKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<ObjectKey> {
        self.object.parent()
    }

    #[inline]
    #[must_use]
    pub fn transformation(&self) -> &'a T {
        &self.object.transformation
    }

    /// Absolute transformation of the object, computed from the root.
    #[must_use]
    pub fn absolute_transformation(&self) -> T {
        transform_system::absolute_transformation(&self.scene.objects, self.key)
            .unwrap_or_else(T::identity)
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &'a Scene<T> {
        self.scene
    }
}
