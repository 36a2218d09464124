use std::any::Any;

use glam::{Affine2, Affine3A};
use slotmap::SlotMap;

use crate::errors::{Result, SceneGraphError};
use crate::linked_list::{Iter, LinkedList};
use crate::scene::feature::{Feature, FeatureContext, FeatureSlot};
use crate::scene::object::Object;
use crate::scene::settings::SceneSettings;
use crate::scene::transform_system::{self, CleanStats};
use crate::scene::transformation::Transformation;
use crate::scene::{FeatureKey, ObjectKey};

/// Two-dimensional scene using affine transformations.
pub type Scene2D = Scene<Affine2>;
/// Three-dimensional scene using affine transformations.
pub type Scene3D = Scene<Affine3A>;

/// Iterator over the child keys of an object.
pub type Children<'a, T> = Iter<'a, ObjectKey, Object<T>>;
/// Iterator over the feature keys of an object.
pub type Features<'a, T> = Iter<'a, FeatureKey, FeatureSlot<T>>;

/// Scene graph
///
/// The scene owns every object and feature in two slot-map arenas and
/// anchors the hierarchy with a root object. The root has no parent, an
/// identity transformation, and is never dirty.
///
/// Objects and features are addressed by [`ObjectKey`] / [`FeatureKey`].
/// Keys are non-owning; once an object is removed every key into its
/// subtree resolves to `None` (or an error) instead of dangling.
///
/// # Caching
///
/// Changing an object's transformation only flags its subtree dirty.
/// Absolute transformations are recomputed on explicit request through
/// [`set_clean`](Self::set_clean), [`set_clean_many`](Self::set_clean_many)
/// and [`set_clean_all`](Self::set_clean_all).
///
/// # Threading
///
/// The scene has no internal locking. All mutation must be serialized by
/// the caller.
pub struct Scene<T: Transformation> {
    pub(crate) objects: SlotMap<ObjectKey, Object<T>>,
    pub(crate) features: SlotMap<FeatureKey, FeatureSlot<T>>,
    root: ObjectKey,
    settings: SceneSettings,
}

impl<T: Transformation> Default for Scene<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transformation> Scene<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(SceneSettings::default())
    }

    #[must_use]
    pub fn with_settings(settings: SceneSettings) -> Self {
        let mut objects = SlotMap::with_capacity_and_key(settings.object_capacity.max(1));
        let root = objects.insert(Object::root());
        Self {
            objects,
            features: SlotMap::with_capacity_and_key(settings.feature_capacity),
            root,
            settings,
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> ObjectKey {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Adds an object with identity transformation under `parent`.
    pub fn add_object(&mut self, parent: ObjectKey) -> Result<ObjectKey> {
        self.add_object_with(parent, T::identity())
    }

    /// Adds an object with the given local transformation under `parent`.
    ///
    /// The object is appended to the parent's children and starts dirty.
    pub fn add_object_with(&mut self, parent: ObjectKey, transformation: T) -> Result<ObjectKey> {
        if !self.objects.contains_key(parent) {
            return Err(SceneGraphError::ObjectNotFound(parent));
        }
        let key = self.objects.insert(Object::new(transformation));
        self.edit_children(parent, |children, objects| {
            children.push_back(objects, parent, key);
        });
        Ok(key)
    }

    /// Moves `object` (with its subtree) under `parent`, appending it to the
    /// new parent's children, and marks it dirty.
    ///
    /// The local transformation is kept, so the absolute transformation
    /// generally changes. Re-parenting to the current parent does nothing.
    pub fn set_parent(&mut self, object: ObjectKey, parent: ObjectKey) -> Result<()> {
        self.check_reparent(object, parent)?;
        if self.parent(object) == Some(parent) {
            return Ok(());
        }
        self.relink(object, parent, None);
        transform_system::mark_dirty(&mut self.objects, &mut self.features, object);
        log::debug!("Re-parented object {object:?} under {parent:?}");
        Ok(())
    }

    /// Like [`set_parent`](Self::set_parent), but rewrites the local
    /// transformation so the absolute transformation stays unchanged.
    pub fn set_parent_keep_transformation(&mut self, object: ObjectKey, parent: ObjectKey) -> Result<()> {
        self.check_reparent(object, parent)?;
        if self.parent(object) == Some(parent) {
            return Ok(());
        }
        let absolute = self.absolute_transformation(object)?;
        let parent_absolute = self.absolute_transformation(parent)?;
        if let Some(node) = self.objects.get_mut(object) {
            node.transformation = parent_absolute.inverted().compose(&absolute);
        }
        self.relink(object, parent, None);
        transform_system::mark_dirty(&mut self.objects, &mut self.features, object);
        log::debug!("Re-parented object {object:?} under {parent:?} keeping its transformation");
        Ok(())
    }

    /// Moves `object` right before `sibling` in the sibling's parent.
    ///
    /// A pure reorder under the same parent leaves dirty state untouched;
    /// moving to another parent marks the object dirty.
    pub fn move_before(&mut self, object: ObjectKey, sibling: ObjectKey) -> Result<()> {
        if !self.objects.contains_key(sibling) {
            return Err(SceneGraphError::ObjectNotFound(sibling));
        }
        let parent = self.parent(sibling).ok_or(SceneGraphError::NotSiblingTarget(sibling))?;
        self.check_reparent(object, parent)?;
        if object == sibling {
            return Ok(());
        }

        let same_parent = self.parent(object) == Some(parent);
        self.relink(object, parent, Some(sibling));
        if !same_parent {
            transform_system::mark_dirty(&mut self.objects, &mut self.features, object);
            log::debug!("Re-parented object {object:?} under {parent:?}");
        }
        Ok(())
    }

    /// Destroys `object`, its features and its whole subtree.
    ///
    /// Each object's features are dropped before its children. Returns the
    /// number of objects destroyed.
    pub fn remove_object(&mut self, object: ObjectKey) -> Result<usize> {
        if object == self.root {
            return Err(SceneGraphError::RootImmutable);
        }
        let parent = self
            .objects
            .get(object)
            .ok_or(SceneGraphError::ObjectNotFound(object))?
            .parent();
        if let Some(parent) = parent {
            self.edit_children(parent, |children, objects| {
                children.cut(objects, object);
            });
        }

        let mut removed = 0;
        let mut removed_features = 0;
        let mut stack = vec![object];
        while let Some(current) = stack.pop() {
            let Some(node) = self.objects.get(current) else {
                continue;
            };
            let (features, children) = (node.features, node.children);

            let mut cursor = features.first();
            while let Some(feature) = cursor {
                cursor = self.features.get(feature).and_then(|slot| slot.links.next());
                self.features.remove(feature);
                removed_features += 1;
            }

            stack.extend(children.iter(&self.objects));
            self.objects.remove(current);
            removed += 1;
        }

        log::debug!("Removed object {object:?}: {removed} objects, {removed_features} features destroyed");
        Ok(removed)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, object: ObjectKey) -> bool {
        self.objects.contains_key(object)
    }

    /// Read-only view of an object.
    #[inline]
    #[must_use]
    pub fn object(&self, object: ObjectKey) -> Option<&Object<T>> {
        self.objects.get(object)
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, object: ObjectKey) -> Option<ObjectKey> {
        self.objects.get(object).and_then(Object::parent)
    }

    /// Child keys of `object` in list order; empty for a missing object.
    #[must_use]
    pub fn children(&self, object: ObjectKey) -> Children<'_, T> {
        self.objects
            .get(object)
            .map_or_else(LinkedList::new, |node| node.children)
            .iter(&self.objects)
    }

    #[inline]
    #[must_use]
    pub fn first_child(&self, object: ObjectKey) -> Option<ObjectKey> {
        self.objects.get(object).and_then(Object::first_child)
    }

    #[inline]
    #[must_use]
    pub fn last_child(&self, object: ObjectKey) -> Option<ObjectKey> {
        self.objects.get(object).and_then(Object::last_child)
    }

    #[inline]
    #[must_use]
    pub fn next_sibling(&self, object: ObjectKey) -> Option<ObjectKey> {
        self.objects.get(object).and_then(Object::next_sibling)
    }

    #[inline]
    #[must_use]
    pub fn previous_sibling(&self, object: ObjectKey) -> Option<ObjectKey> {
        self.objects.get(object).and_then(Object::previous_sibling)
    }

    #[inline]
    #[must_use]
    pub fn child_count(&self, object: ObjectKey) -> usize {
        self.objects.get(object).map_or(0, Object::child_count)
    }

    /// Number of objects in the scene, the root included.
    #[inline]
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of features attached anywhere in the scene.
    #[inline]
    #[must_use]
    pub fn feature_total(&self) -> usize {
        self.features.len()
    }

    fn check_reparent(&self, object: ObjectKey, parent: ObjectKey) -> Result<()> {
        if object == self.root {
            return Err(SceneGraphError::RootImmutable);
        }
        if !self.objects.contains_key(object) {
            return Err(SceneGraphError::ObjectNotFound(object));
        }
        if !self.objects.contains_key(parent) {
            return Err(SceneGraphError::ObjectNotFound(parent));
        }
        if object == parent {
            return Err(SceneGraphError::SelfParent(object));
        }
        let mut cursor = self.parent(parent);
        while let Some(ancestor) = cursor {
            if ancestor == object {
                return Err(SceneGraphError::CyclicHierarchy { object, parent });
            }
            cursor = self.parent(ancestor);
        }
        Ok(())
    }

    /// Cuts `object` from its current parent and links it into `parent`,
    /// either before `before` or at the end.
    fn relink(&mut self, object: ObjectKey, parent: ObjectKey, before: Option<ObjectKey>) {
        if let Some(old_parent) = self.parent(object) {
            self.edit_children(old_parent, |children, objects| {
                children.cut(objects, object);
            });
        }
        self.edit_children(parent, |children, objects| match before {
            Some(before) => children.insert_before(objects, parent, object, before),
            None => children.push_back(objects, parent, object),
        });
    }

    /// Runs `edit` on a copy of the parent's children list head and stores
    /// the result back.
    fn edit_children(
        &mut self,
        parent: ObjectKey,
        edit: impl FnOnce(&mut LinkedList<ObjectKey>, &mut SlotMap<ObjectKey, Object<T>>),
    ) {
        let Some(mut children) = self.objects.get(parent).map(|node| node.children) else {
            return;
        };
        edit(&mut children, &mut self.objects);
        if let Some(node) = self.objects.get_mut(parent) {
            node.children = children;
        }
    }

    // ========================================================================
    // Transformation
    // ========================================================================

    /// Local transformation of `object` relative to its parent.
    #[inline]
    #[must_use]
    pub fn transformation(&self, object: ObjectKey) -> Option<&T> {
        self.objects.get(object).map(Object::transformation)
    }

    /// Replaces the local transformation and marks the subtree dirty.
    pub fn set_transformation(&mut self, object: ObjectKey, transformation: T) -> Result<()> {
        let node = self.transformable(object)?;
        node.transformation = transformation;
        transform_system::mark_dirty(&mut self.objects, &mut self.features, object);
        Ok(())
    }

    /// Applies `transformation` on top of the local one, in the parent's
    /// frame: `local' = transformation ∘ local`.
    pub fn transform(&mut self, object: ObjectKey, transformation: &T) -> Result<()> {
        let node = self.transformable(object)?;
        node.transformation = transformation.compose(&node.transformation);
        transform_system::mark_dirty(&mut self.objects, &mut self.features, object);
        Ok(())
    }

    /// Applies `transformation` in the object's own frame:
    /// `local' = local ∘ transformation`.
    pub fn transform_local(&mut self, object: ObjectKey, transformation: &T) -> Result<()> {
        let node = self.transformable(object)?;
        node.transformation = node.transformation.compose(transformation);
        transform_system::mark_dirty(&mut self.objects, &mut self.features, object);
        Ok(())
    }

    /// Resets the local transformation to identity.
    pub fn reset_transformation(&mut self, object: ObjectKey) -> Result<()> {
        self.set_transformation(object, T::identity())
    }

    fn transformable(&mut self, object: ObjectKey) -> Result<&mut Object<T>> {
        if object == self.root {
            return Err(SceneGraphError::RootImmutable);
        }
        self.objects
            .get_mut(object)
            .ok_or(SceneGraphError::ObjectNotFound(object))
    }

    /// Absolute transformation computed on the fly from the root.
    ///
    /// Caches are neither read nor updated, so this works on dirty objects.
    pub fn absolute_transformation(&self, object: ObjectKey) -> Result<T> {
        transform_system::absolute_transformation(&self.objects, object)
            .ok_or(SceneGraphError::ObjectNotFound(object))
    }

    /// Matrix form of [`absolute_transformation`](Self::absolute_transformation).
    pub fn absolute_transformation_matrix(&self, object: ObjectKey) -> Result<T::Matrix> {
        self.absolute_transformation(object).map(|t| t.to_matrix())
    }

    /// Computes the absolute transformations of several objects at once,
    /// in input order.
    pub fn absolute_transformations(&self, objects: &[ObjectKey]) -> Result<Vec<T>> {
        objects
            .iter()
            .map(|&object| self.absolute_transformation(object))
            .collect()
    }

    /// Absolute transformation stored by the last clean, if the object is
    /// currently clean.
    #[inline]
    #[must_use]
    pub fn cached_absolute_transformation(&self, object: ObjectKey) -> Option<&T> {
        self.objects.get(object).and_then(Object::cached_absolute)
    }

    /// Inverted absolute transformation stored by the last clean, if it was
    /// computed and the object is currently clean.
    #[inline]
    #[must_use]
    pub fn cached_inverted_absolute_transformation(&self, object: ObjectKey) -> Option<&T> {
        self.objects.get(object).and_then(Object::cached_inverted_absolute)
    }

    // ========================================================================
    // Dirty tracking & cleaning
    // ========================================================================

    /// Returns `true` if `object` exists and is dirty.
    #[inline]
    #[must_use]
    pub fn is_dirty(&self, object: ObjectKey) -> bool {
        self.objects.get(object).is_some_and(Object::is_dirty)
    }

    /// Flags `object` and its subtree dirty and notifies their features.
    pub fn mark_dirty(&mut self, object: ObjectKey) {
        if !self.objects.contains_key(object) {
            log::warn!("mark_dirty ignored: object {object:?} not found");
            return;
        }
        transform_system::mark_dirty(&mut self.objects, &mut self.features, object);
    }

    /// Cleans `object` and its dirty ancestors, delivering cached
    /// transformations to their features.
    pub fn set_clean(&mut self, object: ObjectKey) -> CleanStats {
        if !self.objects.contains_key(object) {
            log::warn!("set_clean ignored: object {object:?} not found");
            return CleanStats::default();
        }
        let stats = transform_system::clean_object(
            &mut self.objects,
            &mut self.features,
            object,
            self.settings.inversion,
        );
        Self::trace_stats(&stats);
        stats
    }

    /// Cleans several objects; shared ancestors are cleaned only once.
    pub fn set_clean_many(&mut self, objects: &[ObjectKey]) -> CleanStats {
        let mut stats = CleanStats::default();
        for &object in objects {
            if !self.objects.contains_key(object) {
                log::warn!("set_clean ignored: object {object:?} not found");
                continue;
            }
            stats += transform_system::clean_object(
                &mut self.objects,
                &mut self.features,
                object,
                self.settings.inversion,
            );
        }
        Self::trace_stats(&stats);
        stats
    }

    /// Cleans every dirty object in the scene.
    pub fn set_clean_all(&mut self) -> CleanStats {
        let stats = transform_system::clean_all(
            &mut self.objects,
            &mut self.features,
            self.root,
            self.settings.inversion,
        );
        Self::trace_stats(&stats);
        stats
    }

    fn trace_stats(stats: &CleanStats) {
        if !stats.is_empty() {
            log::trace!(
                "Cleaned {} objects, {} features",
                stats.objects_cleaned,
                stats.features_cleaned
            );
        }
    }

    // ========================================================================
    // Features
    // ========================================================================

    /// Attaches `feature` to the end of `object`'s feature list.
    pub fn add_feature<F: Feature<T>>(&mut self, object: ObjectKey, feature: F) -> Result<FeatureKey> {
        let Some(node) = self.objects.get_mut(object) else {
            return Err(SceneGraphError::ObjectNotFound(object));
        };
        let key = self.features.insert(FeatureSlot::new(Box::new(feature)));
        node.features.push_back(&mut self.features, object, key);
        log::debug!("Attached feature {key:?} to object {object:?}");
        Ok(key)
    }

    /// Builds a feature from a [`FeatureContext`] describing `object`, then
    /// attaches it.
    pub fn add_feature_with<F, B>(&mut self, object: ObjectKey, build: B) -> Result<FeatureKey>
    where
        F: Feature<T>,
        B: FnOnce(FeatureContext<'_, T>) -> F,
    {
        let Some(node) = self.objects.get(object) else {
            return Err(SceneGraphError::ObjectNotFound(object));
        };
        let feature = build(FeatureContext {
            scene: self,
            key: object,
            object: node,
        });
        self.add_feature(object, feature)
    }

    /// Detaches a feature and hands it back to the caller.
    pub fn remove_feature(&mut self, feature: FeatureKey) -> Result<Box<dyn Feature<T>>> {
        let object = self
            .features
            .get(feature)
            .ok_or(SceneGraphError::FeatureNotFound(feature))?
            .object();
        if let Some(node) = object.and_then(|object| self.objects.get_mut(object)) {
            node.features.cut(&mut self.features, feature);
        }
        let slot = self
            .features
            .remove(feature)
            .ok_or(SceneGraphError::FeatureNotFound(feature))?;
        log::debug!("Detached feature {feature:?}");
        Ok(slot.feature)
    }

    /// Downcasts a feature to its concrete type.
    #[must_use]
    pub fn feature<F: Feature<T>>(&self, feature: FeatureKey) -> Option<&F> {
        let slot = self.features.get(feature)?;
        let any: &dyn Any = &*slot.feature;
        any.downcast_ref::<F>()
    }

    /// Mutable downcast of a feature to its concrete type.
    #[must_use]
    pub fn feature_mut<F: Feature<T>>(&mut self, feature: FeatureKey) -> Option<&mut F> {
        let slot = self.features.get_mut(feature)?;
        let any: &mut dyn Any = &mut *slot.feature;
        any.downcast_mut::<F>()
    }

    #[inline]
    #[must_use]
    pub fn feature_dyn(&self, feature: FeatureKey) -> Option<&dyn Feature<T>> {
        self.features.get(feature).map(FeatureSlot::feature)
    }

    /// Object a feature is attached to.
    #[inline]
    #[must_use]
    pub fn feature_object(&self, feature: FeatureKey) -> Option<ObjectKey> {
        self.features.get(feature).and_then(FeatureSlot::object)
    }

    /// Feature keys of `object` in attachment order; empty for a missing
    /// object.
    #[must_use]
    pub fn features(&self, object: ObjectKey) -> Features<'_, T> {
        self.objects
            .get(object)
            .map_or_else(LinkedList::new, |node| node.features)
            .iter(&self.features)
    }

    /// All features of concrete type `F` attached to `object`.
    pub fn features_of<F: Feature<T>>(&self, object: ObjectKey) -> impl Iterator<Item = &F> + '_ {
        self.features(object).filter_map(|key| self.feature::<F>(key))
    }

    #[inline]
    #[must_use]
    pub fn first_feature(&self, object: ObjectKey) -> Option<FeatureKey> {
        self.objects.get(object).and_then(|node| node.features.first())
    }

    #[inline]
    #[must_use]
    pub fn last_feature(&self, object: ObjectKey) -> Option<FeatureKey> {
        self.objects.get(object).and_then(|node| node.features.last())
    }

    #[inline]
    #[must_use]
    pub fn next_feature(&self, feature: FeatureKey) -> Option<FeatureKey> {
        self.features.get(feature).and_then(|slot| slot.links.next())
    }

    #[inline]
    #[must_use]
    pub fn previous_feature(&self, feature: FeatureKey) -> Option<FeatureKey> {
        self.features.get(feature).and_then(|slot| slot.links.previous())
    }

    #[inline]
    #[must_use]
    pub fn feature_count(&self, object: ObjectKey) -> usize {
        self.objects.get(object).map_or(0, Object::feature_count)
    }
}
