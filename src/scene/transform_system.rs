//! Transform System
//!
//! Dirty propagation and lazy cleaning of absolute transformations.
//!
//! These functions are decoupled from [`Scene`](super::Scene) and only
//! borrow the object and feature arenas, so the scene can call them while
//! holding other borrows of itself.
//!
//! All traversals use explicit stacks instead of recursion. Recursion depth
//! would otherwise equal the hierarchy depth, and very deep scenes could
//! overflow the stack.
//!
//! # Invariant
//!
//! A clean object never has a dirty ancestor. Marking dirty spreads down the
//! hierarchy; cleaning walks up to the nearest clean ancestor (the *anchor*)
//! and recomputes the path back down.

use std::ops::AddAssign;

use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::linked_list::LinkedList;
use crate::scene::feature::{CachedTransformations, FeatureSlot};
use crate::scene::object::Object;
use crate::scene::settings::InversionPolicy;
use crate::scene::transformation::Transformation;
use crate::scene::{FeatureKey, ObjectKey};

/// Most hierarchies are shallow; paths up to this depth stay on the stack.
const INLINE_PATH_DEPTH: usize = 16;

type ObjectArena<T> = SlotMap<ObjectKey, Object<T>>;
type FeatureArena<T> = SlotMap<FeatureKey, FeatureSlot<T>>;

/// Work done by a clean call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    /// Objects whose dirty flag was cleared.
    pub objects_cleaned: usize,
    /// Features that received at least one cleaning hook.
    pub features_cleaned: usize,
}

impl CleanStats {
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects_cleaned == 0
    }
}

impl AddAssign for CleanStats {
    fn add_assign(&mut self, rhs: Self) {
        self.objects_cleaned += rhs.objects_cleaned;
        self.features_cleaned += rhs.features_cleaned;
    }
}

enum Visit {
    Enter(ObjectKey),
    Exit(ObjectKey),
}

/// Marks `key` and its still-clean subtree dirty.
///
/// Already-dirty objects short-circuit, so their subtrees are not walked
/// again. Feature `mark_dirty` hooks of an object run after its children
/// have been marked. The root (the object without parent) is never flagged
/// itself, but marking it propagates to its children and notifies its
/// features.
///
/// Returns the number of objects that turned dirty.
pub fn mark_dirty<T: Transformation>(
    objects: &mut ObjectArena<T>,
    features: &mut FeatureArena<T>,
    key: ObjectKey,
) -> usize {
    let mut marked = 0;
    let mut stack = vec![Visit::Enter(key)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(current) => {
                let Some(object) = objects.get_mut(current) else {
                    continue;
                };
                if object.dirty {
                    continue;
                }
                if object.parent().is_some() {
                    object.dirty = true;
                    marked += 1;
                }
                let children = object.children;

                stack.push(Visit::Exit(current));
                // Reverse push keeps children visited in list order.
                stack.extend(children.iter(objects).rev().map(Visit::Enter));
            }
            Visit::Exit(current) => {
                if let Some(object) = objects.get(current) {
                    notify_dirty(features, object.features);
                }
            }
        }
    }

    marked
}

fn notify_dirty<T: Transformation>(features: &mut FeatureArena<T>, list: LinkedList<FeatureKey>) {
    let mut cursor = list.first();
    while let Some(key) = cursor {
        let Some(slot) = features.get_mut(key) else {
            break;
        };
        cursor = slot.links.next();
        slot.feature.mark_dirty();
    }
}

/// Cleans `key` and every dirty ancestor above it.
///
/// Objects outside the path from the anchor to `key` are left untouched.
pub fn clean_object<T: Transformation>(
    objects: &mut ObjectArena<T>,
    features: &mut FeatureArena<T>,
    key: ObjectKey,
    policy: InversionPolicy,
) -> CleanStats {
    let mut stats = CleanStats::default();

    // 1. Collect the dirty path, stopping at the clean anchor.
    let mut path: SmallVec<[ObjectKey; INLINE_PATH_DEPTH]> = SmallVec::new();
    let mut absolute = T::identity();
    let mut cursor = Some(key);
    while let Some(current) = cursor {
        let Some(object) = objects.get(current) else {
            break;
        };
        if !object.dirty {
            absolute = object.absolute.clone();
            break;
        }
        path.push(current);
        cursor = object.parent();
    }

    // 2. Recompose from the anchor back down to `key`.
    for &current in path.iter().rev() {
        if let Some(next) = clean_single(objects, features, current, &absolute, policy, &mut stats) {
            absolute = next;
        }
    }

    stats
}

/// Cleans every dirty object below `root`, each exactly once, in pre-order.
pub fn clean_all<T: Transformation>(
    objects: &mut ObjectArena<T>,
    features: &mut FeatureArena<T>,
    root: ObjectKey,
    policy: InversionPolicy,
) -> CleanStats {
    let mut stats = CleanStats::default();
    let mut stack = vec![root];

    while let Some(current) = stack.pop() {
        let Some(object) = objects.get(current) else {
            continue;
        };

        if object.dirty {
            // Pre-order guarantees the parent was cleaned before its children.
            let parent_absolute = object
                .parent()
                .and_then(|parent| objects.get(parent))
                .map_or_else(T::identity, |parent| parent.absolute.clone());
            clean_single(objects, features, current, &parent_absolute, policy, &mut stats);
        }

        if let Some(object) = objects.get(current) {
            let children = object.children;
            stack.extend(children.iter(objects).rev());
        }
    }

    stats
}

/// Recomputes one object from its parent's absolute transformation, runs its
/// feature hooks and clears its dirty flag. Returns the new absolute.
fn clean_single<T: Transformation>(
    objects: &mut ObjectArena<T>,
    features: &mut FeatureArena<T>,
    key: ObjectKey,
    parent_absolute: &T,
    policy: InversionPolicy,
    stats: &mut CleanStats,
) -> Option<T> {
    let object = objects.get_mut(key)?;
    let absolute = parent_absolute.compose(&object.transformation);

    object.inverted_absolute = clean_features(features, object.features, &absolute, policy, stats);
    object.absolute = absolute.clone();
    object.dirty = false;
    stats.objects_cleaned += 1;

    Some(absolute)
}

/// Delivers the cached transformations requested by each feature in `list`.
///
/// Matrices (and, under [`InversionPolicy::PerObject`], the inverse) are
/// computed lazily and at most once. Returns the inverse if one was
/// computed.
fn clean_features<T: Transformation>(
    features: &mut FeatureArena<T>,
    list: LinkedList<FeatureKey>,
    absolute: &T,
    policy: InversionPolicy,
    stats: &mut CleanStats,
) -> Option<T> {
    let mut matrix: Option<T::Matrix> = None;
    let mut inverted: Option<(T, T::Matrix)> = None;

    let mut cursor = list.first();
    while let Some(key) = cursor {
        let Some(slot) = features.get_mut(key) else {
            break;
        };
        cursor = slot.links.next();

        let requested = slot.feature.cached_transformations();
        if requested.is_empty() {
            continue;
        }

        if requested.contains(CachedTransformations::ABSOLUTE) {
            let matrix = matrix.get_or_insert_with(|| absolute.to_matrix());
            slot.feature.clean(matrix);
        }

        if requested.contains(CachedTransformations::INVERTED_ABSOLUTE) {
            if policy == InversionPolicy::PerFeature {
                inverted = None;
            }
            let (_, matrix) = inverted.get_or_insert_with(|| {
                let inverse = absolute.inverted();
                let matrix = inverse.to_matrix();
                (inverse, matrix)
            });
            slot.feature.clean_inverted(matrix);
        }

        stats.features_cleaned += 1;
    }

    inverted.map(|(inverse, _)| inverse)
}

/// Computes the absolute transformation of `key` by composing local
/// transformations from the root. Caches are neither read nor written.
pub fn absolute_transformation<T: Transformation>(objects: &ObjectArena<T>, key: ObjectKey) -> Option<T> {
    let mut path: SmallVec<[ObjectKey; INLINE_PATH_DEPTH]> = SmallVec::new();
    let mut cursor = Some(key);
    while let Some(current) = cursor {
        let object = objects.get(current)?;
        path.push(current);
        cursor = object.parent();
    }

    let mut absolute = T::identity();
    for &current in path.iter().rev() {
        if let Some(object) = objects.get(current) {
            absolute = absolute.compose(&object.transformation);
        }
    }
    Some(absolute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Affine2, Vec2};

    fn translate(x: f32, y: f32) -> Affine2 {
        Affine2::from_translation(Vec2::new(x, y))
    }

    /// Builds root -> a -> b by hand, without going through `Scene`.
    fn chain() -> (ObjectArena<Affine2>, [ObjectKey; 3]) {
        let mut objects: ObjectArena<Affine2> = SlotMap::with_key();
        let root = objects.insert(Object::root());
        let a = objects.insert(Object::new(translate(1.0, 0.0)));
        let b = objects.insert(Object::new(translate(0.0, 1.0)));

        let mut list = LinkedList::new();
        list.push_back(&mut objects, root, a);
        objects[root].children = list;

        let mut list = LinkedList::new();
        list.push_back(&mut objects, a, b);
        objects[a].children = list;

        (objects, [root, a, b])
    }

    #[test]
    fn test_clean_object_composes_path() {
        let (mut objects, [root, a, b]) = chain();
        let mut features = SlotMap::with_key();

        let stats = clean_object(&mut objects, &mut features, b, InversionPolicy::PerObject);
        assert_eq!(stats.objects_cleaned, 2);
        assert!(!objects[root].dirty && !objects[a].dirty && !objects[b].dirty);
        assert!(objects[b].absolute.translation.abs_diff_eq(Vec2::new(1.0, 1.0), 1e-6));
    }

    #[test]
    fn test_mark_dirty_skips_root_flag() {
        let (mut objects, [root, a, b]) = chain();
        let mut features = SlotMap::with_key();
        clean_all(&mut objects, &mut features, root, InversionPolicy::PerObject);

        assert_eq!(mark_dirty(&mut objects, &mut features, root), 2);
        assert!(!objects[root].dirty);
        assert!(objects[a].dirty && objects[b].dirty);
        assert_eq!(mark_dirty(&mut objects, &mut features, a), 0);
    }

    #[test]
    fn test_absolute_transformation_ignores_cache() {
        let (objects, [_, _, b]) = chain();
        let absolute = absolute_transformation(&objects, b).unwrap();
        assert!(absolute.translation.abs_diff_eq(Vec2::new(1.0, 1.0), 1e-6));
        // Nothing was cleaned.
        assert!(objects[b].dirty);
    }
}
