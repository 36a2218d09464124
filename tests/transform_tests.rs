//! Transformation caching tests
//!
//! Tests for:
//! - Absolute transformation composition along the hierarchy
//! - Dirty propagation (subtree only, idempotent, root never dirty)
//! - Path-only cleaning with `set_clean` and batch cleaning
//! - `set_clean_all` agreeing with direct recomputation
//! - Local transformation edits
//! - Inversion sharing policies

use std::cell::Cell;

use glam::{Affine2, Affine3A, Mat3, Quat, Vec2, Vec3};
use myth_scenegraph::errors::SceneGraphError;
use myth_scenegraph::scene::{
    CachedTransformations, Feature, InversionPolicy, ObjectKey, RigidTransform3D, Scene, Scene2D,
    Scene3D, SceneSettings, Transformation,
};

// ============================================================================
// Helper
// ============================================================================

const EPSILON: f32 = 1e-5;

fn translate(x: f32, y: f32) -> Affine2 {
    Affine2::from_translation(Vec2::new(x, y))
}

fn affine2_approx(a: &Affine2, b: &Affine2) -> bool {
    a.abs_diff_eq(*b, EPSILON)
}

/// root S -> A (translate(1,0)) -> B (translate(0,1))
fn scene_sab() -> (Scene2D, ObjectKey, ObjectKey) {
    let mut scene = Scene2D::new();
    let a = scene.add_object_with(scene.root(), translate(1.0, 0.0)).unwrap();
    let b = scene.add_object_with(a, translate(0.0, 1.0)).unwrap();
    (scene, a, b)
}

/// Records every absolute matrix it is cleaned with.
#[derive(Default)]
struct AbsoluteRecorder {
    cleaned: Vec<Mat3>,
}

impl Feature<Affine2> for AbsoluteRecorder {
    fn cached_transformations(&self) -> CachedTransformations {
        CachedTransformations::ABSOLUTE
    }

    fn clean(&mut self, absolute: &Mat3) {
        self.cleaned.push(*absolute);
    }
}

// ============================================================================
// Composition & Cleaning
// ============================================================================

#[test]
fn clean_leaf_computes_path() {
    let (mut scene, a, b) = scene_sab();

    let stats = scene.set_clean(b);

    assert_eq!(stats.objects_cleaned, 2);
    assert_eq!(scene.cached_absolute_transformation(b), Some(&translate(1.0, 1.0)));
    assert_eq!(scene.cached_absolute_transformation(a), Some(&translate(1.0, 0.0)));
    assert!(!scene.is_dirty(a));
    assert!(!scene.is_dirty(b));
}

#[test]
fn clean_delivers_absolute_matrix_once() {
    let (mut scene, _, b) = scene_sab();
    let feature = scene.add_feature(b, AbsoluteRecorder::default()).unwrap();

    scene.set_clean(b);
    // Already clean: no further hook calls.
    scene.set_clean(b);

    let recorder = scene.feature::<AbsoluteRecorder>(feature).unwrap();
    assert_eq!(recorder.cleaned, vec![Mat3::from(translate(1.0, 1.0))]);
}

#[test]
fn mutating_parent_dirties_subtree_only() {
    let (mut scene, a, b) = scene_sab();
    let root = scene.root();
    scene.set_clean(b);

    scene.set_transformation(a, translate(2.0, 0.0)).unwrap();

    assert!(scene.is_dirty(a));
    assert!(scene.is_dirty(b));
    assert!(!scene.is_dirty(root));
    assert_eq!(scene.cached_absolute_transformation(b), None);

    let stats = scene.set_clean(b);
    assert_eq!(stats.objects_cleaned, 2);
    assert_eq!(scene.cached_absolute_transformation(a), Some(&translate(2.0, 0.0)));
    assert_eq!(scene.cached_absolute_transformation(b), Some(&translate(2.0, 1.0)));
}

#[test]
fn clean_leaf_leaves_siblings_dirty() {
    let mut scene = Scene2D::new();
    let root = scene.root();
    let a = scene.add_object_with(root, translate(1.0, 0.0)).unwrap();
    let left = scene.add_object_with(a, translate(0.0, 1.0)).unwrap();
    let right = scene.add_object_with(a, translate(0.0, 2.0)).unwrap();
    let other = scene.add_object(root).unwrap();

    let stats = scene.set_clean(left);

    assert_eq!(stats.objects_cleaned, 2);
    assert!(!scene.is_dirty(a));
    assert!(!scene.is_dirty(left));
    assert!(scene.is_dirty(right));
    assert!(scene.is_dirty(other));

    // The clean parent now anchors the sibling's path.
    let stats = scene.set_clean(right);
    assert_eq!(stats.objects_cleaned, 1);
    assert_eq!(scene.cached_absolute_transformation(right), Some(&translate(1.0, 2.0)));
}

#[test]
fn set_clean_many_shares_ancestors() {
    let mut scene = Scene2D::new();
    let a = scene.add_object_with(scene.root(), translate(1.0, 0.0)).unwrap();
    let left = scene.add_object(a).unwrap();
    let right = scene.add_object(a).unwrap();

    let stats = scene.set_clean_many(&[left, right, left]);

    assert_eq!(stats.objects_cleaned, 3);
    assert!(!scene.is_dirty(right));
}

#[test]
fn clean_all_matches_direct_recomputation() {
    let mut scene = Scene2D::new();
    let mut keys = vec![scene.root()];
    // Irregular tree: each object hangs under an earlier one.
    for i in 1..40_usize {
        let parent = keys[(i * 37 / 11) % i];
        let local = Affine2::from_scale_angle_translation(
            Vec2::splat(1.0 + (i % 3) as f32 * 0.25),
            i as f32 * 0.1,
            Vec2::new(i as f32, -(i as f32) * 0.5),
        );
        keys.push(scene.add_object_with(parent, local).unwrap());
    }
    // Every object but the root starts dirty and is cleaned exactly once.
    assert_eq!(scene.set_clean_all().objects_cleaned, 39);

    let edited: Vec<ObjectKey> = keys.iter().copied().skip(1).step_by(5).collect();
    for (i, &key) in edited.iter().enumerate() {
        scene.set_transformation(key, translate(i as f32, 1.0)).unwrap();
    }
    // Objects inside an edited subtree: an edited key is itself or an ancestor.
    let expected = keys
        .iter()
        .filter(|&&key| {
            let mut cursor = Some(key);
            while let Some(current) = cursor {
                if edited.contains(&current) {
                    return true;
                }
                cursor = scene.parent(current);
            }
            false
        })
        .count();
    assert!(expected > edited.len());
    assert_eq!(scene.set_clean_all().objects_cleaned, expected);

    for &key in &keys {
        assert!(!scene.is_dirty(key));
        let cached = scene.cached_absolute_transformation(key).unwrap();
        let direct = scene.absolute_transformation(key).unwrap();
        assert!(affine2_approx(cached, &direct), "mismatch for {key:?}");
    }
}

#[test]
fn clean_all_on_clean_scene_does_nothing() {
    let (mut scene, _, _) = scene_sab();
    scene.set_clean_all();

    let stats = scene.set_clean_all();
    assert!(stats.is_empty());
}

// ============================================================================
// Dirty Propagation
// ============================================================================

#[test]
fn mark_dirty_is_idempotent() {
    let (mut scene, a, b) = scene_sab();
    scene.set_clean_all();

    scene.mark_dirty(a);
    scene.mark_dirty(a);
    scene.mark_dirty(b);

    assert!(scene.is_dirty(a));
    assert!(scene.is_dirty(b));
    assert_eq!(scene.set_clean_all().objects_cleaned, 2);
}

#[test]
fn mark_dirty_root_dirties_children_but_not_root() {
    let (mut scene, a, b) = scene_sab();
    let root = scene.root();
    scene.set_clean_all();

    scene.mark_dirty(root);

    assert!(!scene.is_dirty(root));
    assert!(scene.is_dirty(a));
    assert!(scene.is_dirty(b));
    assert_eq!(scene.cached_absolute_transformation(root), Some(&Affine2::IDENTITY));
}

#[test]
fn stale_keys_are_ignored_by_dirty_and_clean() {
    let (mut scene, a, b) = scene_sab();
    scene.remove_object(a).unwrap();

    scene.mark_dirty(b);
    assert!(scene.set_clean(b).is_empty());
    assert!(scene.set_clean_many(&[a, b]).is_empty());
}

// ============================================================================
// Local Transformation Edits
// ============================================================================

#[test]
fn transform_applies_in_parent_frame() {
    let mut scene = Scene2D::new();
    let a = scene
        .add_object_with(scene.root(), Affine2::from_angle(std::f32::consts::FRAC_PI_2))
        .unwrap();

    scene.transform(a, &translate(1.0, 0.0)).unwrap();

    let moved = scene.transformation(a).unwrap().transform_point2(Vec2::ZERO);
    assert!(moved.abs_diff_eq(Vec2::new(1.0, 0.0), EPSILON));
}

#[test]
fn transform_local_applies_in_own_frame() {
    let mut scene = Scene2D::new();
    let a = scene
        .add_object_with(scene.root(), Affine2::from_angle(std::f32::consts::FRAC_PI_2))
        .unwrap();
    scene.set_clean_all();

    scene.transform_local(a, &translate(1.0, 0.0)).unwrap();

    assert!(scene.is_dirty(a));
    let moved = scene.transformation(a).unwrap().transform_point2(Vec2::ZERO);
    assert!(moved.abs_diff_eq(Vec2::new(0.0, 1.0), EPSILON));
}

#[test]
fn reset_transformation_restores_identity() {
    let (mut scene, a, b) = scene_sab();
    scene.set_clean_all();

    scene.reset_transformation(a).unwrap();
    scene.set_clean(b);

    assert_eq!(scene.transformation(a), Some(&Affine2::IDENTITY));
    assert_eq!(scene.cached_absolute_transformation(b), Some(&translate(0.0, 1.0)));
}

#[test]
fn root_transformation_is_immutable() {
    let mut scene = Scene2D::new();
    let root = scene.root();

    assert!(matches!(
        scene.set_transformation(root, translate(1.0, 0.0)),
        Err(SceneGraphError::RootImmutable)
    ));
    assert!(matches!(
        scene.transform(root, &translate(1.0, 0.0)),
        Err(SceneGraphError::RootImmutable)
    ));
    assert_eq!(scene.transformation(root), Some(&Affine2::IDENTITY));
}

#[test]
fn absolute_transformation_ignores_dirty_state() {
    let (mut scene, a, b) = scene_sab();
    scene.set_transformation(a, translate(4.0, 0.0)).unwrap();

    assert!(scene.is_dirty(b));
    assert_eq!(scene.absolute_transformation(b).unwrap(), translate(4.0, 1.0));
    assert_eq!(
        scene.absolute_transformations(&[a, b]).unwrap(),
        vec![translate(4.0, 0.0), translate(4.0, 1.0)]
    );
    assert_eq!(
        scene.absolute_transformation_matrix(b).unwrap(),
        Mat3::from(translate(4.0, 1.0))
    );
    // Nothing was cached along the way.
    assert!(scene.is_dirty(b));
}

// ============================================================================
// Other Transformation Types
// ============================================================================

#[test]
fn scene3d_and_rigid_scenes_agree() {
    let rotation = Quat::from_rotation_y(0.7);
    let offset = Vec3::new(1.0, 2.0, 3.0);

    let mut affine = Scene3D::new();
    let a = affine
        .add_object_with(affine.root(), Affine3A::from_rotation_translation(rotation, offset))
        .unwrap();
    let b = affine.add_object_with(a, Affine3A::from_translation(Vec3::X)).unwrap();

    let mut rigid: Scene<RigidTransform3D> = Scene::new();
    let ra = rigid
        .add_object_with(rigid.root(), RigidTransform3D::new(rotation, offset))
        .unwrap();
    let rb = rigid
        .add_object_with(ra, RigidTransform3D::from_translation(Vec3::X))
        .unwrap();

    affine.set_clean(b);
    rigid.set_clean(rb);

    let p = Vec3::new(0.5, -1.0, 2.0);
    let expected = affine.cached_absolute_transformation(b).unwrap().transform_point3(p);
    let actual = rigid.cached_absolute_transformation(rb).unwrap().transform_point3(p);
    assert!(expected.abs_diff_eq(actual, EPSILON));
}

// ============================================================================
// Inversion Policies
// ============================================================================

thread_local! {
    static INVERSIONS: Cell<usize> = const { Cell::new(0) };
}

/// Translation-only 2D transformation counting its inversions.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CountingTranslation(Vec2);

impl Transformation for CountingTranslation {
    type Matrix = Vec2;
    const DIMENSIONS: usize = 2;

    fn identity() -> Self {
        Self(Vec2::ZERO)
    }

    fn compose(&self, local: &Self) -> Self {
        Self(self.0 + local.0)
    }

    fn inverted(&self) -> Self {
        INVERSIONS.with(|count| count.set(count.get() + 1));
        Self(-self.0)
    }

    fn to_matrix(&self) -> Vec2 {
        self.0
    }
}

#[derive(Default)]
struct InverseRecorder {
    inverted: Vec<Vec2>,
}

impl Feature<CountingTranslation> for InverseRecorder {
    fn cached_transformations(&self) -> CachedTransformations {
        CachedTransformations::INVERTED_ABSOLUTE
    }

    fn clean_inverted(&mut self, inverted_absolute: &Vec2) {
        self.inverted.push(*inverted_absolute);
    }
}

fn inversions_for(policy: InversionPolicy) -> (usize, Scene<CountingTranslation>, ObjectKey) {
    let mut scene = Scene::with_settings(SceneSettings {
        inversion: policy,
        ..Default::default()
    });
    let object = scene
        .add_object_with(scene.root(), CountingTranslation(Vec2::new(3.0, -2.0)))
        .unwrap();
    for _ in 0..3 {
        scene.add_feature(object, InverseRecorder::default()).unwrap();
    }

    INVERSIONS.with(|count| count.set(0));
    scene.set_clean(object);
    (INVERSIONS.with(Cell::get), scene, object)
}

#[test]
fn per_object_policy_inverts_once() {
    let (count, scene, object) = inversions_for(InversionPolicy::PerObject);

    assert_eq!(count, 1);
    for recorder in scene.features_of::<InverseRecorder>(object) {
        assert_eq!(recorder.inverted, vec![Vec2::new(-3.0, 2.0)]);
    }
    assert_eq!(
        scene.cached_inverted_absolute_transformation(object),
        Some(&CountingTranslation(Vec2::new(-3.0, 2.0)))
    );
}

#[test]
fn per_feature_policy_inverts_for_each_feature() {
    let (count, scene, object) = inversions_for(InversionPolicy::PerFeature);

    assert_eq!(count, 3);
    assert_eq!(scene.features_of::<InverseRecorder>(object).count(), 3);
}

#[test]
fn no_inverse_requested_means_no_inversion() {
    let mut scene: Scene<CountingTranslation> = Scene::new();
    let object = scene
        .add_object_with(scene.root(), CountingTranslation(Vec2::X))
        .unwrap();

    INVERSIONS.with(|count| count.set(0));
    scene.set_clean(object);

    assert_eq!(INVERSIONS.with(Cell::get), 0);
    assert_eq!(scene.cached_inverted_absolute_transformation(object), None);
}
