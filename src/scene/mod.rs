//! Scene graph module
//!
//! Manages the object hierarchy and its transformation caches:
//! - Object: scene node (parent/child links, local and cached transformations)
//! - Feature: pluggable capability attached to an object
//! - Transformation: contract for the per-object transformation type
//! - Scene: arena owner and root of the hierarchy
//! - TransformSystem: dirty propagation and lazy cleaning, decoupled from Scene

pub mod feature;
pub mod object;
pub mod scene;
pub mod settings;
pub mod transform_system;
pub mod transformation;

pub use feature::{CachedTransformation, CachedTransformations, Feature, FeatureContext, FeatureSlot};
pub use object::Object;
pub use scene::{Children, Features, Scene, Scene2D, Scene3D};
pub use settings::{InversionPolicy, SceneSettings};
pub use transform_system::CleanStats;
pub use transformation::{RigidTransform3D, Transformation};

use slotmap::new_key_type;

new_key_type! {
    pub struct ObjectKey;
    pub struct FeatureKey;
}
