#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Hierarchical scene graph with lazily cached absolute transformations.
//!
//! - [`scene`]: objects, features, dirty propagation and cleaning
//! - [`linked_list`]: the intrusive list backing children and feature lists
//! - [`assets`]: image import collaborators (TGA)
//! - [`errors`]: the crate-wide error type

pub mod assets;
pub mod errors;
pub mod linked_list;
pub mod scene;

pub use assets::{ImageData, ImageImporter, PixelFormat, TgaImporter};
pub use errors::{Result, SceneGraphError};
pub use scene::{
    CachedTransformation, CachedTransformations, CleanStats, Feature, FeatureContext, FeatureKey,
    InversionPolicy, Object, ObjectKey, RigidTransform3D, Scene, Scene2D, Scene3D, SceneSettings,
    Transformation,
};
