//! Scene Settings
//!
//! Construction-time configuration for a [`Scene`](super::Scene).
//!
//! ```rust
//! use myth_scenegraph::scene::{InversionPolicy, Scene3D, SceneSettings};
//!
//! let scene = Scene3D::with_settings(SceneSettings {
//!     object_capacity: 1024,
//!     inversion: InversionPolicy::PerFeature,
//!     ..Default::default()
//! });
//! assert_eq!(scene.settings().object_capacity, 1024);
//! ```

/// How inverted absolute transformations are produced while cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InversionPolicy {
    /// Invert once per cleaned object and share the result between every
    /// feature on that object requesting it.
    #[default]
    PerObject,

    /// Invert separately for every requesting feature.
    PerFeature,
}

/// Scene graph configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSettings {
    /// Number of objects to pre-allocate (the root included).
    pub object_capacity: usize,
    /// Number of features to pre-allocate.
    pub feature_capacity: usize,
    pub inversion: InversionPolicy,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            object_capacity: 64,
            feature_capacity: 64,
            inversion: InversionPolicy::PerObject,
        }
    }
}
