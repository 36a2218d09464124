//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`SceneGraphError`] covers two families of failures:
//! - Structural misuse of the scene graph (stale keys, cycles, touching
//!   the root)
//! - Image import failures (short or truncated data, unsupported encodings)
//!
//! Dirty marking and cleaning are infallible and never produce these errors.
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, SceneGraphError>`.
//!
//! ```rust
//! use myth_scenegraph::errors::Result;
//! use myth_scenegraph::scene::Scene3D;
//!
//! fn build() -> Result<()> {
//!     let mut scene = Scene3D::new();
//!     let child = scene.add_object(scene.root())?;
//!     scene.remove_object(child)?;
//!     Ok(())
//! }
//! # build().unwrap();
//! ```

use thiserror::Error;

use crate::scene::{FeatureKey, ObjectKey};

/// The main error type for the scene graph and its asset importers.
#[derive(Error, Debug)]
pub enum SceneGraphError {
    // ========================================================================
    // Hierarchy Errors
    // ========================================================================
    /// The object key does not (or no longer) refer to a live object.
    #[error("Object not found: {0:?}")]
    ObjectNotFound(ObjectKey),

    /// The feature key does not (or no longer) refer to a live feature.
    #[error("Feature not found: {0:?}")]
    FeatureNotFound(FeatureKey),

    /// The scene root cannot be re-parented, removed or transformed.
    #[error("The scene root cannot be modified by this operation")]
    RootImmutable,

    /// An object cannot become its own parent.
    #[error("Cannot attach object {0:?} to itself")]
    SelfParent(ObjectKey),

    /// The requested parent is a descendant of the object being moved.
    #[error("Attaching {object:?} under {parent:?} would create a cycle")]
    CyclicHierarchy {
        /// The object being re-parented
        object: ObjectKey,
        /// The requested parent, which lies inside `object`'s subtree
        parent: ObjectKey,
    },

    /// The target of a sibling insertion has no parent (it is the root).
    #[error("Object {0:?} has no parent and cannot have siblings")]
    NotSiblingTarget(ObjectKey),

    // ========================================================================
    // Import Errors
    // ========================================================================
    /// The input is shorter than the fixed-size header.
    #[error("{importer}: the file is too short: {size} bytes")]
    FileTooShort {
        /// Name of the importer reporting the failure
        importer: &'static str,
        /// Size of the input in bytes
        size: usize,
    },

    /// Palette-indexed images are not supported.
    #[error("{0}: paletted files are not supported")]
    PalettedUnsupported(&'static str),

    /// Only uncompressed truecolor images are supported.
    #[error("{importer}: unsupported image type {image_type} (only uncompressed truecolor)")]
    UnsupportedImageType {
        /// Name of the importer reporting the failure
        importer: &'static str,
        /// The image type byte found in the header
        image_type: u8,
    },

    /// The pixel depth has no matching pixel format.
    #[error("{importer}: unsupported bits-per-pixel: {bits_per_pixel}")]
    UnsupportedBitsPerPixel {
        /// Name of the importer reporting the failure
        importer: &'static str,
        /// The bit depth found in the header
        bits_per_pixel: u8,
    },

    /// The pixel payload ends before the declared image size.
    #[error("{importer}: truncated pixel data: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Name of the importer reporting the failure
        importer: &'static str,
        /// Payload size implied by the header
        expected: usize,
        /// Payload size actually present
        actual: usize,
    },

    /// An image was requested while no file is opened.
    #[error("No image is opened")]
    NoImageOpened,

    /// Image index out of bounds.
    #[error("Image index out of bounds: {index} (count: {count})")]
    ImageIndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Number of images available
        count: usize,
    },

    /// Converting decoded pixels into an `image` buffer failed.
    #[error("Image conversion error: {0}")]
    ImageConversion(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Alias for `Result<T, SceneGraphError>`.
pub type Result<T> = std::result::Result<T, SceneGraphError>;
