//! Transformation representations
//!
//! The scene graph never does transformation math itself. Every object
//! stores a value of some type implementing [`Transformation`], and the
//! transform system only composes, inverts and converts those values.
//!
//! Implementations are provided for the glam types used by the engine
//! ([`Affine2`], [`Affine3A`], [`Mat4`], [`DAffine3`]) and for
//! [`RigidTransform3D`], a rotation + translation pair with exact inversion.

use std::fmt::Debug;

use glam::{Affine2, Affine3A, DAffine3, DMat4, Mat3, Mat4, Quat, Vec3};

/// Contract every per-object transformation type must satisfy.
///
/// `compose` must be associative so that composing along a path yields the
/// same absolute transformation no matter where the clean anchor sits.
pub trait Transformation: Clone + Debug + 'static {
    /// Matrix form handed to feature cleaning hooks.
    type Matrix: Debug + 'static;

    /// Number of spatial dimensions (2 or 3).
    const DIMENSIONS: usize;

    fn identity() -> Self;

    /// Returns `self ∘ local`: `local` applied in the frame of `self`.
    #[must_use]
    fn compose(&self, local: &Self) -> Self;

    #[must_use]
    fn inverted(&self) -> Self;

    fn to_matrix(&self) -> Self::Matrix;
}

impl Transformation for Affine2 {
    type Matrix = Mat3;
    const DIMENSIONS: usize = 2;

    #[inline]
    fn identity() -> Self {
        Affine2::IDENTITY
    }

    #[inline]
    fn compose(&self, local: &Self) -> Self {
        *self * *local
    }

    #[inline]
    fn inverted(&self) -> Self {
        self.inverse()
    }

    #[inline]
    fn to_matrix(&self) -> Mat3 {
        Mat3::from(*self)
    }
}

impl Transformation for Affine3A {
    type Matrix = Mat4;
    const DIMENSIONS: usize = 3;

    #[inline]
    fn identity() -> Self {
        Affine3A::IDENTITY
    }

    #[inline]
    fn compose(&self, local: &Self) -> Self {
        *self * *local
    }

    #[inline]
    fn inverted(&self) -> Self {
        self.inverse()
    }

    #[inline]
    fn to_matrix(&self) -> Mat4 {
        Mat4::from(*self)
    }
}

impl Transformation for Mat4 {
    type Matrix = Mat4;
    const DIMENSIONS: usize = 3;

    #[inline]
    fn identity() -> Self {
        Mat4::IDENTITY
    }

    #[inline]
    fn compose(&self, local: &Self) -> Self {
        *self * *local
    }

    #[inline]
    fn inverted(&self) -> Self {
        self.inverse()
    }

    #[inline]
    fn to_matrix(&self) -> Mat4 {
        *self
    }
}

impl Transformation for DAffine3 {
    type Matrix = DMat4;
    const DIMENSIONS: usize = 3;

    #[inline]
    fn identity() -> Self {
        DAffine3::IDENTITY
    }

    #[inline]
    fn compose(&self, local: &Self) -> Self {
        *self * *local
    }

    #[inline]
    fn inverted(&self) -> Self {
        self.inverse()
    }

    #[inline]
    fn to_matrix(&self) -> DMat4 {
        DMat4::from(*self)
    }
}

/// Rotation followed by translation, without scale or shear.
///
/// Inversion is exact (a quaternion conjugate), which makes this the
/// cheapest representation for rigid hierarchies such as skeletons or
/// cameras.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidTransform3D {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl RigidTransform3D {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
    };

    #[must_use]
    pub fn new(rotation: Quat, translation: Vec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            rotation: Quat::IDENTITY,
            translation,
        }
    }

    #[must_use]
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            translation: Vec3::ZERO,
        }
    }

    #[must_use]
    pub fn transform_point3(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }
}

impl Default for RigidTransform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transformation for RigidTransform3D {
    type Matrix = Mat4;
    const DIMENSIONS: usize = 3;

    #[inline]
    fn identity() -> Self {
        Self::IDENTITY
    }

    fn compose(&self, local: &Self) -> Self {
        Self {
            // Renormalize to keep long chains from drifting off the unit sphere.
            rotation: (self.rotation * local.rotation).normalize(),
            translation: self.translation + self.rotation * local.translation,
        }
    }

    fn inverted(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    #[inline]
    fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }
}
