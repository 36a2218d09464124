//! Image import collaborators
//!
//! Decoded images are plain [`ImageData`] values. Importers implement the
//! [`ImageImporter`] open / query / close protocol and report malformed or
//! unsupported input through [`SceneGraphError`](crate::errors::SceneGraphError)
//! instead of producing partial output.

pub mod image_data;
pub mod importer;
pub mod tga;

pub use image_data::{ImageData, PixelFormat};
pub use importer::ImageImporter;
pub use tga::TgaImporter;
