use std::path::Path;

use crate::assets::image_data::ImageData;
use crate::errors::Result;

/// Open / query / close protocol shared by image importers.
///
/// Opening always discards the previously opened data first, so a failed
/// open leaves the importer closed with no image available.
pub trait ImageImporter {
    /// Human-readable importer name used in error messages.
    fn name(&self) -> &'static str;

    /// Decodes an in-memory file.
    fn open_data(&mut self, data: &[u8]) -> Result<()>;

    /// Reads and decodes a file from disk.
    fn open_file(&mut self, path: &Path) -> Result<()> {
        self.close();
        let data = std::fs::read(path)?;
        self.open_data(&data).inspect_err(|err| {
            log::debug!("{}: failed to open {}: {err}", self.name(), path.display());
        })
    }

    fn close(&mut self);

    fn is_opened(&self) -> bool;

    /// Number of 2D images in the opened file (zero when closed).
    fn image2d_count(&self) -> usize;

    fn image2d(&self, index: usize) -> Result<&ImageData>;
}
