use std::path::PathBuf;

use anyhow::Context;
use myth_scenegraph::assets::{ImageImporter, TgaImporter};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path: PathBuf = std::env::args_os()
        .nth(1)
        .context("usage: tga_info <file.tga> [output.png]")?
        .into();

    let mut importer = TgaImporter::new();
    importer
        .open_file(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let image = importer.image2d(0)?;
    println!(
        "{}: {}x{} {:?}",
        path.display(),
        image.width(),
        image.height(),
        image.format()
    );

    if let Some(output) = std::env::args_os().nth(2) {
        let output = PathBuf::from(output);
        // Encoded by extension; PNG is always available.
        image
            .to_dynamic_image()?
            .save(&output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("wrote {}", output.display());
    }

    Ok(())
}
