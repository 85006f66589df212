//! Package writing for MVR archives

use super::SCENE_DESCRIPTION_PATH;
use super::manifest::{AssetManifest, AssetSource};
use super::reader::Archive;
use crate::error::{Diagnostics, Error, Result, Warning, WarningKind};
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Write an MVR package
///
/// The scene description is written first, then every manifest entry once.
/// Sources that cannot be read are skipped with a [`WarningKind::MissingAsset`]
/// warning.
///
/// Returns the writer after finishing the ZIP archive, with the warnings.
pub fn write_package<W: Write + Seek>(
    writer: W,
    scene_xml: &str,
    manifest: &AssetManifest,
) -> Result<(W, Vec<Warning>)> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default();
    let mut diagnostics = Diagnostics::new();

    zip.start_file(SCENE_DESCRIPTION_PATH, options)
        .map_err(|e| Error::xml_write(format!("Failed to create scene description: {}", e)))?;
    zip.write_all(scene_xml.as_bytes())?;

    for entry in manifest.iter() {
        if entry.archive_name == SCENE_DESCRIPTION_PATH {
            diagnostics.warn(
                WarningKind::MissingAsset,
                format!("Asset {} would overwrite the scene description", entry.source),
            );
            continue;
        }
        let bytes = match read_source(&entry.source) {
            Ok(bytes) => bytes,
            Err(e) => {
                diagnostics.warn(
                    WarningKind::MissingAsset,
                    format!("Skipping asset '{}': {}", entry.archive_name, e),
                );
                continue;
            }
        };
        zip.start_file(entry.archive_name.as_str(), options)?;
        zip.write_all(&bytes)?;
        tracing::debug!(entry = %entry.archive_name, size = bytes.len(), "Packed asset");
    }

    let writer = zip.finish()?;
    Ok((writer, diagnostics.into_vec()))
}

/// Write an MVR package to a file
///
/// The archive is assembled in memory and written with a single call, so a
/// failed export leaves no partial file behind.
pub fn write_package_to_file(
    path: impl AsRef<Path>,
    scene_xml: &str,
    manifest: &AssetManifest,
) -> Result<Vec<Warning>> {
    let (cursor, warnings) = write_package(Cursor::new(Vec::new()), scene_xml, manifest)?;
    std::fs::write(path.as_ref(), cursor.into_inner())?;
    Ok(warnings)
}

fn read_source(source: &AssetSource) -> Result<Vec<u8>> {
    match source {
        AssetSource::File(path) => {
            if !path.is_file() {
                return Err(Error::NotFound(path.display().to_string()));
            }
            Ok(std::fs::read(path)?)
        }
        AssetSource::ArchiveEntry { archive, entry } => Archive::open(archive)?.read_entry(entry),
    }
}
