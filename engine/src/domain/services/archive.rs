//! Release archive extraction
//! Picks the platform binaries out of a gzip-compressed tarball

use crate::domain::DomainError;
use flate2::read::GzDecoder;
use std::io::Read;
use tar::Archive;
use tracing::debug;

/// A binary taken out of the archive, keyed by its base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// Extract every regular file whose path starts with `prefix`.
/// Only the base name of each entry is kept. Zero matches is an error.
pub fn extract_binaries(tarball: &[u8], prefix: &str) -> Result<Vec<ExtractedFile>, DomainError> {
    let unpack_err = |e: std::io::Error| DomainError::UnpackFailed(e.to_string());

    let mut archive = Archive::new(GzDecoder::new(tarball));
    let mut files = Vec::new();

    for entry in archive.entries().map_err(unpack_err)? {
        let mut entry = entry.map_err(unpack_err)?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path().map_err(unpack_err)?.to_string_lossy().replace('\\', "/");
        let path = path.strip_prefix("./").unwrap_or(&path);
        if !path.starts_with(prefix) {
            continue;
        }

        let Some(name) = path.rsplit('/').next().filter(|n| !n.is_empty()) else {
            continue;
        };
        let name = name.to_string();

        // Header sizes are untrusted; grow with the bytes actually read
        let mut data = Vec::new();
        entry.read_to_end(&mut data).map_err(unpack_err)?;

        debug!(file = %name, size = data.len(), "Extracted binary");
        files.push(ExtractedFile { name, data });
    }

    if files.is_empty() {
        return Err(DomainError::UnpackFailed(format!(
            "no files under {prefix}"
        )));
    }

    Ok(files)
}
