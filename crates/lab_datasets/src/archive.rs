//! Turns a downloaded payload into the file the profiler reads.
//!
//! Kaggle serves most files zipped. A zipped payload is kept next to the
//! target as `<file>.zip`, extracted into the data directory and removed;
//! anything else is renamed to the target directly.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::error::DatasetError;

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

pub fn is_zip(path: &Path) -> Result<bool, DatasetError> {
    let mut file = File::open(path).map_err(|error| DatasetError::io(path, error))?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ZIP_MAGIC),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(error) => Err(DatasetError::io(path, error)),
    }
}

/// Places `download` at `<data_dir>/<file_name>` and returns that path. The
/// returned path may not exist when an archive did not contain `file_name`.
pub fn unpack(download: &Path, data_dir: &Path, file_name: &str) -> Result<PathBuf, DatasetError> {
    let target = data_dir.join(file_name);

    if !is_zip(download)? {
        fs::rename(download, &target).map_err(|error| DatasetError::io(&target, error))?;
        return Ok(target);
    }

    let zip_path = data_dir.join(format!("{file_name}.zip"));
    fs::rename(download, &zip_path).map_err(|error| DatasetError::io(&zip_path, error))?;
    let extracted = match extract_all(&zip_path, data_dir) {
        Ok(extracted) => extracted,
        Err(error) => {
            if let Err(cleanup) = fs::remove_file(&zip_path) {
                tracing::warn!(
                    component = "archive",
                    event = "archive_cleanup_failed",
                    archive = %zip_path.display(),
                    error = %cleanup,
                );
            }
            return Err(error);
        }
    };
    fs::remove_file(&zip_path).map_err(|error| DatasetError::io(&zip_path, error))?;

    tracing::info!(
        component = "archive",
        event = "archive_extracted",
        archive = %zip_path.display(),
        entries = extracted,
        target_present = target.exists(),
    );
    Ok(target)
}

/// Extracts every entry of `zip_path` below `dest`. Entries whose names would
/// escape `dest` are skipped.
pub fn extract_all(zip_path: &Path, dest: &Path) -> Result<usize, DatasetError> {
    let archive_error = |source: zip::result::ZipError| DatasetError::Archive {
        path: zip_path.to_path_buf(),
        source,
    };
    let file = File::open(zip_path).map_err(|error| DatasetError::io(zip_path, error))?;
    let mut archive = ZipArchive::new(file).map_err(archive_error)?;

    let mut extracted = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(archive_error)?;
        let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
            tracing::warn!(
                component = "archive",
                event = "entry_skipped",
                name = entry.name(),
            );
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|error| DatasetError::io(&out_path, error))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|error| DatasetError::io(parent, error))?;
        }
        let mut out = File::create(&out_path).map_err(|error| DatasetError::io(&out_path, error))?;
        io::copy(&mut entry, &mut out).map_err(|error| DatasetError::io(&out_path, error))?;
        extracted += 1;
    }
    Ok(extracted)
}
