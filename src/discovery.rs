//! Image enumeration for a search root.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::{Result, SearchError};

/// Extensions (lowercase, without the dot) treated as images.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Check whether a path has a supported image extension, ignoring case.
pub fn is_supported_image_format(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Fail unless `root` exists and is a directory.
pub fn validate_root(root: &Path) -> Result<()> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(SearchError::InvalidSearchPath {
            path: root.to_path_buf(),
        })
    }
}

/// Lazily enumerate image files under `root`.
///
/// The root is validated before the iterator is returned. With `recursive`
/// unset only direct children are considered. Order follows the filesystem.
/// Entries the walk cannot read are yielded as errors for the caller to
/// report; they do not end the walk.
pub fn find_images(
    root: &Path,
    recursive: bool,
) -> Result<impl Iterator<Item = walkdir::Result<PathBuf>>> {
    validate_root(root)?;

    let walker = WalkDir::new(root).min_depth(1);
    let walker = if recursive {
        walker
    } else {
        walker.max_depth(1)
    };

    Ok(walker
        .into_iter()
        .map(|entry| entry.map(walkdir::DirEntry::into_path))
        .filter(|entry| match entry {
            Ok(path) => path.is_file() && is_supported_image_format(path),
            Err(_) => true,
        }))
}
