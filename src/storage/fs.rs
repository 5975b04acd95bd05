//! Module to scan directories of audio files for bulk import

use std::path::{Path, PathBuf};

use log::warn;
use walkdir::WalkDir;

use crate::storage::error::StorageError;

const MUSIC_EXTENSIONS: &[&str] = &["mp3", "ogg", "oga", "wav", "flac", "m4a", "aac"];

pub fn is_music_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MUSIC_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively collects the music files under `root`, sorted by path.
pub fn scan_music_files(root: &Path, follow_symlinks: bool) -> Result<Vec<PathBuf>, StorageError> {
    if !root.is_dir() {
        return Err(StorageError::Fs(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )));
    }

    let mut paths = WalkDir::new(root)
        .follow_links(follow_symlinks)
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(
                    "error while scanning dir {}, skipping an entry: {err}",
                    root.display()
                );
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| is_music_file(p))
        .collect::<Vec<PathBuf>>();

    paths.sort();
    Ok(paths)
}

/// Display title derived from a file name, e.g. `night_drive-v2.mp3` becomes
/// `night drive v2`.
pub fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
