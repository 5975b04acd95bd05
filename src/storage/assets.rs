//! Content-addressed storage for uploaded audio and cover art.

use std::{fs, path::PathBuf};

use log::debug;

use crate::{domain::hash::AssetDigest, storage::error::StorageError};

/// URL prefix under which stored assets are served.
pub const ASSETS_URL_PREFIX: &str = "/assets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetKind {
    Audio { extension: String },
    CoverArt { extension: String },
}

impl AssetKind {
    pub fn audio(extension: &str) -> Self {
        Self::Audio {
            extension: clean_extension(extension),
        }
    }

    pub fn cover_art(extension: &str) -> Self {
        Self::CoverArt {
            extension: clean_extension(extension),
        }
    }

    pub fn dir_name(&self) -> &'static str {
        match self {
            AssetKind::Audio { .. } => "audio",
            AssetKind::CoverArt { .. } => "covers",
        }
    }

    fn extension(&self) -> &str {
        match self {
            AssetKind::Audio { extension } | AssetKind::CoverArt { extension } => extension,
        }
    }
}

fn clean_extension(ext: &str) -> String {
    let ext: String = ext
        .trim_start_matches('.')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() { "bin".to_string() } else { ext }
}

pub struct AssetStore {
    root: PathBuf,
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes `bytes` under their digest and returns the public URL.
    pub fn save(&self, bytes: &[u8], kind: &AssetKind) -> Result<String, StorageError> {
        let name = format!("{}.{}", AssetDigest::from_bytes(bytes), kind.extension());
        let dir = self.root.join(kind.dir_name());
        fs::create_dir_all(&dir)?;

        let path = dir.join(&name);
        if path.exists() {
            debug!("asset {} already stored", path.display());
        } else {
            fs::write(&path, bytes)?;
            debug!("stored asset {} ({} bytes)", path.display(), bytes.len());
        }
        Ok(format!("{ASSETS_URL_PREFIX}/{}/{name}", kind.dir_name()))
    }

    /// Maps `<dir>/<digest>.<ext>` to a file in the store. Anything that does
    /// not look like a stored asset name is rejected, so request paths can
    /// never escape the root.
    pub fn resolve(&self, dir: &str, name: &str) -> Option<PathBuf> {
        if dir != "audio" && dir != "covers" {
            return None;
        }
        let (stem, ext) = name.split_once('.')?;
        if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        AssetDigest::from_hex(stem).ok()?;
        Some(self.root.join(dir).join(name))
    }

    /// File behind a URL produced by [`AssetStore::save`], if it is one.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let rest = url.strip_prefix(ASSETS_URL_PREFIX)?.strip_prefix('/')?;
        let (dir, name) = rest.split_once('/')?;
        self.resolve(dir, name)
    }
}
