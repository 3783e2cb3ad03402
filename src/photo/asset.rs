//! Processed images on disk for the lifetime of one generation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use uuid::Uuid;

use crate::error::Result;

/// A PNG written to the temp directory. The file is removed when this is
/// dropped, whether or not generation succeeded.
#[derive(Debug)]
pub struct TempAsset {
    path: PathBuf,
}

impl TempAsset {
    /// Write `png` as `processed_image_{slot}_{uuid}.png` inside `dir`.
    pub fn write(dir: &Path, slot: &str, png: &[u8]) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{ASSET_PREFIX}{slot}_{}.png", Uuid::new_v4().simple()));
        fs::write(&path, png)?;
        log::debug!("Wrote processed image {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempAsset {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Could not remove temp image {}: {e}", self.path.display());
        }
    }
}

const ASSET_PREFIX: &str = "processed_image_";

/// Remove processed images in `dir` last modified more than `max_age` ago.
/// These are left behind only when a process dies mid-request.
///
/// Returns the number of files removed.
pub fn sweep_stale(dir: &Path, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_asset = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(ASSET_PREFIX) && name.ends_with(".png"));
        if !is_asset {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > max_age) && fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let asset = TempAsset::write(dir.path(), "1", b"png").unwrap();
        let path = asset.path().to_path_buf();

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("processed_image_1_"));
        assert!(name.ends_with(".png"));
        assert_eq!(fs::read(&path).unwrap(), b"png");

        drop(asset);
        assert!(!path.exists());
    }

    #[test]
    fn test_sweep_only_touches_stale_assets() {
        let dir = tempfile::tempdir().unwrap();
        let asset = TempAsset::write(dir.path(), "1", b"png").unwrap();
        fs::write(dir.path().join("keep.txt"), b"x").unwrap();

        assert_eq!(sweep_stale(dir.path(), Duration::from_secs(3600)).unwrap(), 0);
        assert!(asset.path().exists());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(sweep_stale(dir.path(), Duration::ZERO).unwrap(), 1);
        assert!(!asset.path().exists());
        assert!(dir.path().join("keep.txt").exists());
    }

    #[test]
    fn test_names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = TempAsset::write(dir.path(), "2", b"a").unwrap();
        let b = TempAsset::write(dir.path(), "2", b"b").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
