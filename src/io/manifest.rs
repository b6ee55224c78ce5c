use std::ops::Index;
use std::path::Path;

use anyhow::{Context, Result};

use super::enumerate::base_name;

/// The authoritative, ordered list of images of a run.
///
/// Position in the manifest is the canonical image index used by the
/// reconciler, the orchestrator and the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageManifest {
    entries: Vec<String>,
}

impl ImageManifest {
    /// Read a list file: whitespace-delimited image names, usually one per line.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open image list {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        Self {
            entries: text.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Manifest entries with their extension stripped, in manifest order.
    pub fn base_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| base_name(e))
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }
}

impl Index<usize> for ImageManifest {
    type Output = String;

    fn index(&self, idx: usize) -> &String {
        &self.entries[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_preserves_order() {
        let manifest = ImageManifest::parse("img003.jpg\nimg001.jpg\n\n  img002.png\n");
        assert_eq!(manifest.len(), 3);
        assert_eq!(manifest[0], "img003.jpg");
        assert_eq!(manifest[2], "img002.png");
        let bases: Vec<_> = manifest.base_names().collect();
        assert_eq!(bases, vec!["img003", "img001", "img002"]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(ImageManifest::load(tmp.path().join("list.txt")).is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("list.txt");
        std::fs::write(&path, "a.jpg b.jpg\nc.jpg\n").unwrap();
        let manifest = ImageManifest::load(&path).unwrap();
        assert_eq!(manifest, ImageManifest::from_entries(["a.jpg", "b.jpg", "c.jpg"]));
    }
}
