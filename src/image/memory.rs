//! In-memory image

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{BuilderError, BuilderResult};
use crate::image::Image;

/// Image held entirely in memory, layers included
#[derive(Debug, Clone, Default)]
pub struct MemoryImage {
    name: String,
    labels: BTreeMap<String, String>,
    env: BTreeMap<String, String>,
    working_dir: String,
    layers: Vec<Vec<u8>>,
    saved: bool,
}

impl MemoryImage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn working_dir(&self) -> &str {
        &self.working_dir
    }

    /// Layer tars in the order they were added
    pub fn layers(&self) -> &[Vec<u8>] {
        &self.layers
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }
}

impl Image for MemoryImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn label(&self, key: &str) -> Option<String> {
        self.labels.get(key).cloned()
    }

    fn set_label(&mut self, key: &str, value: &str) -> BuilderResult<()> {
        self.labels.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn env(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    fn add_layer(&mut self, path: &Path) -> BuilderResult<()> {
        let data = fs::read(path)
            .map_err(|e| BuilderError::io(format!("reading layer {}", path.display()), e))?;
        self.layers.push(data);
        Ok(())
    }

    fn set_working_dir(&mut self, dir: &str) -> BuilderResult<()> {
        self.working_dir = dir.to_string();
        Ok(())
    }

    fn save(&mut self) -> BuilderResult<()> {
        self.saved = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn labels_and_env() {
        let mut image = MemoryImage::new("some/image")
            .with_label("a", "1")
            .with_env("HOME", "/root");

        assert_eq!(image.label("a").as_deref(), Some("1"));
        assert!(image.label("b").is_none());
        assert_eq!(image.env("HOME").as_deref(), Some("/root"));

        image.set_label("b", "2").unwrap();
        assert_eq!(image.labels().len(), 2);
    }

    #[test]
    fn layers_are_copied_on_add() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("layer.tar");
        fs::write(&path, b"layer bytes").unwrap();

        let mut image = MemoryImage::new("some/image");
        image.add_layer(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(image.layers(), &[b"layer bytes".to_vec()]);
    }

    #[test]
    fn missing_layer_file_errors() {
        let mut image = MemoryImage::new("some/image");
        assert!(image.add_layer(Path::new("/nonexistent/layer.tar")).is_err());
    }

    #[test]
    fn rename_and_save() {
        let mut image = MemoryImage::new("some/image");
        image.rename("other/image");
        assert_eq!(image.name(), "other/image");
        assert!(!image.is_saved());
        image.save().unwrap();
        assert!(image.is_saved());
    }
}
