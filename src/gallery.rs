use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::debug;
use walkdir::WalkDir;

use crate::{
    errors::{PetSegError, Result},
    mask::SourceImage,
};

/// Decode one image file into a [`SourceImage`].
pub fn load_image(path: &Path) -> Result<SourceImage> {
    let image = image::open(path).map_err(|e| PetSegError::ImageProcessing {
        path: path.display().to_string(),
        operation: "image decoding".to_string(),
        source: Box::new(e),
    })?;
    debug!(path = %path.display(), width = image.width(), height = image.height(), "image decoded");
    Ok(SourceImage::new(image))
}

/// A directory of pictures standing in for the platform picker.
#[derive(Debug, Clone)]
pub struct Gallery {
    root: PathBuf,
    entries: Vec<PathBuf>,
}

impl Gallery {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(PetSegError::FileSystem {
                path: root.to_path_buf(),
                operation: "gallery directory check".to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "gallery directory does not exist",
                ),
            });
        }

        let mut entries = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| ImageFormat::from_path(e.path()).is_ok())
            .map(|e| e.into_path())
            .collect::<Vec<_>>();
        entries.sort();

        debug!(root = %root.display(), images = entries.len(), "gallery scanned");
        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Find an entry by file name, or the first entry when `name` is `None`.
    pub fn pick(&self, name: Option<&str>) -> Result<&Path> {
        let found = match name {
            Some(name) => self
                .entries
                .iter()
                .find(|p| p.file_name().is_some_and(|f| f == name)),
            None => self.entries.first(),
        };

        found.map(PathBuf::as_path).ok_or_else(|| PetSegError::Validation {
            field: "gallery".to_string(),
            reason: match name {
                Some(name) => format!("has no image named {name} in {}", self.root.display()),
                None => format!("has no images in {}", self.root.display()),
            },
        })
    }

    pub fn load(&self, name: Option<&str>) -> Result<SourceImage> {
        load_image(self.pick(name)?)
    }
}
