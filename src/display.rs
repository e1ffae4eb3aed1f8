use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{
    errors::{PetSegError, Result},
    mask::SourceImage,
    traits::DisplaySurface,
};

/// Writes shown images to a file and shown text to a writer (stdout by default).
pub struct FileDisplay<W: Write = std::io::Stdout> {
    output: PathBuf,
    writer: W,
}

impl FileDisplay {
    pub fn new(output: &Path) -> Self {
        Self::with_writer(output, std::io::stdout())
    }
}

impl<W: Write> FileDisplay<W> {
    pub fn with_writer(output: &Path, writer: W) -> Self {
        Self {
            output: output.to_path_buf(),
            writer,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<W: Write> DisplaySurface for FileDisplay<W> {
    fn show_image(&mut self, image: &SourceImage) -> Result<()> {
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PetSegError::FileSystem {
                path: parent.to_path_buf(),
                operation: "output directory creation".to_string(),
                source: e,
            })?;
        }

        image
            .save(&self.output)
            .map_err(|e| PetSegError::ImageProcessing {
                path: self.output.display().to_string(),
                operation: "image save".to_string(),
                source: Box::new(e),
            })?;
        info!(path = %self.output.display(), "image written");
        Ok(())
    }

    fn show_text(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{text}").map_err(|e| PetSegError::FileSystem {
            path: PathBuf::from("<stdout>"),
            operation: "text output".to_string(),
            source: e,
        })
    }
}

/// Keeps everything that was shown, newest last.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub images: Vec<SourceImage>,
    pub texts: Vec<String>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_text(&self) -> Option<&str> {
        self.texts.last().map(String::as_str)
    }
}

impl DisplaySurface for RecordingDisplay {
    fn show_image(&mut self, image: &SourceImage) -> Result<()> {
        self.images.push(image.clone());
        Ok(())
    }

    fn show_text(&mut self, text: &str) -> Result<()> {
        self.texts.push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_file_display_writes_image_and_text() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let output = temp_dir.path().join("out").join("mask.png");

        let mut display = FileDisplay::with_writer(&output, Vec::new());
        display.show_image(&SourceImage::from(RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]))))?;
        display.show_text("Pet: 100.0%")?;

        let written = image::open(&output)?.to_rgb8();
        assert_eq!(*written.get_pixel(1, 1), Rgb([255, 0, 0]));
        assert_eq!(display.into_writer(), b"Pet: 100.0%\n");
        Ok(())
    }

    #[test]
    fn test_recording_display() -> Result<()> {
        let mut display = RecordingDisplay::new();
        display.show_text("first")?;
        display.show_text("second")?;
        assert_eq!(display.last_text(), Some("second"));
        assert!(display.images.is_empty());
        Ok(())
    }
}
