use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the pet segmentation pipeline.
///
/// # Why structured errors
///
/// The first four variants are the failures a user can actually see while
/// working with a session (no image, refused permission, engine failure and
/// an unusable mask). Each one maps to a fixed status line through
/// [`PetSegError::user_message`], so the layer that triggers an analysis never
/// has to parse error strings. The remaining variants carry the
/// path/operation context of the filesystem and model plumbing.
#[derive(Error, Debug)]
pub enum PetSegError {
    #[error("No image selected")]
    NoImageSelected,

    #[error("Permission denied to read storage")]
    PermissionDenied,

    #[error("Inference error: {operation} failed")]
    Inference {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Degenerate segmentation input: {reason}")]
    DegenerateInput { reason: String },

    #[error("Prediction discarded: the source image was replaced")]
    StalePrediction,

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PetSegError>;

pub const SELECT_IMAGE_FIRST: &str = "Please select an image first";
pub const PERMISSION_DENIED_NOTICE: &str = "Permission denied to read your storage.";
pub const SEGMENTATION_FAILED: &str = "Segmentation failed";

impl PetSegError {
    pub fn inference<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Inference {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateInput {
            reason: reason.into(),
        }
    }

    /// The status line shown to the user in place of a report.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoImageSelected => SELECT_IMAGE_FIRST.to_string(),
            Self::PermissionDenied => PERMISSION_DENIED_NOTICE.to_string(),
            Self::Inference { source, .. } => format!("Error during segmentation: {source}"),
            Self::DegenerateInput { .. } => SEGMENTATION_FAILED.to_string(),
            other => format!("Error during segmentation: {other}"),
        }
    }
}

/// Convert anyhow errors to configuration errors.
///
/// # Why this conversion exists
///
/// Some call sites (gallery scanning, CLI helpers) produce `anyhow::Error`
/// which lacks structured information. They are converted at the library
/// boundary instead of leaking the generic type through the public API.
impl From<anyhow::Error> for PetSegError {
    fn from(err: anyhow::Error) -> Self {
        PetSegError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should construct
/// `PetSegError::FileSystem` directly; this is the fallback.
impl From<std::io::Error> for PetSegError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Convert image crate errors to image processing errors.
impl From<image::ImageError> for PetSegError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

/// Convert ONNX Runtime errors to inference errors.
impl From<ort::Error> for PetSegError {
    fn from(err: ort::Error) -> Self {
        Self::inference("ort operation", err)
    }
}

/// Convert ndarray shape errors to inference errors.
///
/// Shape errors only happen while decoding model output, so they belong to
/// the inference category rather than a separate tensor error type.
impl From<ndarray::ShapeError> for PetSegError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::inference("tensor shape conversion", err)
    }
}

/// A panicked or cancelled blocking inference task.
impl From<tokio::task::JoinError> for PetSegError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::inference("inference task", err)
    }
}
