use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use image::ImageFormat;
use std::path::PathBuf;

use crate::reporter::OutOfRangePolicy;

/// Models this build knows how to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ModelKind {
    #[default]
    Segmentation,
}

impl ModelKind {
    pub const fn default_file_name(self) -> &'static str {
        match self {
            ModelKind::Segmentation => "segmentation_model.onnx",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            ModelKind::Segmentation => "Semantic Segmentation",
        }
    }
}

/// Answer given to the storage-read permission prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PermissionDecision {
    #[default]
    Grant,
    Deny,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Use a single captured image file.
    Camera { image: PathBuf },
    /// Pick an image from a directory.
    Gallery {
        dir: PathBuf,

        /// File name to pick; the first image in name order otherwise.
        #[arg(long)]
        pick: Option<String>,
    },
}

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub source: Source,

    #[arg(long, value_enum, default_value_t = ModelKind::Segmentation)]
    pub model: ModelKind,

    #[arg(short, long)]
    pub model_path: Option<PathBuf>,

    #[arg(short, long, default_value_t = 0)]
    pub device_id: i32,

    /// Where the colored mask is written.
    #[arg(short, long, default_value = "mask.png", value_parser = check_output)]
    pub output: PathBuf,

    #[arg(long, value_enum, default_value_t = OutOfRangePolicy::Exclude)]
    pub out_of_range: OutOfRangePolicy,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub require_gallery_permission: bool,

    #[arg(long, value_enum, default_value_t = PermissionDecision::Grant)]
    pub permission: PermissionDecision,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,

    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Config {
    pub fn model_path(&self) -> PathBuf {
        self.model_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.model.default_file_name()))
    }

    pub const fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn check_output(s: &str) -> Result<PathBuf, String> {
    let supported: Vec<_> = ImageFormat::all()
        .filter(|f| f.writing_enabled())
        .flat_map(|f| f.extensions_str())
        .map(|s| format!("`{}`", s))
        .collect();
    let supported_message = format!("Supported formats: {}", supported.join(", "));

    let format = ImageFormat::from_path(s)
        .map_err(|_| format!("{} has no supported extension. {}", s, supported_message))?;
    if !format.writing_enabled() {
        return Err(format!("{} is not supported. {}", s, supported_message));
    }

    Ok(PathBuf::from(s))
}
