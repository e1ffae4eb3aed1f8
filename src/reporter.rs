use clap::ValueEnum;
use ndarray::Axis;
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::{
    classes::ClassLabel,
    errors::{PetSegError, Result},
    mask::{SegmentationMask, SegmentationResult, SourceImage},
};

pub const REPORT_TITLE: &str = "Semantic Segmentation";

/// How mask cells outside the class table enter the percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutOfRangePolicy {
    /// Skip them and compute percentages over the in-range cells only.
    #[default]
    Exclude,
    /// Skip them but keep them in the denominator, leaving an unreported gap.
    CountAsGap,
    /// Fail the analysis.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassShare {
    pub label: ClassLabel,
    pub pixels: usize,
    pub percentage: f64,
}

/// Per-class pixel distribution of one mask.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStatistics {
    pub shares: Vec<ClassShare>,
    pub total_pixels: usize,
    /// Pixel count the percentages are relative to.
    pub denominator: usize,
    pub out_of_range: usize,
}

impl ClassStatistics {
    pub fn percentage(&self, label: ClassLabel) -> f64 {
        self.shares
            .iter()
            .find(|s| s.label == label)
            .map_or(0.0, |s| s.percentage)
    }

    pub fn percentage_sum(&self) -> f64 {
        self.shares.iter().map(|s| s.percentage).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub text: String,
    pub confidence: f32,
    pub statistics: ClassStatistics,
    #[serde(skip)]
    pub display_image: SourceImage,
}

/// Turns a segmentation result into class statistics and the report text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentationReporter {
    policy: OutOfRangePolicy,
}

impl SegmentationReporter {
    pub const fn new(policy: OutOfRangePolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> OutOfRangePolicy {
        self.policy
    }

    pub fn analyze(&self, result: &SegmentationResult) -> Result<Report> {
        let statistics = self.statistics(&result.segmentation_mask)?;
        let text = format_report(result.confidence, &statistics);

        Ok(Report {
            text,
            confidence: result.confidence,
            statistics,
            display_image: result.colored_mask.clone(),
        })
    }

    pub fn statistics(&self, mask: &SegmentationMask) -> Result<ClassStatistics> {
        let total_pixels = mask.total_pixels();
        if total_pixels == 0 {
            return Err(PetSegError::degenerate(format!(
                "empty mask ({}x{})",
                mask.columns(),
                mask.rows()
            )));
        }

        let counts = count_classes(mask);
        let in_range: usize = counts.iter().sum();
        let out_of_range = total_pixels - in_range;

        if out_of_range > 0 {
            if self.policy == OutOfRangePolicy::Reject {
                return Err(PetSegError::degenerate(format!(
                    "{out_of_range} of {total_pixels} cells hold an unknown class index"
                )));
            }
            warn!(
                out_of_range,
                total_pixels,
                policy = ?self.policy,
                "mask cells outside the class table were skipped"
            );
        }

        let denominator = match self.policy {
            OutOfRangePolicy::CountAsGap => total_pixels,
            OutOfRangePolicy::Exclude | OutOfRangePolicy::Reject => in_range,
        };
        if denominator == 0 {
            return Err(PetSegError::degenerate(
                "no mask cell holds a known class index",
            ));
        }

        let shares = ClassLabel::ALL
            .iter()
            .zip(counts)
            .map(|(&label, pixels)| ClassShare {
                label,
                pixels,
                percentage: 100.0 * pixels as f64 / denominator as f64,
            })
            .collect();

        Ok(ClassStatistics {
            shares,
            total_pixels,
            denominator,
            out_of_range,
        })
    }
}

fn count_classes(mask: &SegmentationMask) -> [usize; ClassLabel::COUNT] {
    mask.cells()
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|row| {
            let mut counts = [0usize; ClassLabel::COUNT];
            for &cell in row {
                if let Some(label) = ClassLabel::from_index(cell) {
                    counts[label.index()] += 1;
                }
            }
            counts
        })
        .reduce(
            || [0; ClassLabel::COUNT],
            |mut acc, row| {
                for (a, r) in acc.iter_mut().zip(row) {
                    *a += r;
                }
                acc
            },
        )
}

/// One decimal with ties rounded up (`0.25` prints as `0.3`), `.` as separator.
pub fn format_percentage(value: f64) -> String {
    format!("{:.1}", (value * 10.0).round() / 10.0)
}

pub fn format_report(confidence: f32, statistics: &ClassStatistics) -> String {
    let mut lines = vec![
        REPORT_TITLE.to_string(),
        format!(
            "Confidence: {}%",
            format_percentage(f64::from(confidence) * 100.0)
        ),
        String::new(),
    ];
    lines.extend(
        statistics
            .shares
            .iter()
            .map(|share| format!("{}: {}%", share.label, format_percentage(share.percentage))),
    );
    lines.extend(ClassLabel::ALL.map(ClassLabel::legend_line));
    lines.join("\n")
}
