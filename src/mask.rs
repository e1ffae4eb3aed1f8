use std::{ops::Deref, sync::Arc};

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::{Array2, ArrayView2};

use crate::{
    classes::ClassLabel,
    errors::{PetSegError, Result},
};

/// A decoded raster image, immutable once created.
///
/// Clones share the pixel buffer, so an in-flight inference task can keep the
/// image alive after the acquisition slot has moved on to a newer one.
#[derive(Debug, Clone)]
pub struct SourceImage(Arc<DynamicImage>);

impl SourceImage {
    pub fn new(image: DynamicImage) -> Self {
        Self(Arc::new(image))
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.0
    }

    /// True when both handles point at the same pixel buffer.
    pub fn same_as(&self, other: &SourceImage) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for SourceImage {
    type Target = DynamicImage;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DynamicImage> for SourceImage {
    fn from(image: DynamicImage) -> Self {
        Self::new(image)
    }
}

impl From<RgbImage> for SourceImage {
    fn from(image: RgbImage) -> Self {
        Self::new(DynamicImage::ImageRgb8(image))
    }
}

/// Per-pixel class indices, one row per image row.
///
/// Backed by an `Array2`, so the grid is rectangular by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    cells: Array2<i32>,
}

impl SegmentationMask {
    pub fn from_array(cells: Array2<i32>) -> Self {
        Self { cells }
    }

    /// Build a mask from nested rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);

        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(PetSegError::degenerate(format!(
                "mask row {row} has {} cells, expected {width}",
                cells.len()
            )));
        }

        let flat = rows.into_iter().flatten().collect::<Vec<_>>();
        let cells = Array2::from_shape_vec((height, width), flat)
            .map_err(|e| PetSegError::degenerate(e.to_string()))?;
        Ok(Self { cells })
    }

    pub fn rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn columns(&self) -> usize {
        self.cells.ncols()
    }

    pub fn total_pixels(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> ArrayView2<'_, i32> {
        self.cells.view()
    }

    /// Render each cell in its class color; gap cells stay black.
    pub fn colorize(&self) -> RgbImage {
        RgbImage::from_fn(self.columns() as u32, self.rows() as u32, |x, y| {
            ClassLabel::from_index(self.cells[[y as usize, x as usize]])
                .map_or(Rgb([0, 0, 0]), ClassLabel::color)
        })
    }
}

/// What the inference engine hands back for one image.
#[derive(Debug, Clone)]
pub struct SegmentationResult {
    pub segmentation_mask: SegmentationMask,
    pub colored_mask: SourceImage,
    pub confidence: f32,
}

impl SegmentationResult {
    pub fn new(
        segmentation_mask: SegmentationMask,
        colored_mask: SourceImage,
        confidence: f32,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(PetSegError::Validation {
                field: "confidence".to_string(),
                reason: format!("must lie in [0, 1], got {confidence}"),
            });
        }

        Ok(Self {
            segmentation_mask,
            colored_mask,
            confidence,
        })
    }

    /// Build a result whose colored mask is rendered from the class mask.
    pub fn from_mask(segmentation_mask: SegmentationMask, confidence: f32) -> Result<Self> {
        let colored_mask = SourceImage::from(segmentation_mask.colorize());
        Self::new(segmentation_mask, colored_mask, confidence)
    }

    /// Mask resolution as `(width, height)`, matching `GenericImageView`.
    pub fn mask_dimensions(&self) -> (u32, u32) {
        (
            self.segmentation_mask.columns() as u32,
            self.segmentation_mask.rows() as u32,
        )
    }

    pub fn colored_mask_dimensions(&self) -> (u32, u32) {
        self.colored_mask.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_rows_rectangular() -> Result<()> {
        let mask = SegmentationMask::from_rows(vec![vec![0, 0], vec![1, 2]])?;
        assert_eq!(mask.rows(), 2);
        assert_eq!(mask.columns(), 2);
        assert_eq!(mask.total_pixels(), 4);
        assert_eq!(mask.cells(), array![[0, 0], [1, 2]].view());
        Ok(())
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let result = SegmentationMask::from_rows(vec![vec![0, 0, 1], vec![1]]);
        match result {
            Err(PetSegError::DegenerateInput { reason }) => {
                assert!(reason.contains("row 1"));
            }
            other => panic!("Expected DegenerateInput, got {other:?}"),
        }
    }

    #[test]
    fn test_from_rows_empty() -> Result<()> {
        let mask = SegmentationMask::from_rows(Vec::new())?;
        assert!(mask.is_empty());
        assert_eq!(mask.total_pixels(), 0);
        Ok(())
    }

    #[test]
    fn test_colorize() {
        let mask = SegmentationMask::from_array(array![[0, 1], [2, 7]]);
        let colored = mask.colorize();
        assert_eq!(colored.dimensions(), (2, 2));
        assert_eq!(*colored.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*colored.get_pixel(1, 0), Rgb([0, 255, 0]));
        assert_eq!(*colored.get_pixel(0, 1), Rgb([0, 0, 255]));
        assert_eq!(*colored.get_pixel(1, 1), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_result_rejects_confidence_out_of_range() {
        let mask = SegmentationMask::from_array(array![[0]]);
        assert!(SegmentationResult::from_mask(mask.clone(), 1.5).is_err());
        assert!(SegmentationResult::from_mask(mask.clone(), f32::NAN).is_err());
        assert!(SegmentationResult::from_mask(mask, 0.0).is_ok());
    }

    #[test]
    fn test_source_image_shares_buffer() {
        let image = SourceImage::from(RgbImage::new(4, 3));
        let clone = image.clone();
        assert!(image.same_as(&clone));
        assert_eq!(clone.dimensions(), (4, 3));
        assert!(!image.same_as(&SourceImage::from(RgbImage::new(4, 3))));
    }
}
