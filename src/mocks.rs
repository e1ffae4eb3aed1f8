use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::{PetSegError, Result};
use crate::mask::{SegmentationMask, SegmentationResult, SourceImage};
use crate::traits::SegmentationEngine;
use ndarray::array;

/// Scripted segmentation engine for tests.
#[derive(Debug)]
pub struct MockSegmentationEngine {
    pub image_size: u32,
    mask: SegmentationMask,
    confidence: f32,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockSegmentationEngine {
    /// Always answers with `mask` and `confidence`, whatever the image.
    pub fn new(mask: SegmentationMask, confidence: f32) -> Self {
        Self {
            image_size: 128,
            mask,
            confidence,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always fails with an inference error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(SegmentationMask::from_array(array![[0]]), 0.0)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentationEngine for MockSegmentationEngine {
    fn segment(&self, _image: &SourceImage) -> Result<SegmentationResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(PetSegError::inference("mock segment", message.clone())),
            None => SegmentationResult::from_mask(self.mask.clone(), self.confidence),
        }
    }

    fn get_image_size(&self) -> u32 {
        self.image_size
    }
}

/// The 2x2 `[[0, 0], [1, 2]]` mask at 0.87 confidence.
pub fn create_mock_engine() -> MockSegmentationEngine {
    MockSegmentationEngine::new(
        SegmentationMask::from_array(array![[0, 0], [1, 2]]),
        0.87,
    )
}
