use std::{path::Path, time::Instant};

use crate::{
    classes::ClassLabel,
    errors::{PetSegError, Result},
    mask::{SegmentationMask, SegmentationResult, SourceImage},
    traits::SegmentationEngine,
};
use image::{imageops, imageops::FilterType, GenericImageView, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// ONNX Runtime backed segmentation engine.
pub struct Model {
    pub image_size: u32,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl Model {
    pub fn new(model_path: &Path, device_id: i32) -> Result<Self> {
        let mut session = SessionBuilder::new()
            .map_err(|e| PetSegError::inference("session builder initialisation", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| PetSegError::inference("execution provider registration", e))?
            .with_memory_pattern(true)
            .map_err(|e| PetSegError::inference("memory pattern setup", e))?
            .commit_from_file(model_path)
            .map_err(|e| {
                PetSegError::inference(format!("model load: {}", model_path.display()), e)
            })?;

        let input = session.inputs.first().ok_or_else(|| {
            PetSegError::inference("model input lookup", "model declares no inputs")
        })?;
        let image_size = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.get(2).copied())
            .filter(|&size| size > 0)
            .ok_or_else(|| {
                PetSegError::inference("model input shape lookup", "input is not a NCHW tensor")
            })? as u32;
        let input_name = input.name.clone();
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| {
                PetSegError::inference("model output lookup", "model declares no outputs")
            })?;

        // warm up
        let data = Array4::<f32>::zeros((1, 3, image_size as usize, image_size as usize));
        session
            .run(ort::inputs![input_name.as_str() => TensorRef::from_array_view(&data)
                .map_err(|e| PetSegError::inference("warm-up tensor creation", e))?])
            .map_err(|e| PetSegError::inference("model warm-up run", e))?;

        info!(
            model = %model_path.display(),
            image_size,
            device_id,
            "segmentation model loaded"
        );

        Ok(Self {
            image_size,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }

    pub fn predict(&self, tensor: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }
}

impl SegmentationEngine for Model {
    fn segment(&self, image: &SourceImage) -> Result<SegmentationResult> {
        let started = Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(PetSegError::inference(
                "input validation",
                format!("invalid input dimensions {width}x{height}"),
            ));
        }

        let tensor = preprocess(&image.to_rgb8(), self.image_size);
        let logits = self.predict(tensor.view())?;
        let (batch, classes, _, _) = logits.dim();
        if batch != 1 || classes != ClassLabel::COUNT {
            return Err(PetSegError::inference(
                "model output validation",
                format!(
                    "expected [1, {}, H, W] logits, got {:?}",
                    ClassLabel::COUNT,
                    logits.shape()
                ),
            ));
        }

        let (mask, confidence) = decode_logits(logits.index_axis(Axis(0), 0));
        let colored = imageops::resize(&mask.colorize(), width, height, FilterType::Nearest);
        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            confidence, "segmentation finished"
        );

        SegmentationResult::new(mask, SourceImage::from(colored), confidence)
    }

    fn get_image_size(&self) -> u32 {
        self.image_size
    }
}

/// Resize to the model resolution and lay out as `[1, 3, S, S]` in `[0, 1]`.
pub fn preprocess(image: &RgbImage, image_size: u32) -> Array4<f32> {
    let image = imageops::resize(image, image_size, image_size, FilterType::Triangle);
    image
        .as_ndarray3()
        .mapv(|v| f32::from(v) / 255.0)
        .insert_axis(Axis(0))
}

/// Argmax per pixel plus the mean of the winning softmax probabilities.
pub fn decode_logits(logits: ArrayView3<f32>) -> (SegmentationMask, f32) {
    let (_, height, width) = logits.dim();
    let mut confidence_sum = 0.0f64;

    let cells = Array2::from_shape_fn((height, width), |(y, x)| {
        let pixel = logits.slice(s![.., y, x]);
        let (best, max) = pixel
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |(bi, bv), (i, &v)| {
                if v > bv {
                    (i, v)
                } else {
                    (bi, bv)
                }
            });
        let partition: f32 = pixel.iter().map(|&v| (v - max).exp()).sum();
        if partition.is_finite() && partition > 0.0 {
            confidence_sum += f64::from(1.0 / partition);
        }
        best as i32
    });

    let pixels = (height * width).max(1) as f64;
    let confidence = (confidence_sum / pixels).clamp(0.0, 1.0) as f32;
    (SegmentationMask::from_array(cells), confidence)
}
