use std::{sync::Arc, time::Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    acquisition::{GalleryRequest, ImageAcquisition},
    config::ModelKind,
    errors::{PetSegError, Result},
    mask::{SegmentationResult, SourceImage},
    reporter::{Report, SegmentationReporter},
    traits::{DisplaySurface, SegmentationEngine},
};

/// An inference call running on the blocking pool.
///
/// Obtained from [`Session::start_prediction`] and redeemed with
/// [`Session::finish_prediction`]. Replacing the source image in between
/// cancels it.
#[derive(Debug)]
pub struct PendingPrediction {
    generation: u64,
    token: CancellationToken,
    task: JoinHandle<Result<SegmentationResult>>,
}

impl PendingPrediction {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Text and optional image to put in front of the user after a prediction.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub image: Option<SourceImage>,
}

impl StatusMessage {
    pub fn from_outcome(outcome: &Result<Report>) -> Self {
        match outcome {
            Ok(report) => Self {
                text: report.text.clone(),
                image: Some(report.display_image.clone()),
            },
            Err(err) => Self {
                text: err.user_message(),
                image: None,
            },
        }
    }
}

/// One user session: the acquisition slot, the engine and the reporter.
pub struct Session<E: SegmentationEngine + 'static> {
    acquisition: ImageAcquisition,
    engine: Arc<E>,
    reporter: SegmentationReporter,
    model: ModelKind,
    in_flight: Option<CancellationToken>,
}

impl<E: SegmentationEngine + 'static> Session<E> {
    pub fn new(engine: E, reporter: SegmentationReporter, acquisition: ImageAcquisition) -> Self {
        Self::with_shared_engine(Arc::new(engine), reporter, acquisition)
    }

    pub fn with_shared_engine(
        engine: Arc<E>,
        reporter: SegmentationReporter,
        acquisition: ImageAcquisition,
    ) -> Self {
        Self {
            acquisition,
            engine,
            reporter,
            model: ModelKind::Segmentation,
            in_flight: None,
        }
    }

    pub const fn acquisition(&self) -> &ImageAcquisition {
        &self.acquisition
    }

    pub const fn model(&self) -> ModelKind {
        self.model
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn capture_from_camera(&mut self, image: SourceImage) {
        self.cancel_in_flight();
        self.acquisition.capture_from_camera(image);
    }

    pub fn request_gallery(&mut self) -> GalleryRequest {
        self.acquisition.request_gallery()
    }

    pub fn select_from_gallery(&mut self, image: SourceImage) -> GalleryRequest {
        let before = self.acquisition.generation();
        let request = self.acquisition.select_from_gallery(image);
        if self.acquisition.generation() != before {
            self.cancel_in_flight();
        }
        request
    }

    pub fn permission_granted(&mut self) {
        self.acquisition.permission_granted();
    }

    pub fn permission_denied(&mut self) -> PetSegError {
        self.acquisition.permission_denied()
    }

    pub fn gallery_cancelled(&mut self) {
        self.acquisition.gallery_cancelled();
    }

    /// Tear down at the end of the session.
    pub fn end(&mut self) {
        self.cancel_in_flight();
        self.acquisition.reset();
    }

    /// Hand the current image to the engine on the blocking pool.
    ///
    /// Must be called from within a tokio runtime. A prediction that is
    /// still in flight is cancelled first.
    pub fn start_prediction(&mut self) -> Result<PendingPrediction> {
        let image = self
            .acquisition
            .current_image()
            .ok_or(PetSegError::NoImageSelected)?;

        self.cancel_in_flight();
        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());

        let engine = Arc::clone(&self.engine);
        let task_token = token.clone();
        let task = tokio::task::spawn_blocking(move || {
            if task_token.is_cancelled() {
                return Err(PetSegError::StalePrediction);
            }
            engine.segment(&image)
        });

        let generation = self.acquisition.generation();
        debug!(generation, model = self.model.display_name(), "prediction started");
        Ok(PendingPrediction {
            generation,
            token,
            task,
        })
    }

    /// Wait for the engine and build the report. Results for an image that
    /// has since been replaced are discarded.
    pub async fn finish_prediction(&mut self, pending: PendingPrediction) -> Result<Report> {
        let PendingPrediction {
            generation,
            token,
            task,
        } = pending;

        if self.in_flight.as_ref().is_some_and(|t| t.is_cancelled()) {
            self.in_flight = None;
        }

        if token.is_cancelled() || generation != self.acquisition.generation() {
            debug!(generation, "stale prediction discarded");
            return Err(PetSegError::StalePrediction);
        }

        let started = Instant::now();
        let joined = task.await;
        self.in_flight = None;

        let result = joined?.map_err(|err| match err {
            err @ (PetSegError::Inference { .. } | PetSegError::StalePrediction) => err,
            other => PetSegError::inference("segment", other),
        })?;

        if token.is_cancelled() || generation != self.acquisition.generation() {
            return Err(PetSegError::StalePrediction);
        }

        let report = self.reporter.analyze(&result)?;
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            confidence = report.confidence,
            "prediction finished"
        );
        Ok(report)
    }

    pub async fn predict(&mut self) -> Result<Report> {
        let pending = self.start_prediction()?;
        self.finish_prediction(pending).await
    }

    /// Run a prediction and put the outcome on `display`: the colored mask and
    /// report on success, the status line on failure. Analysis failures are
    /// shown and then returned; only display failures skip the screen.
    pub async fn predict_and_display<D: DisplaySurface>(
        &mut self,
        display: &mut D,
    ) -> Result<Report> {
        display.show_text(&format!("Selected model: {}", self.model.display_name()))?;

        let outcome = self.predict().await;
        if let Err(err) = &outcome {
            warn!(error = %err, "prediction failed");
        }

        let status = StatusMessage::from_outcome(&outcome);
        if let Some(image) = &status.image {
            display.show_image(image)?;
        }
        display.show_text(&status.text)?;
        outcome
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            debug!("cancelling in-flight prediction");
            token.cancel();
        }
    }
}
