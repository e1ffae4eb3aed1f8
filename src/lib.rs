pub mod acquisition;
pub mod classes;
pub mod config;
pub mod display;
pub mod errors;
pub mod gallery;
pub mod logging;
pub mod mask;
pub mod model;
pub mod reporter;
pub mod session;
pub mod traits;

pub mod mocks;

pub use acquisition::{AcquisitionState, GalleryRequest, ImageAcquisition};
pub use classes::ClassLabel;
pub use config::{Config, ModelKind, PermissionDecision, Source};
pub use errors::{PetSegError, Result};
pub use mask::{SegmentationMask, SegmentationResult, SourceImage};
pub use model::Model;
pub use reporter::{ClassStatistics, OutOfRangePolicy, Report, SegmentationReporter};
pub use session::{PendingPrediction, Session, StatusMessage};
pub use traits::*;

use gallery::{load_image, Gallery};
use tracing::info;

/// Feed the configured source into `session` the way the app's buttons do:
/// camera images go straight in, gallery picks go through the permission gate.
pub fn acquire<E: SegmentationEngine + 'static>(
    session: &mut Session<E>,
    config: &Config,
) -> Result<()> {
    match &config.source {
        Source::Camera { image } => {
            session.capture_from_camera(load_image(image)?);
        }
        Source::Gallery { dir, pick } => {
            if session.request_gallery().needs_permission {
                match config.permission {
                    PermissionDecision::Grant => session.permission_granted(),
                    PermissionDecision::Deny => return Err(session.permission_denied()),
                }
                session.request_gallery();
            }

            let image = match Gallery::open(dir).and_then(|gallery| gallery.load(pick.as_deref())) {
                Ok(image) => image,
                Err(err) => {
                    session.gallery_cancelled();
                    return Err(err);
                }
            };
            session.select_from_gallery(image);
        }
    }

    info!(state = session.acquisition().state().name(), "source acquired");
    Ok(())
}
