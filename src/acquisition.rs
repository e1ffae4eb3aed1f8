use tracing::debug;

use crate::{errors::PetSegError, mask::SourceImage};

/// Where the current source image stands.
#[derive(Debug, Clone, Default)]
pub enum AcquisitionState {
    #[default]
    Idle,
    /// Waiting for a storage-read permission decision. `previous` is the image
    /// that was current when the request started, restored on denial.
    AwaitingPermission { previous: Option<SourceImage> },
    Ready(SourceImage),
}

impl AcquisitionState {
    pub const fn name(&self) -> &'static str {
        match self {
            AcquisitionState::Idle => "Idle",
            AcquisitionState::AwaitingPermission { .. } => "AwaitingPermission",
            AcquisitionState::Ready(_) => "Ready",
        }
    }
}

/// Answer to [`ImageAcquisition::request_gallery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GalleryRequest {
    pub needs_permission: bool,
}

/// Owns the currently selected image and gates gallery access behind the
/// storage-read permission.
#[derive(Debug)]
pub struct ImageAcquisition {
    state: AcquisitionState,
    permission_required: bool,
    permission_granted: bool,
    generation: u64,
}

impl Default for ImageAcquisition {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ImageAcquisition {
    /// `permission_required = false` models platforms where the picker needs
    /// no storage permission at all.
    pub const fn new(permission_required: bool) -> Self {
        Self {
            state: AcquisitionState::Idle,
            permission_required,
            permission_granted: false,
            generation: 0,
        }
    }

    pub const fn state(&self) -> &AcquisitionState {
        &self.state
    }

    /// Incremented whenever the stored image changes.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub const fn has_gallery_access(&self) -> bool {
        !self.permission_required || self.permission_granted
    }

    pub fn current_image(&self) -> Option<SourceImage> {
        match &self.state {
            AcquisitionState::Ready(image) => Some(image.clone()),
            _ => None,
        }
    }

    /// Camera capture never needs the storage permission.
    pub fn capture_from_camera(&mut self, image: SourceImage) {
        self.store(image, "camera");
    }

    /// Ask whether the gallery may be opened. Without access this moves to
    /// `AwaitingPermission` and the caller must resolve the permission before
    /// retrying. With access, a pending request is settled first so the image
    /// held before it becomes current again until the picker returns one.
    pub fn request_gallery(&mut self) -> GalleryRequest {
        if self.has_gallery_access() {
            self.settle_pending_request();
            return GalleryRequest {
                needs_permission: false,
            };
        }

        if !matches!(self.state, AcquisitionState::AwaitingPermission { .. }) {
            let previous = self.current_image();
            self.transition(AcquisitionState::AwaitingPermission { previous });
        }

        GalleryRequest {
            needs_permission: true,
        }
    }

    /// Store an image picked from the gallery. Without access the image is
    /// dropped and the state becomes `AwaitingPermission`.
    pub fn select_from_gallery(&mut self, image: SourceImage) -> GalleryRequest {
        let request = self.request_gallery();
        if !request.needs_permission {
            self.store(image, "gallery");
        }
        request
    }

    /// Record the grant. The state stays `AwaitingPermission` until the
    /// gallery flow is re-entered with [`Self::request_gallery`],
    /// [`Self::select_from_gallery`] or [`Self::gallery_cancelled`].
    pub fn permission_granted(&mut self) {
        debug!(state = self.state.name(), "storage permission granted");
        self.permission_granted = true;
    }

    /// Abandon the pending gallery request and hand back the notice to show.
    pub fn permission_denied(&mut self) -> PetSegError {
        self.permission_granted = false;
        self.settle_pending_request();
        PetSegError::PermissionDenied
    }

    /// The picker came back empty; keep whatever image was current before.
    pub fn gallery_cancelled(&mut self) {
        self.settle_pending_request();
    }

    fn settle_pending_request(&mut self) {
        if let AcquisitionState::AwaitingPermission { previous } = &mut self.state {
            let next = match previous.take() {
                Some(image) => AcquisitionState::Ready(image),
                None => AcquisitionState::Idle,
            };
            self.transition(next);
        }
    }

    /// Drop the current image at the end of a session.
    pub fn reset(&mut self) {
        if self.current_image().is_some() {
            self.generation += 1;
        }
        self.transition(AcquisitionState::Idle);
    }

    fn store(&mut self, image: SourceImage, source: &'static str) {
        let (width, height) = (image.width(), image.height());
        self.generation += 1;
        debug!(source, width, height, generation = self.generation, "source image stored");
        self.transition(AcquisitionState::Ready(image));
    }

    fn transition(&mut self, next: AcquisitionState) {
        debug!(from = self.state.name(), to = next.name(), "acquisition transition");
        self.state = next;
    }
}
