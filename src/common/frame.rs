use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::CaptureRequest;

/// Orientation hint the camera attaches to a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Returns the image turned upright.
    pub fn apply(self, image: &DynamicImage) -> DynamicImage {
        match self {
            Rotation::Deg0 => image.clone(),
            Rotation::Deg90 => image.rotate90(),
            Rotation::Deg180 => image.rotate180(),
            Rotation::Deg270 => image.rotate270(),
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(format!("unsupported rotation {} (expected 0, 90, 180 or 270)", other)),
        }
    }
}

/// Receives frames back once the pipeline is done with them.
pub trait FrameRecycler: Send + Sync {
    fn recycle(&self, frame_id: Uuid);
}

/// One captured image. Not `Clone`: whoever holds the `Frame` owns the capture
/// buffer, and the recycler is notified exactly once, either through
/// [`Frame::release`] or when the frame is dropped.
pub struct Frame {
    request: CaptureRequest,
    frame_id: Uuid,
    image: Arc<DynamicImage>,
    rotation: Rotation,
    captured_at: DateTime<Utc>,
    recycler: Option<Arc<dyn FrameRecycler>>,
}

impl Frame {
    pub fn new(request: CaptureRequest, image: DynamicImage, rotation: Rotation) -> Self {
        Self {
            request,
            frame_id: Uuid::new_v4(),
            image: Arc::new(image),
            rotation,
            captured_at: Utc::now(),
            recycler: None,
        }
    }

    pub fn with_recycler(mut self, recycler: Arc<dyn FrameRecycler>) -> Self {
        self.recycler = Some(recycler);
        self
    }

    pub fn request(&self) -> &CaptureRequest {
        &self.request
    }

    pub fn request_id(&self) -> Uuid {
        self.request.request_id
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Read-only view of the pixels that outlives a borrow of the frame.
    pub fn shared_image(&self) -> Arc<DynamicImage> {
        Arc::clone(&self.image)
    }

    pub fn release(mut self) {
        self.recycle();
    }

    fn recycle(&mut self) {
        if let Some(recycler) = self.recycler.take() {
            recycler.recycle(self.frame_id);
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.recycle();
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("request_id", &self.request.request_id)
            .field("frame_id", &self.frame_id)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("rotation", &self.rotation)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}
