use uuid::Uuid;

use crate::common::{CaptureRequest, Frame, LandmarkResult};
use crate::error::{CaptureError, ClassificationError};

/// Posted by the workers onto the single channel the orchestrator reads.
#[derive(Debug)]
pub enum Completion {
    Captured {
        request: CaptureRequest,
        result: Result<Frame, CaptureError>,
    },
    Classified {
        request_id: Uuid,
        result: Result<Option<LandmarkResult>, ClassificationError>,
    },
}

impl Completion {
    pub fn request_id(&self) -> Uuid {
        match self {
            Completion::Captured { request, .. } => request.request_id,
            Completion::Classified { request_id, .. } => *request_id,
        }
    }
}
