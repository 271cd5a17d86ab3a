use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Created for every accepted trigger press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl CaptureRequest {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self::new()
    }
}
