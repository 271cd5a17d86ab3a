use thiserror::Error;
use uuid::Uuid;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Trigger Error: {0}")]
    Trigger(#[from] TriggerError),
    #[error("Capture Error: {0}")]
    Capture(#[from] CaptureError),
    #[error("Classification Error: {0}")]
    Classification(#[from] ClassificationError),
    #[error("Orchestrator Error: {0}")]
    Orchestrator(String),
}

// Trigger line errors
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Trigger hardware unavailable: {0}")]
    HardwareUnavailable(String),
    #[error("Trigger line is already open")]
    AlreadyOpen,
    #[error("Trigger line is already closed")]
    AlreadyClosed,
    #[error("Failed to release trigger line: {0}")]
    ReleaseError(std::io::Error),
}

// Raised by camera implementations
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode camera image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Camera device error: {0}")]
    Device(String),
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("A capture is already outstanding")]
    Busy,
    #[error("Failed to capture frame for request {0}: {1}")]
    CaptureFailed(Uuid, #[source] CameraError),
    #[error("Failed to initialize camera: {0}")]
    InitializationFailed(#[source] CameraError),
    #[error("Capture worker is not running")]
    WorkerStopped,
    #[error("Capture worker panicked")]
    WorkerPanicked,
}

#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("Failed to reach the recognition service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Recognition service answered {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("Recognition service rejected the request: {0}")]
    Api(String),
    #[error("Failed to encode frame: {0}")]
    Encoding(#[from] image::ImageError),
    #[error("Recognition service is not configured: {0}")]
    NotConfigured(String),
    #[error("Classification worker is busy")]
    Busy,
    #[error("Classification worker is not running")]
    WorkerStopped,
}
