pub mod camera;
pub mod classification;
pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod presentation;
pub mod trigger;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Configuration;
pub use error::{AppError, CameraError, CaptureError, ClassificationError, TriggerError};

pub use camera::{Camera, CaptureService, StillImageCamera};
pub use classification::{CloudVisionDetector, LandmarkDetector};
pub use pipeline::{DetectionState, Orchestrator, OrchestratorBuilder};
pub use presentation::{PresentationSink, TerminalPanel};
pub use trigger::{TriggerEvent, TriggerSource};
