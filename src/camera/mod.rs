pub mod capture_service;
pub mod frame_ledger;
pub mod still_image;

pub use capture_service::CaptureService;
pub use frame_ledger::FrameLedger;
pub use still_image::StillImageCamera;

use crate::common::Rotation;
use crate::error::CameraError;
use image::DynamicImage;

/// Camera driver as seen by the capture worker. Every method is called from
/// the worker thread, so implementations may block.
pub trait Camera: Send {
    fn initialize(&mut self) -> Result<(), CameraError>;
    fn take_picture(&mut self) -> Result<DynamicImage, CameraError>;
    fn shut_down(&mut self);

    fn rotation(&self) -> Rotation {
        Rotation::Deg0
    }
}
