use std::path::PathBuf;

use image::DynamicImage;
use tracing::{debug, info};

use super::Camera;
use crate::common::Rotation;
use crate::error::CameraError;

/// Serves the image at `path` as every capture, decoded fresh each time so a
/// file replaced on disk shows up on the next press.
pub struct StillImageCamera {
    path: PathBuf,
    rotation: Rotation,
}

impl StillImageCamera {
    pub fn new(path: PathBuf, rotation: Rotation) -> Self {
        Self { path, rotation }
    }
}

impl Camera for StillImageCamera {
    fn initialize(&mut self) -> Result<(), CameraError> {
        let metadata = std::fs::metadata(&self.path)?;
        if !metadata.is_file() {
            return Err(CameraError::Device(format!(
                "{} is not an image file",
                self.path.display()
            )));
        }
        info!("Still image camera reading {}", self.path.display());
        Ok(())
    }

    fn take_picture(&mut self) -> Result<DynamicImage, CameraError> {
        let image = image::open(&self.path)?;
        debug!(
            "Captured {}x{} still from {}",
            image.width(),
            image.height(),
            self.path.display()
        );
        Ok(image)
    }

    fn shut_down(&mut self) {
        info!("Still image camera shut down");
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }
}
