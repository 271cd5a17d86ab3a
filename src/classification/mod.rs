pub mod client;
pub mod cloud_vision;

pub use client::ClassificationClient;
pub use cloud_vision::CloudVisionDetector;

use async_trait::async_trait;
use image::DynamicImage;

use crate::common::{LandmarkCandidate, LandmarkResult, Rotation};
use crate::error::ClassificationError;

/// Remote landmark recognition. Candidates come back best match first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LandmarkDetector: Send + Sync {
    async fn detect(
        &self,
        image: &DynamicImage,
        rotation: Rotation,
    ) -> Result<Vec<LandmarkCandidate>, ClassificationError>;
}

/// Runs one detection and keeps only the best match.
pub async fn classify(
    detector: &dyn LandmarkDetector,
    image: &DynamicImage,
    rotation: Rotation,
) -> Result<Option<LandmarkResult>, ClassificationError> {
    let candidates = detector.detect(image, rotation).await?;
    tracing::debug!("Recognition service returned {} candidates", candidates.len());
    Ok(LandmarkResult::best_match(&candidates))
}
