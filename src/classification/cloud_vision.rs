use std::io::Cursor;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::LandmarkDetector;
use crate::common::{GeoPoint, LandmarkCandidate, Rotation};
use crate::config::VisionConfiguration;
use crate::error::ClassificationError;

const LANDMARK_FEATURE: &str = "LANDMARK_DETECTION";

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    max_results: u32,
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    landmark_annotations: Vec<EntityAnnotation>,
    error: Option<Status>,
}

// Zero-valued fields are omitted on the wire, hence the defaults.
#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    locations: Vec<LocationInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationInfo {
    lat_lng: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    #[serde(default)]
    latitude: f64,
    #[serde(default)]
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i32,
    #[serde(default)]
    message: String,
}

/// Landmark detection through the Cloud Vision `images:annotate` REST call.
pub struct CloudVisionDetector {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    max_results: u32,
}

impl CloudVisionDetector {
    pub fn new(configuration: &VisionConfiguration) -> Result<Self, ClassificationError> {
        let api_key = configuration
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ClassificationError::NotConfigured("vision.api_key is not set".into()))?;
        let endpoint = Url::parse(&configuration.endpoint).map_err(|e| {
            ClassificationError::NotConfigured(format!(
                "invalid vision endpoint {:?}: {}",
                configuration.endpoint, e
            ))
        })?;
        let client = reqwest::Client::builder()
            .timeout(configuration.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
            max_results: configuration.max_results.max(1),
        })
    }

    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("key", &self.api_key);
        url
    }

    fn build_request(
        &self,
        image: &DynamicImage,
        rotation: Rotation,
    ) -> Result<AnnotateRequest, ClassificationError> {
        Ok(AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(encode_jpeg(image, rotation)?),
                },
                features: vec![Feature {
                    kind: LANDMARK_FEATURE,
                    max_results: self.max_results,
                }],
            }],
        })
    }
}

#[async_trait]
impl LandmarkDetector for CloudVisionDetector {
    async fn detect(
        &self,
        image: &DynamicImage,
        rotation: Rotation,
    ) -> Result<Vec<LandmarkCandidate>, ClassificationError> {
        let body = self.build_request(image, rotation)?;
        debug!("Posting {}x{} frame to {}", image.width(), image.height(), self.endpoint);

        let response = self.client.post(self.request_url()).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClassificationError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        let annotations: AnnotateResponse = response.json().await?;
        into_candidates(annotations)
    }
}

/// Turns the frame upright and encodes it as JPEG, which carries no alpha.
fn encode_jpeg(image: &DynamicImage, rotation: Rotation) -> Result<Vec<u8>, ClassificationError> {
    let upright = DynamicImage::ImageRgb8(rotation.apply(image).to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    upright.write_to(&mut buffer, ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
}

fn into_candidates(response: AnnotateResponse) -> Result<Vec<LandmarkCandidate>, ClassificationError> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(Vec::new());
    };
    if let Some(error) = first.error {
        return Err(ClassificationError::Api(format!(
            "{} (code {})",
            error.message, error.code
        )));
    }
    Ok(first
        .landmark_annotations
        .into_iter()
        .map(|annotation| {
            let locations = annotation
                .locations
                .into_iter()
                .filter_map(|location| location.lat_lng)
                .map(|lat_lng| GeoPoint {
                    latitude: lat_lng.latitude,
                    longitude: lat_lng.longitude,
                })
                .collect();
            LandmarkCandidate::new(annotation.description, annotation.score, locations)
        })
        .collect())
}
