//! Pluggable face-detection boundary
//!
//! The detector is an external collaborator: given an image, it returns face
//! regions in that image's own pixel coordinate space, asynchronously, one
//! result per call. Everything behind the trait is opaque to the renderer,
//! so any vision backend can be substituted without touching the
//! transform/render core.

use async_trait::async_trait;
use face_overlay_common::Region;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AdapterError;

/// One face reported by a detection backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    /// Bounding rectangle in the source image's pixel space.
    pub region: Region,
    /// Detection confidence score (0.0-1.0).
    pub confidence: f32,
}

/// Asynchronous face-detection capability.
///
/// Single operation, single callback per call; no streaming, no partial
/// results, no cancellation.
#[async_trait]
pub trait FaceDetection: Send + Sync {
    /// Backend identifier used in logs.
    fn name(&self) -> &str;

    /// Detect faces in `image`.
    ///
    /// Returned regions are expressed in `image`'s own pixel coordinates.
    /// An empty vector is a valid result (no faces found).
    async fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedFace>, AdapterError>;
}

/// Shared handle to a detection backend.
pub type SharedDetector = Arc<dyn FaceDetection>;

#[cfg(test)]
mod tests {
    use super::*;

    struct NoFaces;

    #[async_trait]
    impl FaceDetection for NoFaces {
        fn name(&self) -> &str {
            "no-faces"
        }

        async fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectedFace>, AdapterError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_trait_object_detect() {
        let detector: SharedDetector = Arc::new(NoFaces);
        let image = RgbImage::new(4, 4);

        let faces = detector.detect(&image).await.unwrap();
        assert!(faces.is_empty());
        assert_eq!(detector.name(), "no-faces");
    }
}
