//! UltraFace face-detection backend driven through ONNX Runtime
//!
//! Wraps the UltraFace RFB-320 model (Ultra-Light-Fast-Generic-Face-Detector,
//! ~1.2MB) as a [`FaceDetection`] backend. The model itself is the opaque
//! part; this crate only feeds it pixels and turns its raw tensors back into
//! face regions in the source image's pixel space.
//!
//! # Example
//! ```no_run
//! use face_overlay_ultraface::{UltraFaceConfig, UltraFaceDetector};
//! use image::open;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = UltraFaceDetector::new("ultraface-rfb320.onnx", UltraFaceConfig::default())?;
//!
//! let img = open("photo.jpg")?.to_rgb8();
//! let faces = detector.detect_image(&img)?;
//!
//! for face in faces {
//!     println!(
//!         "face at ({:.0}, {:.0}) {:.0}x{:.0}, confidence {:.2}",
//!         face.region.x, face.region.y, face.region.width, face.region.height, face.confidence
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod priors;

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use face_overlay_common::Region;
use face_overlay_core::{AdapterError, DetectedFace, FaceDetection};
use image::RgbImage;
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use priors::Prior;

/// Input size the RFB-320 model expects.
const MODEL_INPUT: (u32, u32) = (320, 240);

/// Configuration for the UltraFace backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UltraFaceConfig {
    /// Minimum confidence for a detection to be kept (0.0-1.0).
    pub confidence_threshold: f32,
    /// IoU threshold for non-maximum suppression (0.0-1.0).
    pub nms_threshold: f32,
    /// Model input size; only 320x240 is supported.
    pub input_size: (u32, u32),
}

impl Default for UltraFaceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            // Anchor decoding yields several overlapping boxes per face;
            // suppression has to be strict.
            nms_threshold: 0.25,
            input_size: MODEL_INPUT,
        }
    }
}

/// Errors raised while loading or running the UltraFace model.
#[derive(Debug, Error)]
pub enum UltraFaceError {
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("unsupported input size {0}x{1}, only 320x240 is supported")]
    UnsupportedInputSize(u32, u32),

    #[error("empty input image")]
    EmptyImage,

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("unexpected model output: {0}")]
    Output(String),
}

impl From<UltraFaceError> for AdapterError {
    fn from(err: UltraFaceError) -> Self {
        let message = err.to_string();
        match err {
            UltraFaceError::ModelLoad(_) | UltraFaceError::UnsupportedInputSize(..) => {
                AdapterError::BackendLoad(message)
            }
            UltraFaceError::EmptyImage => AdapterError::InvalidImage(message),
            UltraFaceError::Inference(_) | UltraFaceError::Output(_) => {
                AdapterError::Detection(message)
            }
        }
    }
}

/// Face detector backed by the UltraFace RFB-320 ONNX model.
#[derive(Debug)]
pub struct UltraFaceDetector {
    // ort's Session::run needs &mut self; the trait hands out &self.
    session: Mutex<Session>,
    config: UltraFaceConfig,
    priors: Vec<Prior>,
}

impl UltraFaceDetector {
    /// Load the model and precompute the prior grid.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        config: UltraFaceConfig,
    ) -> Result<Self, UltraFaceError> {
        let (input_w, input_h) = config.input_size;
        if (input_w, input_h) != MODEL_INPUT {
            return Err(UltraFaceError::UnsupportedInputSize(input_w, input_h));
        }

        let model_path = model_path.as_ref();
        info!("loading UltraFace model from {}", model_path.display());

        let session = Session::builder()
            .and_then(|builder| Ok(builder.with_optimization_level(GraphOptimizationLevel::Level3)?))
            .and_then(|mut builder| builder.commit_from_file(model_path))
            .map_err(|e| UltraFaceError::ModelLoad(e.to_string()))?;

        let priors = priors::rfb320_priors();
        info!(priors = priors.len(), "UltraFace model loaded");

        Ok(Self {
            session: Mutex::new(session),
            config,
            priors,
        })
    }

    /// Detect faces in an RGB image, returning regions in the image's own
    /// pixel space.
    pub fn detect_image(&self, image: &RgbImage) -> Result<Vec<DetectedFace>, UltraFaceError> {
        let (image_w, image_h) = image.dimensions();
        if image_w == 0 || image_h == 0 {
            return Err(UltraFaceError::EmptyImage);
        }

        debug!("detecting faces in {image_w}x{image_h} image");

        let input = self.preprocess(image);
        let input_tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| UltraFaceError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| UltraFaceError::Inference(e.to_string()))?;

        // Scores come as [1, N, 2] logits (background, face); the RFB-320
        // export names the tensor "confidences". Boxes are [1, N, 4]
        // regression offsets against the prior grid.
        let scores_value = outputs
            .get("confidences")
            .or_else(|| outputs.get("scores"))
            .ok_or_else(|| UltraFaceError::Output("missing confidences output".into()))?;
        let (scores_shape, scores) = scores_value
            .try_extract_tensor::<f32>()
            .map_err(|e| UltraFaceError::Output(format!("confidences: {e}")))?;

        let boxes_value = outputs
            .get("boxes")
            .ok_or_else(|| UltraFaceError::Output("missing boxes output".into()))?;
        let (boxes_shape, locations) = boxes_value
            .try_extract_tensor::<f32>()
            .map_err(|e| UltraFaceError::Output(format!("boxes: {e}")))?;

        if scores_shape.len() != 3 || boxes_shape.len() != 3 || scores_shape[1] != boxes_shape[1] {
            return Err(UltraFaceError::Output(format!(
                "unexpected output shapes: confidences={scores_shape:?}, boxes={boxes_shape:?}"
            )));
        }

        let faces = decode_detections(
            scores,
            locations,
            &self.priors,
            &self.config,
            image_w as f32,
            image_h as f32,
        )?;

        debug!(faces = faces.len(), "detection complete");
        Ok(faces)
    }

    /// Resize to the model input and normalize to CHW `(px - 127) / 128`.
    fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let (input_w, input_h) = self.config.input_size;
        let resized = image::imageops::resize(
            image,
            input_w,
            input_h,
            image::imageops::FilterType::Triangle,
        );

        let mut input = Array4::<f32>::zeros((1, 3, input_h as usize, input_w as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                input[[0, channel, y as usize, x as usize]] =
                    (f32::from(pixel[channel]) - 127.0) / 128.0;
            }
        }
        input
    }
}

#[async_trait]
impl FaceDetection for UltraFaceDetector {
    fn name(&self) -> &str {
        "ultraface-rfb320"
    }

    async fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedFace>, AdapterError> {
        Ok(self.detect_image(image)?)
    }
}

/// Turn raw model tensors into pixel-space detections: softmax the logits,
/// decode regressions against the priors, scale to the source image, then
/// suppress duplicates.
fn decode_detections(
    scores: &[f32],
    locations: &[f32],
    priors: &[Prior],
    config: &UltraFaceConfig,
    image_w: f32,
    image_h: f32,
) -> Result<Vec<DetectedFace>, UltraFaceError> {
    if scores.len() != priors.len() * 2 || locations.len() != priors.len() * 4 {
        return Err(UltraFaceError::Output(format!(
            "tensor sizes do not match the prior grid: {} scores, {} locations, {} priors",
            scores.len(),
            locations.len(),
            priors.len()
        )));
    }

    let mut faces = Vec::new();
    for (i, prior) in priors.iter().enumerate() {
        // Softmax over the (background, face) logit pair.
        let background = scores[2 * i];
        let face = scores[2 * i + 1];
        let confidence = 1.0 / (1.0 + (background - face).exp());
        if confidence < config.confidence_threshold {
            continue;
        }

        let base = 4 * i;
        let [x1, y1, x2, y2] = prior.decode([
            locations[base],
            locations[base + 1],
            locations[base + 2],
            locations[base + 3],
        ]);

        let x1 = x1.clamp(0.0, 1.0);
        let y1 = y1.clamp(0.0, 1.0);
        let x2 = x2.clamp(0.0, 1.0);
        let y2 = y2.clamp(0.0, 1.0);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        faces.push(DetectedFace {
            region: Region::new(
                x1 * image_w,
                y1 * image_h,
                (x2 - x1) * image_w,
                (y2 - y1) * image_h,
            ),
            confidence,
        });
    }

    Ok(suppress_duplicates(faces, config.nms_threshold))
}

/// Greedy non-maximum suppression: keep the most confident detection of each
/// overlapping cluster.
fn suppress_duplicates(mut faces: Vec<DetectedFace>, nms_threshold: f32) -> Vec<DetectedFace> {
    faces.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<DetectedFace> = Vec::new();
    for face in faces {
        if kept
            .iter()
            .all(|winner| winner.region.iou(&face.region) <= nms_threshold)
        {
            kept.push(face);
        }
    }
    kept
}
