//! Face overlay core: aspect-fit transform, overlay marks, and the
//! detection-cycle session.
//!
//! The analytical work (finding faces) is delegated to an opaque backend
//! behind the [`FaceDetection`] trait. What this crate owns is the original
//! logic of the application:
//!
//! - the affine mapping from image pixel space to display-surface space under
//!   aspect-fit scaling ([`FitTransform`])
//! - the overlay layer of translucent rounded rectangles ([`OverlayLayer`])
//! - the per-trigger detection cycle with in-flight serialization and
//!   swallow-on-error semantics ([`DetectionSession`])
//!
//! # Example
//! ```
//! use face_overlay_common::SurfaceSize;
//! use face_overlay_core::FitTransform;
//!
//! // A 200x100 photograph shown aspect-fit in a 100x100 surface.
//! let fit = FitTransform::aspect_fit(
//!     SurfaceSize::new(200.0, 100.0),
//!     SurfaceSize::new(100.0, 100.0),
//! );
//!
//! assert_eq!(fit.apply(10.0, 10.0), (5.0, 30.0));
//! ```

pub mod adapter;
pub mod error;
pub mod overlay;
pub mod session;
pub mod transform;

pub use adapter::{DetectedFace, FaceDetection, SharedDetector};
pub use error::AdapterError;
pub use overlay::{OverlayLayer, OverlayMark, MARK_CORNER_RADIUS, MARK_OPACITY};
pub use session::{DetectionSession, TriggerOutcome};
pub use transform::FitTransform;
