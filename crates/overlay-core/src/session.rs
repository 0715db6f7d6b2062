//! Detection-cycle orchestration
//!
//! One trigger runs one cycle: ask the backend for faces, clear the overlay
//! layer, compute the aspect-fit transform once, and add one mark per region.
//! Image, surface, layer, and detector are explicit session state rather than
//! ambient UI state, so the whole cycle is testable without any UI framework.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use face_overlay_common::{Region, Rgba, SurfaceSize};
use image::RgbImage;
use tracing::{debug, warn};

use crate::adapter::SharedDetector;
use crate::overlay::{OverlayLayer, OverlayMark};
use crate::transform::FitTransform;

/// Outcome of one [`DetectionSession::trigger`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Detection ran to completion; `faces` marks were drawn. Zero on an
    /// adapter error or an empty result; both are swallowed here.
    Completed { faces: usize },

    /// A previous detection is still in flight; this trigger was ignored.
    InFlight,

    /// No image is currently displayed; nothing was detected.
    NoImage,
}

/// The state one detection cycle operates on.
pub struct DetectionSession {
    detector: SharedDetector,
    image: Mutex<Option<Arc<RgbImage>>>,
    layer: Mutex<OverlayLayer>,
    mark_color: Rgba,
    in_flight: AtomicBool,
}

impl DetectionSession {
    #[must_use]
    pub fn new(detector: SharedDetector, surface: SurfaceSize, mark_color: Rgba) -> Self {
        Self {
            detector,
            image: Mutex::new(None),
            layer: Mutex::new(OverlayLayer::new(surface)),
            mark_color,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Replace the displayed picture. Takes effect from the next cycle; a
    /// cycle already in flight keeps the image it started with.
    pub fn set_image(&self, image: RgbImage) {
        *lock(&self.image) = Some(Arc::new(image));
    }

    /// Remove the displayed picture.
    pub fn clear_image(&self) {
        *lock(&self.image) = None;
    }

    /// Track an external layout change of the display surface.
    pub fn resize_surface(&self, surface: SurfaceSize) {
        lock(&self.layer).resize_surface(surface);
    }

    /// Snapshot of the overlay layer's current marks.
    #[must_use]
    pub fn marks(&self) -> Vec<OverlayMark> {
        lock(&self.layer).marks().to_vec()
    }

    /// Run one detection cycle.
    ///
    /// Serialization policy for rapid triggers: a trigger arriving while a
    /// cycle is in flight is ignored ([`TriggerOutcome::InFlight`]). Adapter
    /// failures never propagate past this boundary; the cycle just produces
    /// zero marks.
    pub async fn trigger(&self) -> TriggerOutcome {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("detection already in flight, ignoring trigger");
            return TriggerOutcome::InFlight;
        }

        let outcome = self.run_cycle().await;
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_cycle(&self) -> TriggerOutcome {
        let Some(image) = lock(&self.image).clone() else {
            debug!("no image displayed, nothing to detect");
            return TriggerOutcome::NoImage;
        };

        let started = Instant::now();
        let faces = match self.detector.detect(&image).await {
            Ok(faces) => faces,
            Err(err) => {
                warn!(backend = self.detector.name(), "face detection failed: {err}");
                Vec::new()
            }
        };

        let regions: Vec<Region> = faces.iter().map(|face| face.region).collect();

        // One transform per cycle: image and surface dimensions are read once
        // and applied uniformly to every region.
        let mut layer = lock(&self.layer);
        layer.clear();
        let fit = FitTransform::aspect_fit(SurfaceSize::from(image.dimensions()), layer.surface());
        layer.mark_regions(&fit, &regions, self.mark_color);

        debug!(
            backend = self.detector.name(),
            faces = regions.len(),
            elapsed = ?started.elapsed(),
            "detection cycle complete"
        );

        TriggerOutcome::Completed {
            faces: regions.len(),
        }
    }

    /// Render the current picture with the current marks.
    ///
    /// Returns `None` when no image is displayed.
    #[must_use]
    pub fn composite(&self) -> Option<image::RgbaImage> {
        let image = lock(&self.image).clone()?;
        Some(lock(&self.layer).composite(&image))
    }
}

/// Lock a mutex, recovering the data on poisoning. The layer and image hold
/// plain data, so a panicked writer cannot leave them logically invalid.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
