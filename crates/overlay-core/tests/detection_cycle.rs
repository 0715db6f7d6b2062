//! End-to-end detection cycles against mock backends: trigger serialization
//! and the full detect → transform → mark → composite path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use face_overlay_common::{Region, Rgba, SurfaceSize};
use face_overlay_core::{
    AdapterError, DetectedFace, DetectionSession, FaceDetection, TriggerOutcome, MARK_OPACITY,
};
use image::RgbImage;

/// Answers after a configurable delay, to keep a cycle in flight.
struct SlowDetector {
    delay: Duration,
    regions: Vec<Region>,
}

#[async_trait]
impl FaceDetection for SlowDetector {
    fn name(&self) -> &str {
        "slow"
    }

    async fn detect(&self, _image: &RgbImage) -> Result<Vec<DetectedFace>, AdapterError> {
        tokio::time::sleep(self.delay).await;
        Ok(self
            .regions
            .iter()
            .map(|&region| DetectedFace {
                region,
                confidence: 0.95,
            })
            .collect())
    }
}

#[tokio::test]
async fn second_trigger_during_flight_is_ignored() {
    let detector = Arc::new(SlowDetector {
        delay: Duration::from_millis(200),
        regions: vec![Region::new(10.0, 10.0, 20.0, 20.0)],
    });
    let session = Arc::new(DetectionSession::new(
        detector,
        SurfaceSize::new(100.0, 100.0),
        Rgba::GREEN,
    ));
    session.set_image(RgbImage::new(200, 100));

    let first = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.trigger().await }
    });

    // Let the first cycle reach the adapter before re-triggering.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.trigger().await, TriggerOutcome::InFlight);

    assert_eq!(
        first.await.expect("first trigger panicked"),
        TriggerOutcome::Completed { faces: 1 }
    );
    assert_eq!(session.marks().len(), 1);
}

#[tokio::test]
async fn trigger_accepted_again_after_completion() {
    let detector = Arc::new(SlowDetector {
        delay: Duration::from_millis(10),
        regions: vec![Region::new(10.0, 10.0, 20.0, 20.0)],
    });
    let session = Arc::new(DetectionSession::new(
        detector,
        SurfaceSize::new(100.0, 100.0),
        Rgba::GREEN,
    ));
    session.set_image(RgbImage::new(200, 100));

    assert_eq!(session.trigger().await, TriggerOutcome::Completed { faces: 1 });
    assert_eq!(session.trigger().await, TriggerOutcome::Completed { faces: 1 });
}

#[tokio::test]
async fn full_cycle_composites_marks_over_the_picture() {
    let detector = Arc::new(SlowDetector {
        delay: Duration::from_millis(1),
        regions: vec![Region::new(40.0, 40.0, 80.0, 80.0)],
    });
    let session = DetectionSession::new(
        detector,
        SurfaceSize::new(100.0, 100.0),
        Rgba::GREEN,
    );

    // Uniform mid-gray 200x100 picture.
    let mut picture = RgbImage::new(200, 100);
    for pixel in picture.pixels_mut() {
        *pixel = image::Rgb([100, 100, 100]);
    }
    session.set_image(picture);

    session.trigger().await;
    let canvas = session.composite().expect("image is set");
    assert_eq!(canvas.dimensions(), (100, 100));

    // The region maps to (20, 45, 40, 40) under scale 0.5, offsets (0, 25).
    // Inside the mark the green channel is blended above the gray base.
    let inside = canvas.get_pixel(40, 65);
    let base = 100.0 * (1.0 - MARK_OPACITY);
    let expected_g = (base + 255.0 * MARK_OPACITY).round() as i16;
    let expected_r = base.round() as i16;
    assert!((i16::from(inside[1]) - expected_g).abs() <= 1);
    assert!((i16::from(inside[0]) - expected_r).abs() <= 1);

    // Outside the mark but inside the picture: plain gray.
    let outside = canvas.get_pixel(80, 35);
    assert_eq!(outside[0], 100);
    assert_eq!(outside[1], 100);

    // Letterbox band above the picture: fully transparent.
    assert_eq!(canvas.get_pixel(50, 10)[3], 0);
}
