//! Aspect-fit mapping from image pixel space to display-surface space

use face_overlay_common::{Region, SurfaceSize};
use serde::{Deserialize, Serialize};

/// Affine mapping (uniform scale plus translation) from a source image's
/// pixel space into the space of a surface displaying it aspect-fit: scaled
/// uniformly until fully visible, centered, no cropping, no stretching.
///
/// A point maps as `(x * scale + offset_x, y * scale + offset_y)`: the raw
/// point is scaled first, then the centering offset is added.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl FitTransform {
    /// The do-nothing mapping.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        offset_x: 0.0,
        offset_y: 0.0,
    };

    /// Compute the transform for `image` shown aspect-fit inside `surface`.
    ///
    /// When the surface is relatively wider than the image, the image is
    /// height-constrained and `scale = surface.height / image.height`;
    /// otherwise it is width-constrained. Leftover space on the other axis is
    /// split evenly into the centering offsets.
    ///
    /// Degenerate input (absent image modeled as zero dimensions, or any
    /// non-positive dimension) falls back to [`FitTransform::IDENTITY`]
    /// rather than failing; callers tolerate detections drawn unscaled in
    /// that case.
    #[must_use]
    pub fn aspect_fit(image: SurfaceSize, surface: SurfaceSize) -> Self {
        if image.is_degenerate() || surface.is_degenerate() {
            return Self::IDENTITY;
        }

        let scale = if surface.aspect() > image.aspect() {
            surface.height / image.height
        } else {
            surface.width / image.width
        };

        let offset_x = (surface.width - image.width * scale) / 2.0;
        let offset_y = (surface.height - image.height * scale) / 2.0;

        Self {
            scale,
            offset_x,
            offset_y,
        }
    }

    /// Map a point from image space into surface space.
    #[must_use]
    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.offset_x, y * self.scale + self.offset_y)
    }

    /// Map a rectangle: the origin corner moves like a point; width and
    /// height pick up the scale only, never the offsets.
    #[must_use]
    pub fn map_region(&self, region: &Region) -> Region {
        let (x, y) = self.apply(region.x, region.y);
        Region::new(x, y, region.width * self.scale, region.height * self.scale)
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_fit() {
        // Matching aspect ratios at matching size: the transform is the identity.
        let fit = FitTransform::aspect_fit(
            SurfaceSize::new(640.0, 480.0),
            SurfaceSize::new(640.0, 480.0),
        );
        assert!(fit.is_identity());
    }

    #[test]
    fn test_width_constrained() {
        // Image 200x100 (aspect 2.0) in a 100x100 surface (aspect 1.0):
        // width-constrained, scale 0.5, centered vertically.
        let fit = FitTransform::aspect_fit(
            SurfaceSize::new(200.0, 100.0),
            SurfaceSize::new(100.0, 100.0),
        );

        assert!((fit.scale - 0.5).abs() < 1e-6);
        assert!((fit.offset_x - 0.0).abs() < 1e-6);
        assert!((fit.offset_y - 25.0).abs() < 1e-6);

        let mapped = fit.map_region(&Region::new(10.0, 10.0, 20.0, 20.0));
        assert!((mapped.x - 5.0).abs() < 1e-6);
        assert!((mapped.y - 30.0).abs() < 1e-6);
        assert!((mapped.width - 10.0).abs() < 1e-6);
        assert!((mapped.height - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_height_constrained() {
        // Image 100x200 (aspect 0.5) in a 100x100 surface (aspect 1.0):
        // height-constrained, scale 0.5, centered horizontally.
        let fit = FitTransform::aspect_fit(
            SurfaceSize::new(100.0, 200.0),
            SurfaceSize::new(100.0, 100.0),
        );

        assert!((fit.scale - 0.5).abs() < 1e-6);
        assert!((fit.offset_x - 25.0).abs() < 1e-6);
        assert!((fit.offset_y - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_image_falls_back_to_identity() {
        let fit = FitTransform::aspect_fit(
            SurfaceSize::new(0.0, 0.0),
            SurfaceSize::new(375.0, 667.0),
        );
        assert!(fit.is_identity());

        let fit = FitTransform::aspect_fit(
            SurfaceSize::new(-10.0, 100.0),
            SurfaceSize::new(375.0, 667.0),
        );
        assert!(fit.is_identity());
    }

    #[test]
    fn test_degenerate_surface_falls_back_to_identity() {
        let fit = FitTransform::aspect_fit(
            SurfaceSize::new(640.0, 480.0),
            SurfaceSize::new(100.0, 0.0),
        );
        assert!(fit.is_identity());
    }

    #[test]
    fn test_shape_is_scale_invariant() {
        // Transformed width/height depend on scale alone, never the offsets.
        let fit = FitTransform::aspect_fit(
            SurfaceSize::new(4000.0, 3000.0),
            SurfaceSize::new(375.0, 667.0),
        );

        let region = Region::new(123.0, 456.0, 640.0, 480.0);
        let mapped = fit.map_region(&region);

        assert!((mapped.width - region.width * fit.scale).abs() < 1e-3);
        assert!((mapped.height - region.height * fit.scale).abs() < 1e-3);
    }

    #[test]
    fn test_uniform_scale_preserves_aspect() {
        let fit = FitTransform::aspect_fit(
            SurfaceSize::new(1920.0, 1080.0),
            SurfaceSize::new(400.0, 400.0),
        );

        let region = Region::new(100.0, 100.0, 300.0, 150.0);
        let mapped = fit.map_region(&region);

        assert!((mapped.width / mapped.height - 2.0).abs() < 1e-5);
    }
}
