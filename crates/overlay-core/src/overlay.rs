//! Overlay marks and their rasterization
//!
//! Marks are translucent rounded rectangles stacked on a transparent layer
//! exactly over the display surface. The layer owns its marks: it is created
//! empty, populated once per detection cycle, and fully cleared before
//! repopulation. No mark is ever removed individually.

use face_overlay_common::{Region, Rgba, SurfaceSize};
use image::{imageops, DynamicImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::transform::FitTransform;

/// Corner rounding radius applied to every mark, in surface units.
pub const MARK_CORNER_RADIUS: f32 = 10.0;

/// Opacity factor applied to every mark fill.
pub const MARK_OPACITY: f32 = 0.3;

/// One translucent rectangle visualizing a detected face region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayMark {
    /// Rectangle in display-surface coordinates.
    pub rect: Region,
    /// Fill color supplied by the caller.
    pub color: Rgba,
    /// Corner rounding radius (surface units).
    pub corner_radius: f32,
    /// Fill opacity factor (0.0-1.0), multiplied with the color's alpha.
    pub opacity: f32,
}

/// Transparent layer stacked over the display surface.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    surface: SurfaceSize,
    marks: Vec<OverlayMark>,
}

impl OverlayLayer {
    /// Create an empty layer covering a surface of the given size.
    #[must_use]
    pub fn new(surface: SurfaceSize) -> Self {
        Self {
            surface,
            marks: Vec::new(),
        }
    }

    #[must_use]
    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    /// Track an external layout change of the underlying surface.
    pub fn resize_surface(&mut self, surface: SurfaceSize) {
        self.surface = surface;
    }

    #[must_use]
    pub fn marks(&self) -> &[OverlayMark] {
        &self.marks
    }

    /// Drop every mark. Called at the start of each detection cycle.
    pub fn clear(&mut self) {
        self.marks.clear();
    }

    /// Append one mark per region, all mapped through the same `fit`
    /// transform so every region of a cycle shares one scale and one offset.
    pub fn mark_regions(&mut self, fit: &FitTransform, regions: &[Region], color: Rgba) {
        self.marks.reserve(regions.len());
        for region in regions {
            self.marks.push(OverlayMark {
                rect: fit.map_region(region),
                color,
                corner_radius: MARK_CORNER_RADIUS,
                opacity: MARK_OPACITY,
            });
        }
    }

    /// Render the photograph aspect-fit on a surface-sized canvas and blend
    /// every mark over it.
    ///
    /// A degenerate surface degrades to the image's own size (identity fit)
    /// instead of failing.
    #[must_use]
    pub fn composite(&self, image: &RgbImage) -> RgbaImage {
        let surface = if self.surface.is_degenerate() {
            SurfaceSize::from(image.dimensions())
        } else {
            self.surface
        };

        let mut canvas = RgbaImage::new(
            surface.width.round() as u32,
            surface.height.round() as u32,
        );

        let fit = FitTransform::aspect_fit(SurfaceSize::from(image.dimensions()), surface);
        let scaled_w = (image.width() as f32 * fit.scale).round() as u32;
        let scaled_h = (image.height() as f32 * fit.scale).round() as u32;

        if scaled_w > 0 && scaled_h > 0 {
            let resized = imageops::resize(image, scaled_w, scaled_h, imageops::FilterType::Triangle);
            let resized = DynamicImage::ImageRgb8(resized).to_rgba8();
            imageops::overlay(
                &mut canvas,
                &resized,
                fit.offset_x.round() as i64,
                fit.offset_y.round() as i64,
            );
        }

        for mark in &self.marks {
            blend_mark(&mut canvas, mark);
        }

        canvas
    }
}

/// Alpha-blend one mark onto the canvas, clipped to the canvas bounds.
fn blend_mark(canvas: &mut RgbaImage, mark: &OverlayMark) {
    let alpha = (mark.opacity * f32::from(mark.color.a) / 255.0).clamp(0.0, 1.0);
    if alpha <= 0.0 || mark.rect.width <= 0.0 || mark.rect.height <= 0.0 {
        return;
    }

    let (canvas_w, canvas_h) = canvas.dimensions();
    let x0 = mark.rect.x.floor().max(0.0) as u32;
    let y0 = mark.rect.y.floor().max(0.0) as u32;
    let x1 = mark.rect.right().ceil().min(canvas_w as f32) as u32;
    let y1 = mark.rect.bottom().ceil().min(canvas_h as f32) as u32;

    let src = [
        f32::from(mark.color.r),
        f32::from(mark.color.g),
        f32::from(mark.color.b),
    ];
    let coverage_alpha = (alpha * 255.0).round() as u8;

    for py in y0..y1 {
        for px in x0..x1 {
            // Sample at the pixel center.
            if !covers(&mark.rect, mark.corner_radius, px as f32 + 0.5, py as f32 + 0.5) {
                continue;
            }

            let dst = canvas.get_pixel_mut(px, py);
            for channel in 0..3 {
                let blended = f32::from(dst[channel]) * (1.0 - alpha) + src[channel] * alpha;
                dst[channel] = blended.round() as u8;
            }
            dst[3] = dst[3].max(coverage_alpha);
        }
    }
}

/// Whether a point lies inside the rounded rectangle.
fn covers(rect: &Region, corner_radius: f32, x: f32, y: f32) -> bool {
    if x < rect.x || x > rect.right() || y < rect.y || y > rect.bottom() {
        return false;
    }

    // Radius cannot exceed half the shorter side.
    let radius = corner_radius
        .min(rect.width / 2.0)
        .min(rect.height / 2.0)
        .max(0.0);

    // Nearest point of the radius-inset inner rectangle; within `radius` of
    // it means inside the rounded outline (covers edges and corner arcs in
    // one test).
    let inner_x = x.clamp(rect.x + radius, rect.right() - radius);
    let inner_y = y.clamp(rect.y + radius, rect.bottom() - radius);
    let dx = x - inner_x;
    let dy = y - inner_y;

    dx * dx + dy * dy <= radius * radius
}
