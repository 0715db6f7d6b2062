//! Prior grid and box decoding for the UltraFace RFB-320 model
//!
//! The model regresses offsets against a fixed grid of prior boxes rather
//! than emitting absolute coordinates. This module generates that grid for
//! the 320x240 input and turns regression quadruples back into corner-form
//! boxes, all normalized to the unit square.
//!
//! Reference: Ultra-Light-Fast-Generic-Face-Detector-1MB,
//! vision/utils/box_utils.py

/// One prior in center form, normalized to the unit square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prior {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

/// Regression variances from the reference implementation.
const CENTER_VARIANCE: f32 = 0.1;
const SIZE_VARIANCE: f32 = 0.2;

const INPUT_WIDTH: f32 = 320.0;
const INPUT_HEIGHT: f32 = 240.0;

/// One feature-map level of the detection head.
struct Level {
    /// Grid cells (columns, rows).
    grid: (usize, usize),
    /// Pixel stride per cell (horizontal, vertical).
    stride: (f32, f32),
    /// Square box sizes anchored at each cell, in input pixels.
    sizes: &'static [f32],
}

// 40x30x3 + 20x15x2 + 10x8x2 + 5x4x3 = 4420 priors.
const LEVELS: [Level; 4] = [
    Level {
        grid: (40, 30),
        stride: (8.0, 8.0),
        sizes: &[10.0, 16.0, 24.0],
    },
    Level {
        grid: (20, 15),
        stride: (16.0, 16.0),
        sizes: &[32.0, 48.0],
    },
    Level {
        grid: (10, 8),
        stride: (32.0, 30.0),
        sizes: &[64.0, 96.0],
    },
    Level {
        grid: (5, 4),
        stride: (64.0, 60.0),
        sizes: &[128.0, 192.0, 256.0],
    },
];

/// Total prior count across all levels.
pub const PRIOR_COUNT: usize = 4420;

/// Generate the prior grid for the RFB-320 model.
#[must_use]
pub fn rfb320_priors() -> Vec<Prior> {
    let mut priors = Vec::with_capacity(PRIOR_COUNT);

    for level in &LEVELS {
        let (cols, rows) = level.grid;
        let (stride_x, stride_y) = level.stride;

        for row in 0..rows {
            for col in 0..cols {
                let cx = (col as f32 + 0.5) * stride_x / INPUT_WIDTH;
                let cy = (row as f32 + 0.5) * stride_y / INPUT_HEIGHT;

                for &size in level.sizes {
                    priors.push(Prior {
                        cx: cx.clamp(0.0, 1.0),
                        cy: cy.clamp(0.0, 1.0),
                        w: (size / INPUT_WIDTH).clamp(0.0, 1.0),
                        h: (size / INPUT_HEIGHT).clamp(0.0, 1.0),
                    });
                }
            }
        }
    }

    debug_assert_eq!(priors.len(), PRIOR_COUNT);
    priors
}

impl Prior {
    /// Decode one regression quadruple `[dx, dy, dw, dh]` into a corner-form
    /// box `[x1, y1, x2, y2]`, still normalized to the unit square.
    #[must_use]
    pub fn decode(&self, offsets: [f32; 4]) -> [f32; 4] {
        let [dx, dy, dw, dh] = offsets;

        let cx = self.cx + dx * CENTER_VARIANCE * self.w;
        let cy = self.cy + dy * CENTER_VARIANCE * self.h;
        let w = self.w * (dw * SIZE_VARIANCE).exp();
        let h = self.h * (dh * SIZE_VARIANCE).exp();

        [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
    }
}
