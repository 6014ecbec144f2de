//! Anchor prior generation.
//!
//! The network's score and box tensors are flattened in a fixed order: feature
//! map level first, then row, then column, then min-box size. `generate_priors`
//! reproduces that order exactly, so prior `i` lines up with row `i` of every
//! raw output. The level table is constant data; nothing here depends on a
//! detector instance.

use crate::trace::{trace_event, trace_span};
use crate::util::math::ceil_div;
use crate::util::{UltraFaceError, UltraFaceResult};

/// Feature map strides in input pixels, one per detection head.
pub const STRIDES: [usize; 4] = [8, 16, 32, 64];

/// Min-box edge lengths in input pixels, one group per detection head.
pub const MIN_BOXES: [&[f32]; 4] = [
    &[10.0, 16.0, 24.0],
    &[32.0, 48.0],
    &[64.0, 96.0],
    &[128.0, 192.0, 256.0],
];

/// Anchor prior in center form, normalized to the detector input size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prior {
    /// Center x as a fraction of the input width.
    pub cx: f32,
    /// Center y as a fraction of the input height.
    pub cy: f32,
    /// Width as a fraction of the input width.
    pub w: f32,
    /// Height, using the same normalized edge as `w`.
    pub h: f32,
}

/// Geometry of one detection head for a given input size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeatureMapSpec {
    /// Stride of this head in input pixels.
    pub stride: usize,
    /// Number of cells along x, `ceil(input_w / stride)`.
    pub size_w: usize,
    /// Number of cells along y, `ceil(input_h / stride)`.
    pub size_h: usize,
    /// Anchors emitted per cell, in emission order.
    pub min_box_sizes: &'static [f32],
}

impl FeatureMapSpec {
    /// Number of priors this head contributes, or `None` if the count does
    /// not fit in `usize`.
    pub fn num_anchors(&self) -> Option<usize> {
        self.size_w
            .checked_mul(self.size_h)?
            .checked_mul(self.min_box_sizes.len())
    }
}

fn check_dimensions(width: usize, height: usize) -> UltraFaceResult<()> {
    if width == 0 || height == 0 {
        return Err(UltraFaceError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Returns the per-level feature map geometry for an input of `width x height`.
pub fn feature_maps(width: usize, height: usize) -> UltraFaceResult<[FeatureMapSpec; 4]> {
    check_dimensions(width, height)?;
    Ok(std::array::from_fn(|level| {
        let stride = STRIDES[level];
        FeatureMapSpec {
            stride,
            size_w: ceil_div(width, stride),
            size_h: ceil_div(height, stride),
            min_box_sizes: MIN_BOXES[level],
        }
    }))
}

/// Sums the per-level counts; an overflowing total is reported as invalid
/// dimensions.
fn total_anchors(maps: &[FeatureMapSpec], width: usize, height: usize) -> UltraFaceResult<usize> {
    maps.iter()
        .try_fold(0usize, |acc, map| acc.checked_add(map.num_anchors()?))
        .ok_or(UltraFaceError::InvalidDimensions { width, height })
}

/// Number of priors generated for an input of `width x height`.
pub fn num_anchors(width: usize, height: usize) -> UltraFaceResult<usize> {
    total_anchors(&feature_maps(width, height)?, width, height)
}

/// Generates the ordered prior sequence for an input of `width x height`.
///
/// Priors are not clamped; anchors near the border or larger than a small
/// input keep their raw geometry and decoding works from it unchanged.
pub fn generate_priors(width: usize, height: usize) -> UltraFaceResult<Vec<Prior>> {
    let maps = feature_maps(width, height)?;
    let _span = trace_span!("generate_priors", width = width, height = height).entered();

    let total = total_anchors(&maps, width, height)?;
    let mut priors = Vec::new();
    priors
        .try_reserve_exact(total)
        .map_err(|_| UltraFaceError::InvalidDimensions { width, height })?;
    let in_w = width as f32;
    let in_h = height as f32;

    for map in &maps {
        let stride = map.stride as f32;
        for row in 0..map.size_h {
            let cy = (row as f32 + 0.5) * stride / in_h;
            for col in 0..map.size_w {
                let cx = (col as f32 + 0.5) * stride / in_w;
                for &min_box in map.min_box_sizes {
                    let edge = min_box / in_w;
                    priors.push(Prior {
                        cx,
                        cy,
                        w: edge,
                        h: edge,
                    });
                }
            }
        }
    }

    trace_event!("priors_generated", count = priors.len());
    Ok(priors)
}
