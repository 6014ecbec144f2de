//! Regression decoding against anchor priors.
//!
//! Each anchor `i` owns `scores[i]` and the four offsets
//! `boxes[4i..4i + 4] = (dx, dy, dw, dh)`. Offsets are decoded with the
//! variances the network was trained with, scaled to input pixels, and kept
//! only when the score clears the threshold. Output follows anchor order.

use crate::candidate::FaceBox;
use crate::prior::Prior;
use crate::trace::{trace_event, trace_span};
use crate::util::math::in_unit_closed;
use crate::util::{UltraFaceError, UltraFaceResult};

#[cfg(feature = "rayon")]
pub mod rayon;

/// Default minimum confidence; scores must be strictly greater.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.7;

const CENTER_VARIANCE: f32 = 0.1;
const SIZE_VARIANCE: f32 = 0.2;
pub(crate) const OFFSETS_PER_ANCHOR: usize = 4;

/// Input resolution the priors were generated for, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Scale {
    pub width: f32,
    pub height: f32,
}

/// Checks that `score_threshold` lies in `[0, 1]`.
pub(crate) fn validate_score_threshold(score_threshold: f32) -> UltraFaceResult<()> {
    if !in_unit_closed(score_threshold) {
        return Err(UltraFaceError::InvalidThreshold {
            name: "score_threshold",
            value: score_threshold,
        });
    }
    Ok(())
}

/// Verifies tensor lengths against the prior count.
pub(crate) fn check_lengths(scores: &[f32], boxes: &[f32], priors: &[Prior]) -> UltraFaceResult<()> {
    if scores.len() != priors.len() {
        return Err(UltraFaceError::LengthMismatch {
            what: "scores",
            expected: priors.len(),
            got: scores.len(),
        });
    }
    let expected = priors.len() * OFFSETS_PER_ANCHOR;
    if boxes.len() != expected {
        return Err(UltraFaceError::LengthMismatch {
            what: "boxes",
            expected,
            got: boxes.len(),
        });
    }
    Ok(())
}

/// Decodes a single anchor. Returns `None` when the score does not clear the
/// threshold (NaN never does) or the decoded corners are not finite.
#[inline]
pub(crate) fn decode_one(
    score: f32,
    offsets: &[f32],
    prior: &Prior,
    scale: Scale,
    score_threshold: f32,
) -> Option<FaceBox> {
    if score.is_nan() || score <= score_threshold {
        return None;
    }
    let (dx, dy, dw, dh) = (offsets[0], offsets[1], offsets[2], offsets[3]);

    let cx = dx * CENTER_VARIANCE * prior.w + prior.cx;
    let cy = dy * CENTER_VARIANCE * prior.h + prior.cy;
    let w = (dw * SIZE_VARIANCE).exp() * prior.w;
    let h = (dh * SIZE_VARIANCE).exp() * prior.h;

    let face = FaceBox {
        x1: (cx - w / 2.0) * scale.width,
        y1: (cy - h / 2.0) * scale.height,
        x2: (cx + w / 2.0) * scale.width,
        y2: (cy + h / 2.0) * scale.height,
        score,
    };
    let finite = face.x1.is_finite()
        && face.y1.is_finite()
        && face.x2.is_finite()
        && face.y2.is_finite();
    finite.then_some(face)
}

/// Decodes raw network outputs into candidate boxes in input-pixel space.
///
/// `scores` must hold one value per prior and `boxes` four; any other length
/// is rejected rather than truncated. No clamping to the image is applied,
/// so boxes may reach slightly outside `[0, width] x [0, height]`.
pub fn decode(
    scores: &[f32],
    boxes: &[f32],
    priors: &[Prior],
    width: usize,
    height: usize,
    score_threshold: f32,
) -> UltraFaceResult<Vec<FaceBox>> {
    let scale = prepare(scores, boxes, priors, width, height, score_threshold)?;
    let _span = trace_span!("decode", anchors = priors.len()).entered();

    let out: Vec<FaceBox> = priors
        .iter()
        .zip(scores)
        .zip(boxes.chunks_exact(OFFSETS_PER_ANCHOR))
        .filter_map(|((prior, &score), offsets)| {
            decode_one(score, offsets, prior, scale, score_threshold)
        })
        .collect();

    trace_event!("decoded", candidates = out.len());
    Ok(out)
}

/// Shared argument checks for the scalar and parallel decoders.
pub(crate) fn prepare(
    scores: &[f32],
    boxes: &[f32],
    priors: &[Prior],
    width: usize,
    height: usize,
    score_threshold: f32,
) -> UltraFaceResult<Scale> {
    if width == 0 || height == 0 {
        return Err(UltraFaceError::InvalidDimensions { width, height });
    }
    validate_score_threshold(score_threshold)?;
    check_lengths(scores, boxes, priors)?;
    Ok(Scale {
        width: width as f32,
        height: height as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::decode;
    use crate::prior::Prior;
    use crate::util::UltraFaceError;

    fn centered_prior() -> Prior {
        Prior {
            cx: 0.5,
            cy: 0.5,
            w: 0.25,
            h: 0.25,
        }
    }

    #[test]
    fn zero_offsets_reproduce_the_prior() {
        let priors = [centered_prior()];
        let out = decode(&[0.9], &[0.0; 4], &priors, 200, 100, 0.7).unwrap();
        assert_eq!(out.len(), 1);
        let b = out[0];
        assert!((b.x1 - 75.0).abs() < 1e-4);
        assert!((b.x2 - 125.0).abs() < 1e-4);
        assert!((b.y1 - 37.5).abs() < 1e-4);
        assert!((b.y2 - 62.5).abs() < 1e-4);
        assert_eq!(b.score, 0.9);
    }

    #[test]
    fn offsets_apply_variances() {
        let priors = [centered_prior()];
        let boxes = [1.0, -2.0, 5.0, 0.0];
        let out = decode(&[0.8], &boxes, &priors, 100, 100, 0.5).unwrap();
        let b = out[0];
        let cx = 0.1 * 0.25 + 0.5;
        let cy = -0.2 * 0.25 + 0.5;
        let w = 1.0f32.exp() * 0.25;
        let h = 0.25;
        assert!((b.x1 - (cx - w / 2.0) * 100.0).abs() < 1e-3);
        assert!((b.x2 - (cx + w / 2.0) * 100.0).abs() < 1e-3);
        assert!((b.y1 - (cy - h / 2.0) * 100.0).abs() < 1e-3);
        assert!((b.y2 - (cy + h / 2.0) * 100.0).abs() < 1e-3);
    }

    #[test]
    fn threshold_is_strict_and_nan_is_dropped() {
        let priors = [centered_prior(); 4];
        let scores = [0.7, 0.700_001, f32::NAN, 0.2];
        let out = decode(&scores, &[0.0; 16], &priors, 10, 10, 0.7).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].score, 0.700_001);
    }

    #[test]
    fn non_finite_geometry_is_dropped() {
        let priors = [centered_prior(); 2];
        let boxes = [0.0, 0.0, f32::NAN, 0.0, 0.0, 0.0, 1000.0, 0.0];
        let out = decode(&[0.9, 0.9], &boxes, &priors, 10, 10, 0.7).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn length_mismatches_are_errors() {
        let priors = [centered_prior(); 2];
        assert_eq!(
            decode(&[0.9], &[0.0; 8], &priors, 10, 10, 0.7).unwrap_err(),
            UltraFaceError::LengthMismatch {
                what: "scores",
                expected: 2,
                got: 1
            }
        );
        assert_eq!(
            decode(&[0.9, 0.9], &[0.0; 9], &priors, 10, 10, 0.7).unwrap_err(),
            UltraFaceError::LengthMismatch {
                what: "boxes",
                expected: 8,
                got: 9
            }
        );
    }

    #[test]
    fn empty_inputs_decode_to_nothing() {
        let out = decode(&[], &[], &[], 320, 240, 0.7).unwrap();
        assert!(out.is_empty());
    }
}
