//! Rayon-parallel decode (feature-gated).
//!
//! Anchors are split into fixed-size blocks decoded on the current rayon
//! pool. Blocks are concatenated in order, so the result is identical to
//! [`decode`](super::decode).

use crate::candidate::FaceBox;
use crate::decode::{decode_one, prepare, OFFSETS_PER_ANCHOR};
use crate::prior::Prior;
use crate::trace::{trace_event, trace_span};
use crate::util::UltraFaceResult;
use rayon::prelude::*;

/// Anchors per work item; small enough to balance 320x240 inputs.
const BLOCK: usize = 512;

/// Parallel counterpart of [`decode`](super::decode) with the same contract.
///
/// Runs on whichever rayon pool is current; wrap the call in
/// `ThreadPool::install` to pin it to a dedicated pool.
pub fn decode_par(
    scores: &[f32],
    boxes: &[f32],
    priors: &[Prior],
    width: usize,
    height: usize,
    score_threshold: f32,
) -> UltraFaceResult<Vec<FaceBox>> {
    let scale = prepare(scores, boxes, priors, width, height, score_threshold)?;
    let _span = trace_span!("decode", anchors = priors.len(), parallel = true).entered();

    let blocks: Vec<Vec<FaceBox>> = priors
        .par_chunks(BLOCK)
        .zip(scores.par_chunks(BLOCK))
        .zip(boxes.par_chunks(BLOCK * OFFSETS_PER_ANCHOR))
        .map(|((priors, scores), boxes)| {
            priors
                .iter()
                .zip(scores)
                .zip(boxes.chunks_exact(OFFSETS_PER_ANCHOR))
                .filter_map(|((prior, &score), offsets)| {
                    decode_one(score, offsets, prior, scale, score_threshold)
                })
                .collect()
        })
        .collect();

    let out: Vec<FaceBox> = blocks.into_iter().flatten().collect();
    trace_event!("decoded", candidates = out.len());
    Ok(out)
}
