//! Owning detector handle tying priors, decode and suppression together.
//!
//! A `FaceDetector` is built once per input resolution. It owns the prior
//! sequence behind an `Arc`, so clones are cheap and frames may be processed
//! from several threads at once. Dropping the last clone releases everything;
//! there is no separate release call to forget or repeat.

use std::fmt;
use std::sync::Arc;

use crate::candidate::nms::{suppress, validate_iou_threshold, NmsMode, DEFAULT_IOU_THRESHOLD};
use crate::candidate::{flatten, FaceBox};
use crate::decode::{decode, validate_score_threshold, DEFAULT_SCORE_THRESHOLD};
use crate::prior::{generate_priors, Prior};
use crate::trace::{trace_event, trace_span};
use crate::util::{UltraFaceError, UltraFaceResult};

/// Default worker count for the parallel decode path.
pub const DEFAULT_NUM_THREADS: usize = 4;

/// Detector input resolution, matching the tensor the network was fed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputSize {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Channel count; recorded for callers, unused by post-processing.
    pub channels: usize,
}

impl InputSize {
    pub fn new(width: usize, height: usize, channels: usize) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }
}

/// Post-processing configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Candidates need a score strictly above this, in `[0, 1]`.
    pub score_threshold: f32,
    /// Overlap at which boxes are merged or dropped, in `(0, 1]`.
    pub iou_threshold: f32,
    /// Suppression strategy.
    pub nms_mode: NmsMode,
    /// Worker count for parallel decode.
    pub num_threads: usize,
    /// Decode on a dedicated rayon pool. Ignored without the `rayon` feature.
    pub parallel: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            nms_mode: NmsMode::default(),
            num_threads: DEFAULT_NUM_THREADS,
            parallel: false,
        }
    }
}

impl DetectorConfig {
    /// Validates threshold ranges and the thread count.
    pub fn validate(&self) -> UltraFaceResult<()> {
        validate_score_threshold(self.score_threshold)?;
        validate_iou_threshold(self.iou_threshold)?;
        if self.num_threads == 0 {
            return Err(UltraFaceError::InvalidInput("num_threads must be at least 1"));
        }
        Ok(())
    }
}

/// Face detector post-processor for one input resolution.
#[derive(Clone)]
pub struct FaceDetector {
    input: InputSize,
    cfg: DetectorConfig,
    priors: Arc<[Prior]>,
    #[cfg(feature = "rayon")]
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl fmt::Debug for FaceDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceDetector")
            .field("input", &self.input)
            .field("cfg", &self.cfg)
            .field("num_anchors", &self.priors.len())
            .finish()
    }
}

impl FaceDetector {
    /// Builds a detector with the default configuration.
    pub fn new(input: InputSize) -> UltraFaceResult<Self> {
        Self::with_config(input, DetectorConfig::default())
    }

    /// Builds a detector, generating its priors once.
    pub fn with_config(input: InputSize, cfg: DetectorConfig) -> UltraFaceResult<Self> {
        cfg.validate()?;
        let priors: Arc<[Prior]> = generate_priors(input.width, input.height)?.into();

        #[cfg(feature = "rayon")]
        let pool = if cfg.parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(cfg.num_threads)
                .build()
                .map_err(|err| UltraFaceError::ThreadPool(err.to_string()))?;
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(Self {
            input,
            cfg,
            priors,
            #[cfg(feature = "rayon")]
            pool,
        })
    }

    pub fn input(&self) -> InputSize {
        self.input
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }

    /// Priors in network output order.
    pub fn priors(&self) -> &[Prior] {
        &self.priors
    }

    /// Number of anchors the score and box tensors must describe.
    pub fn num_anchors(&self) -> usize {
        self.priors.len()
    }

    /// Decodes raw outputs into thresholded candidates, in anchor order.
    pub fn decode(&self, scores: &[f32], boxes: &[f32]) -> UltraFaceResult<Vec<FaceBox>> {
        #[cfg(feature = "rayon")]
        {
            if let Some(pool) = &self.pool {
                return pool.install(|| {
                    crate::decode::rayon::decode_par(
                        scores,
                        boxes,
                        &self.priors,
                        self.input.width,
                        self.input.height,
                        self.cfg.score_threshold,
                    )
                });
            }
        }

        decode(
            scores,
            boxes,
            &self.priors,
            self.input.width,
            self.input.height,
            self.cfg.score_threshold,
        )
    }

    /// Applies the configured suppression to `candidates`.
    pub fn suppress(&self, candidates: Vec<FaceBox>) -> UltraFaceResult<Vec<FaceBox>> {
        suppress(candidates, self.cfg.iou_threshold, self.cfg.nms_mode)
    }

    /// Runs decode and suppression for one frame.
    pub fn detect(&self, scores: &[f32], boxes: &[f32]) -> UltraFaceResult<Vec<FaceBox>> {
        let _span = trace_span!("detect", anchors = self.priors.len()).entered();
        let candidates = self.decode(scores, boxes)?;
        let candidate_count = candidates.len();
        let faces = self.suppress(candidates)?;
        trace_event!("detected", candidates = candidate_count, faces = faces.len());
        Ok(faces)
    }

    /// Same as [`detect`](Self::detect), flattened to `5 * k` floats of
    /// `(x1, y1, x2, y2, score)`.
    pub fn detect_flat(&self, scores: &[f32], boxes: &[f32]) -> UltraFaceResult<Vec<f32>> {
        Ok(flatten(&self.detect(scores, boxes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::{DetectorConfig, FaceDetector, InputSize};
    use crate::candidate::nms::NmsMode;
    use crate::util::UltraFaceError;

    #[test]
    fn default_config_matches_reference_thresholds() {
        let cfg = DetectorConfig::default();
        assert_eq!(cfg.score_threshold, 0.7);
        assert_eq!(cfg.iou_threshold, 0.35);
        assert_eq!(cfg.nms_mode, NmsMode::Blending);
        assert_eq!(cfg.num_threads, 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_rejects_zero_threads() {
        let cfg = DetectorConfig {
            num_threads: 0,
            ..DetectorConfig::default()
        };
        assert_eq!(
            cfg.validate().unwrap_err(),
            UltraFaceError::InvalidInput("num_threads must be at least 1")
        );
    }

    #[test]
    fn detector_reports_anchor_count() {
        let detector = FaceDetector::new(InputSize::new(320, 240, 3)).unwrap();
        assert_eq!(detector.num_anchors(), 4420);
        assert_eq!(detector.priors().len(), 4420);
        let clone = detector.clone();
        assert_eq!(clone.priors().as_ptr(), detector.priors().as_ptr());
    }

    #[test]
    fn detector_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FaceDetector>();
    }
}
