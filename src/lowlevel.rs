//! Building blocks for callers that drive the stages themselves.
//!
//! Most users only need [`FaceDetector`](crate::FaceDetector). These items
//! expose the fixed anchor table and per-stage defaults for pipelines that
//! keep their own priors or batch several frames.

pub use crate::candidate::nms::DEFAULT_IOU_THRESHOLD;
pub use crate::candidate::FLAT_STRIDE;
#[cfg(feature = "rayon")]
pub use crate::decode::rayon::decode_par;
pub use crate::decode::DEFAULT_SCORE_THRESHOLD;
pub use crate::detector::DEFAULT_NUM_THREADS;
pub use crate::prior::{feature_maps, num_anchors, MIN_BOXES, STRIDES};
