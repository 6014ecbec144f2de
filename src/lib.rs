//! Post-processing for anchor-based Ultra-Light face detectors.
//!
//! The network emits one score and four regression offsets per anchor. This
//! crate generates the matching anchor priors once per input resolution,
//! decodes offsets into pixel boxes above a score threshold, and removes
//! duplicates with hard or blending non-maximum suppression. Decoding can
//! run on a rayon pool via the `rayon` feature; spans and events are emitted
//! through `tracing` when the `tracing` feature is on.
//!
//! ```
//! use ultraface::{FaceDetector, InputSize};
//!
//! let detector = FaceDetector::new(InputSize::new(320, 240, 3))?;
//! let scores = vec![0.0; detector.num_anchors()];
//! let boxes = vec![0.0; detector.num_anchors() * 4];
//! let faces = detector.detect(&scores, &boxes)?;
//! assert!(faces.is_empty());
//! # Ok::<(), ultraface::UltraFaceError>(())
//! ```

pub mod candidate;
pub mod decode;
pub mod detector;
pub mod lowlevel;
pub mod prior;
mod trace;
pub mod util;

pub use candidate::nms::{suppress, NmsMode};
pub use candidate::{flatten, FaceBox};
pub use decode::decode;
pub use detector::{DetectorConfig, FaceDetector, InputSize};
pub use prior::{generate_priors, FeatureMapSpec, Prior};
pub use util::{UltraFaceError, UltraFaceResult};
