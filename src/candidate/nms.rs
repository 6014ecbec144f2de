//! Non-maximum suppression over decoded face boxes.

use std::fmt;
use std::str::FromStr;

use crate::candidate::FaceBox;
use crate::trace::{trace_event, trace_span};
use crate::util::math::in_unit_open_closed;
use crate::util::{UltraFaceError, UltraFaceResult};

/// Default IoU at or above which two boxes are treated as the same face.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.35;

/// How overlapping boxes are resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NmsMode {
    /// Keep the highest-scoring box and drop everything overlapping it.
    Hard,
    /// Replace each overlapping group by its score-weighted mean box.
    #[default]
    Blending,
}

impl NmsMode {
    /// Maps the integer codes used by existing integrations (`1` hard,
    /// `2` blending).
    pub fn from_code(code: i32) -> UltraFaceResult<Self> {
        match code {
            1 => Ok(Self::Hard),
            2 => Ok(Self::Blending),
            other => Err(UltraFaceError::InvalidNmsMode(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Blending => "blending",
        }
    }
}

impl fmt::Display for NmsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NmsMode {
    type Err = UltraFaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hard" => Ok(Self::Hard),
            "blending" => Ok(Self::Blending),
            _ => Err(UltraFaceError::InvalidNmsMode(s.to_owned())),
        }
    }
}

/// Checks that `iou_threshold` lies in `(0, 1]`.
pub(crate) fn validate_iou_threshold(iou_threshold: f32) -> UltraFaceResult<()> {
    if !in_unit_open_closed(iou_threshold) {
        return Err(UltraFaceError::InvalidThreshold {
            name: "iou_threshold",
            value: iou_threshold,
        });
    }
    Ok(())
}

/// Sorts boxes by descending score. The sort is stable, so equal scores keep
/// their input order (earliest first).
fn sort_desc(boxes: &mut [FaceBox]) {
    boxes.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Suppresses overlapping detections.
///
/// Boxes are processed in descending score order. Each unconsumed box seeds a
/// group made of itself and every later unconsumed box with IoU at or above
/// `iou_threshold`; the whole group is consumed. `Hard` emits the seed as is,
/// `Blending` emits the score-weighted mean of the group's corners with the
/// seed's score. Output follows emission order. Candidates with a NaN score
/// are dropped.
pub fn suppress(
    mut candidates: Vec<FaceBox>,
    iou_threshold: f32,
    mode: NmsMode,
) -> UltraFaceResult<Vec<FaceBox>> {
    validate_iou_threshold(iou_threshold)?;
    let _span = trace_span!(
        "suppress",
        candidates = candidates.len(),
        mode = mode.as_str()
    )
    .entered();

    candidates.retain(|c| !c.score.is_nan());
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    sort_desc(&mut candidates);

    let mut consumed = vec![false; candidates.len()];
    let mut out = Vec::new();
    let mut group: Vec<FaceBox> = Vec::new();

    for (i, seed) in candidates.iter().enumerate() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;
        group.clear();
        group.push(*seed);

        for (j, other) in candidates.iter().enumerate().skip(i + 1) {
            if consumed[j] {
                continue;
            }
            if seed.iou(other) >= iou_threshold {
                consumed[j] = true;
                group.push(*other);
            }
        }

        let kept = match mode {
            NmsMode::Hard => *seed,
            NmsMode::Blending => blend(&group),
        };
        out.push(kept);
    }

    trace_event!("suppressed", kept = out.len());
    Ok(out)
}

/// Score-weighted mean of a group whose first element is the seed.
///
/// Falls back to the seed's corners when any weight is negative or the
/// weights do not sum to a positive finite value, so the result always lies
/// within the group's bounds.
fn blend(group: &[FaceBox]) -> FaceBox {
    let seed = group[0];
    if group.iter().any(|b| b.score < 0.0) {
        return seed;
    }
    let total: f32 = group.iter().map(|b| b.score).sum();
    if total <= 0.0 || !total.is_finite() {
        return seed;
    }

    let mut merged = FaceBox::new(0.0, 0.0, 0.0, 0.0, seed.score);
    for b in group {
        let rate = b.score / total;
        merged.x1 += b.x1 * rate;
        merged.y1 += b.y1 * rate;
        merged.x2 += b.x2 * rate;
        merged.y2 += b.y2 * rate;
    }
    merged
}
