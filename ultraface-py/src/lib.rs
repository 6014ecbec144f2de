//! Python bindings for ultraface detector post-processing.
//!
//! The inference runtime stays in Python; this module takes the raw score and
//! box tensors it produces and returns suppressed detections as numpy arrays.

use numpy::{IntoPyArray, PyArray1, PyArray2, PyArrayMethods, PyReadonlyArray1};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use ultraface::lowlevel::FLAT_STRIDE;
use ultraface::{
    DetectorConfig as RustDetectorConfig, FaceBox as RustFaceBox,
    FaceDetector as RustFaceDetector, InputSize, NmsMode, UltraFaceError,
};

/// Convert an UltraFaceError to a Python exception.
fn to_py_err(err: UltraFaceError) -> PyErr {
    match err {
        UltraFaceError::ThreadPool(_) => PyRuntimeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

fn dimension(value: i64, name: &str) -> PyResult<usize> {
    usize::try_from(value)
        .map_err(|_| PyValueError::new_err(format!("{name} must be positive, got {value}")))
}

fn parse_mode(mode: &str) -> PyResult<NmsMode> {
    mode.parse().map_err(to_py_err)
}

/// Splits a flat `(x1, y1, x2, y2, score)` buffer into boxes.
fn unflatten(flat: &[f32]) -> PyResult<Vec<RustFaceBox>> {
    if flat.len() % FLAT_STRIDE != 0 {
        return Err(PyValueError::new_err(format!(
            "boxes length {} is not a multiple of {FLAT_STRIDE}",
            flat.len()
        )));
    }
    Ok(flat
        .chunks_exact(FLAT_STRIDE)
        .map(|c| RustFaceBox::new(c[0], c[1], c[2], c[3], c[4]))
        .collect())
}

/// Detected face in input-pixel coordinates.
#[pyclass(frozen)]
#[derive(Clone)]
pub struct FaceBox {
    #[pyo3(get)]
    pub x1: f32,
    #[pyo3(get)]
    pub y1: f32,
    #[pyo3(get)]
    pub x2: f32,
    #[pyo3(get)]
    pub y2: f32,
    #[pyo3(get)]
    pub score: f32,
}

#[pymethods]
impl FaceBox {
    /// Return `(x1, y1, x2, y2, score)`.
    fn to_tuple(&self) -> (f32, f32, f32, f32, f32) {
        (self.x1, self.y1, self.x2, self.y2, self.score)
    }

    fn __repr__(&self) -> String {
        format!(
            "FaceBox(x1={:.1}, y1={:.1}, x2={:.1}, y2={:.1}, score={:.3})",
            self.x1, self.y1, self.x2, self.y2, self.score
        )
    }
}

impl From<RustFaceBox> for FaceBox {
    fn from(b: RustFaceBox) -> Self {
        Self {
            x1: b.x1,
            y1: b.y1,
            x2: b.x2,
            y2: b.y2,
            score: b.score,
        }
    }
}

/// Face detector post-processor bound to one input resolution.
///
/// Priors are generated once here. Call `release()` (or leave a `with`
/// block) to free them; any later call raises `RuntimeError`.
#[pyclass]
pub struct FaceDetector {
    inner: Option<RustFaceDetector>,
}

impl FaceDetector {
    fn detector(&self) -> PyResult<&RustFaceDetector> {
        self.inner
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("FaceDetector has been released"))
    }
}

#[pymethods]
impl FaceDetector {
    /// Create a detector.
    ///
    /// Args:
    ///     width: Network input width in pixels
    ///     height: Network input height in pixels
    ///     channels: Network input channels
    ///     num_threads: Workers for parallel decode (default: 4)
    ///     score_threshold: Minimum face score, exclusive (default: 0.7)
    ///     iou_threshold: Overlap for suppression (default: 0.35)
    ///     nms_mode: "hard" or "blending" (default: "blending")
    ///     parallel: Decode on a dedicated thread pool (default: False)
    #[new]
    #[pyo3(signature = (
        width,
        height,
        channels,
        num_threads = 4,
        score_threshold = 0.7,
        iou_threshold = 0.35,
        nms_mode = "blending",
        parallel = false
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        width: i64,
        height: i64,
        channels: i64,
        num_threads: usize,
        score_threshold: f32,
        iou_threshold: f32,
        nms_mode: &str,
        parallel: bool,
    ) -> PyResult<Self> {
        let input = InputSize::new(
            dimension(width, "width")?,
            dimension(height, "height")?,
            dimension(channels, "channels")?,
        );
        let cfg = RustDetectorConfig {
            score_threshold,
            iou_threshold,
            nms_mode: parse_mode(nms_mode)?,
            num_threads,
            parallel,
        };
        let inner = RustFaceDetector::with_config(input, cfg).map_err(to_py_err)?;
        Ok(Self { inner: Some(inner) })
    }

    /// Number of anchors the score and box tensors must describe.
    #[getter]
    fn num_anchors(&self) -> PyResult<usize> {
        Ok(self.detector()?.num_anchors())
    }

    /// Whether `release()` has been called.
    #[getter]
    fn released(&self) -> bool {
        self.inner.is_none()
    }

    /// Run decode and suppression for one frame.
    ///
    /// Args:
    ///     scores: 1D float32 array, one score per anchor
    ///     boxes: 1D float32 array, four offsets per anchor
    ///
    /// Returns:
    ///     1D float32 array of length 5*k, `(x1, y1, x2, y2, score)` per face
    fn detect<'py>(
        &self,
        py: Python<'py>,
        scores: PyReadonlyArray1<'py, f32>,
        boxes: PyReadonlyArray1<'py, f32>,
    ) -> PyResult<Bound<'py, PyArray1<f32>>> {
        let detector = self.detector()?;
        let scores = scores.as_slice()?;
        let boxes = boxes.as_slice()?;
        let flat = py
            .detach(|| detector.detect_flat(scores, boxes))
            .map_err(to_py_err)?;
        Ok(flat.into_pyarray(py))
    }

    /// Like `detect`, returning a list of FaceBox objects.
    fn detect_boxes(
        &self,
        py: Python<'_>,
        scores: PyReadonlyArray1<'_, f32>,
        boxes: PyReadonlyArray1<'_, f32>,
    ) -> PyResult<Vec<FaceBox>> {
        let detector = self.detector()?;
        let scores = scores.as_slice()?;
        let boxes = boxes.as_slice()?;
        let faces = py
            .detach(|| detector.detect(scores, boxes))
            .map_err(to_py_err)?;
        Ok(faces.into_iter().map(FaceBox::from).collect())
    }

    /// Anchor priors as an `(num_anchors, 4)` array of `cx, cy, w, h`.
    fn priors<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyArray2<f32>>> {
        let detector = self.detector()?;
        let flat: Vec<f32> = detector
            .priors()
            .iter()
            .flat_map(|p| [p.cx, p.cy, p.w, p.h])
            .collect();
        flat.into_pyarray(py).reshape([detector.num_anchors(), 4])
    }

    /// Free the priors. Raises if the detector was already released.
    fn release(&mut self) -> PyResult<()> {
        match self.inner.take() {
            Some(_) => Ok(()),
            None => Err(PyRuntimeError::new_err("FaceDetector already released")),
        }
    }

    fn __enter__(slf: PyRef<'_, Self>) -> PyRef<'_, Self> {
        slf
    }

    fn __exit__(
        &mut self,
        _exc_type: &Bound<'_, PyAny>,
        _exc_value: &Bound<'_, PyAny>,
        _traceback: &Bound<'_, PyAny>,
    ) -> bool {
        self.inner = None;
        false
    }

    fn __repr__(&self) -> String {
        match &self.inner {
            Some(d) => {
                let input = d.input();
                format!(
                    "FaceDetector({}x{}x{}, num_anchors={}, nms_mode='{}')",
                    input.width,
                    input.height,
                    input.channels,
                    d.num_anchors(),
                    d.config().nms_mode
                )
            }
            None => "FaceDetector(released)".to_string(),
        }
    }
}

/// Suppress overlapping boxes without a detector.
///
/// Args:
///     boxes: 1D float32 array, `(x1, y1, x2, y2, score)` per box
///     iou_threshold: Overlap for suppression (default: 0.35)
///     nms_mode: "hard" or "blending" (default: "blending")
///
/// Returns:
///     1D float32 array in the same layout, in emission order
#[pyfunction]
#[pyo3(signature = (boxes, iou_threshold = 0.35, nms_mode = "blending"))]
fn suppress<'py>(
    py: Python<'py>,
    boxes: PyReadonlyArray1<'py, f32>,
    iou_threshold: f32,
    nms_mode: &str,
) -> PyResult<Bound<'py, PyArray1<f32>>> {
    let mode = parse_mode(nms_mode)?;
    let candidates = unflatten(boxes.as_slice()?)?;
    let kept = ultraface::suppress(candidates, iou_threshold, mode).map_err(to_py_err)?;
    Ok(ultraface::flatten(&kept).into_pyarray(py))
}

/// Number of anchors for an input of `width x height`.
#[pyfunction]
fn num_anchors(width: i64, height: i64) -> PyResult<usize> {
    ultraface::lowlevel::num_anchors(dimension(width, "width")?, dimension(height, "height")?)
        .map_err(to_py_err)
}

/// Python module for ultraface post-processing.
#[pymodule]
fn _ultraface(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<FaceBox>()?;
    m.add_class::<FaceDetector>()?;
    m.add_function(wrap_pyfunction!(suppress, m)?)?;
    m.add_function(wrap_pyfunction!(num_anchors, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
