use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;
use ultraface::lowlevel::feature_maps;
use ultraface::{DetectorConfig, FaceBox, FaceDetector, InputSize, NmsMode, Prior};

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "UltraFace post-processing CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Print the generated priors for the configured input size and exit.
    #[arg(long)]
    print_priors: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NmsModeConfig {
    Hard,
    Blending,
}

impl From<NmsModeConfig> for NmsMode {
    fn from(value: NmsModeConfig) -> Self {
        match value {
            NmsModeConfig::Hard => NmsMode::Hard,
            NmsModeConfig::Blending => NmsMode::Blending,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetectorConfigJson {
    score_threshold: f32,
    iou_threshold: f32,
    nms_mode: NmsModeConfig,
    num_threads: usize,
    parallel: bool,
}

impl Default for DetectorConfigJson {
    fn default() -> Self {
        let cfg = DetectorConfig::default();
        Self {
            score_threshold: cfg.score_threshold,
            iou_threshold: cfg.iou_threshold,
            nms_mode: NmsModeConfig::Blending,
            num_threads: cfg.num_threads,
            parallel: cfg.parallel,
        }
    }
}

impl From<DetectorConfigJson> for DetectorConfig {
    fn from(value: DetectorConfigJson) -> Self {
        Self {
            score_threshold: value.score_threshold,
            iou_threshold: value.iou_threshold,
            nms_mode: value.nms_mode.into(),
            num_threads: value.num_threads,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    input_width: usize,
    input_height: usize,
    input_channels: usize,
    scores_path: String,
    boxes_path: String,
    output_path: Option<String>,
    detector: DetectorConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_width: 320,
            input_height: 240,
            input_channels: 3,
            scores_path: String::new(),
            boxes_path: String::new(),
            output_path: None,
            detector: DetectorConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FaceRecord {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

impl From<FaceBox> for FaceRecord {
    fn from(value: FaceBox) -> Self {
        Self {
            x1: value.x1,
            y1: value.y1,
            x2: value.x2,
            y2: value.y2,
            score: value.score,
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    num_anchors: usize,
    candidates: usize,
    faces: Vec<FaceRecord>,
}

#[derive(Debug, Serialize)]
struct LevelRecord {
    stride: usize,
    size_w: usize,
    size_h: usize,
    min_box_sizes: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct PriorDump {
    num_anchors: usize,
    levels: Vec<LevelRecord>,
    /// `[cx, cy, w, h]` per anchor, in tensor order.
    priors: Vec<[f32; 4]>,
}

/// Reads a flat f32 tensor: a JSON array for `.json` files, raw
/// little-endian f32 otherwise.
fn load_tensor(path: &Path) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let text = fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&text)?);
    }

    let bytes = fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(format!(
            "{}: {} bytes is not a whole number of f32 values",
            path.display(),
            bytes.len()
        )
        .into());
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn emit(json: String, output_path: Option<String>) -> std::io::Result<()> {
    match output_path {
        Some(path) => fs::write(path, json),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

/// Filter for `--trace`: library stages at debug, the per-frame summary at
/// info, on top of whatever `RUST_LOG` asks for.
fn trace_filter() -> Result<EnvFilter, ParseError> {
    Ok(EnvFilter::from_default_env()
        .add_directive("ultraface=debug".parse()?)
        .add_directive("ultraface_cli=info".parse()?))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(trace_filter()?)
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    let input = InputSize::new(
        config.input_width,
        config.input_height,
        config.input_channels,
    );
    let detector = FaceDetector::with_config(input, config.detector.into())?;

    if cli.print_priors {
        let levels = feature_maps(input.width, input.height)?
            .iter()
            .map(|m| LevelRecord {
                stride: m.stride,
                size_w: m.size_w,
                size_h: m.size_h,
                min_box_sizes: m.min_box_sizes.to_vec(),
            })
            .collect();
        let dump = PriorDump {
            num_anchors: detector.num_anchors(),
            levels,
            priors: detector
                .priors()
                .iter()
                .map(|p: &Prior| [p.cx, p.cy, p.w, p.h])
                .collect(),
        };
        emit(serde_json::to_string_pretty(&dump)?, config.output_path)?;
        return Ok(());
    }

    if config.scores_path.is_empty() || config.boxes_path.is_empty() {
        return Err("scores_path and boxes_path must be set in the config".into());
    }
    let scores = load_tensor(Path::new(&config.scores_path))?;
    let boxes = load_tensor(Path::new(&config.boxes_path))?;

    let candidates = detector.decode(&scores, &boxes)?;
    let candidate_count = candidates.len();
    let faces = detector.suppress(candidates)?;
    tracing::info!(
        anchors = detector.num_anchors(),
        candidates = candidate_count,
        faces = faces.len(),
        "frame processed"
    );

    let output = Output {
        num_anchors: detector.num_anchors(),
        candidates: candidate_count,
        faces: faces.into_iter().map(FaceRecord::from).collect(),
    };
    emit(serde_json::to_string_pretty(&output)?, config.output_path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::trace_filter;

    #[test]
    fn trace_filter_enables_frame_summary() {
        let filter = trace_filter().unwrap().to_string().to_lowercase();
        assert!(filter.contains("ultraface=debug"), "{filter}");
        assert!(filter.contains("ultraface_cli=info"), "{filter}");
    }
}
