//! Table-driven suppression scenarios loaded from `tests/data`.

use serde::Deserialize;
use ultraface::{suppress, FaceBox, NmsMode};

const SCENARIOS: &str = include_str!("data/nms_scenarios.json");
const TOLERANCE: f32 = 1e-4;

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    iou_threshold: f32,
    mode: String,
    candidates: Vec<[f32; 5]>,
    expected: Vec<[f32; 5]>,
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    scenarios: Vec<Scenario>,
}

fn to_box(raw: &[f32; 5]) -> FaceBox {
    FaceBox::new(raw[0], raw[1], raw[2], raw[3], raw[4])
}

#[test]
fn suppression_scenarios() {
    let file: ScenarioFile = serde_json::from_str(SCENARIOS).unwrap();
    assert!(!file.scenarios.is_empty());

    for scenario in &file.scenarios {
        let mode: NmsMode = scenario.mode.parse().unwrap();
        let candidates = scenario.candidates.iter().map(to_box).collect();
        let out = suppress(candidates, scenario.iou_threshold, mode).unwrap();

        assert_eq!(
            out.len(),
            scenario.expected.len(),
            "{}: got {:?}",
            scenario.name,
            out
        );
        for (actual, expected) in out.iter().zip(&scenario.expected) {
            for (a, e) in actual.to_array().iter().zip(expected) {
                assert!(
                    (a - e).abs() < TOLERANCE,
                    "{}: got {:?}, expected {:?}",
                    scenario.name,
                    actual,
                    expected
                );
            }
        }
    }
}
