//! Resuming through relative paths. Changes the working directory, so this
//! file holds a single test.

use adverb_trainer::config::TrainSpec;
use adverb_trainer::data::{FeatureFile, Modality, RawSample};
use adverb_trainer::run::run_from_spec;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const PAIRS: [(&str, &str); 2] = [("fast", "run"), ("slow", "run")];

fn sample(index: usize) -> RawSample {
    let (adverb, action) = PAIRS[index % PAIRS.len()];
    let a = if adverb == "fast" { 1.0 } else { -1.0 };
    let mut features = BTreeMap::new();
    features.insert(
        Modality::Rgb,
        (0..4).map(|t| vec![a, t as f32 * 0.1]).collect(),
    );
    RawSample {
        adverb: adverb.to_string(),
        action: action.to_string(),
        features,
    }
}

fn spec(features: &Path, resume: Option<&str>) -> TrainSpec {
    let mut yaml = format!(
        "data: {{path: {}, modality: [rgb], batch_size: 2}}\n\
         optimizer: {{lr: 0.01}}\n\
         schedule: {{max_epochs: 2, eval_interval: 5, save_interval: 2}}\n\
         checkpoint:\n  dir: ./checkpoints\n",
        features.display()
    );
    if let Some(resume) = resume {
        yaml.push_str(&format!("  resume: {resume}\n"));
    }
    serde_yaml::from_str(&yaml).unwrap()
}

#[test]
fn test_relative_resume_in_same_directory() {
    let tmp = TempDir::new().unwrap();
    let file = FeatureFile {
        adverbs: vec!["fast".to_string(), "slow".to_string()],
        actions: vec!["run".to_string()],
        pairs: PAIRS
            .iter()
            .map(|(adv, act)| (adv.to_string(), act.to_string()))
            .collect(),
        train: (0..6).map(sample).collect(),
        test: (0..4).map(sample).collect(),
    };
    let features = tmp.path().join("features.json");
    std::fs::write(&features, serde_json::to_string(&file).unwrap()).unwrap();
    std::env::set_current_dir(tmp.path()).unwrap();

    let first = run_from_spec(&spec(&features, None)).unwrap();
    assert_eq!(first.checkpoints, vec![PathBuf::from("./checkpoints/ckpt_E_2.json")]);
    let before = std::fs::read("checkpoints/ckpt_E_2.json").unwrap();

    let resumed = run_from_spec(&spec(&features, Some("checkpoints/ckpt_E_2.json"))).unwrap();
    assert_eq!(resumed.start_epoch, 2);
    assert_eq!(resumed.checkpoints, vec![PathBuf::from("./checkpoints/ckpt_E_4.json")]);
    assert_eq!(std::fs::read("checkpoints/ckpt_E_2.json").unwrap(), before);
}
