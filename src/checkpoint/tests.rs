use super::*;
use crate::optim::ParamGroup;
use crate::Tensor;
use tempfile::TempDir;

/// Registry with `n` parameters `p0..p{n-1}`, each of shape [2], filled with `fill`
fn registry(n: usize, fill: f32) -> ParameterRegistry {
    let mut registry = ParameterRegistry::new();
    for i in 0..n {
        let group = if i % 3 == 0 {
            ParamGroup::ActionModifiers
        } else {
            ParamGroup::Embedding
        };
        let name = if group == ParamGroup::ActionModifiers {
            format!("action_modifiers.p{i}")
        } else {
            format!("p{i}")
        };
        registry
            .register(group, name, vec![2], Tensor::from_vec(vec![fill + i as f32; 2], true))
            .unwrap();
    }
    registry
}

#[test]
fn test_checkpoint_name_and_no_overwrite() {
    let dir = TempDir::new().unwrap();
    let manager = CheckpointManager::new(dir.path(), CheckpointFormat::Json, LoadMode::Partial);
    let params = registry(3, 0.0);

    let path = manager.save_registry(&params, 20).unwrap();
    assert_eq!(path, dir.path().join("ckpt_E_20.json"));

    let err = manager.save_registry(&params, 20).unwrap_err();
    assert!(matches!(err, Error::CheckpointExists(_)));
}

#[test]
fn test_round_trip_in_every_format() {
    for format in [
        CheckpointFormat::Json,
        CheckpointFormat::Yaml,
        CheckpointFormat::SafeTensors,
    ] {
        let dir = TempDir::new().unwrap();
        let manager = CheckpointManager::new(dir.path(), format, LoadMode::Strict);
        let saved = registry(4, 0.25);

        let path = manager.save_registry(&saved, 7).unwrap();
        let loaded = manager.load(&path, &registry(4, -1.0)).unwrap();

        assert_eq!(loaded.epoch, 7, "{format:?}");
        assert_eq!(loaded.state, saved.state(), "{format:?}");
        assert!(loaded.dropped.is_empty() && loaded.missing.is_empty());
    }
}

#[test]
fn test_partial_load_into_larger_model() {
    let dir = TempDir::new().unwrap();
    let manager = CheckpointManager::new(dir.path(), CheckpointFormat::Json, LoadMode::Partial);
    let path = manager.save_registry(&registry(10, 100.0), 12).unwrap();

    let mut live = registry(12, 0.0);
    let untouched = live.state();
    let loaded = manager.load(&path, &live).unwrap();
    assert_eq!(loaded.epoch, 12);
    assert_eq!(loaded.state.len(), 10);
    assert!(loaded.dropped.is_empty());
    assert_eq!(loaded.missing, vec!["p10".to_string(), "p11".to_string()]);

    live.merge_state(&loaded.state).unwrap();
    for i in 0..10 {
        let name = live.names().find(|n| n.ends_with(&format!("p{i}"))).unwrap().to_string();
        assert_eq!(live.get(&name).unwrap().data()[0], 100.0 + i as f32);
    }
    for name in ["p10", "p11"] {
        assert_eq!(live.get(name).unwrap().data(), &untouched[name]);
    }
}

#[test]
fn test_partial_load_drops_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let manager = CheckpointManager::new(dir.path(), CheckpointFormat::Yaml, LoadMode::Partial);
    let path = manager.save_registry(&registry(5, 1.0), 3).unwrap();

    let loaded = manager.load(&path, &registry(4, 0.0)).unwrap();
    assert_eq!(loaded.dropped, vec!["p4".to_string()]);
    assert_eq!(loaded.state.len(), 4);
}

#[test]
fn test_default_mode_rejects_mismatched_keys() {
    let dir = TempDir::new().unwrap();
    let manager = CheckpointManager::new(dir.path(), CheckpointFormat::Json, LoadMode::default());
    assert_eq!(manager.mode(), LoadMode::Strict);
    let path = manager.save_registry(&registry(5, 0.0), 3).unwrap();

    assert!(matches!(
        manager.load(&path, &registry(4, 0.0)),
        Err(Error::CheckpointMismatch { .. })
    ));
}

#[test]
fn test_strict_load_rejects_any_difference() {
    let dir = TempDir::new().unwrap();
    let manager = CheckpointManager::new(dir.path(), CheckpointFormat::Json, LoadMode::Strict);
    let path = manager.save_registry(&registry(10, 0.0), 12).unwrap();

    match manager.load(&path, &registry(12, 0.0)) {
        Err(Error::CheckpointMismatch { missing, unexpected }) => {
            assert_eq!(missing.len(), 2);
            assert!(unexpected.is_empty());
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
}

#[test]
fn test_shape_mismatch_is_fatal_in_partial_mode() {
    let dir = TempDir::new().unwrap();
    let manager = CheckpointManager::new(dir.path(), CheckpointFormat::SafeTensors, LoadMode::Partial);
    let path = manager.save_registry(&registry(2, 0.0), 1).unwrap();

    let mut live = ParameterRegistry::new();
    live.register(
        ParamGroup::Embedding,
        "p1",
        vec![1, 2],
        Tensor::from_vec(vec![0.0, 0.0], true),
    )
    .unwrap();

    assert!(matches!(
        manager.load(&path, &live),
        Err(Error::ShapeMismatch { .. })
    ));
}

#[test]
fn test_file_without_epoch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("weights.json");
    let snapshot = Snapshot::from_registry(&registry(1, 0.0), ModelMetadata::new("w", "a"));
    write_snapshot(&snapshot, &path, CheckpointFormat::Json).unwrap();

    assert!(read_snapshot(&path).is_err());
}

#[test]
fn test_unknown_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ckpt_E_1.pt");
    std::fs::write(&path, b"not a checkpoint").unwrap();
    assert!(matches!(read_snapshot(&path), Err(Error::Serialization(_))));
}
