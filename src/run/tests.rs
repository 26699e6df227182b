use super::*;
use crate::checkpoint::{CheckpointFormat, LoadMode};
use crate::data::tests::toy_dataset;
use crate::metrics::{ACC_ADVERB, LOSS_TOTAL};
use crate::optim::ParamGroup;
use crate::Error;
use approx::assert_relative_eq;
use tempfile::TempDir;

const BASE_LR: f32 = 1e-2;

fn schedule(max_epochs: usize, eval_interval: usize, save_interval: usize) -> ScheduleSpec {
    ScheduleSpec {
        max_epochs,
        eval_interval,
        save_interval,
        pretrain_action: false,
        adverb_start: 0,
    }
}

fn optim() -> OptimSpec {
    OptimSpec {
        lr: BASE_LR,
        weight_decay: 0.0,
    }
}

struct Fixture {
    model: ActionModifiers,
    train: BatchLoader,
    test: BatchLoader,
    pairs: PairTable,
}

fn fixture() -> Fixture {
    let train = toy_dataset(12);
    let test = toy_dataset(6);
    let model = ActionModifiers::for_dataset(&train, 4, 7).unwrap();
    let pairs = train.pairs().clone();
    Fixture {
        model,
        train: BatchLoader::new(Arc::new(train), 4, true, 7).unwrap(),
        test: BatchLoader::new(Arc::new(test), 6, false, 7).unwrap(),
        pairs,
    }
}

fn manager(dir: &TempDir) -> CheckpointManager {
    CheckpointManager::new(dir.path(), CheckpointFormat::Json, LoadMode::Partial)
}

fn modifier_state(model: &ActionModifiers) -> Vec<(String, Vec<f32>)> {
    model
        .parameters()
        .iter()
        .filter(|(group, ..)| *group == ParamGroup::ActionModifiers)
        .map(|(_, name, _, tensor)| (name.to_string(), tensor.data().to_vec()))
        .collect()
}

#[test]
fn test_epoch_cadence() {
    let dir = TempDir::new().unwrap();
    let mut f = fixture();
    let mut sink = InMemorySink::new();

    let summary = RunOrchestrator::new(schedule(4, 2, 2), &optim(), manager(&dir))
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut sink)
        .unwrap();

    assert_eq!(summary.start_epoch, 0);
    assert_eq!(summary.final_epoch, 4);
    assert_eq!(
        summary.checkpoints,
        vec![dir.path().join("ckpt_E_2.json"), dir.path().join("ckpt_E_4.json")]
    );

    // Epochs 0..=4 inclusive
    let loss_steps: Vec<usize> = sink.query(LOSS_TOTAL).iter().map(|r| r.step).collect();
    assert_eq!(loss_steps, vec![0, 1, 2, 3, 4]);

    // Baseline pass, then epochs 0, 2, 4; one test batch each
    let acc_steps: Vec<usize> = sink.query(ACC_ADVERB).iter().map(|r| r.step).collect();
    assert_eq!(acc_steps, vec![0, 0, 2, 4]);
    assert_relative_eq!(
        f64::from(summary.last_accuracy),
        sink.last(ACC_ADVERB).unwrap(),
        epsilon = 1e-6
    );
    assert!((0.0..=1.0).contains(&summary.last_accuracy));
}

#[test]
fn test_no_checkpoint_at_epoch_zero() {
    let dir = TempDir::new().unwrap();
    let mut f = fixture();
    let mut sink = InMemorySink::new();

    let summary = RunOrchestrator::new(schedule(1, 1, 1), &optim(), manager(&dir))
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut sink)
        .unwrap();

    assert_eq!(summary.checkpoints, vec![dir.path().join("ckpt_E_1.json")]);
    assert!(!dir.path().join("ckpt_E_0.json").exists());
}

#[test]
fn test_pretraining_freezes_modifiers_until_adverb_start() {
    let dir = TempDir::new().unwrap();
    let mut f = fixture();
    let mut sink = InMemorySink::new();
    let initial = modifier_state(&f.model);

    let mut spec = schedule(4, 10, 1);
    spec.pretrain_action = true;
    spec.adverb_start = 3;
    let mut orchestrator = RunOrchestrator::new(spec, &optim(), manager(&dir));
    assert_eq!(orchestrator.rates().action_modifiers, 0.0);

    orchestrator
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut sink)
        .unwrap();

    let reader = ActionModifiers::for_dataset(&toy_dataset(3), 4, 7).unwrap();
    let checkpoints = orchestrator.checkpoints();
    for epoch in [1, 2] {
        let loaded = checkpoints
            .load(checkpoints.path_for(epoch), reader.parameters())
            .unwrap();
        for (name, values) in &initial {
            for (stored, init) in loaded.state[name].iter().zip(values) {
                assert_relative_eq!(*stored, *init, max_relative = 1e-6);
            }
        }
    }

    let after = checkpoints
        .load(checkpoints.path_for(3), reader.parameters())
        .unwrap();
    assert!(initial.iter().any(|(name, values)| {
        after.state[name]
            .iter()
            .zip(values)
            .any(|(stored, init)| (stored - init).abs() > 1e-5)
    }));

    // Rates: frozen at the start, rescaled together at the boundary
    let modifier_lr = sink.query(LR_ACTION_MODIFIERS);
    let embedding_lr = sink.query(LR_EMBEDDING);
    assert_eq!(modifier_lr.len(), 2);
    assert_eq!((modifier_lr[0].step, modifier_lr[0].value), (0, 0.0));
    assert_eq!(modifier_lr[1].step, 3);
    assert_relative_eq!(modifier_lr[1].value, f64::from(BASE_LR * 0.1), epsilon = 1e-9);
    assert_relative_eq!(embedding_lr[1].value, f64::from(BASE_LR * 0.1), epsilon = 1e-9);
    assert_eq!(orchestrator.scheduler().stage(), TrainingStage::Joint);
}

#[test]
fn test_resume_continues_from_checkpoint_epoch() {
    let first_dir = TempDir::new().unwrap();
    let mut f = fixture();
    let summary = RunOrchestrator::new(schedule(2, 1, 2), &optim(), manager(&first_dir))
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut InMemorySink::new())
        .unwrap();
    let resume_from = summary.checkpoints[0].clone();

    let second_dir = TempDir::new().unwrap();
    let mut g = fixture();
    let mut sink = InMemorySink::new();
    let summary = RunOrchestrator::new(schedule(2, 1, 2), &optim(), manager(&second_dir))
        .with_resume(&resume_from)
        .run(&mut g.model, &mut g.train, &mut g.test, &g.pairs, &mut sink)
        .unwrap();

    assert_eq!(summary.start_epoch, 2);
    assert_eq!(summary.final_epoch, 4);
    assert_eq!(sink.query(ACC_ADVERB)[0].step, 2);
    assert_eq!(
        summary.checkpoints,
        vec![
            second_dir.path().join("ckpt_E_2.json"),
            second_dir.path().join("ckpt_E_4.json")
        ]
    );
}

#[test]
fn test_resume_in_same_directory_keeps_source_checkpoint() {
    let dir = TempDir::new().unwrap();
    let mut f = fixture();
    let summary = RunOrchestrator::new(schedule(2, 5, 2), &optim(), manager(&dir))
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut InMemorySink::new())
        .unwrap();
    let source = summary.checkpoints[0].clone();
    let before = std::fs::read(&source).unwrap();

    let summary = RunOrchestrator::new(schedule(2, 5, 2), &optim(), manager(&dir))
        .with_resume(&source)
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut InMemorySink::new())
        .unwrap();

    assert_eq!(summary.checkpoints, vec![dir.path().join("ckpt_E_4.json")]);
    assert_eq!(std::fs::read(&source).unwrap(), before);
}

#[test]
fn test_resume_through_indirect_path_keeps_source_checkpoint() {
    let dir = TempDir::new().unwrap();
    let mut f = fixture();
    let summary = RunOrchestrator::new(schedule(2, 5, 2), &optim(), manager(&dir))
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut InMemorySink::new())
        .unwrap();
    let before = std::fs::read(&summary.checkpoints[0]).unwrap();

    std::fs::create_dir(dir.path().join("nested")).unwrap();
    let indirect = dir.path().join("nested").join("..").join("ckpt_E_2.json");
    let summary = RunOrchestrator::new(schedule(2, 5, 2), &optim(), manager(&dir))
        .with_resume(&indirect)
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut InMemorySink::new())
        .unwrap();

    assert_eq!(summary.start_epoch, 2);
    assert_eq!(summary.checkpoints, vec![dir.path().join("ckpt_E_4.json")]);
    assert_eq!(std::fs::read(dir.path().join("ckpt_E_2.json")).unwrap(), before);
}

#[test]
fn test_existing_checkpoint_fails_before_training() {
    let dir = TempDir::new().unwrap();
    let mut f = fixture();
    RunOrchestrator::new(schedule(2, 5, 2), &optim(), manager(&dir))
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut InMemorySink::new())
        .unwrap();

    let mut g = fixture();
    let initial = modifier_state(&g.model);
    let mut sink = InMemorySink::new();
    let err = RunOrchestrator::new(schedule(2, 5, 2), &optim(), manager(&dir))
        .run(&mut g.model, &mut g.train, &mut g.test, &g.pairs, &mut sink)
        .unwrap_err();

    assert!(matches!(err, Error::CheckpointExists(path) if path.ends_with("ckpt_E_2.json")));
    assert!(sink.query(LOSS_TOTAL).is_empty());
    assert!(sink.query(ACC_ADVERB).is_empty());
    assert_eq!(modifier_state(&g.model), initial);
}

#[test]
fn test_existing_checkpoint_in_resume_range_fails() {
    let source_dir = TempDir::new().unwrap();
    let mut f = fixture();
    let summary = RunOrchestrator::new(schedule(2, 5, 2), &optim(), manager(&source_dir))
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut InMemorySink::new())
        .unwrap();

    // A stale ckpt_E_4 in the target directory collides with the resumed run
    let target_dir = TempDir::new().unwrap();
    std::fs::write(target_dir.path().join("ckpt_E_4.json"), b"{}").unwrap();
    let mut sink = InMemorySink::new();
    let err = RunOrchestrator::new(schedule(2, 5, 2), &optim(), manager(&target_dir))
        .with_resume(&summary.checkpoints[0])
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut sink)
        .unwrap_err();

    assert!(matches!(err, Error::CheckpointExists(path) if path.ends_with("ckpt_E_4.json")));
    assert!(sink.query(LOSS_TOTAL).is_empty());
}

#[test]
fn test_resume_past_adverb_start_enters_joint_stage() {
    let dir = TempDir::new().unwrap();
    let mut f = fixture();
    let summary = RunOrchestrator::new(schedule(3, 5, 3), &optim(), manager(&dir))
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut InMemorySink::new())
        .unwrap();

    let mut spec = schedule(1, 5, 5);
    spec.pretrain_action = true;
    spec.adverb_start = 1;
    let resumed_dir = TempDir::new().unwrap();
    let mut sink = InMemorySink::new();
    let mut orchestrator =
        RunOrchestrator::new(spec, &optim(), manager(&resumed_dir)).with_resume(&summary.checkpoints[0]);
    orchestrator
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut sink)
        .unwrap();

    assert_eq!(orchestrator.scheduler().stage(), TrainingStage::Joint);
    let first = &sink.query(LR_ACTION_MODIFIERS)[0];
    assert_eq!(first.step, 3);
    assert_relative_eq!(first.value, f64::from(BASE_LR * 0.1), epsilon = 1e-9);
}

#[test]
fn test_from_spec_writes_resolved_config() {
    let dir = TempDir::new().unwrap();
    let yaml = format!(
        "data: {{path: features.json, batch_size: 4}}\n\
         optimizer: {{lr: 0.01}}\n\
         schedule: {{max_epochs: 1, eval_interval: 1, save_interval: 5}}\n\
         checkpoint: {{dir: {}}}\n",
        dir.path().display()
    );
    let spec: TrainSpec = serde_yaml::from_str(&yaml).unwrap();
    let mut f = fixture();

    RunOrchestrator::from_spec(&spec)
        .run(&mut f.model, &mut f.train, &mut f.test, &f.pairs, &mut InMemorySink::new())
        .unwrap();

    let written: TrainSpec =
        serde_yaml::from_str(&std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap())
            .unwrap();
    assert_eq!(written, spec);
}
