//! Run orchestration
//!
//! A run walks epochs `start..=start + max_epochs`, where `start` is 0 or
//! the epoch stored in the resumed checkpoint. Before the first epoch the
//! model is evaluated once. Every epoch then:
//!
//! 1. fires the stage transition if this is the adverb start epoch,
//! 2. trains one pass,
//! 3. evaluates when `epoch % eval_interval == 0`,
//! 4. saves when `epoch % save_interval == 0 && epoch > 0`.
//!
//! Save targets are checked before the first epoch: an existing file other
//! than the resumed checkpoint aborts the run with
//! [`Error::CheckpointExists`](crate::Error::CheckpointExists).
//!
//! # Example
//!
//! ```no_run
//! use adverb_trainer::config::load_config;
//! use adverb_trainer::run::run_from_spec;
//!
//! let spec = load_config("config.yaml")?;
//! let summary = run_from_spec(&spec)?;
//! println!("final accuracy: {:?}", summary.last_accuracy);
//! # Ok::<(), adverb_trainer::Error>(())
//! ```

#[cfg(test)]
mod tests;

use crate::checkpoint::CheckpointManager;
use crate::config::{save_config, OptimSpec, ScheduleSpec, TrainSpec};
use crate::data::{BatchLoader, DataLoader, DatasetOptions, FeatureDataset, PairTable, Split};
use crate::eval::evaluate;
use crate::metrics::{InMemorySink, JsonlSink, MetricsSink, LR_ACTION_MODIFIERS, LR_EMBEDDING};
use crate::model::{ActionModifiers, EmbeddingModel};
use crate::optim::{GroupRates, GroupedOptimizer, StageScheduler, TrainingStage};
use crate::train::run_epoch;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolved configuration written next to the checkpoints
pub const CONFIG_FILE: &str = "config.yaml";

/// Scalar log written next to the checkpoints
pub const SCALARS_FILE: &str = "scalars.jsonl";

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub start_epoch: usize,
    pub final_epoch: usize,
    /// Accuracy of the most recent evaluation pass
    pub last_accuracy: f32,
    /// Checkpoints written by this run, in order
    pub checkpoints: Vec<PathBuf>,
}

/// Owner of the epoch counter, the stage scheduler and the optimizer
#[derive(Debug)]
pub struct RunOrchestrator {
    schedule: ScheduleSpec,
    scheduler: StageScheduler,
    optimizer: GroupedOptimizer,
    checkpoints: CheckpointManager,
    resume: Option<PathBuf>,
    resolved: Option<TrainSpec>,
}

impl RunOrchestrator {
    pub fn new(schedule: ScheduleSpec, optimizer: &OptimSpec, checkpoints: CheckpointManager) -> Self {
        let scheduler =
            StageScheduler::new(optimizer.lr, schedule.pretrain_action, schedule.adverb_start);
        Self {
            optimizer: GroupedOptimizer::adam(scheduler.rates(), optimizer.weight_decay),
            scheduler,
            schedule,
            checkpoints,
            resume: None,
            resolved: None,
        }
    }

    /// Orchestrator for a full run configuration, saved as [`CONFIG_FILE`]
    /// when the run starts.
    pub fn from_spec(spec: &TrainSpec) -> Self {
        let checkpoints = CheckpointManager::new(
            &spec.checkpoint.dir,
            spec.checkpoint.format,
            spec.checkpoint.load_mode,
        );
        let mut orchestrator = Self::new(spec.schedule.clone(), &spec.optimizer, checkpoints);
        orchestrator.resume = spec.checkpoint.resume.clone();
        orchestrator.resolved = Some(spec.clone());
        orchestrator
    }

    /// Restore the model from `path` before the first epoch
    pub fn with_resume(mut self, path: impl Into<PathBuf>) -> Self {
        self.resume = Some(path.into());
        self
    }

    pub fn checkpoints(&self) -> &CheckpointManager {
        &self.checkpoints
    }

    pub fn scheduler(&self) -> &StageScheduler {
        &self.scheduler
    }

    pub fn rates(&self) -> GroupRates {
        self.optimizer.rates()
    }

    /// Train `model` for the configured number of epochs
    pub fn run<M: EmbeddingModel + ?Sized>(
        &mut self,
        model: &mut M,
        train: &mut dyn DataLoader,
        test: &mut dyn DataLoader,
        pairs: &PairTable,
        sink: &mut dyn MetricsSink,
    ) -> Result<RunSummary> {
        let start_epoch = match &self.resume {
            Some(path) => self.checkpoints.restore(path, model)?.epoch,
            None => 0,
        };
        let final_epoch = start_epoch + self.schedule.max_epochs;
        let kept_epoch = self.check_save_targets(start_epoch, final_epoch)?;

        if let Some(spec) = &self.resolved {
            save_config(spec, self.checkpoints.dir().join(CONFIG_FILE))?;
        }

        // Resuming past the boundary lands directly in the joint stage.
        if self.scheduler.stage() == TrainingStage::Pretrain
            && start_epoch > self.scheduler.adverb_start()
        {
            self.scheduler.advance(self.scheduler.adverb_start());
        }
        self.optimizer.apply_rates(self.scheduler.rates());
        self.emit_rates(sink, start_epoch)?;

        if self.scheduler.stage() == TrainingStage::Pretrain
            && self.scheduler.adverb_start() > final_epoch
        {
            tracing::warn!(
                adverb_start = self.scheduler.adverb_start(),
                final_epoch,
                "run ends before adverb training starts"
            );
        }
        tracing::info!(
            start_epoch,
            final_epoch,
            stage = ?self.scheduler.stage(),
            "starting run"
        );

        let mut last_accuracy = evaluate(model, test, pairs, sink, start_epoch)?;
        let mut written = Vec::new();

        for epoch in start_epoch..=final_epoch {
            if self.scheduler.should_transition(epoch) {
                let transition = self.scheduler.advance(epoch);
                self.optimizer.apply_rates(transition.rates);
                self.emit_rates(sink, epoch)?;
                tracing::info!(
                    epoch,
                    action_modifiers_lr = transition.rates.action_modifiers,
                    embedding_lr = transition.rates.embedding,
                    "entering joint training"
                );
            }

            run_epoch(model, train, &mut self.optimizer, sink, epoch)?;

            if epoch % self.schedule.eval_interval == 0 {
                last_accuracy = evaluate(model, test, pairs, sink, epoch)?;
            }

            if self.saves_at(epoch) {
                if kept_epoch == Some(epoch) {
                    tracing::warn!(
                        path = %self.checkpoints.path_for(epoch).display(),
                        "not overwriting resumed checkpoint"
                    );
                } else {
                    written.push(self.checkpoints.save(model, epoch)?);
                }
            }
        }

        sink.flush()?;
        Ok(RunSummary {
            start_epoch,
            final_epoch,
            last_accuracy,
            checkpoints: written,
        })
    }

    fn saves_at(&self, epoch: usize) -> bool {
        epoch % self.schedule.save_interval == 0 && epoch > 0
    }

    /// Fail before training if a save target of `start..=end` already
    /// exists. The resumed checkpoint itself is allowed and its epoch is
    /// returned so the loop can skip that save.
    fn check_save_targets(&self, start: usize, end: usize) -> Result<Option<usize>> {
        let mut kept = None;
        for epoch in (start..=end).filter(|&epoch| self.saves_at(epoch)) {
            let target = self.checkpoints.path_for(epoch);
            if !target.exists() {
                continue;
            }
            match &self.resume {
                Some(resume) if same_file(resume, &target) => kept = Some(epoch),
                _ => return Err(Error::CheckpointExists(target.display().to_string())),
            }
        }
        Ok(kept)
    }

    fn emit_rates(&self, sink: &mut dyn MetricsSink, step: usize) -> Result<()> {
        let rates = self.optimizer.rates();
        sink.add_scalar(LR_ACTION_MODIFIERS, f64::from(rates.action_modifiers), step)?;
        sink.add_scalar(LR_EMBEDDING, f64::from(rates.embedding), step)?;
        Ok(())
    }
}

/// Both paths resolve to the same file on disk
fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn dataset_options(spec: &TrainSpec) -> DatasetOptions {
    DatasetOptions {
        modalities: spec.data.modality.clone(),
        temporal_window: spec.data.temporal_window,
        adverb_filter: spec.data.adverb_filter.clone(),
        workers: spec.data.workers,
    }
}

/// Load both splits of the configured feature file
pub fn load_splits(spec: &TrainSpec) -> Result<(FeatureDataset, FeatureDataset)> {
    let options = dataset_options(spec);
    let train = FeatureDataset::load(&spec.data.path, Split::Train, &options)?;
    let test = FeatureDataset::load(&spec.data.path, Split::Test, &options)?;
    if train.pairs() != test.pairs() {
        return Err(Error::Dataset(
            "train and test splits resolved to different pair tables".to_string(),
        ));
    }
    tracing::info!(
        train = train.len(),
        test = test.len(),
        pairs = train.pairs().len(),
        feature_dim = train.feature_dim(),
        "loaded feature file"
    );
    Ok((train, test))
}

/// Build data, model and sinks from `spec` and run training to completion
pub fn run_from_spec(spec: &TrainSpec) -> Result<RunSummary> {
    let (train, test) = load_splits(spec)?;
    let mut model = ActionModifiers::for_dataset(&train, spec.model.embed_dim, spec.model.seed)?;
    let pairs = train.pairs().clone();

    let mut train_loader =
        BatchLoader::new(Arc::new(train), spec.data.batch_size, true, spec.model.seed)?;
    let mut test_loader =
        BatchLoader::new(Arc::new(test), spec.data.batch_size, false, spec.model.seed)?;
    let mut sink = JsonlSink::open(spec.checkpoint.dir.join(SCALARS_FILE))?;

    RunOrchestrator::from_spec(spec).run(
        &mut model,
        &mut train_loader,
        &mut test_loader,
        &pairs,
        &mut sink,
    )
}

/// Restore `checkpoint` into a fresh model and run one evaluation pass
pub fn evaluate_checkpoint(spec: &TrainSpec, checkpoint: impl Into<PathBuf>) -> Result<f32> {
    let checkpoint = checkpoint.into();
    let (train, test) = load_splits(spec)?;
    let mut model = ActionModifiers::for_dataset(&train, spec.model.embed_dim, spec.model.seed)?;
    let pairs = train.pairs().clone();

    let manager = CheckpointManager::new(
        &spec.checkpoint.dir,
        spec.checkpoint.format,
        spec.checkpoint.load_mode,
    );
    let loaded = manager.restore(&checkpoint, &mut model)?;

    let mut test_loader =
        BatchLoader::new(Arc::new(test), spec.data.batch_size, false, spec.model.seed)?;
    let mut sink = InMemorySink::new();
    evaluate(&mut model, &mut test_loader, &pairs, &mut sink, loaded.epoch)
}
