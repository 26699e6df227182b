//! Two-stage learning-rate schedule
//!
//! With action pretraining enabled a run starts in [`TrainingStage::Pretrain`]
//! with the action modifiers frozen. At `adverb_start` it moves to
//! [`TrainingStage::Joint`] and both groups are rescaled to `base_lr * 0.1`
//! in one step. The move happens at most once and never reverses.

use super::GroupRates;
use serde::{Deserialize, Serialize};

/// Factor applied to the base rate for both groups on entering the joint stage
pub const JOINT_LR_SCALE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingStage {
    /// Action modifiers frozen, only the embedding group learns
    Pretrain,
    /// Both groups learn
    Joint,
}

/// Outcome of [`StageScheduler::advance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTransition {
    pub stage_changed: bool,
    pub rates: GroupRates,
}

/// Owner of the training stage and of the rates it implies
#[derive(Debug, Clone)]
pub struct StageScheduler {
    stage: TrainingStage,
    base_lr: f32,
    adverb_start: usize,
    rates: GroupRates,
}

impl StageScheduler {
    pub fn new(base_lr: f32, pretrain_action: bool, adverb_start: usize) -> Self {
        let stage = if pretrain_action {
            TrainingStage::Pretrain
        } else {
            TrainingStage::Joint
        };
        Self {
            stage,
            base_lr,
            adverb_start,
            rates: GroupRates::initial(base_lr, pretrain_action),
        }
    }

    pub fn stage(&self) -> TrainingStage {
        self.stage
    }

    /// Rates the optimizer should currently run with
    pub fn rates(&self) -> GroupRates {
        self.rates
    }

    pub fn adverb_start(&self) -> usize {
        self.adverb_start
    }

    /// Whether `advance(epoch)` would fire the transition
    pub fn should_transition(&self, epoch: usize) -> bool {
        self.stage == TrainingStage::Pretrain && epoch == self.adverb_start
    }

    /// Move to the joint stage if `epoch` is the configured boundary
    pub fn advance(&mut self, epoch: usize) -> StageTransition {
        let stage_changed = self.should_transition(epoch);
        if stage_changed {
            self.stage = TrainingStage::Joint;
            self.rates = GroupRates::uniform(self.base_lr * JOINT_LR_SCALE);
        }
        StageTransition {
            stage_changed,
            rates: self.rates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_starts_joint_without_pretraining() {
        let scheduler = StageScheduler::new(1e-3, false, 5);
        assert_eq!(scheduler.stage(), TrainingStage::Joint);
        assert_eq!(scheduler.rates(), GroupRates::uniform(1e-3));
    }

    #[test]
    fn test_joint_start_never_transitions() {
        let mut scheduler = StageScheduler::new(1e-3, false, 5);
        let transition = scheduler.advance(5);
        assert!(!transition.stage_changed);
        assert_eq!(transition.rates, GroupRates::uniform(1e-3));
    }

    #[test]
    fn test_pretrain_to_joint_rescales_both_groups() {
        let base_lr = 1e-3;
        let mut scheduler = StageScheduler::new(base_lr, true, 5);
        assert_eq!(scheduler.stage(), TrainingStage::Pretrain);
        assert_eq!(scheduler.rates().action_modifiers, 0.0);

        let transition = scheduler.advance(5);

        assert!(transition.stage_changed);
        assert_eq!(scheduler.stage(), TrainingStage::Joint);
        assert_relative_eq!(transition.rates.action_modifiers, base_lr * 0.1);
        assert_relative_eq!(transition.rates.embedding, base_lr * 0.1);
    }

    #[test]
    fn test_advance_is_idempotent_at_boundary() {
        let mut scheduler = StageScheduler::new(1e-2, true, 3);
        let first = scheduler.advance(3);
        let second = scheduler.advance(3);

        assert!(first.stage_changed);
        assert!(!second.stage_changed);
        assert_eq!(first.rates, second.rates);
        assert_relative_eq!(second.rates.embedding, 1e-3);
    }

    #[test]
    fn test_other_epochs_do_not_change_rates() {
        let mut scheduler = StageScheduler::new(1e-2, true, 3);
        for epoch in [0, 1, 2, 4, 10] {
            let transition = scheduler.advance(epoch);
            assert!(!transition.stage_changed);
            assert_eq!(transition.rates, GroupRates::initial(1e-2, true));
        }
        assert_eq!(scheduler.stage(), TrainingStage::Pretrain);
    }
}
