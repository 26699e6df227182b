//! Configuration validation

use super::schema::TrainSpec;

/// Validation error type
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Feature file does not exist: {0}")]
    DataPathNotFound(String),

    #[error("Resume checkpoint does not exist: {0}")]
    ResumePathNotFound(String),

    #[error("Invalid learning rate: {0} (must be > 0.0)")]
    InvalidLearningRate(f32),

    #[error("Invalid weight decay: {0} (must be >= 0.0)")]
    InvalidWeightDecay(f32),

    #[error("Invalid batch size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid epochs: {0} (must be > 0)")]
    InvalidEpochs(usize),

    #[error("Invalid eval interval: {0} (must be > 0)")]
    InvalidEvalInterval(usize),

    #[error("Invalid save interval: {0} (must be > 0)")]
    InvalidSaveInterval(usize),

    #[error("At least one modality is required")]
    EmptyModality,

    #[error("Invalid temporal window: {0} (must be > 0)")]
    InvalidTemporalWindow(usize),

    #[error("Invalid embedding dimension: {0} (must be > 0)")]
    InvalidEmbedDim(usize),

    #[error("Adverb start epoch {adverb_start} is after the last epoch {max_epochs}")]
    AdverbStartOutOfRange { adverb_start: usize, max_epochs: usize },
}

/// Check value ranges of a run specification
pub fn validate_config(spec: &TrainSpec) -> Result<(), ValidationError> {
    let lr = spec.optimizer.lr;
    if lr.is_nan() || lr <= 0.0 {
        return Err(ValidationError::InvalidLearningRate(lr));
    }
    let weight_decay = spec.optimizer.weight_decay;
    if weight_decay.is_nan() || weight_decay < 0.0 {
        return Err(ValidationError::InvalidWeightDecay(weight_decay));
    }

    if spec.data.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(spec.data.batch_size));
    }
    if spec.data.modality.is_empty() {
        return Err(ValidationError::EmptyModality);
    }
    if spec.data.temporal_window == 0 {
        return Err(ValidationError::InvalidTemporalWindow(spec.data.temporal_window));
    }

    let schedule = &spec.schedule;
    if schedule.max_epochs == 0 {
        return Err(ValidationError::InvalidEpochs(schedule.max_epochs));
    }
    if schedule.eval_interval == 0 {
        return Err(ValidationError::InvalidEvalInterval(schedule.eval_interval));
    }
    if schedule.save_interval == 0 {
        return Err(ValidationError::InvalidSaveInterval(schedule.save_interval));
    }
    // Resumed runs start at the stored epoch, unknown until the checkpoint
    // is read, so the bound only holds for fresh runs.
    if schedule.pretrain_action
        && spec.checkpoint.resume.is_none()
        && schedule.adverb_start > schedule.max_epochs
    {
        return Err(ValidationError::AdverbStartOutOfRange {
            adverb_start: schedule.adverb_start,
            max_epochs: schedule.max_epochs,
        });
    }

    if spec.model.embed_dim == 0 {
        return Err(ValidationError::InvalidEmbedDim(spec.model.embed_dim));
    }

    Ok(())
}

/// Check that the files a run reads exist
pub fn validate_paths(spec: &TrainSpec) -> Result<(), ValidationError> {
    if !spec.data.path.exists() {
        return Err(ValidationError::DataPathNotFound(
            spec.data.path.display().to_string(),
        ));
    }
    if let Some(resume) = &spec.checkpoint.resume {
        if !resume.exists() {
            return Err(ValidationError::ResumePathNotFound(
                resume.display().to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TrainSpec {
        serde_yaml::from_str(
            r#"
data:
  path: features.json
  batch_size: 8
optimizer:
  lr: 0.001
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&spec()).is_ok());
    }

    #[test]
    fn test_invalid_learning_rate() {
        let mut s = spec();
        s.optimizer.lr = 0.0;
        assert_eq!(validate_config(&s), Err(ValidationError::InvalidLearningRate(0.0)));
        s.optimizer.lr = f32::NAN;
        assert!(validate_config(&s).is_err());
    }

    #[test]
    fn test_negative_weight_decay() {
        let mut s = spec();
        s.optimizer.weight_decay = -0.1;
        assert!(matches!(
            validate_config(&s),
            Err(ValidationError::InvalidWeightDecay(_))
        ));
    }

    #[test]
    fn test_zero_intervals() {
        let mut s = spec();
        s.schedule.eval_interval = 0;
        assert_eq!(validate_config(&s), Err(ValidationError::InvalidEvalInterval(0)));

        let mut s = spec();
        s.schedule.save_interval = 0;
        assert_eq!(validate_config(&s), Err(ValidationError::InvalidSaveInterval(0)));

        let mut s = spec();
        s.schedule.max_epochs = 0;
        assert_eq!(validate_config(&s), Err(ValidationError::InvalidEpochs(0)));
    }

    #[test]
    fn test_data_ranges() {
        let mut s = spec();
        s.data.batch_size = 0;
        assert_eq!(validate_config(&s), Err(ValidationError::InvalidBatchSize(0)));

        let mut s = spec();
        s.data.modality.clear();
        assert_eq!(validate_config(&s), Err(ValidationError::EmptyModality));

        let mut s = spec();
        s.data.temporal_window = 0;
        assert_eq!(validate_config(&s), Err(ValidationError::InvalidTemporalWindow(0)));

        let mut s = spec();
        s.model.embed_dim = 0;
        assert_eq!(validate_config(&s), Err(ValidationError::InvalidEmbedDim(0)));
    }

    #[test]
    fn test_adverb_start_only_checked_when_pretraining() {
        let mut s = spec();
        s.schedule.max_epochs = 10;
        s.schedule.adverb_start = 11;
        assert!(validate_config(&s).is_ok());

        s.schedule.pretrain_action = true;
        assert_eq!(
            validate_config(&s),
            Err(ValidationError::AdverbStartOutOfRange {
                adverb_start: 11,
                max_epochs: 10
            })
        );
        s.schedule.adverb_start = 10;
        assert!(validate_config(&s).is_ok());
    }

    #[test]
    fn test_adverb_start_past_max_epochs_allowed_on_resume() {
        let mut s = spec();
        s.schedule.max_epochs = 4;
        s.schedule.adverb_start = 12;
        s.schedule.pretrain_action = true;
        s.checkpoint.resume = Some("runs/ckpt_E_10.json".into());
        assert!(validate_config(&s).is_ok());
    }

    #[test]
    fn test_missing_paths() {
        let mut s = spec();
        s.data.path = "/nonexistent/features.json".into();
        assert!(matches!(
            validate_paths(&s),
            Err(ValidationError::DataPathNotFound(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        s.data.path = dir.path().to_path_buf();
        s.checkpoint.resume = Some(dir.path().join("ckpt_E_5.json"));
        assert!(matches!(
            validate_paths(&s),
            Err(ValidationError::ResumePathNotFound(_))
        ));
    }
}
