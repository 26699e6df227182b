//! Embedding models driven by the training and evaluation loops
//!
//! The loops only see [`EmbeddingModel`]: a model produces two named loss
//! terms in training mode, query embeddings in eval mode, one embedding per
//! pair of the pair table, and owns its parameters through a
//! [`ParameterRegistry`].

mod action_modifiers;
mod loss;

pub use action_modifiers::{ActionModifiers, ActionModifiersConfig};
pub use loss::softmax_cross_entropy;

use crate::data::Batch;
use crate::optim::{ParameterRegistry, ParameterState};
use crate::{Result, Tensor};
use ndarray::Array2;

/// Name of the action classification term
pub const ACTION_LOSS: &str = "action_loss";

/// Name of the adverb classification term
pub const ADVERB_LOSS: &str = "adverb_loss";

/// A named scalar loss on the autograd tape
#[derive(Debug, Clone)]
pub struct LossTerm {
    pub name: String,
    pub value: Tensor,
}

impl LossTerm {
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

pub trait EmbeddingModel {
    /// Training-mode forward pass returning the model's loss terms
    fn forward_train(&mut self, batch: &Batch) -> Result<Vec<LossTerm>>;

    /// Eval-mode forward pass: one query embedding per batch row
    fn forward_eval(&self, batch: &Batch) -> Result<Array2<f32>>;

    /// One embedding per pair, rows in pair-table order
    fn pair_embeddings(&self) -> Result<Array2<f32>>;

    fn parameters(&self) -> &ParameterRegistry;

    fn parameters_mut(&mut self) -> &mut ParameterRegistry;

    fn train(&mut self);

    fn eval(&mut self);

    fn is_training(&self) -> bool;

    /// Snapshot of every parameter
    fn state(&self) -> ParameterState {
        self.parameters().state()
    }

    /// Overwrite the parameters present in `state`; returns the names written
    fn load_state(&mut self, state: &ParameterState) -> Result<Vec<String>> {
        self.parameters_mut().merge_state(state)
    }
}
