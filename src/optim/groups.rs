//! Tagged parameter groups and the optimizer that steps them independently
//!
//! Every trainable parameter is registered under exactly one [`ParamGroup`]
//! when the model is built. The registry therefore partitions the model's
//! parameters by construction: there is no name matching at training time
//! and no way for a parameter to land in two groups.

use super::{Adam, Optimizer};
use crate::{Error, Result, Tensor};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Name-to-values snapshot of every parameter in a registry
pub type ParameterState = BTreeMap<String, Array1<f32>>;

/// The two optimizer groups of a compositional model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGroup {
    /// Per-adverb modifiers applied on top of action embeddings
    ActionModifiers,
    /// Everything else: feature projection, action embeddings
    Embedding,
}

impl ParamGroup {
    pub const ALL: [ParamGroup; 2] = [ParamGroup::ActionModifiers, ParamGroup::Embedding];

    /// Group name as reported to optimizers and metrics
    pub fn name(&self) -> &'static str {
        match self {
            ParamGroup::ActionModifiers => "action_modifiers",
            ParamGroup::Embedding => "embedding",
        }
    }

    /// Group implied by a parameter name, for models that only expose names
    pub fn from_param_name(name: &str) -> Self {
        if name.contains("action_modifiers") {
            ParamGroup::ActionModifiers
        } else {
            ParamGroup::Embedding
        }
    }

    fn slot(self) -> usize {
        match self {
            ParamGroup::ActionModifiers => 0,
            ParamGroup::Embedding => 1,
        }
    }
}

impl fmt::Display for ParamGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Default)]
struct GroupSlot {
    names: Vec<String>,
    shapes: Vec<Vec<usize>>,
    tensors: Vec<Tensor>,
}

/// Owner of a model's trainable parameters, partitioned into [`ParamGroup`]s
#[derive(Debug, Default)]
pub struct ParameterRegistry {
    slots: [GroupSlot; 2],
    index: HashMap<String, (ParamGroup, usize)>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parameter under an explicit group tag
    ///
    /// `shape` is the logical shape; its product must equal the flat length.
    pub fn register(
        &mut self,
        group: ParamGroup,
        name: impl Into<String>,
        shape: Vec<usize>,
        tensor: Tensor,
    ) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateParameter(name));
        }
        let numel: usize = shape.iter().product();
        if numel != tensor.len() {
            return Err(Error::ShapeMismatch {
                what: name,
                expected: shape,
                got: vec![tensor.len()],
            });
        }

        let slot = &mut self.slots[group.slot()];
        self.index.insert(name.clone(), (group, slot.tensors.len()));
        slot.names.push(name);
        slot.shapes.push(shape);
        slot.tensors.push(tensor);
        Ok(())
    }

    /// Build a registry from bare names, grouping by [`ParamGroup::from_param_name`]
    pub fn from_named(params: Vec<(String, Vec<usize>, Tensor)>) -> Result<Self> {
        let mut registry = Self::new();
        for (name, shape, tensor) in params {
            let group = ParamGroup::from_param_name(&name);
            registry.register(group, name, shape, tensor)?;
        }
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        let (group, i) = self.index.get(name)?;
        self.slots[group.slot()].tensors.get(*i)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tensor> {
        let (group, i) = *self.index.get(name)?;
        self.slots[group.slot()].tensors.get_mut(i)
    }

    pub fn group_of(&self, name: &str) -> Option<ParamGroup> {
        self.index.get(name).map(|(group, _)| *group)
    }

    pub fn shape(&self, name: &str) -> Option<&[usize]> {
        let (group, i) = self.index.get(name)?;
        self.slots[group.slot()].shapes.get(*i).map(Vec::as_slice)
    }

    /// Parameter names of one group, in registration order
    pub fn group_names(&self, group: ParamGroup) -> &[String] {
        &self.slots[group.slot()].names
    }

    pub fn group_tensors(&self, group: ParamGroup) -> &[Tensor] {
        &self.slots[group.slot()].tensors
    }

    pub fn group_tensors_mut(&mut self, group: ParamGroup) -> &mut [Tensor] {
        &mut self.slots[group.slot()].tensors
    }

    /// All names, action modifiers first, each group in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .flat_map(|slot| slot.names.iter().map(String::as_str))
    }

    /// (group, name, shape, tensor) for every parameter
    pub fn iter(&self) -> impl Iterator<Item = (ParamGroup, &str, &[usize], &Tensor)> {
        ParamGroup::ALL.into_iter().flat_map(move |group| {
            let slot = &self.slots[group.slot()];
            slot.names
                .iter()
                .zip(&slot.shapes)
                .zip(&slot.tensors)
                .map(move |((name, shape), tensor)| {
                    (group, name.as_str(), shape.as_slice(), tensor)
                })
        })
    }

    pub fn zero_grad(&self) {
        for slot in &self.slots {
            for tensor in &slot.tensors {
                tensor.zero_grad();
            }
        }
    }

    /// Snapshot of every parameter's values
    pub fn state(&self) -> ParameterState {
        self.iter()
            .map(|(_, name, _, tensor)| (name.to_string(), tensor.data().clone()))
            .collect()
    }

    /// Overwrite parameters present in `state`, leaving the rest untouched
    ///
    /// Keys unknown to the registry are ignored. A known key with a different
    /// element count is an error and nothing is written in that case.
    /// Returns the names that were written.
    pub fn merge_state(&mut self, state: &ParameterState) -> Result<Vec<String>> {
        for (name, values) in state {
            if let Some(shape) = self.shape(name) {
                let expected: usize = shape.iter().product();
                if expected != values.len() {
                    return Err(Error::ShapeMismatch {
                        what: name.clone(),
                        expected: shape.to_vec(),
                        got: vec![values.len()],
                    });
                }
            }
        }

        let mut written = Vec::new();
        for (name, values) in state {
            if let Some(tensor) = self.get_mut(name) {
                tensor.data_mut().assign(values);
                written.push(name.clone());
            }
        }
        Ok(written)
    }
}

/// Learning rate of each group
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupRates {
    pub action_modifiers: f32,
    pub embedding: f32,
}

impl GroupRates {
    /// Both groups at the same rate
    pub fn uniform(lr: f32) -> Self {
        Self {
            action_modifiers: lr,
            embedding: lr,
        }
    }

    /// Starting rates: with action pretraining the modifiers are frozen at 0
    pub fn initial(base_lr: f32, pretrain_action: bool) -> Self {
        if pretrain_action {
            Self {
                action_modifiers: 0.0,
                embedding: base_lr,
            }
        } else {
            Self::uniform(base_lr)
        }
    }

    pub fn get(&self, group: ParamGroup) -> f32 {
        match group {
            ParamGroup::ActionModifiers => self.action_modifiers,
            ParamGroup::Embedding => self.embedding,
        }
    }
}

/// One inner optimizer per [`ParamGroup`], each with its own learning rate
pub struct GroupedOptimizer {
    inner: [Box<dyn Optimizer>; 2],
}

impl GroupedOptimizer {
    /// Adam on both groups, sharing betas and weight decay
    pub fn adam(rates: GroupRates, weight_decay: f32) -> Self {
        Self::with_optimizers(
            Box::new(Adam::default_params(rates.action_modifiers, weight_decay)),
            Box::new(Adam::default_params(rates.embedding, weight_decay)),
        )
    }

    pub fn with_optimizers(
        action_modifiers: Box<dyn Optimizer>,
        embedding: Box<dyn Optimizer>,
    ) -> Self {
        Self {
            inner: [action_modifiers, embedding],
        }
    }

    pub fn lr(&self, group: ParamGroup) -> f32 {
        self.inner[group.slot()].lr()
    }

    pub fn set_lr(&mut self, group: ParamGroup, lr: f32) {
        self.inner[group.slot()].set_lr(lr);
    }

    pub fn rates(&self) -> GroupRates {
        GroupRates {
            action_modifiers: self.lr(ParamGroup::ActionModifiers),
            embedding: self.lr(ParamGroup::Embedding),
        }
    }

    pub fn apply_rates(&mut self, rates: GroupRates) {
        for group in ParamGroup::ALL {
            self.set_lr(group, rates.get(group));
        }
    }

    pub fn zero_grad(&mut self, registry: &mut ParameterRegistry) {
        for group in ParamGroup::ALL {
            self.inner[group.slot()].zero_grad(registry.group_tensors_mut(group));
        }
    }

    /// Step every group with its own optimizer; an empty group is a no-op
    pub fn step(&mut self, registry: &mut ParameterRegistry) {
        for group in ParamGroup::ALL {
            let params = registry.group_tensors_mut(group);
            if !params.is_empty() {
                self.inner[group.slot()].step(params);
            }
        }
    }
}

impl fmt::Debug for GroupedOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupedOptimizer")
            .field("rates", &self.rates())
            .finish()
    }
}
