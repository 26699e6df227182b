//! Reference compositional model
//!
//! A video feature `x` is projected to `v = W x`. Each action `k` has an
//! embedding `a_k` and each adverb `j` an additive modifier `m_j`, so the pair
//! (j, k) embeds as `a_k + m_j`. Training minimises two cross-entropies:
//! actions scored by `<v, a_k>`, and adverbs scored by `<v, a_act + m_j>`
//! under the ground-truth action.
//!
//! Both losses are recorded with [`analytic_scalar`], gradients derived in
//! closed form below.

use super::{softmax_cross_entropy, EmbeddingModel, LossTerm, ACTION_LOSS, ADVERB_LOSS};
use crate::autograd::analytic_scalar;
use crate::data::{Batch, FeatureDataset, PairTable, Vocab};
use crate::optim::{ParamGroup, ParameterRegistry};
use crate::{Context, Error, Result, Tensor};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const VIDEO_EMBEDDER: &str = "video_embedder.weight";
pub const ACTION_EMBEDDING: &str = "action_embedding.weight";
pub const MODIFIER_PREFIX: &str = "action_modifiers";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActionModifiersConfig {
    pub feature_dim: usize,
    pub embed_dim: usize,
    pub seed: u64,
}

#[derive(Debug)]
pub struct ActionModifiers {
    config: ActionModifiersConfig,
    pairs: PairTable,
    num_actions: usize,
    num_adverbs: usize,
    registry: ParameterRegistry,
    ctx: Context,
}

fn init(rng: &mut StdRng, len: usize, fan_in: usize) -> Tensor {
    let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
    let data: Vec<f32> = (0..len).map(|_| rng.random_range(-bound..bound)).collect();
    Tensor::from_vec(data, true)
}

fn as_matrix<'a>(tensor: &'a Tensor, rows: usize, cols: usize, what: &str) -> Result<ArrayView2<'a, f32>> {
    tensor
        .data()
        .view()
        .into_shape_with_order((rows, cols))
        .map_err(|_| Error::ShapeMismatch {
            what: what.to_string(),
            expected: vec![rows, cols],
            got: vec![tensor.len()],
        })
}

fn flatten(matrix: Array2<f32>) -> Array1<f32> {
    matrix.iter().copied().collect()
}

impl ActionModifiers {
    /// Build a model over `adverbs` and `pairs`; one modifier per adverb.
    pub fn new(config: ActionModifiersConfig, adverbs: &Vocab, pairs: PairTable) -> Result<Self> {
        if config.embed_dim == 0 || config.feature_dim == 0 {
            return Err(Error::Config(format!(
                "embedding and feature dimensions must be > 0 (got {} and {})",
                config.embed_dim, config.feature_dim
            )));
        }
        if adverbs.len() != pairs.num_adverbs() {
            return Err(Error::ShapeMismatch {
                what: "adverb vocabulary".to_string(),
                expected: vec![pairs.num_adverbs()],
                got: vec![adverbs.len()],
            });
        }

        let d = config.embed_dim;
        let f = config.feature_dim;
        let num_actions = pairs.num_actions();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut registry = ParameterRegistry::new();

        registry.register(ParamGroup::Embedding, VIDEO_EMBEDDER, vec![d, f], init(&mut rng, d * f, f))?;
        registry.register(
            ParamGroup::Embedding,
            ACTION_EMBEDDING,
            vec![num_actions, d],
            init(&mut rng, num_actions * d, d),
        )?;
        for label in adverbs.labels() {
            registry.register(
                ParamGroup::ActionModifiers,
                format!("{MODIFIER_PREFIX}.{label}"),
                vec![d],
                init(&mut rng, d, d),
            )?;
        }

        Ok(Self {
            config,
            num_adverbs: adverbs.len(),
            num_actions,
            pairs,
            registry,
            ctx: Context::new(),
        })
    }

    /// Model sized for `dataset`
    pub fn for_dataset(dataset: &FeatureDataset, embed_dim: usize, seed: u64) -> Result<Self> {
        let config = ActionModifiersConfig {
            feature_dim: dataset.feature_dim(),
            embed_dim,
            seed,
        };
        Self::new(config, dataset.adverbs(), dataset.pairs().clone())
    }

    pub fn config(&self) -> ActionModifiersConfig {
        self.config
    }

    pub fn pairs(&self) -> &PairTable {
        &self.pairs
    }

    fn video_embedder(&self) -> Result<&Tensor> {
        self.param(VIDEO_EMBEDDER)
    }

    fn action_embedding(&self) -> Result<&Tensor> {
        self.param(ACTION_EMBEDDING)
    }

    fn param(&self, name: &str) -> Result<&Tensor> {
        self.registry.get(name).ok_or_else(|| Error::CheckpointMismatch {
            missing: vec![name.to_string()],
            unexpected: Vec::new(),
        })
    }

    /// Modifier matrix, one row per adverb
    fn modifiers(&self) -> Array2<f32> {
        let tensors = self.registry.group_tensors(ParamGroup::ActionModifiers);
        let mut m = Array2::zeros((self.num_adverbs, self.config.embed_dim));
        for (mut row, tensor) in m.axis_iter_mut(Axis(0)).zip(tensors) {
            row.assign(tensor.data());
        }
        m
    }

    fn embed(&self, batch: &Batch) -> Result<Array2<f32>> {
        let f = self.config.feature_dim;
        if batch.features.ncols() != f {
            return Err(Error::ShapeMismatch {
                what: "batch features".to_string(),
                expected: vec![batch.len(), f],
                got: batch.features.shape().to_vec(),
            });
        }
        let w = as_matrix(self.video_embedder()?, self.config.embed_dim, f, VIDEO_EMBEDDER)?;
        Ok(batch.features.dot(&w.t()))
    }
}

impl EmbeddingModel for ActionModifiers {
    fn forward_train(&mut self, batch: &Batch) -> Result<Vec<LossTerm>> {
        if batch.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let d = self.config.embed_dim;
        let x = &batch.features;
        let v = self.embed(batch)?;
        let a = as_matrix(self.action_embedding()?, self.num_actions, d, ACTION_EMBEDDING)?;
        let m = self.modifiers();

        // action term: z = V Aᵀ
        let (action_value, dz) = softmax_cross_entropy(&v.dot(&a.t()), &batch.actions)?;
        let dv_action = dz.dot(&a);
        let action_grads = vec![
            (self.video_embedder()?.clone(), flatten(dv_action.t().dot(x))),
            (self.action_embedding()?.clone(), flatten(dz.t().dot(&v))),
        ];

        // adverb term: s_ij = <v_i, a_act(i)> + <v_i, m_j>
        let mut a_gt = Array2::zeros((batch.len(), d));
        for (mut row, &action) in a_gt.axis_iter_mut(Axis(0)).zip(&batch.actions) {
            if action >= self.num_actions {
                return Err(Error::IndexOutOfRange {
                    what: "action",
                    index: action,
                    len: self.num_actions,
                });
            }
            row.assign(&a.row(action));
        }
        let base = (&v * &a_gt).sum_axis(Axis(1)).insert_axis(Axis(1));
        let (adverb_value, ds) = softmax_cross_entropy(&(v.dot(&m.t()) + &base), &batch.adverbs)?;

        let row_sums = ds.sum_axis(Axis(1)).insert_axis(Axis(1));
        let dv_adverb = ds.dot(&m) + &a_gt * &row_sums;
        let mut da_adverb = Array2::zeros((self.num_actions, d));
        for ((i, &action), r) in batch.actions.iter().enumerate().zip(row_sums.iter()) {
            let mut target = da_adverb.row_mut(action);
            target.scaled_add(*r, &v.row(i));
        }
        let dm = ds.t().dot(&v);

        let mut adverb_grads = vec![
            (self.video_embedder()?.clone(), flatten(dv_adverb.t().dot(x))),
            (self.action_embedding()?.clone(), flatten(da_adverb)),
        ];
        let modifiers = self.registry.group_tensors(ParamGroup::ActionModifiers);
        for (tensor, grad) in modifiers.iter().zip(dm.axis_iter(Axis(0))) {
            adverb_grads.push((tensor.clone(), grad.to_owned()));
        }

        let record = self.ctx.is_training();
        let term = |name: &str, value: f32, grads| {
            let tensor = if record {
                analytic_scalar(value, grads)
            } else {
                Tensor::scalar(value, false)
            };
            LossTerm::new(name, tensor)
        };
        Ok(vec![
            term(ACTION_LOSS, action_value, action_grads),
            term(ADVERB_LOSS, adverb_value, adverb_grads),
        ])
    }

    fn forward_eval(&self, batch: &Batch) -> Result<Array2<f32>> {
        self.embed(batch)
    }

    fn pair_embeddings(&self) -> Result<Array2<f32>> {
        let d = self.config.embed_dim;
        let a = as_matrix(self.action_embedding()?, self.num_actions, d, ACTION_EMBEDDING)?;
        let m = self.modifiers();
        let mut out = Array2::zeros((self.pairs.len(), d));
        for (mut row, pair) in out.axis_iter_mut(Axis(0)).zip(self.pairs.pairs()) {
            row.assign(&(&a.row(pair.action) + &m.row(pair.adverb)));
        }
        Ok(out)
    }

    fn parameters(&self) -> &ParameterRegistry {
        &self.registry
    }

    fn parameters_mut(&mut self) -> &mut ParameterRegistry {
        &mut self.registry
    }

    fn train(&mut self) {
        self.ctx.train();
    }

    fn eval(&mut self) {
        self.ctx.eval();
    }

    fn is_training(&self) -> bool {
        self.ctx.is_training()
    }
}
