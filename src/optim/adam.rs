//! Adam optimizer

use super::Optimizer;
use crate::Tensor;
use ndarray::Array1;

/// Adam optimizer (Adaptive Moment Estimation) with L2 weight decay
///
/// Weight decay is folded into the gradient before the moment updates
/// (`g ← g + λθ`), matching the classic coupled formulation.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>, // First moment
    v: Vec<Option<Array1<f32>>>, // Second moment
}

impl Adam {
    /// Create a new Adam optimizer
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32, weight_decay: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            weight_decay,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Create Adam with default betas and epsilon
    pub fn default_params(lr: f32, weight_decay: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8, weight_decay)
    }

    /// Number of steps taken so far
    pub fn steps(&self) -> u64 {
        self.t
    }

    fn ensure_moments(&mut self, params: &[Tensor]) {
        if self.m.len() != params.len() {
            self.m = params.iter().map(|_| None).collect();
            self.v = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_moments(params);
        self.t += 1;

        // Bias correction factors
        let lr_t = self.lr
            * ((1.0 - self.beta2.powi(self.t as i32)).sqrt()
                / (1.0 - self.beta1.powi(self.t as i32)));

        for (i, param) in params.iter_mut().enumerate() {
            let Some(mut grad) = param.grad() else {
                continue;
            };
            if self.weight_decay != 0.0 {
                grad = grad + param.data() * self.weight_decay;
            }

            // m_t = β1 * m_{t-1} + (1 - β1) * g
            let m_t = match &self.m[i] {
                Some(m) => m * self.beta1 + &grad * (1.0 - self.beta1),
                None => &grad * (1.0 - self.beta1),
            };

            // v_t = β2 * v_{t-1} + (1 - β2) * g²
            let grad_sq = &grad * &grad;
            let v_t = match &self.v[i] {
                Some(v) => v * self.beta2 + &grad_sq * (1.0 - self.beta2),
                None => &grad_sq * (1.0 - self.beta2),
            };

            // θ_t = θ_{t-1} - lr_t * m_t / (√v_t + ε)
            // A zero learning rate must leave θ untouched bit for bit.
            if lr_t != 0.0 {
                let update = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;
                *param.data_mut() -= &update;
            }

            self.m[i] = Some(m_t);
            self.v[i] = Some(v_t);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
