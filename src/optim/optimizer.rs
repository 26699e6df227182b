//! Optimizer trait

use crate::Tensor;

/// Trait for optimization algorithms
///
/// An optimizer instance owns per-parameter state keyed by position, so it
/// must always be stepped with the same slice of parameters in the same order.
pub trait Optimizer {
    /// Perform a single optimization step
    fn step(&mut self, params: &mut [Tensor]);

    /// Zero out all gradients
    fn zero_grad(&mut self, params: &mut [Tensor]) {
        for param in params {
            param.zero_grad();
        }
    }

    /// Get learning rate
    fn lr(&self) -> f32;

    /// Set learning rate
    fn set_lr(&mut self, lr: f32);
}
