//! Autograd operations with backward passes

use super::tensor::GradCell;
use super::{BackwardOp, Tensor};
use ndarray::Array1;
use std::rc::Rc;

/// Add two tensors
pub fn add(a: &Tensor, b: &Tensor) -> Tensor {
    let data = a.data() + b.data();
    let requires_grad = a.requires_grad() || b.requires_grad();

    let mut result = Tensor::new(data, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AddBackward {
            a: a.clone(),
            b: b.clone(),
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AddBackward {
    a: Tensor,
    b: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for AddBackward {
    fn backward(&self) {
        if let Some(grad) = self.result_grad.borrow().as_ref() {
            if self.a.requires_grad() {
                self.a.accumulate_grad(grad.clone());
            }
            if self.b.requires_grad() {
                self.b.accumulate_grad(grad.clone());
            }

            if let Some(op) = self.a.backward_op() {
                op.backward();
            }
            if let Some(op) = self.b.backward_op() {
                op.backward();
            }
        }
    }
}

/// Scalar whose gradients w.r.t. a set of leaf tensors are known in closed form.
///
/// `local_grads` pairs each leaf with ∂value/∂leaf. On backward the upstream
/// scalar gradient is multiplied in and accumulated into each leaf, so a model
/// can express a loss with hand-derived gradients and still compose with
/// [`add`] and the rest of the tape.
pub fn analytic_scalar(value: f32, local_grads: Vec<(Tensor, Array1<f32>)>) -> Tensor {
    let local_grads: Vec<_> = local_grads
        .into_iter()
        .filter(|(leaf, _)| leaf.requires_grad())
        .collect();
    let requires_grad = !local_grads.is_empty();

    let mut result = Tensor::scalar(value, requires_grad);

    if requires_grad {
        let backward_op = Rc::new(AnalyticBackward {
            local_grads,
            result_grad: result.grad_cell(),
        });
        result.set_backward_op(backward_op);
    }

    result
}

struct AnalyticBackward {
    local_grads: Vec<(Tensor, Array1<f32>)>,
    result_grad: GradCell,
}

impl BackwardOp for AnalyticBackward {
    fn backward(&self) {
        let upstream = match self.result_grad.borrow().as_ref() {
            Some(grad) => grad.sum(),
            None => return,
        };
        for (leaf, grad) in &self.local_grads {
            // ∂L/∂leaf = ∂L/∂value * ∂value/∂leaf
            leaf.accumulate_grad(grad * upstream);
        }
    }
}
