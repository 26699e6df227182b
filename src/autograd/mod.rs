//! Tape-based autograd engine
//!
//! Tensors carry a shared gradient cell and an optional backward operation.
//! Calling [`backward`] on a scalar loss walks the recorded operations and
//! accumulates gradients into every leaf that requires them.

mod backward;
mod context;
mod ops;
mod tensor;


pub use backward::BackwardOp;
pub use context::Context;
pub use ops::{add, analytic_scalar};
pub use tensor::Tensor;

/// Perform backward pass on a tensor
pub fn backward(tensor: &mut Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    match grad_output {
        Some(grad) => tensor.set_grad(grad),
        // Seed with ones for scalar losses
        None => tensor.set_grad(ndarray::Array1::ones(tensor.len())),
    }

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
