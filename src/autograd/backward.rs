//! Backward operation trait

/// A recorded operation that knows how to push its output gradient
/// back into its inputs.
pub trait BackwardOp {
    /// Propagate the gradient stored in the output cell to the inputs
    fn backward(&self);
}
