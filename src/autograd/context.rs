//! Execution mode shared by a model and the loops driving it

/// Train/eval mode switch.
///
/// In eval mode a model must not record backward operations, so evaluation
/// never touches gradient cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    training: bool,
}

impl Context {
    /// Create a new context in training mode
    pub fn new() -> Self {
        Self { training: true }
    }

    /// Switch to training mode
    pub fn train(&mut self) {
        self.training = true;
    }

    /// Switch to evaluation mode
    pub fn eval(&mut self) {
        self.training = false;
    }

    /// Check if in training mode
    pub fn is_training(&self) -> bool {
        self.training
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
