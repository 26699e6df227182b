//! Epoch-level training
//!
//! [`run_epoch`] drives one pass of gradient updates over a loader and
//! reports the running means of the two loss terms and their sum.

mod epoch_loop;


pub use epoch_loop::{run_epoch, split_loss_terms};

/// Mean losses over the batches of one epoch
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpochLosses {
    pub total: f32,
    pub action: f32,
    pub adverb: f32,
    pub batches: usize,
}

impl EpochLosses {
    /// Fold one batch into the running means
    pub fn record(&mut self, total: f32, action: f32, adverb: f32) {
        self.batches += 1;
        let n = self.batches as f32;
        self.total += (total - self.total) / n;
        self.action += (action - self.action) / n;
        self.adverb += (adverb - self.adverb) / n;
    }
}
