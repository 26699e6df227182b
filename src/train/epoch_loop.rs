//! One epoch of gradient updates

use super::EpochLosses;
use crate::autograd::{add, backward};
use crate::data::DataLoader;
use crate::metrics::{MetricsSink, LOSS_ACTION, LOSS_ADVERB, LOSS_TOTAL};
use crate::model::{EmbeddingModel, LossTerm, ACTION_LOSS, ADVERB_LOSS};
use crate::optim::GroupedOptimizer;
use crate::{Error, Result, Tensor};

/// Pull the action and adverb terms out of a model's loss list.
///
/// Exactly two terms named `action_loss` and `adverb_loss` are accepted, in
/// either order.
pub fn split_loss_terms(terms: Vec<LossTerm>) -> Result<(Tensor, Tensor)> {
    if terms.len() != 2 {
        let names: Vec<_> = terms.iter().map(|t| t.name.as_str()).collect();
        return Err(Error::LossContract(format!(
            "expected 2 loss terms ({ACTION_LOSS}, {ADVERB_LOSS}), got {}: {names:?}",
            terms.len()
        )));
    }

    let mut action = None;
    let mut adverb = None;
    for term in terms {
        let slot = match term.name.as_str() {
            ACTION_LOSS => &mut action,
            ADVERB_LOSS => &mut adverb,
            other => {
                return Err(Error::LossContract(format!("unexpected loss term {other:?}")));
            }
        };
        if slot.replace(term.value).is_some() {
            return Err(Error::LossContract(format!("duplicate loss term {:?}", term.name)));
        }
    }

    match (action, adverb) {
        (Some(action), Some(adverb)) => Ok((action, adverb)),
        _ => Err(Error::LossContract(format!(
            "both {ACTION_LOSS} and {ADVERB_LOSS} are required"
        ))),
    }
}

/// Train `model` for one pass over `loader`.
///
/// Per batch: forward, clear gradients, backpropagate the summed loss, one
/// optimizer step. The epoch means are written to `sink` at step `epoch`.
pub fn run_epoch<M: EmbeddingModel + ?Sized>(
    model: &mut M,
    loader: &mut dyn DataLoader,
    optimizer: &mut GroupedOptimizer,
    sink: &mut dyn MetricsSink,
    epoch: usize,
) -> Result<EpochLosses> {
    model.train();
    let mut losses = EpochLosses::default();

    for batch in loader.batches() {
        let terms = model.forward_train(&batch)?;
        let (action, adverb) = split_loss_terms(terms)?;

        optimizer.zero_grad(model.parameters_mut());
        let mut total = add(&action, &adverb);
        backward(&mut total, None);
        optimizer.step(model.parameters_mut());

        losses.record(total.item(), action.item(), adverb.item());
        tracing::debug!(
            epoch,
            batch = losses.batches,
            loss = total.item(),
            "trained batch"
        );
    }

    if losses.batches == 0 {
        return Err(Error::EmptyLoader);
    }

    sink.add_scalar(LOSS_TOTAL, f64::from(losses.total), epoch)?;
    sink.add_scalar(LOSS_ACTION, f64::from(losses.action), epoch)?;
    sink.add_scalar(LOSS_ADVERB, f64::from(losses.adverb), epoch)?;
    tracing::info!(
        "E: {} | L: {:.2E} | L_act: {:.2E} | L_adv: {:.2E}",
        epoch,
        losses.total,
        losses.action,
        losses.adverb
    );
    Ok(losses)
}
