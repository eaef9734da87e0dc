//! Sequential payout loop.
//!
//! Rows are dispatched strictly in file order, one at a time: nonces are
//! assigned by the caller and nothing here could reorder them safely. The
//! first row that cannot be dispatched halts the batch.

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::context::RunContext;
use crate::error::DispatchError;
use crate::sender::{Broadcaster, dispatch};
use crate::transaction::build;
use crate::types::{DispatchReport, DispatchResult, LoopState, PayoutRow};

pub async fn run_batch<B>(rows: &[PayoutRow], ctx: &RunContext, broadcaster: &B) -> DispatchReport
where
    B: Broadcaster + ?Sized,
{
    let mut state = LoopState::Running;
    let mut results = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            state = LoopState::Cancelled;
            break;
        }

        info!(
            "------------ nonce {} address {} should paid {} ------------",
            row.nonce, row.address, row.amount
        );

        let outcome = match build(row, &ctx.params) {
            Ok(tx) => dispatch(&tx, ctx, broadcaster).await,
            Err(e) => Err(DispatchError::from(e)),
        };

        match outcome {
            Ok(reference) => {
                results.push(DispatchResult::succeeded(row, reference));
                info!(
                    "------------ nonce {} address {} paid finished ------------",
                    row.nonce, row.address
                );
            }
            Err(DispatchError::Cancelled) => {
                warn!("cancelled while dispatching nonce {}", row.nonce);
                results.push(DispatchResult::failed(row));
                state = LoopState::Cancelled;
                break;
            }
            Err(e) => {
                error!("fatal error at nonce {}: {}, process exit.", row.nonce, e);
                results.push(DispatchResult::failed(row));
                state = LoopState::HaltedOnError;
                break;
            }
        }

        if index + 1 < rows.len() {
            info!("sleep {}s", ctx.pacing.as_secs_f64());
            tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => {
                    state = LoopState::Cancelled;
                    break;
                }
                _ = sleep(ctx.pacing) => {}
            }
        }
    }

    if state == LoopState::Running {
        state = LoopState::Completed;
    }

    DispatchReport { state, results }
}
