//! Outer run loop: cursor ownership, per-iteration session lifecycle,
//! termination policy.

use crate::addresses::AddressBook;
use crate::backend::SessionFactory;
use crate::cursor::PersistentCursor;
use crate::flow::CheckoutPipeline;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use trolley_common::protocol::AttemptResult;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Address book is empty; nothing to iterate")]
    EmptyAddressBook,
}

/// When the loop stops.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RunPolicy {
    /// Hard cap on iterations for this run-cycle.
    pub max_iterations: u64,
    /// Stop at the first non-success classification instead of walking
    /// the whole address book blind. The layout probably changed.
    pub stop_on_inconclusive: bool,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            max_iterations: 40,
            stop_on_inconclusive: false,
        }
    }
}

/// Per-class tallies for one run-cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub successes: u64,
    pub inconclusive: u64,
    pub errors: u64,
    /// Normalized cursor value persisted at run end.
    pub final_cursor: u64,
}

/// Owns the outer loop. The cursor has exactly one writer — this
/// controller, at one point per iteration — so iterations are isolated
/// by construction.
pub struct RunController<F: SessionFactory> {
    addresses: AddressBook,
    cursor: PersistentCursor,
    factory: F,
    policy: RunPolicy,
}

impl<F: SessionFactory> RunController<F> {
    pub fn new(
        addresses: AddressBook,
        cursor: PersistentCursor,
        factory: F,
        policy: RunPolicy,
    ) -> Self {
        Self {
            addresses,
            cursor,
            factory,
            policy,
        }
    }

    /// Walk the address book from the persisted cursor until a
    /// termination condition fires. Every iteration — success, failure or
    /// error — closes its session, advances the cursor and persists it
    /// before the loop decides anything.
    pub async fn run(&self, pipeline: &CheckoutPipeline<'_>) -> Result<RunSummary, RunError> {
        let n = self.addresses.len() as u64;
        if n == 0 {
            return Err(RunError::EmptyAddressBook);
        }

        let mut index = self.cursor.load() % n;
        let mut summary = RunSummary {
            final_cursor: index,
            ..RunSummary::default()
        };

        while summary.iterations < self.policy.max_iterations {
            info!(
                iteration = summary.iterations + 1,
                index, "Starting checkout attempt"
            );

            let result = self.run_one(pipeline, index).await;
            match &result {
                AttemptResult::Success => summary.successes += 1,
                AttemptResult::Inconclusive => summary.inconclusive += 1,
                AttemptResult::Error(cause) => {
                    summary.errors += 1;
                    warn!(index, %cause, "Iteration ended in error");
                }
            }

            // Unconditional bookkeeping, ahead of any termination check: a
            // crash after this point neither replays nor skips a record.
            index = (index + 1) % n;
            self.cursor.save(index);
            summary.iterations += 1;

            if self.policy.stop_on_inconclusive && !result.is_success() {
                warn!("Stopping at first non-success result");
                break;
            }
        }

        summary.final_cursor = index;
        info!(
            iterations = summary.iterations,
            successes = summary.successes,
            inconclusive = summary.inconclusive,
            errors = summary.errors,
            "Run finished"
        );
        Ok(summary)
    }

    /// One iteration against one fresh session. Never escapes an error:
    /// launch and pipeline failures classify as `Error`, close failures
    /// are logged and dropped (the next iteration gets a new session).
    async fn run_one(&self, pipeline: &CheckoutPipeline<'_>, index: u64) -> AttemptResult {
        let Some(record) = self.addresses.get(index as usize) else {
            // Unreachable while the cursor stays normalized; classify
            // rather than panic if it ever isn't.
            return AttemptResult::Error(format!("record index {index} out of range"));
        };

        let mut session = self.factory.create();
        let result = match session.launch().await {
            Ok(()) => pipeline.run(session.as_mut(), record).await,
            Err(e) => {
                error!("Session launch failed: {e}");
                AttemptResult::Error(format!("session launch failed: {e}"))
            }
        };
        if let Err(e) = session.close().await {
            warn!("Session close failed: {e}");
        }
        result
    }
}
