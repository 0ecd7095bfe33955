//! Bulk fan-out
//!
//! The portal protocol is sequential per conversation, so bulk work
//! parallelizes across independent learners instead: one fresh
//! `SessionClient` with its own login per concurrent unit, bounded by a
//! semaphore. Every unit settles on its own; one learner's failure never
//! aborts its siblings.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use shule_core::config::PortalConfig;
use shule_core::error::{PortalError, PortalResult};
use shule_core::ids::LearnerId;
use shule_core::learner::Learner;
use shule_portal::client::SessionClient;

use crate::engine::{LifecycleEngine, TransitionOutcome};

/// Which lifecycle transition a bulk run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Request,
    Admit,
    CaptureBiodata,
    TransferIn,
}

impl SyncOperation {
    /// Short name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::Request => "request",
            SyncOperation::Admit => "admit",
            SyncOperation::CaptureBiodata => "capture_biodata",
            SyncOperation::TransferIn => "transfer_in",
        }
    }
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-learner settlement of one bulk run.
#[derive(Debug)]
pub struct LearnerOutcome {
    pub learner_id: LearnerId,
    pub result: PortalResult<TransitionOutcome>,
}

/// Settle-all bulk runner.
#[derive(Debug, Clone)]
pub struct BulkRunner {
    config: PortalConfig,
    concurrency: usize,
}

impl BulkRunner {
    /// Create a runner. `concurrency` bounds the number of simultaneous
    /// portal conversations; it is clamped to at least one.
    pub fn new(config: PortalConfig, concurrency: usize) -> Self {
        Self {
            config,
            concurrency: concurrency.max(1),
        }
    }

    /// Drive `operation` for every learner, each in its own conversation.
    ///
    /// Outcomes come back in the input order, one per learner, regardless
    /// of which units failed.
    #[instrument(skip(self, learners), fields(operation = %operation, count = learners.len()))]
    pub async fn run(&self, learners: Vec<Learner>, operation: SyncOperation) -> Vec<LearnerOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, learner) in learners.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let config = self.config.clone();
            tasks.spawn(async move {
                let learner_id = learner.id;
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => run_one(config, operation, &learner).await,
                    Err(_) => Err(PortalError::protocol("bulk semaphore closed")),
                };
                (index, LearnerOutcome { learner_id, result })
            });
        }

        let mut settled: Vec<Option<LearnerOutcome>> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if settled.len() <= index {
                        settled.resize_with(index + 1, || None);
                    }
                    settled[index] = Some(outcome);
                }
                Err(join_error) => {
                    // A panicked unit is reported, not propagated; the rest
                    // of the batch keeps settling.
                    warn!(error = %join_error, "bulk unit crashed");
                }
            }
        }

        let outcomes: Vec<LearnerOutcome> = settled.into_iter().flatten().collect();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        info!(
            settled = outcomes.len(),
            failed, "bulk run settled"
        );
        outcomes
    }
}

/// One unit of work: fresh conversation, own login, one transition.
async fn run_one(
    config: PortalConfig,
    operation: SyncOperation,
    learner: &Learner,
) -> PortalResult<TransitionOutcome> {
    let mut client = SessionClient::new(config)?;
    client.login().await?;
    let mut engine = LifecycleEngine::new(client);
    let result = match operation {
        SyncOperation::Request => engine.request(learner).await,
        SyncOperation::Admit => engine.admit(learner).await,
        SyncOperation::CaptureBiodata => engine.capture_biodata(learner).await,
        SyncOperation::TransferIn => engine.transfer_in(learner).await,
    };
    if let Err(error) = &result {
        warn!(
            learner_id = %learner.id,
            code = error.error_code(),
            error = %error,
            "bulk unit failed"
        );
    }
    result
}

/// Split settled outcomes into successes and failures.
pub fn partition_outcomes(
    outcomes: &[LearnerOutcome],
) -> (Vec<&LearnerOutcome>, Vec<&LearnerOutcome>) {
    outcomes.iter().partition(|o| o.result.is_ok())
}
