//! Fan-out of one probe task per fixture and the single aggregation point.
//!
//! Every task reports exactly one [`TaskResult`] tagged with the index of the
//! input it was spawned for. The orchestrator drains all of them on the
//! caller's task and hands successes to the aggregation closure in receive
//! order, which is the only place a case may write to its registry.

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::{CaseFailure, Error};

/// A probe outcome tagged with the position of its input.
#[derive(Debug)]
pub struct TaskResult<T> {
    pub index: usize,
    pub result: Result<T, Error>,
}

/// Statistics of a passed case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub name: &'static str,
    pub probes: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    limit: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// `concurrency` bounds in-flight probes; zero is treated as one.
    /// Cancelling `cancel` stops every probe that has not finished yet.
    pub fn new(concurrency: usize, cancel: CancellationToken) -> Self {
        Self {
            limit: Arc::new(Semaphore::new(concurrency.max(1))),
            cancel,
        }
    }

    /// Runs `probe` once per input and feeds each success to `aggregate`.
    ///
    /// The first error in receive order, from a probe or from `aggregate`,
    /// fails the case and cancels the probes still pending. All results are
    /// drained regardless, and successes received after the failure are
    /// still aggregated.
    pub async fn run<I, T, F, Fut, A>(
        &self,
        case: &'static str,
        inputs: Vec<I>,
        probe: F,
        mut aggregate: A,
    ) -> Result<CaseReport, CaseFailure>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
        T: Send + 'static,
        A: FnMut(usize, T) -> Result<(), Error>,
    {
        let started = Instant::now();
        let total = inputs.len();
        tracing::debug!(case, probes = total, "dispatching probes");
        if total == 0 {
            return Ok(CaseReport {
                name: case,
                probes: 0,
                elapsed: started.elapsed(),
            });
        }

        let token = self.cancel.child_token();
        let (tx, mut rx) = mpsc::channel(total);
        for (index, input) in inputs.into_iter().enumerate() {
            let work = probe(input);
            let tx = tx.clone();
            let limit = self.limit.clone();
            let token = token.clone();
            tokio::spawn(async move {
                if token.is_cancelled() {
                    let _ = tx.send(TaskResult { index, result: Err(Error::Cancelled) }).await;
                    return;
                }
                let result = tokio::select! {
                    biased;
                    result = async {
                        let _permit = limit.acquire_owned().await.map_err(|_| Error::Cancelled)?;
                        work.await
                    } => result,
                    _ = token.cancelled() => Err(Error::Cancelled),
                };
                let _ = tx.send(TaskResult { index, result }).await;
            });
        }
        drop(tx);

        let mut failure: Option<(Option<usize>, Error)> = None;
        let mut received = 0;
        while received < total {
            let Some(TaskResult { index, result }) = rx.recv().await else {
                break;
            };
            received += 1;
            let Err(err) = result.and_then(|value| aggregate(index, value)) else {
                continue;
            };
            if failure.is_none() {
                tracing::warn!(case, index, error = %err, "probe failed, cancelling siblings");
                token.cancel();
                failure = Some((Some(index), err));
            } else {
                tracing::debug!(case, index, error = %err, "additional probe failure");
            }
        }
        if received < total {
            tracing::warn!(
                case,
                missing = total - received,
                "probe tasks exited without reporting"
            );
            if failure.is_none() {
                failure = Some((None, Error::Lost));
            }
        }

        match failure {
            Some((index, source)) => Err(CaseFailure {
                case,
                index,
                source,
            }),
            None => {
                let elapsed = started.elapsed();
                tracing::info!(case, probes = total, ?elapsed, "case passed");
                Ok(CaseReport {
                    name: case,
                    probes: total,
                    elapsed,
                })
            }
        }
    }
}
