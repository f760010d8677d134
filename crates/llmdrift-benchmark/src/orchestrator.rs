use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use llmdrift_core::{BenchmarkRef, DriftError, Registry, RequestId, Result, RunRecord};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const EVENT_CAPACITY: usize = 256;

/// Emitted once per recorded run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub group_id: usize,
    pub request_id: RequestId,
    pub run: RunRecord,
    pub score_sum: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireSummary {
    pub fired: usize,
    pub failed: usize,
}

/// Sends benchmarks to the oracle and turns its replies into run records.
///
/// Per benchmark: Unfired -> Pending on a successful dispatch, Pending ->
/// Resolved when its reply is recorded. Nothing is ever re-fired.
pub struct Orchestrator {
    registry: Arc<Registry>,
    oracle: Arc<dyn crate::Oracle>,
    pending: Mutex<HashMap<RequestId, BenchmarkRef>>,
    next_request_id: AtomicU64,
    fire_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<RunEvent>,
}

impl Orchestrator {
    pub fn new(registry: Arc<Registry>, oracle: Arc<dyn crate::Oracle>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            registry,
            oracle,
            pending: Mutex::new(HashMap::new()),
            next_request_id: AtomicU64::new(0),
            fire_lock: tokio::sync::Mutex::new(()),
            events,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        self.pending_table().len()
    }

    fn pending_table(&self) -> MutexGuard<'_, HashMap<RequestId, BenchmarkRef>> {
        self.pending.lock().expect("pending table lock poisoned")
    }

    /// Dispatch every benchmark that has not been fired yet.
    ///
    /// Fire passes are serialized, so concurrent callers never send the same
    /// benchmark twice. A failed dispatch leaves the benchmark unfired.
    #[instrument(skip(self))]
    pub async fn fire_all(&self) -> Result<FireSummary> {
        let _guard = self.fire_lock.lock().await;
        let mut summary = FireSummary::default();

        for item in self.registry.unfired() {
            let request_id = RequestId(self.next_request_id.fetch_add(1, Ordering::Relaxed));

            // Registered before dispatch: the reply may beat the acknowledgement.
            self.pending_table().insert(request_id, item.target);

            match self.oracle.submit(request_id, &item.prompt).await {
                Ok(()) => {
                    self.registry.mark_pending(item.target)?;
                    debug!(%request_id, benchmark = %item.target, id = %item.id, "Fired benchmark");
                    summary.fired += 1;
                }
                Err(e) => {
                    self.pending_table().remove(&request_id);
                    warn!(%request_id, id = %item.id, "Dispatch failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        info!(fired = summary.fired, failed = summary.failed, "Fire pass complete");
        Ok(summary)
    }

    /// Callback for oracle replies. Each request id resolves at most once;
    /// an unknown or already consumed id is reported, not dropped.
    #[instrument(skip(self, response), fields(len = response.len()))]
    pub fn on_response(&self, request_id: RequestId, response: &str) -> Result<RunRecord> {
        let target = self
            .pending_table()
            .remove(&request_id)
            .ok_or(DriftError::RequestNotFound(request_id))?;

        let (run, score_sum) = self.registry.record_run(target, response)?;
        info!(
            %request_id,
            group_id = target.group_id,
            score = run.score,
            score_sum,
            "Benchmark result added"
        );

        // No subscribers is fine.
        let _ = self.events.send(RunEvent {
            group_id: target.group_id,
            request_id,
            run: run.clone(),
            score_sum,
        });

        Ok(run)
    }

    /// Feed replies from `rx` into `on_response` until the channel closes or
    /// `cancel` fires. Returns how many replies were recorded.
    pub async fn run_resolver(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<crate::OracleResponse>,
        cancel: CancellationToken,
    ) -> usize {
        let mut resolved = 0;

        loop {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Resolver cancelled");
                    break;
                }
                response = rx.recv() => match response {
                    Some(r) => r,
                    None => {
                        debug!("Response channel closed");
                        break;
                    }
                },
            };

            match self.on_response(response.request_id, &response.content) {
                Ok(_) => resolved += 1,
                Err(e) => warn!(request_id = %response.request_id, "Resolution failed: {}", e),
            }
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryOracle, OracleResponse};
    use llmdrift_core::{Benchmark, FireState};

    fn setup() -> (Arc<Registry>, Arc<MemoryOracle>, Orchestrator) {
        let registry = Arc::new(Registry::new());
        registry.add_group(
            "primes",
            "",
            vec![
                Benchmark::prime(11, true).unwrap(),
                Benchmark::prime(12, false).unwrap(),
            ],
        );
        let oracle = Arc::new(MemoryOracle::new());
        let orchestrator = Orchestrator::new(registry.clone(), oracle.clone());
        (registry, oracle, orchestrator)
    }

    #[tokio::test]
    async fn test_fire_all_is_idempotent() {
        let (registry, oracle, orchestrator) = setup();

        let first = orchestrator.fire_all().await.unwrap();
        let second = orchestrator.fire_all().await.unwrap();

        assert_eq!(first, FireSummary { fired: 2, failed: 0 });
        assert_eq!(second, FireSummary::default());
        assert_eq!(oracle.submitted().len(), 2);
        assert_eq!(orchestrator.pending_count(), 2);
        assert_eq!(
            registry.group(0).unwrap().states,
            vec![FireState::Pending, FireState::Pending]
        );
    }

    #[tokio::test]
    async fn test_fire_all_only_sends_new_benchmarks() {
        let (registry, oracle, orchestrator) = setup();
        orchestrator.fire_all().await.unwrap();

        registry
            .add_benchmarks(0, vec![Benchmark::prime(13, true).unwrap()])
            .unwrap();
        let summary = orchestrator.fire_all().await.unwrap();

        assert_eq!(summary.fired, 1);
        let submitted = oracle.submitted();
        assert_eq!(submitted.len(), 3);
        assert!(submitted[2].1.starts_with("Is 13 a prime number?"));
    }

    #[tokio::test]
    async fn test_failed_dispatch_stays_unfired() {
        let registry = Arc::new(Registry::new());
        registry.add_group("p", "", vec![Benchmark::prime(11, true).unwrap()]);
        let orchestrator = Orchestrator::new(registry.clone(), Arc::new(MemoryOracle::rejecting()));

        let summary = orchestrator.fire_all().await.unwrap();

        assert_eq!(summary, FireSummary { fired: 0, failed: 1 });
        assert_eq!(orchestrator.pending_count(), 0);
        assert_eq!(registry.unfired().len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let (registry, oracle, orchestrator) = setup();
        orchestrator.fire_all().await.unwrap();
        let submitted = oracle.submitted();

        // Second benchmark answers first.
        let run = orchestrator.on_response(submitted[1].0, "[No]").unwrap();
        assert_eq!(run.prompt, submitted[1].1);
        orchestrator.on_response(submitted[0].0, "[No]").unwrap();

        let group = registry.group(0).unwrap();
        assert_eq!(group.runs[0].score, 100);
        assert_eq!(group.runs[1].score, 0);
        assert_eq!(group.score_sum, 100);
        assert_eq!(orchestrator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_response_is_rejected() {
        let (registry, oracle, orchestrator) = setup();
        orchestrator.fire_all().await.unwrap();
        let request_id = oracle.submitted()[0].0;

        orchestrator.on_response(request_id, "[Yes]").unwrap();
        let before = registry.group(0).unwrap();

        let err = orchestrator.on_response(request_id, "[Yes]").unwrap_err();
        assert!(matches!(err, DriftError::RequestNotFound(id) if id == request_id));
        assert_eq!(registry.group(0).unwrap(), before);

        assert!(orchestrator.on_response(RequestId(999), "[Yes]").is_err());
    }

    #[tokio::test]
    async fn test_score_sum_tracks_every_response() {
        let (registry, oracle, orchestrator) = setup();
        orchestrator.fire_all().await.unwrap();

        for (i, (request_id, _)) in oracle.submitted().into_iter().enumerate() {
            let before = registry.group(0).unwrap();
            let run = orchestrator.on_response(request_id, "[Yes]").unwrap();
            let after = registry.group(0).unwrap();

            assert_eq!(after.runs.len(), before.runs.len() + 1);
            assert_eq!(after.score_sum, before.score_sum + u64::from(run.score));
            assert_eq!(
                after.score_sum,
                after.runs.iter().map(|r| u64::from(r.score)).sum::<u64>()
            );
            assert_eq!(after.runs.len(), i + 1);
        }
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_delivery_has_one_winner() {
        let (registry, oracle, orchestrator) = setup();
        orchestrator.fire_all().await.unwrap();
        let request_id = oracle.submitted()[0].0;
        let orchestrator = Arc::new(orchestrator);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move { orchestrator.on_response(request_id, "[Yes]").is_ok() })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(registry.group(0).unwrap().runs.len(), 1);
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let (_registry, oracle, orchestrator) = setup();
        let mut events = orchestrator.subscribe();
        orchestrator.fire_all().await.unwrap();
        let request_id = oracle.submitted()[1].0;

        orchestrator.on_response(request_id, "[No]").unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(event.group_id, 0);
        assert_eq!(event.request_id, request_id);
        assert_eq!(event.run.score, 100);
        assert_eq!(event.score_sum, 100);
    }

    #[tokio::test]
    async fn test_resolver_drains_channel() {
        let (registry, oracle, orchestrator) = setup();
        orchestrator.fire_all().await.unwrap();
        let orchestrator = Arc::new(orchestrator);
        let (tx, rx) = mpsc::channel(8);

        for (request_id, _) in oracle.submitted() {
            tx.send(OracleResponse {
                request_id,
                content: "[Yes]".to_string(),
            })
            .await
            .unwrap();
        }
        // Unknown id is logged and skipped.
        tx.send(OracleResponse {
            request_id: RequestId(42),
            content: "[Yes]".to_string(),
        })
        .await
        .unwrap();
        drop(tx);

        let resolved = orchestrator
            .clone()
            .run_resolver(rx, CancellationToken::new())
            .await;

        assert_eq!(resolved, 2);
        assert_eq!(registry.group(0).unwrap().runs.len(), 2);
    }

    #[tokio::test]
    async fn test_resolver_stops_on_cancel() {
        let (_registry, _oracle, orchestrator) = setup();
        let (_tx, rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let resolved = Arc::new(orchestrator).run_resolver(rx, cancel).await;
        assert_eq!(resolved, 0);
    }
}
