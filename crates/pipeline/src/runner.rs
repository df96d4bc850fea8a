//! Pipeline runner: a schema-constrained call bound to its state cell.
//!
//! Two ways to invoke:
//!
//! - [`PipelineRunner::run`] is driven by the caller's future. Dropping the
//!   future cancels the invocation.
//! - [`PipelineRunner::submit`] spawns the invocation in the background.
//!
//! Both share one in-flight slot. Starting an invocation either way stops
//! the previous one, so at most one request per pipeline is outstanding,
//! and a result lands in the orchestrator only if it still belongs to the
//! latest invocation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use churnguard_core::error::PipelineError;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::call::SchemaConstrainedCall;
use crate::orchestrator::{Orchestrator, Outcome, Snapshot};
use crate::prompt::PromptTemplate;

/// The invocation currently allowed to reach the provider.
enum InFlight {
    /// Started by `submit`; stopped by aborting the task.
    Spawned(JoinHandle<()>),
    /// Started by `run`; stopped by signalling the caller's future.
    Awaited(oneshot::Sender<()>),
}

impl InFlight {
    fn is_active(&self) -> bool {
        match self {
            InFlight::Spawned(handle) => !handle.is_finished(),
            InFlight::Awaited(stop) => !stop.is_closed(),
        }
    }

    fn stop(self) {
        match self {
            InFlight::Spawned(handle) => handle.abort(),
            InFlight::Awaited(stop) => {
                let _ = stop.send(());
            }
        }
    }
}

pub struct PipelineRunner<P: PromptTemplate> {
    call: Arc<SchemaConstrainedCall<P>>,
    orchestrator: Arc<Orchestrator<P::Output>>,
    in_flight: Mutex<Option<InFlight>>,
}

impl<P: PromptTemplate> PipelineRunner<P> {
    pub fn new(call: SchemaConstrainedCall<P>) -> Self {
        let name = call.prompt().name();
        Self {
            call: Arc::new(call),
            orchestrator: Arc::new(Orchestrator::new(name)),
            in_flight: Mutex::new(None),
        }
    }

    pub fn call(&self) -> &SchemaConstrainedCall<P> {
        &self.call
    }

    pub fn snapshot(&self) -> Snapshot<P::Output> {
        self.orchestrator.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot<P::Output>> {
        self.orchestrator.subscribe()
    }

    /// Invoke and wait, superseding any earlier invocation. The outcome says
    /// whether the result was applied; a run superseded before its response
    /// arrives ends as a stale `Cancelled`.
    pub async fn run(&self, input: P::Input) -> Outcome<P::Output> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let sequence = self.begin_superseding(|_| InFlight::Awaited(stop_tx));
        let guard = SettleOnDrop::new(Arc::clone(&self.orchestrator), sequence);

        let result = tokio::select! {
            result = self.call.invoke(&input) => result,
            _ = stop_rx => Err(PipelineError::Cancelled),
        };
        guard.finish(result)
    }

    /// Invoke in the background, superseding any earlier invocation.
    /// Returns the new invocation's sequence number.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, input: P::Input) -> u64 {
        let call = Arc::clone(&self.call);
        let orchestrator = Arc::clone(&self.orchestrator);
        self.begin_superseding(move |sequence| {
            // Created before spawning so an abort that lands before the
            // first poll still settles the invocation.
            let guard = SettleOnDrop::new(orchestrator, sequence);
            InFlight::Spawned(tokio::spawn(async move {
                execute(&call, guard, &input).await;
            }))
        })
    }

    /// Stop the in-flight invocation and fail the current one with
    /// `Cancelled` if it is still pending. Returns whether anything was
    /// cancelled.
    pub fn cancel(&self) -> bool {
        if let Some(previous) = self.lock_in_flight().take() {
            previous.stop();
        }
        let cancelled = self.orchestrator.cancel_current();
        if cancelled {
            info!(pipeline = self.call.prompt().name(), "Pipeline cancelled");
        }
        cancelled
    }

    /// Stamp a new invocation and stop the previous one. The slot lock is
    /// held across both so slot order always matches sequence order.
    fn begin_superseding(&self, start: impl FnOnce(u64) -> InFlight) -> u64 {
        let mut slot = self.lock_in_flight();
        let sequence = self.orchestrator.begin();
        if let Some(previous) = slot.replace(start(sequence)) {
            if previous.is_active() {
                debug!(pipeline = self.call.prompt().name(), sequence, "Superseding in-flight request");
            }
            previous.stop();
        }
        sequence
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: PromptTemplate> Drop for PipelineRunner<P> {
    fn drop(&mut self) {
        if let Some(previous) = self.lock_in_flight().take() {
            previous.stop();
        }
    }
}

/// Run one invocation to completion and settle it.
async fn execute<P: PromptTemplate>(
    call: &SchemaConstrainedCall<P>,
    guard: SettleOnDrop<P::Output>,
    input: &P::Input,
) -> Outcome<P::Output> {
    let result = call.invoke(input).await;
    guard.finish(result)
}

/// Settles an invocation as `Cancelled` if it is dropped before it
/// finishes, so the state cannot stay `Pending`.
struct SettleOnDrop<O: Clone + Send + Sync + 'static> {
    orchestrator: Arc<Orchestrator<O>>,
    sequence: u64,
    armed: bool,
}

impl<O: Clone + Send + Sync + 'static> SettleOnDrop<O> {
    fn new(orchestrator: Arc<Orchestrator<O>>, sequence: u64) -> Self {
        Self {
            orchestrator,
            sequence,
            armed: true,
        }
    }

    fn finish(mut self, result: Result<O, PipelineError>) -> Outcome<O> {
        self.armed = false;
        self.orchestrator.settle(self.sequence, result)
    }
}

impl<O: Clone + Send + Sync + 'static> Drop for SettleOnDrop<O> {
    fn drop(&mut self) {
        if self.armed {
            self.orchestrator
                .settle(self.sequence, Err(PipelineError::Cancelled));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::ModelSettings;
    use crate::orchestrator::PipelineState;
    use crate::prompt::{ChurnPrompt, PortfolioPrompt};
    use crate::test_helpers::*;
    use churnguard_core::assessment::{ChurnAssessment, RiskLevel};
    use churnguard_core::customer::CustomerRecord;
    use churnguard_core::error::{FailureKind, ProviderError};
    use churnguard_core::provider::Provider;
    use std::time::Duration;

    fn churn_runner(provider: Arc<dyn Provider>) -> PipelineRunner<ChurnPrompt> {
        PipelineRunner::new(SchemaConstrainedCall::new(
            provider,
            ChurnPrompt::default(),
            ModelSettings::new("gemini-3-pro-preview"),
        ))
    }

    fn customer(tenure_months: u32) -> CustomerRecord {
        CustomerRecord {
            tenure_months,
            ..CustomerRecord::default()
        }
    }

    async fn wait_until<F>(runner: &PipelineRunner<ChurnPrompt>, mut done: F)
    where
        F: FnMut(&Snapshot<ChurnAssessment>) -> bool,
    {
        let mut rx = runner.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| done(s)))
            .await
            .expect("state never reached")
            .expect("orchestrator dropped");
    }

    #[tokio::test]
    async fn run_resolves_and_clears_loading() {
        let runner = churn_runner(Arc::new(ScriptedProvider::text(SAMPLE_ASSESSMENT)));
        let outcome = runner.run(customer(12)).await;

        assert!(outcome.is_applied());
        let snapshot = runner.snapshot();
        assert!(!snapshot.is_loading());
        let assessment = snapshot.result().unwrap();
        assert_eq!(assessment.churn_probability, 0.82);
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
    }

    #[tokio::test]
    async fn transport_failure_settles_as_failed() {
        let runner = churn_runner(Arc::new(ScriptedProvider::failing(ProviderError::Network(
            "connection refused".into(),
        ))));
        runner.run(customer(12)).await;

        let snapshot = runner.snapshot();
        assert!(!snapshot.is_loading());
        assert!(snapshot.result().is_none());
        assert_eq!(
            snapshot.error().map(PipelineError::kind),
            Some(FailureKind::TransportFailure)
        );
    }

    #[tokio::test]
    async fn failure_after_success_drops_the_old_result() {
        let runner = churn_runner(Arc::new(ScriptedProvider::new(vec![
            Ok(SAMPLE_ASSESSMENT.into()),
            Ok("not json".into()),
        ])));
        runner.run(customer(12)).await;
        assert!(runner.snapshot().result().is_some());

        runner.run(customer(13)).await;
        let snapshot = runner.snapshot();
        assert!(snapshot.result().is_none());
        assert_eq!(
            snapshot.error().map(PipelineError::kind),
            Some(FailureKind::MalformedResponse)
        );
    }

    #[tokio::test]
    async fn overlapping_runs_keep_one_request_in_flight() {
        let (provider, gates) = GatedProvider::new(2);
        let provider = Arc::new(provider);
        let runner = churn_runner(provider.clone());
        let mut gates = gates.into_iter();
        let (gate_a, gate_b) = (gates.next().unwrap(), gates.next().unwrap());

        let driver = async {
            while provider.taken() < 2 {
                tokio::task::yield_now().await;
            }
            // A is stopped once B starts; give it a chance to unwind.
            for _ in 0..10 {
                if provider.in_flight() == 1 {
                    break;
                }
                tokio::task::yield_now().await;
            }
            assert_eq!(provider.in_flight(), 1);
            let _ = gate_a.send(Ok(SAMPLE_ASSESSMENT.into()));
            gate_b.send(Ok(LOW_RISK_ASSESSMENT.into())).unwrap();
        };

        let (a, b, ()) = tokio::join!(runner.run(customer(1)), runner.run(customer(60)), driver);

        assert!(!a.is_applied());
        assert_eq!(a.sequence(), 1);
        assert!(matches!(a.into_result(), Err(PipelineError::Cancelled)));
        assert!(b.is_applied());
        assert_eq!(b.sequence(), 2);

        let snapshot = runner.snapshot();
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.result().unwrap().risk_level, RiskLevel::Low);
        assert_eq!(provider.in_flight(), 0);
    }

    #[tokio::test]
    async fn submit_stops_a_pending_run() {
        let (provider, mut gates) = GatedProvider::new(2);
        let provider = Arc::new(provider);
        let runner = churn_runner(provider.clone());

        let driver = async {
            while provider.taken() < 1 {
                tokio::task::yield_now().await;
            }
            assert_eq!(runner.submit(customer(60)), 2);
            let gate_b = gates.pop().unwrap();
            gate_b.send(Ok(LOW_RISK_ASSESSMENT.into())).unwrap();
        };

        let (a, ()) = tokio::join!(runner.run(customer(1)), driver);
        assert!(!a.is_applied());
        assert!(matches!(a.into_result(), Err(PipelineError::Cancelled)));

        wait_until(&runner, |s| s.result().is_some()).await;
        assert_eq!(runner.snapshot().sequence, 2);
    }

    #[tokio::test]
    async fn invalid_record_fails_without_a_provider_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let runner = churn_runner(provider.clone());
        let record = CustomerRecord {
            monthly_charges: -500.0,
            total_charges: f64::NAN,
            ..CustomerRecord::default()
        };

        let outcome = runner.run(record).await;
        assert!(outcome.is_applied());
        assert_eq!(provider.calls(), 0);
        assert_eq!(
            runner.snapshot().error().map(PipelineError::kind),
            Some(FailureKind::InvalidInput)
        );
    }

    #[tokio::test]
    async fn submit_supersedes_the_in_flight_request() {
        let (provider, mut gates) = GatedProvider::new(2);
        let provider = Arc::new(provider);
        let runner = churn_runner(provider.clone());

        let first = runner.submit(customer(1));
        while provider.taken() < 1 {
            tokio::task::yield_now().await;
        }
        let second = runner.submit(customer(60));
        assert_eq!((first, second), (1, 2));

        let gate_b = gates.pop().unwrap();
        let gate_a = gates.pop().unwrap();
        gate_b.send(Ok(LOW_RISK_ASSESSMENT.into())).unwrap();
        wait_until(&runner, |s| s.result().is_some()).await;

        // The first task was aborted; its gate has no receiver left.
        tokio::task::yield_now().await;
        let _ = gate_a.send(Ok(SAMPLE_ASSESSMENT.into()));
        tokio::task::yield_now().await;

        let snapshot = runner.snapshot();
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.result().unwrap().risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn cancel_fails_the_pending_request() {
        let (provider, _gates) = GatedProvider::new(1);
        let runner = churn_runner(Arc::new(provider));

        runner.submit(customer(12));
        assert!(runner.snapshot().is_loading());

        assert!(runner.cancel());
        let snapshot = runner.snapshot();
        assert!(!snapshot.is_loading());
        assert!(matches!(
            snapshot.state,
            PipelineState::Failed {
                error: PipelineError::Cancelled,
                ..
            }
        ));
        assert!(!runner.cancel());
    }

    #[tokio::test]
    async fn dropping_a_run_future_does_not_leave_pending_state() {
        let (provider, _gates) = GatedProvider::new(1);
        let runner = churn_runner(Arc::new(provider));

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), runner.run(customer(12))).await;
        assert!(timed_out.is_err());

        let snapshot = runner.snapshot();
        assert!(!snapshot.is_loading());
        assert_eq!(
            snapshot.error().map(PipelineError::kind),
            Some(FailureKind::Cancelled)
        );
    }

    #[tokio::test]
    async fn dropping_the_runner_aborts_background_work() {
        let (provider, gates) = GatedProvider::new(1);
        let runner = churn_runner(Arc::new(provider));
        let mut rx = runner.subscribe();

        runner.submit(customer(12));
        drop(runner);

        let settled = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| !s.is_loading()),
        )
        .await
        .expect("task was not aborted")
        .map(|s| s.error().map(PipelineError::kind));
        assert_eq!(settled.ok().flatten(), Some(FailureKind::Cancelled));
        drop(gates);
    }

    #[tokio::test]
    async fn portfolio_runs_through_the_same_machinery() {
        let provider = Arc::new(ScriptedProvider::text(
            r##"{"sourceCode":"import xgboost as xgb","documentation":"# ChurnGuard-ML"}"##,
        ));
        let runner = PipelineRunner::new(SchemaConstrainedCall::new(
            provider.clone() as Arc<dyn Provider>,
            PortfolioPrompt::default(),
            ModelSettings::new("gemini-3-flash-preview"),
        ));

        assert!(runner.run(()).await.is_applied());
        let snapshot = runner.snapshot();
        assert_eq!(snapshot.result().unwrap().source_code, "import xgboost as xgb");
        assert_eq!(provider.requests()[0].model, "gemini-3-flash-preview");
    }
}
