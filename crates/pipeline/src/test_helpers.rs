//! Shared test helpers for pipeline tests.

use churnguard_core::error::ProviderError;
use churnguard_core::message::{Message, Role};
use churnguard_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

pub const SAMPLE_ASSESSMENT: &str = r#"{"churnProbability":0.82,"riskLevel":"Critical","topFactors":[{"factor":"Tenure","weight":0.4}],"recommendation":"Offer retention bundle","reasoning":"x","modelComparison":[{"name":"XGBoost","score":0.84}]}"#;

pub const LOW_RISK_ASSESSMENT: &str = r#"{"churnProbability":0.12,"riskLevel":"Low","topFactors":[],"recommendation":"No action","reasoning":"Long tenure on a two year contract","modelComparison":[{"name":"Logistic Regression","score":0.77},{"name":"Random Forest","score":0.8},{"name":"XGBoost","score":0.84}]}"#;

/// A mock provider that replays scripted outcomes in call order.
///
/// Panics if more calls are made than outcomes provided.
pub struct ScriptedProvider {
    outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(Ok(text)) => Ok(make_text_response(&text)),
            Some(Err(e)) => Err(e),
            None => panic!("ScriptedProvider: no more responses"),
        }
    }
}

/// A mock provider whose calls block until the test releases them.
///
/// Call `n` waits on gate `n`; tests decide the order in which responses
/// arrive. A dropped gate surfaces as a network error.
pub struct GatedProvider {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<String, ProviderError>>>>,
    taken: AtomicUsize,
    active: AtomicUsize,
}

pub type Gate = oneshot::Sender<Result<String, ProviderError>>;

impl GatedProvider {
    pub fn new(calls: usize) -> (Self, Vec<Gate>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) =
            (0..calls).map(|_| oneshot::channel()).unzip();
        (
            Self {
                gates: Mutex::new(receivers),
                taken: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
            },
            senders,
        )
    }

    /// How many calls have reached their gate.
    pub fn taken(&self) -> usize {
        self.taken.load(Ordering::SeqCst)
    }

    /// How many calls are waiting on their gate right now. A call stops
    /// counting once it returns or its future is dropped.
    pub fn in_flight(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct ActiveCall<'a>(&'a AtomicUsize);

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl Provider for GatedProvider {
    fn name(&self) -> &str {
        "gated_mock"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .pop_front()
            .expect("GatedProvider: no more gates");
        self.taken.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_add(1, Ordering::SeqCst);
        let _active = ActiveCall(&self.active);
        match gate.await {
            Ok(Ok(text)) => Ok(make_text_response(&text)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ProviderError::Network("gate closed".into())),
        }
    }
}

/// Create a simple text response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A request without its per-message ids and timestamps.
pub fn request_shape(request: &ProviderRequest) -> (String, Vec<(Role, String)>, Option<u32>) {
    (
        request.model.clone(),
        request
            .messages
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect(),
        request.max_tokens,
    )
}
