//! Pipeline state: the single current-result cell of one pipeline.
//!
//! State machine:
//!
//! ```text
//! Idle ──begin──▶ Pending ──settle──▶ Resolved | Failed
//!                    ▲                       │
//!                    └───────begin───────────┘
//! ```
//!
//! Every `begin` stamps a new sequence number. `settle` applies a result
//! only while its sequence is still the latest and the cell is still
//! pending; anything else is a stale result and is discarded. The stamp
//! comparison and the write happen inside one `send_if_modified` closure,
//! so check-and-apply cannot interleave with another writer.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use churnguard_core::error::PipelineError;
use tokio::sync::watch;
use tracing::{info, warn};

/// Where a pipeline is in its lifecycle.
#[derive(Debug, Clone)]
pub enum PipelineState<O> {
    /// Nothing has been requested yet.
    Idle,
    /// An invocation is in flight.
    Pending { started_at: DateTime<Utc> },
    /// The latest invocation produced a result.
    Resolved { result: O, resolved_at: DateTime<Utc> },
    /// The latest invocation failed. Any earlier result is gone.
    Failed {
        error: PipelineError,
        failed_at: DateTime<Utc>,
    },
}

/// A point-in-time view of a pipeline's state.
#[derive(Debug, Clone)]
pub struct Snapshot<O> {
    /// Sequence number of the latest invocation; 0 before the first.
    pub sequence: u64,
    pub state: PipelineState<O>,
}

impl<O> Snapshot<O> {
    pub fn is_loading(&self) -> bool {
        matches!(self.state, PipelineState::Pending { .. })
    }

    pub fn result(&self) -> Option<&O> {
        match &self.state {
            PipelineState::Resolved { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match &self.state {
            PipelineState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Short state name for logs and views.
    pub fn status(&self) -> &'static str {
        match self.state {
            PipelineState::Idle => "idle",
            PipelineState::Pending { .. } => "pending",
            PipelineState::Resolved { .. } => "resolved",
            PipelineState::Failed { .. } => "failed",
        }
    }
}

/// What happened to a finished invocation's result.
#[derive(Debug, Clone)]
pub enum Outcome<O> {
    /// The result became the pipeline's current state.
    Applied {
        sequence: u64,
        result: Result<O, PipelineError>,
    },
    /// A newer invocation had started, or the invocation was cancelled; the
    /// result was discarded.
    Stale {
        sequence: u64,
        result: Result<O, PipelineError>,
    },
}

impl<O> Outcome<O> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied { .. })
    }

    pub fn sequence(&self) -> u64 {
        match self {
            Outcome::Applied { sequence, .. } | Outcome::Stale { sequence, .. } => *sequence,
        }
    }

    pub fn into_result(self) -> Result<O, PipelineError> {
        match self {
            Outcome::Applied { result, .. } | Outcome::Stale { result, .. } => result,
        }
    }
}

/// Single writer of one pipeline's state cell.
pub struct Orchestrator<O> {
    name: &'static str,
    tx: watch::Sender<Snapshot<O>>,
    last_issued: AtomicU64,
}

impl<O: Clone + Send + Sync + 'static> Orchestrator<O> {
    pub fn new(name: &'static str) -> Self {
        let (tx, _) = watch::channel(Snapshot {
            sequence: 0,
            state: PipelineState::Idle,
        });
        Self {
            name,
            tx,
            last_issued: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Start a new invocation and move to `Pending`. Returns its sequence number.
    pub fn begin(&self) -> u64 {
        let sequence = self.last_issued.fetch_add(1, Ordering::SeqCst) + 1;
        let started = self.tx.send_if_modified(|snapshot| {
            if sequence <= snapshot.sequence {
                return false;
            }
            snapshot.sequence = sequence;
            snapshot.state = PipelineState::Pending {
                started_at: Utc::now(),
            };
            true
        });
        if started {
            info!(pipeline = self.name, sequence, "Pipeline pending");
        }
        sequence
    }

    /// Apply `result` if `sequence` is still the current, pending invocation.
    pub fn settle(&self, sequence: u64, result: Result<O, PipelineError>) -> Outcome<O> {
        let mut slot = Some(result);
        let applied = self.tx.send_if_modified(|snapshot| {
            if snapshot.sequence != sequence || !snapshot.is_loading() {
                return false;
            }
            let now = Utc::now();
            snapshot.state = match slot.as_ref() {
                Some(Ok(value)) => PipelineState::Resolved {
                    result: value.clone(),
                    resolved_at: now,
                },
                Some(Err(error)) => PipelineState::Failed {
                    error: error.clone(),
                    failed_at: now,
                },
                None => return false,
            };
            true
        });

        let result = slot.take().unwrap_or(Err(PipelineError::Cancelled));
        if applied {
            match &result {
                Ok(_) => info!(pipeline = self.name, sequence, "Pipeline resolved"),
                Err(e) => warn!(pipeline = self.name, sequence, error = %e, "Pipeline failed"),
            }
            Outcome::Applied { sequence, result }
        } else {
            warn!(
                pipeline = self.name,
                sequence,
                current = self.tx.borrow().sequence,
                "Discarding stale pipeline result"
            );
            Outcome::Stale { sequence, result }
        }
    }

    /// Fail the current invocation with `Cancelled` if it is still pending.
    pub fn cancel_current(&self) -> bool {
        let current = self.tx.borrow().sequence;
        self.settle(current, Err(PipelineError::Cancelled))
            .is_applied()
    }

    /// The current state.
    pub fn snapshot(&self) -> Snapshot<O> {
        self.tx.borrow().clone()
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<O>> {
        self.tx.subscribe()
    }
}
