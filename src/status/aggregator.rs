//! Deadline-bounded fan-out over status probes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

use crate::observability::metrics;
use crate::status::probe::StatusProbe;

/// What one probe contributed to an aggregated status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Completed { status: String },
    Failed { error: String },
    TimedOut,
}

impl ProbeOutcome {
    fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Completed { .. } => "completed",
            ProbeOutcome::Failed { .. } => "failed",
            ProbeOutcome::TimedOut => "timed_out",
        }
    }
}

/// Merged view over every probe for one reference id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedStatus {
    pub reference_id: String,
    /// True when at least one probe missed the deadline.
    pub partial: bool,
    /// Outcomes keyed by probe name.
    pub sources: BTreeMap<String, ProbeOutcome>,
}

/// A running probe and the slot its result belongs to.
///
/// Aborts the task when dropped, so no probe outlives its aggregation.
struct ProbeTask {
    name: String,
    handle: JoinHandle<ProbeOutcome>,
}

impl Drop for ProbeTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Run every probe concurrently and collect what finishes before `deadline`.
///
/// A failing probe does not cancel its siblings. Probes still running at the
/// deadline are cancelled and reported as [`ProbeOutcome::TimedOut`].
pub async fn aggregate(
    reference_id: &str,
    probes: &[Arc<dyn StatusProbe>],
    deadline: Instant,
) -> AggregatedStatus {
    let started = Instant::now();

    let mut tasks: Vec<ProbeTask> = probes
        .iter()
        .map(|probe| {
            let probe = Arc::clone(probe);
            let reference = reference_id.to_string();
            ProbeTask {
                name: probe.name().to_string(),
                handle: tokio::spawn(async move {
                    match probe.fetch(&reference).await {
                        Ok(status) => ProbeOutcome::Completed { status },
                        Err(e) => ProbeOutcome::Failed {
                            error: e.to_string(),
                        },
                    }
                }),
            }
        })
        .collect();

    let mut sources = BTreeMap::new();
    for task in &mut tasks {
        let outcome = match timeout_at(deadline, &mut task.handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => {
                tracing::error!(probe = %task.name, error = %join_error, "Status probe task failed");
                ProbeOutcome::Failed {
                    error: "probe aborted".to_string(),
                }
            }
            Err(_) => ProbeOutcome::TimedOut,
        };

        match &outcome {
            ProbeOutcome::Failed { error } => {
                tracing::warn!(probe = %task.name, reference_id, error = %error, "Status probe failed");
            }
            ProbeOutcome::TimedOut => {
                tracing::warn!(probe = %task.name, reference_id, "Status probe missed the deadline");
            }
            ProbeOutcome::Completed { .. } => {}
        }
        metrics::record_probe_result(&task.name, outcome.label());
        sources.insert(task.name.clone(), outcome);
    }
    // Dropping the tasks aborts anything still running.
    drop(tasks);

    let partial = sources.values().any(|o| *o == ProbeOutcome::TimedOut);
    metrics::record_status_duration(started.elapsed(), partial);

    AggregatedStatus {
        reference_id: reference_id.to_string(),
        partial,
        sources,
    }
}
