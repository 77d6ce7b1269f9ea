//! Idle session eviction.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::store::QuizSessionStore;
use crate::observability::metrics;

/// Retire sessions idle for longer than `idle_timeout`; returns how many went
pub fn sweep_once(
    store: &QuizSessionStore,
    now: DateTime<Utc>,
    idle_timeout: chrono::Duration,
) -> usize {
    let swept = store.sweep_idle(now, idle_timeout);
    for session in &swept {
        debug!(
            session_id = session.id,
            owner_id = session.owner_id,
            phase = session.phase.as_str(),
            pending = session.pending.len(),
            "Idle quiz session expired"
        );
    }

    if !swept.is_empty() {
        info!(count = swept.len(), "Expired idle quiz sessions");
        metrics::record_sessions_swept(swept.len());
    }
    let stats = store.stats();
    metrics::set_active_sessions(stats.sessions(), stats.tickets);
    swept.len()
}

/// Run [`sweep_once`] every `interval` until `shutdown` is cancelled
pub fn spawn_idle_sweeper(
    store: Arc<QuizSessionStore>,
    idle_timeout: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let idle_timeout = chrono::Duration::from_std(idle_timeout).unwrap_or(chrono::Duration::MAX);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Idle sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    sweep_once(&store, Utc::now(), idle_timeout);
                }
            }
        }
    })
}
