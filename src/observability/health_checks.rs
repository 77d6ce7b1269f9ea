//! Health check functionality module.
//!
//! This module provides:
//! - Bot token shape validation
//! - Question bank root availability
//! - Session store occupancy for the readiness report

use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::quiz::QuizSessionStore;

/// Dependencies inspected by `/health/ready`
#[derive(Debug, Clone)]
pub struct ReadinessContext {
    pub bot_token: String,
    pub quiz_root: PathBuf,
    pub store: Arc<QuizSessionStore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCounts {
    pub dispatching: usize,
    pub active: usize,
    pub awaiting_reveal: usize,
    pub tickets: usize,
}

/// JSON body of the readiness probe
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    pub checks: Vec<CheckResult>,
    pub sessions: SessionCounts,
}

fn check(name: &'static str, result: Result<()>) -> CheckResult {
    match result {
        Ok(()) => CheckResult {
            name,
            ok: true,
            detail: None,
        },
        Err(e) => CheckResult {
            name,
            ok: false,
            detail: Some(e.to_string()),
        },
    }
}

/// Run every readiness check and collect session counts
pub fn perform_readiness_checks(ctx: &ReadinessContext) -> ReadinessReport {
    let checks = vec![
        check("telegram_bot", check_bot_token_health(&ctx.bot_token)),
        check("quiz_root", check_quiz_root_health(&ctx.quiz_root)),
    ];
    let stats = ctx.store.stats();

    ReadinessReport {
        ready: checks.iter().all(|c| c.ok),
        checks,
        sessions: SessionCounts {
            dispatching: stats.dispatching,
            active: stats.active,
            awaiting_reveal: stats.awaiting_reveal,
            tickets: stats.tickets,
        },
    }
}

/// Check Telegram bot token shape (`<numeric id>:<secret>`)
pub fn check_bot_token_health(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(anyhow::anyhow!("Bot token is empty"));
    }

    let (id, secret) = token
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("Bot token format is invalid"))?;
    if id.parse::<u64>().is_err() || secret.is_empty() {
        return Err(anyhow::anyhow!("Bot token format is invalid"));
    }

    tracing::debug!("Bot token health check passed");
    Ok(())
}

/// Check that the question bank root is a readable directory
pub fn check_quiz_root_health(root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(root)
        .map_err(|e| anyhow::anyhow!("Quiz root {} unavailable: {}", root.display(), e))?;
    if !metadata.is_dir() {
        return Err(anyhow::anyhow!("Quiz root {} is not a directory", root.display()));
    }
    std::fs::read_dir(root)
        .map_err(|e| anyhow::anyhow!("Quiz root {} unreadable: {}", root.display(), e))?;

    tracing::debug!("Quiz root health check passed");
    Ok(())
}

/// Periodically record health check results and session gauges until cancelled
pub fn start_health_metrics_recorder(
    ctx: ReadinessContext,
    every: Duration,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }

            let started = Instant::now();
            let bot_healthy = check_bot_token_health(&ctx.bot_token).is_ok();
            super::metrics::record_health_check_metrics(
                "telegram_bot",
                bot_healthy,
                started.elapsed(),
            );

            let started = Instant::now();
            let root_healthy = check_quiz_root_health(&ctx.quiz_root).is_ok();
            super::metrics::record_health_check_metrics(
                "quiz_root",
                root_healthy,
                started.elapsed(),
            );

            let stats = ctx.store.stats();
            super::metrics::set_active_sessions(stats.sessions(), stats.tickets);
        }
    })
}
