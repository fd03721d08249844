mod api;
mod config;
mod errors;
mod models;
mod monitor;
mod notify;
mod pipeline;
mod source;

use api::ApiServer;
use chrono::Utc;
use config::Config;
use monitor::{Monitor, QueryParams};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_json);
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }

    let monitor = Arc::new(Monitor::from_config(config));

    tracing::info!(
        "lof-monitor starting: window [{}, {}], max {} items, {} display columns, push {}",
        monitor.config().dis_limit,
        monitor.config().pre_limit,
        monitor.config().max_items,
        monitor.config().content.columns().count(),
        if monitor.can_push() { "enabled" } else { "disabled" }
    );

    // ── Optional in-process schedule ───────────────────────────────
    match monitor.config().push_interval_secs {
        Some(secs) if monitor.can_push() => {
            spawn_push_loop(Arc::clone(&monitor), Duration::from_secs(secs));
        }
        Some(_) => tracing::warn!(
            "PUSH_INTERVAL_SECS is set but WECHAT_WEBHOOK_KEY is not; schedule disabled"
        ),
        None => {}
    }

    // ── HTTP API, runs until Ctrl+C ────────────────────────────────
    ApiServer::new(monitor).run().await
}

/// Filtering follows `RUST_LOG`.
fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Pushes with the configured defaults every `every`. Each tick stands alone:
/// a failed tick is logged and the next one runs as usual.
fn spawn_push_loop(monitor: Arc<Monitor>, every: Duration) {
    tracing::info!("scheduled push every {}s", every.as_secs());

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately; don't push on startup
        interval.tick().await;

        loop {
            interval.tick().await;
            match monitor.push(&QueryParams::default(), Utc::now()).await {
                Ok(report) => match report.response {
                    Some(reply) if reply.is_ok() => {
                        tracing::info!("scheduled push sent {} funds", report.records.len())
                    }
                    Some(reply) => tracing::warn!(
                        "scheduled push rejected: {} {}",
                        reply.errcode,
                        reply.errmsg
                    ),
                    None => tracing::info!("scheduled push skipped: no matching data"),
                },
                Err(e) => tracing::error!("scheduled push failed: {e}"),
            }
        }
    });
}
