/// Sync command handlers (status, manual drain, watch)
use anyhow::Result;
use fieldsync_core::{spawn_reachability_probe, DrainOutcome, SkipReason, SyncStatus};
use fieldsync_remote::{RemoteSubmitter, SyncReport};
use fieldsync_storage::Partition;
use std::sync::Arc;
use tabled::{Table, Tabled};

use super::helpers::App;

#[derive(Tabled)]
struct PendingRow {
    #[tabled(rename = "Partition")]
    partition: String,
    #[tabled(rename = "Queued")]
    queued: usize,
    #[tabled(rename = "Drained")]
    drained: &'static str,
}

pub async fn handle_status() -> Result<()> {
    let app = App::open()?;

    let mut rows = Vec::new();
    for partition in Partition::ALL.into_iter().filter(Partition::is_draft) {
        rows.push(PendingRow {
            partition: partition.to_string(),
            queued: app.drafts.raw().count(partition).await?,
            drained: if Partition::DRAINABLE.contains(&partition) {
                "yes"
            } else {
                "no"
            },
        });
    }

    let pending = app.orchestrator.refresh_pending().await?;
    println!("{}", Table::new(&rows));
    println!("Pending sync: {pending}");

    match app.config.api_url.as_deref() {
        Some(url) => {
            let online = app.detect_connectivity().await;
            println!("Remote: {url} ({})", if online { "reachable" } else { "unreachable" });
        }
        None => println!("Remote: not configured"),
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.is_complete_success() {
        println!("Synced all {} records", report.successful);
        return;
    }

    println!(
        "Synced {}/{} records ({} failed)",
        report.successful, report.total_entries, report.failed
    );
    for error in &report.errors {
        println!("  - {error}");
    }
}

pub async fn handle_sync() -> Result<()> {
    let app = App::open()?;

    if !app.detect_connectivity().await {
        println!("Remote {} is unreachable; drafts stay queued", app.remote.system_name());
        return Ok(());
    }

    match app.orchestrator.drain().await {
        DrainOutcome::Completed(report) => print_report(&report),
        DrainOutcome::Skipped(SkipReason::NothingPending) => println!("Nothing to sync."),
        DrainOutcome::Skipped(reason) => println!("Sync skipped: {reason:?}"),
    }

    let remaining = app.orchestrator.status().pending;
    if remaining > 0 {
        println!("{remaining} records still queued; they will retry on the next sync");
    }
    Ok(())
}

fn describe(status: &SyncStatus) -> String {
    let state = if status.syncing { "syncing" } else { "idle" };
    let last = status
        .last_sync_at
        .map_or_else(|| "never".to_string(), |t| t.format("%H:%M:%S").to_string());
    format!(
        "[{state}] pending={} last_sync={last} errors={}",
        status.pending,
        status.errors.len()
    )
}

pub async fn handle_watch() -> Result<()> {
    let app = App::open()?;
    app.orchestrator.refresh_pending().await?;

    let _subscription = app.orchestrator.subscribe(|status| {
        println!("{}", describe(status));
    });

    let probe = spawn_reachability_probe(
        app.connectivity.clone(),
        app.remote.clone() as Arc<dyn RemoteSubmitter>,
        app.config.probe_interval(),
    );

    println!("Watching connectivity (Ctrl+C to stop)");
    app.orchestrator
        .run_auto_sync(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl+C: {e}");
            }
        })
        .await;

    probe.abort();
    Ok(())
}
