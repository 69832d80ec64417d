/// Draft listing and discard command handlers
use anyhow::Result;
use chrono::{DateTime, Utc};
use fieldsync_storage::{DraftDailyLog, DraftExpense, DraftTimeEntry, Partition, PendingPhoto};
use tabled::{Table, Tabled};

use super::helpers::{truncate_str, App};

#[derive(Tabled)]
struct DraftRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Summary")]
    summary: String,
}

fn row(
    kind: &'static str,
    id: String,
    project: String,
    at: DateTime<Utc>,
    summary: &str,
) -> DraftRow {
    DraftRow {
        kind,
        id,
        project,
        created: at.format("%Y-%m-%d %H:%M").to_string(),
        summary: truncate_str(summary, 40),
    }
}

async fn collect_rows(app: &App, partition: Partition) -> Result<Vec<DraftRow>> {
    let rows = match partition {
        Partition::TimeEntries => app
            .drafts
            .get_all::<DraftTimeEntry>()
            .await?
            .into_iter()
            .map(|e| {
                let located = if e.location.is_some() {
                    "with location"
                } else {
                    "no location"
                };
                let summary = e.notes.clone().unwrap_or_else(|| located.to_string());
                row("time", e.id, e.project_id, e.clock_in, &summary)
            })
            .collect(),
        Partition::Expenses => app
            .drafts
            .get_all::<DraftExpense>()
            .await?
            .into_iter()
            .map(|e| {
                let summary = format!("{} {:.2} {}", e.category, e.amount, e.description);
                row("expense", e.id, e.project_id, e.timestamp, &summary)
            })
            .collect(),
        Partition::DailyLogs => app
            .drafts
            .get_all::<DraftDailyLog>()
            .await?
            .into_iter()
            .map(|l| {
                let summary = format!("{}: {}", l.log_date, l.notes);
                row("log", l.id, l.project_id, l.created_at, &summary)
            })
            .collect(),
        Partition::PendingPhotos => app
            .drafts
            .get_all::<PendingPhoto>()
            .await?
            .into_iter()
            .map(|p| {
                let summary = p.caption.clone().unwrap_or_else(|| p.file_name.clone());
                row("photo", p.id, p.project_id, p.queued_at, &summary)
            })
            .collect(),
        Partition::SiteCoordinates | Partition::UploadCheckpoints => Vec::new(),
    };
    Ok(rows)
}

pub async fn handle_list(kind: Option<String>) -> Result<()> {
    let app = App::open()?;

    let partitions: Vec<Partition> = match kind {
        Some(kind) => vec![kind.parse()?],
        None => Partition::ALL.into_iter().filter(Partition::is_draft).collect(),
    };

    let mut rows = Vec::new();
    for partition in partitions {
        rows.extend(collect_rows(&app, partition).await?);
    }

    if rows.is_empty() {
        println!("No drafts queued.");
        return Ok(());
    }

    println!("{}", Table::new(&rows));
    Ok(())
}

pub async fn handle_discard(kind: &str, id: &str) -> Result<()> {
    let app = App::open()?;
    let partition: Partition = kind.parse()?;

    if app.drafts.discard(partition, id).await? {
        app.orchestrator.refresh_pending().await?;
        println!("Discarded {partition}/{id}");
    } else {
        println!("No draft {partition}/{id}");
    }
    Ok(())
}
