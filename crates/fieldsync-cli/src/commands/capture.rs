/// Draft capture command handlers (clock-in, expense, daily log, photo)
use anyhow::{Context, Result};
use chrono::NaiveDate;
use fieldsync_core::{
    ClockInError, ClockInService, FixedPositionProvider, GeofenceChecker, Position,
    PositionProvider, UnavailablePositionProvider,
};
use fieldsync_storage::{DraftDailyLog, DraftExpense, PendingPhoto, Receipt, WeatherData};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::helpers::{read_attachment, App};

/// Device position supplied on the command line
pub struct PositionArgs {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: f64,
}

pub struct ExpenseArgs {
    pub project: String,
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub receipt: Option<PathBuf>,
    pub mileage: Option<f64>,
    pub cost_code: Option<String>,
}

pub struct DailyLogArgs {
    pub project: String,
    pub date: Option<String>,
    pub notes: String,
    pub conditions: Option<String>,
    pub temperature: Option<f64>,
    pub wind: Option<String>,
    pub photos: Vec<String>,
}

fn position_provider(app: &App, args: &PositionArgs) -> Arc<dyn PositionProvider> {
    match (args.latitude, args.longitude) {
        (Some(latitude), Some(longitude)) => Arc::new(FixedPositionProvider::new(Position {
            latitude,
            longitude,
            accuracy_meters: args.accuracy,
            timestamp: app.clock.now(),
        })),
        _ => Arc::new(UnavailablePositionProvider),
    }
}

/// After a draft is queued, sync right away when the remote is reachable
async fn sync_if_online(app: &App) {
    if let Err(e) = app.orchestrator.refresh_pending().await {
        log::warn!("Failed to count pending drafts: {e}");
    }
    if app.detect_connectivity().await {
        app.orchestrator.drain().await;
    }
    println!("Pending drafts: {}", app.orchestrator.status().pending);
}

pub async fn handle_clock_in(
    project: &str,
    notes: Option<String>,
    position: &PositionArgs,
) -> Result<()> {
    let app = App::open()?;
    let geofence = GeofenceChecker::new(
        position_provider(&app, position),
        app.drafts.clone(),
        app.clock.clone(),
    );
    let service = ClockInService::new(
        app.drafts.clone(),
        geofence,
        app.orchestrator.clone(),
        app.clock.clone(),
    );

    match service.clock_in(project, notes).await {
        Ok(outcome) => {
            println!("Clocked in to {project} at {}", outcome.entry.clock_in.format("%H:%M"));
            if let Some(warning) = outcome.warning {
                println!("  Warning: {warning}");
            } else if let Some(check) = outcome.geofence.filter(|g| !g.is_unchecked()) {
                println!(
                    "  {:.0}m from site (allowed {:.0}m)",
                    check.distance_meters, check.radius_meters
                );
            }
        }
        Err(ClockInError::OutsideGeofence {
            distance_meters,
            radius_meters,
        }) => {
            println!(
                "Clock-in refused: {distance_meters:.0}m from site (allowed {radius_meters:.0}m)"
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    sync_if_online(&app).await;
    Ok(())
}

pub async fn handle_expense(args: ExpenseArgs) -> Result<()> {
    let app = App::open()?;

    let mut expense = DraftExpense::new(
        args.project,
        args.category,
        args.amount,
        args.description,
        app.clock.now(),
    );
    if let Some(path) = args.receipt {
        let (file_name, content_type, data) = read_attachment(&path)?;
        expense = expense.with_receipt(Receipt {
            file_name,
            content_type,
            data,
        });
    }
    if let Some(mileage) = args.mileage {
        expense = expense.with_mileage(mileage);
    }
    if let Some(cost_code) = args.cost_code {
        expense = expense.with_cost_code(cost_code);
    }

    app.drafts.put(&expense).await?;
    println!("Queued expense {} ({:.2})", expense.id, expense.amount);

    sync_if_online(&app).await;
    Ok(())
}

pub async fn handle_daily_log(args: DailyLogArgs) -> Result<()> {
    let app = App::open()?;
    let now = app.clock.now();

    let log_date = match args.date {
        Some(date) => NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("Invalid date: {date}. Use YYYY-MM-DD"))?,
        None => now.date_naive(),
    };

    let mut daily_log = DraftDailyLog::new(args.project, log_date, args.notes, now);
    if args.conditions.is_some() || args.temperature.is_some() || args.wind.is_some() {
        daily_log.weather = Some(WeatherData {
            conditions: args.conditions,
            temperature_c: args.temperature,
            wind: args.wind,
        });
    }
    daily_log.photo_ids = args.photos;

    app.drafts.put(&daily_log).await?;
    println!("Saved daily log {} for {log_date}", daily_log.id);
    Ok(())
}

pub async fn handle_photo(
    project: String,
    file: &Path,
    album: Option<String>,
    caption: Option<String>,
) -> Result<()> {
    let app = App::open()?;
    let (file_name, content_type, payload) = read_attachment(file)?;

    let mut photo = PendingPhoto::new(project, file_name, content_type, payload, app.clock.now());
    photo.album_id = album;
    photo.caption = caption;

    app.drafts.put(&photo).await?;
    println!("Queued photo {} ({} bytes)", photo.id, photo.payload.len());

    sync_if_online(&app).await;
    Ok(())
}
