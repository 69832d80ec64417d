mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::capture::{DailyLogArgs, ExpenseArgs, PositionArgs};

#[derive(Parser)]
#[command(name = "fieldsync")]
#[command(about = "Offline-first field data capture", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clock in to a project, checking the job-site geofence when a position is given
    ClockIn {
        /// Project ID
        project: String,
        /// Notes for the time entry
        #[arg(short, long)]
        notes: Option<String>,
        /// Device latitude
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Device longitude
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
        /// Reported fix accuracy in meters
        #[arg(long, default_value = "10")]
        accuracy: f64,
    },
    /// Queue an expense
    Expense {
        /// Project ID
        project: String,
        /// Category (materials, fuel, tools, ...)
        #[arg(short, long)]
        category: String,
        /// Amount
        #[arg(short, long)]
        amount: f64,
        /// Description
        #[arg(short, long)]
        description: String,
        /// Receipt image or PDF to attach
        #[arg(short, long)]
        receipt: Option<PathBuf>,
        /// Mileage driven
        #[arg(long)]
        mileage: Option<f64>,
        /// Cost code
        #[arg(long)]
        cost_code: Option<String>,
    },
    /// Save a daily log (kept locally, not synced)
    DailyLog {
        /// Project ID
        project: String,
        /// Notes for the day
        #[arg(short, long)]
        notes: String,
        /// Log date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Weather conditions
        #[arg(long)]
        conditions: Option<String>,
        /// Temperature in Celsius
        #[arg(long, allow_hyphen_values = true)]
        temperature: Option<f64>,
        /// Wind description
        #[arg(long)]
        wind: Option<String>,
        /// IDs of queued photos taken with this log
        #[arg(long = "photo")]
        photos: Vec<String>,
    },
    /// Queue a photo for upload
    Photo {
        /// Project ID
        project: String,
        /// Image file
        file: PathBuf,
        /// Album ID
        #[arg(long)]
        album: Option<String>,
        /// Caption
        #[arg(long)]
        caption: Option<String>,
    },
    /// Manage cached job-site coordinates
    Site {
        #[command(subcommand)]
        action: SiteAction,
    },
    /// List queued drafts
    Drafts {
        /// Only show one kind (time_entries, expenses, daily_logs, pending_photos)
        kind: Option<String>,
    },
    /// Discard a queued draft without submitting it
    Discard {
        /// Draft kind (time_entries, expenses, daily_logs, pending_photos)
        kind: String,
        /// Draft ID
        id: String,
    },
    /// Show queued counts and remote reachability
    Status,
    /// Drain the queue now if the remote is reachable
    Sync,
    /// Keep running and drain whenever connectivity returns
    Watch,
}

#[derive(Subcommand, Debug)]
enum SiteAction {
    /// Cache a project's site coordinate
    Set {
        /// Project ID
        project: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Geofence radius in meters (default 300)
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Check a position against a project's geofence
    Check {
        /// Project ID
        project: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, default_value = "10")]
        accuracy: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    match cli.command {
        Commands::ClockIn {
            project,
            notes,
            lat,
            lon,
            accuracy,
        } => {
            let position = PositionArgs {
                latitude: lat,
                longitude: lon,
                accuracy,
            };
            commands::capture::handle_clock_in(&project, notes, &position).await
        }
        Commands::Expense {
            project,
            category,
            amount,
            description,
            receipt,
            mileage,
            cost_code,
        } => {
            commands::capture::handle_expense(ExpenseArgs {
                project,
                category,
                amount,
                description,
                receipt,
                mileage,
                cost_code,
            })
            .await
        }
        Commands::DailyLog {
            project,
            notes,
            date,
            conditions,
            temperature,
            wind,
            photos,
        } => {
            commands::capture::handle_daily_log(DailyLogArgs {
                project,
                date,
                notes,
                conditions,
                temperature,
                wind,
                photos,
            })
            .await
        }
        Commands::Photo {
            project,
            file,
            album,
            caption,
        } => commands::capture::handle_photo(project, &file, album, caption).await,
        Commands::Site { action } => match action {
            SiteAction::Set {
                project,
                lat,
                lon,
                radius,
            } => commands::site::handle_site_set(project, lat, lon, radius).await,
            SiteAction::Check {
                project,
                lat,
                lon,
                accuracy,
            } => commands::site::handle_site_check(&project, lat, lon, accuracy).await,
        },
        Commands::Drafts { kind } => commands::drafts::handle_list(kind).await,
        Commands::Discard { kind, id } => commands::drafts::handle_discard(&kind, &id).await,
        Commands::Status => commands::sync::handle_status().await,
        Commands::Sync => commands::sync::handle_sync().await,
        Commands::Watch => commands::sync::handle_watch().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_clock_in_accepts_negative_longitude() {
        let cli = Cli::try_parse_from([
            "fieldsync", "clock-in", "p-1", "--lat", "30.0", "--lon", "-95.0",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::ClockIn { lon: Some(lon), .. } if (lon + 95.0).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn test_clock_in_requires_both_coordinates() {
        assert!(Cli::try_parse_from(["fieldsync", "clock-in", "p-1", "--lat", "30.0"]).is_err());
    }
}
