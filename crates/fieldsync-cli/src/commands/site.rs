/// Job-site coordinate command handlers
use anyhow::Result;
use fieldsync_core::{FixedPositionProvider, GeofenceChecker, Position};
use fieldsync_storage::{CachedSiteCoordinate, DEFAULT_GEOFENCE_RADIUS_METERS};
use std::sync::Arc;

use super::helpers::App;

fn checker_at(app: &App, latitude: f64, longitude: f64, accuracy_meters: f64) -> GeofenceChecker {
    let provider = FixedPositionProvider::new(Position {
        latitude,
        longitude,
        accuracy_meters,
        timestamp: app.clock.now(),
    });
    GeofenceChecker::new(Arc::new(provider), app.drafts.clone(), app.clock.clone())
}

pub async fn handle_site_set(
    project: String,
    latitude: f64,
    longitude: f64,
    radius: Option<f64>,
) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        anyhow::bail!("Coordinates out of range: {latitude}, {longitude}");
    }
    if radius.is_some_and(|r| r <= 0.0) {
        anyhow::bail!("Radius must be positive");
    }

    let app = App::open()?;
    let site = CachedSiteCoordinate {
        project_id: project,
        latitude,
        longitude,
        radius_meters: radius,
    };
    checker_at(&app, latitude, longitude, 0.0)
        .cache_site_coordinate(&site)
        .await?;

    println!(
        "Cached site for {}: {latitude:.6}, {longitude:.6} (radius {:.0}m)",
        site.project_id,
        site.radius()
    );
    if radius.is_none() {
        println!("  Using default radius of {DEFAULT_GEOFENCE_RADIUS_METERS:.0}m");
    }
    Ok(())
}

pub async fn handle_site_check(
    project: &str,
    latitude: f64,
    longitude: f64,
    accuracy: f64,
) -> Result<()> {
    let app = App::open()?;
    let result = checker_at(&app, latitude, longitude, accuracy)
        .check_geofence(project)
        .await?;

    if result.is_unchecked() {
        println!("No site cached for {project}; clock-in would be allowed");
    } else if result.is_within {
        println!(
            "Inside geofence: {:.0}m from site (radius {:.0}m)",
            result.distance_meters, result.radius_meters
        );
    } else {
        println!(
            "Outside geofence: {:.0}m from site (radius {:.0}m)",
            result.distance_meters, result.radius_meters
        );
    }
    Ok(())
}
