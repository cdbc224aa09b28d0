#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the emergency incident monitor.
//!
//! Polls the ABC Emergency feed for every configured instance and prints
//! incident notifications to stdout as JSON lines.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use emergency_watch_config::{MonitorConfig, Settings, load_config};
use emergency_watch_coordinator::{
    Coordinator, Notification, NotificationSink, feed_from_settings,
};
use emergency_watch_feed::EmergencyFeed;
use emergency_watch_incident_models::CoordinatorData;
use emergency_watch_spatial::incident_geojson;
use tokio::time::MissedTickBehavior;

#[derive(Parser)]
#[command(name = "emergency_watch", about = "ABC Emergency incident monitor")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, global = true, default_value = "emergency_watch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll every instance on the configured interval until interrupted
    Poll,
    /// Poll every instance once and print the resulting snapshots
    Once {
        /// Print incident polygons as a `GeoJSON` feature collection instead
        #[arg(long)]
        geojson: bool,
    },
    /// Validate the configuration and list the configured instances
    Check,
    /// Delete the persisted seen-incident state of one instance
    Forget {
        /// Instance identifier (e.g., "home")
        instance: String,
    },
}

/// Writes each notification to stdout as one JSON line.
struct StdoutSink;

impl NotificationSink for StdoutSink {
    fn notify(&self, notification: Notification) {
        match serde_json::to_string(&notification) {
            Ok(line) => println!("{line}"),
            Err(e) => log::warn!("Failed to encode {} event: {e}", notification.event_type),
        }
    }
}

fn build_coordinators(settings: &Settings) -> Result<Vec<Coordinator>, Box<dyn std::error::Error>> {
    let feed: Arc<dyn EmergencyFeed> = Arc::new(feed_from_settings(settings)?);
    let sink: Arc<dyn NotificationSink> = Arc::new(StdoutSink);

    Ok(settings
        .instances
        .iter()
        .map(|instance| Coordinator::from_config(instance, settings, feed.clone(), sink.clone()))
        .collect())
}

async fn refresh_all(coordinators: &mut [Coordinator]) {
    for coordinator in coordinators {
        let id = coordinator.instance_id().to_string();
        match coordinator.refresh().await {
            Ok(data) => log_summary(&id, data),
            Err(e) => log::warn!("[{id}] Update failed: {e}"),
        }
    }
}

fn log_summary(id: &str, data: &CoordinatorData) {
    if !data.location_available {
        log::info!("[{id}] Location unavailable");
        return;
    }

    let highest = data.highest_alert_level.as_ref();
    match data.nearby_count {
        Some(nearby) => log::info!(
            "[{id}] {} incidents, {nearby} nearby, highest alert: {}{}",
            data.total_count,
            if highest.is_empty() { "none" } else { highest },
            if data.inside_polygon { " (inside warning area)" } else { "" },
        ),
        None => log::info!(
            "[{id}] {} incidents, highest alert: {}",
            data.total_count,
            if highest.is_empty() { "none" } else { highest },
        ),
    }
}

fn feature_collection(data: &CoordinatorData) -> geojson::FeatureCollection {
    let features = data
        .incidents
        .iter()
        .filter_map(|incident| {
            let geometry = incident_geojson(incident)?;
            let mut properties = serde_json::Map::new();
            properties.insert("headline".to_string(), incident.headline.clone().into());
            properties.insert("event_type".to_string(), incident.event_type.clone().into());
            properties.insert(
                "alert_level".to_string(),
                incident.alert_level.as_ref().to_string().into(),
            );
            properties.insert("contains_point".to_string(), incident.contains_point.into());

            Some(geojson::Feature {
                bbox: None,
                geometry: Some(geometry),
                id: Some(geojson::feature::Id::String(incident.id.clone())),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let settings = load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Poll) {
        Commands::Poll => {
            let mut coordinators = build_coordinators(&settings)?;
            if coordinators.is_empty() {
                log::warn!("No instances configured in {}", cli.config.display());
                return Ok(());
            }

            log::info!(
                "Polling {} instance(s) every {}s",
                coordinators.len(),
                settings.scan_interval_secs
            );

            let mut interval =
                tokio::time::interval(Duration::from_secs(settings.scan_interval_secs));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => refresh_all(&mut coordinators).await,
                    _ = tokio::signal::ctrl_c() => {
                        log::info!("Shutting down");
                        break;
                    }
                }
            }
        }
        Commands::Once { geojson } => {
            let mut coordinators = build_coordinators(&settings)?;
            for coordinator in &mut coordinators {
                let id = coordinator.instance_id().to_string();
                match coordinator.refresh().await {
                    Ok(data) if geojson => println!("{}", feature_collection(data)),
                    Ok(data) => println!("{}", serde_json::to_string_pretty(data)?),
                    Err(e) => log::error!("[{id}] Update failed: {e}"),
                }
            }
        }
        Commands::Check => {
            println!("{:<16} {:<8} NAME", "ID", "TYPE");
            println!("{}", "-".repeat(50));
            for instance in &settings.instances {
                let detail = match &instance.monitor {
                    MonitorConfig::State { state } => state.to_string(),
                    MonitorConfig::Zone {
                        latitude,
                        longitude,
                        radius_km,
                    } => format!("({latitude}, {longitude}) within {radius_km} km"),
                    MonitorConfig::Person {
                        location_file,
                        radius_km,
                    } => format!("{} within {radius_km} km", location_file.display()),
                };
                println!(
                    "{:<16} {:<8} {} [{detail}]",
                    instance.id,
                    instance.monitor.instance_type().as_ref(),
                    instance.name
                );
            }
            println!();
            println!(
                "Scan interval {}s, retention {} days, data in {}",
                settings.scan_interval_secs,
                settings.retention_days,
                settings.data_dir.display()
            );
        }
        Commands::Forget { instance } => {
            let Some(config) = settings.instance(&instance) else {
                return Err(format!("Unknown instance: {instance}").into());
            };
            let feed: Arc<dyn EmergencyFeed> = Arc::new(feed_from_settings(&settings)?);
            let mut coordinator = Coordinator::from_config(
                config,
                &settings,
                feed,
                Arc::new(emergency_watch_coordinator::NullSink),
            );
            coordinator.remove_storage().await?;
            log::info!("Removed seen-incident state for {instance}");
        }
    }

    Ok(())
}
