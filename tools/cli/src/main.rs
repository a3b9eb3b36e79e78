//! LiftSync CLI - Command line interface for backups and credentials.
//!
//! This tool drives the same sync, restore and sign-in operations the app
//! uses, against the configured local database and backup folder.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use liftsync_app::{AppConfig, LiftSync};
use liftsync_common::{Exercise, Secret, SnapshotData, TriggerReason, WorkoutSession, WorkoutTemplate};

#[derive(Parser)]
#[command(name = "liftsync")]
#[command(about = "LiftSync - Workout data backup and sync")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (default: platform config dir).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync if the trigger's throttle interval has elapsed.
    Sync {
        /// Trigger reason, e.g. "session_completed" or "template_modified".
        #[arg(short, long, default_value = "manual")]
        trigger: TriggerReason,
    },

    /// Upload a snapshot now, ignoring the throttle.
    ForceSync,

    /// List remote backups, newest first.
    Backups,

    /// Replace local data with a backup.
    Restore {
        /// Backup id (default: newest).
        #[arg(short, long)]
        id: Option<String>,
    },

    /// Delete one remote backup.
    DeleteBackup {
        /// Backup id.
        id: String,
    },

    /// Print a valid access token, refreshing it if needed.
    Token,

    /// Store credentials obtained from the sign-in flow.
    Login {
        #[arg(long)]
        access_token: String,

        #[arg(long)]
        refresh_token: Option<String>,

        /// Access token lifetime in seconds.
        #[arg(long, default_value_t = 3600)]
        expires_in: i64,
    },

    /// Forget stored credentials.
    Disconnect,

    /// Export all local data as JSON.
    Export {
        /// Output file (default: stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Import entities from an export or a backup file.
    Import {
        /// JSON file to import.
        file: PathBuf,
    },

    /// Show sync status and local entity counts.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let app = LiftSync::open(config).context("Failed to open LiftSync")?;

    match cli.command {
        Commands::Sync { trigger } => cmd_sync(&app, trigger).await,
        Commands::ForceSync => cmd_force_sync(&app).await,
        Commands::Backups => cmd_backups(&app).await,
        Commands::Restore { id } => cmd_restore(&app, id.as_deref()).await,
        Commands::DeleteBackup { id } => cmd_delete_backup(&app, &id).await,
        Commands::Token => cmd_token(&app).await,
        Commands::Login {
            access_token,
            refresh_token,
            expires_in,
        } => cmd_login(&app, access_token, refresh_token, expires_in).await,
        Commands::Disconnect => cmd_disconnect(&app).await,
        Commands::Export { out } => cmd_export(&app, out.as_deref()),
        Commands::Import { file } => cmd_import(&app, &file),
        Commands::Status => cmd_status(&app),
    }
}

/// Throttled sync for a trigger.
async fn cmd_sync(app: &LiftSync, trigger: TriggerReason) -> Result<()> {
    info!("Sync requested: {}", trigger);

    let report = app
        .coordinator()
        .sync_if_due(trigger)
        .await
        .context("Sync failed")?;

    match report {
        Some(report) => {
            println!("Backup uploaded: {}", report.remote_id);
            println!("  Entities: {}", report.entity_count);
            println!("  Rotated: {}", report.rotated);
        }
        None => println!(
            "Skipped: last sync is more recent than {} minutes",
            trigger.policy().min_interval_minutes
        ),
    }
    Ok(())
}

async fn cmd_force_sync(app: &LiftSync) -> Result<()> {
    let report = app.force_sync().await.context("Sync failed")?;
    println!("Backup uploaded: {}", report.remote_id);
    println!("  Entities: {}", report.entity_count);
    println!("  Rotated: {}", report.rotated);
    Ok(())
}

async fn cmd_backups(app: &LiftSync) -> Result<()> {
    let backups = app.list_backups().await.context("Failed to list backups")?;

    if backups.is_empty() {
        println!("No backups found.");
    } else {
        println!("Backups ({}):", backups.len());
        for backup in backups {
            println!(
                "  {}  {}  {}",
                backup.created_at.format("%Y-%m-%d %H:%M:%S"),
                backup.id,
                backup.name
            );
        }
    }
    Ok(())
}

async fn cmd_restore(app: &LiftSync, id: Option<&str>) -> Result<()> {
    let report = app.restore(id).await.context("Restore failed")?;
    println!("Restored from {}", report.remote_id);
    println!("  Exercises: {}", report.imported.exercises);
    println!("  Templates: {}", report.imported.templates);
    println!("  Workouts: {}", report.imported.workouts);
    Ok(())
}

async fn cmd_delete_backup(app: &LiftSync, id: &str) -> Result<()> {
    app.delete_backup(id)
        .await
        .with_context(|| format!("Failed to delete backup {}", id))?;
    println!("Backup deleted: {}", id);
    Ok(())
}

async fn cmd_token(app: &LiftSync) -> Result<()> {
    match app.get_valid_access_token().await.context("Token refresh failed")? {
        Some(token) => println!("{}", token.expose()),
        None => anyhow::bail!("Not signed in. Run `liftsync login` first."),
    }
    Ok(())
}

async fn cmd_login(
    app: &LiftSync,
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
) -> Result<()> {
    let restored = app
        .sign_in(
            Secret::new(access_token),
            refresh_token.map(Secret::new),
            chrono::Duration::seconds(expires_in),
        )
        .await
        .context("Sign-in failed")?;

    println!("Signed in as {}", app.user_id());
    if let Some(report) = restored {
        println!("Restored latest backup {}", report.remote_id);
    }
    Ok(())
}

async fn cmd_disconnect(app: &LiftSync) -> Result<()> {
    app.disconnect().await.context("Failed to disconnect")?;
    println!("Disconnected {}", app.user_id());
    Ok(())
}

fn cmd_export(app: &LiftSync, out: Option<&Path>) -> Result<()> {
    let data = app.export().context("Failed to export")?;
    let json = serde_json::to_string_pretty(&data)?;

    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Exported {} entities to {}",
                data.entity_count(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_import(app: &LiftSync, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content).context("Invalid JSON")?;
    let data = SnapshotData::from_payload_value(value).context("Unrecognized import format")?;

    let summary = app.import(&data).context("Import failed")?;
    println!("Imported:");
    println!("  Exercises: {}", summary.exercises);
    println!("  Templates: {}", summary.templates);
    println!("  Workouts: {}", summary.workouts);
    Ok(())
}

fn cmd_status(app: &LiftSync) -> Result<()> {
    let status = app.status().context("Failed to read sync status")?;
    let store = app.store();

    println!("LiftSync Status:");
    println!("  User: {}", app.user_id());
    match status.last_sync_time {
        Some(time) => println!("  Last sync: {}", time.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("  Last sync: never"),
    }
    if let Some(outcome) = status.last_sync_status {
        println!("  Last outcome: {:?}", outcome);
    }
    if let Some(id) = status.last_remote_id {
        println!("  Last backup: {}", id);
    }
    println!("  Exercises: {}", store.count::<Exercise>()?);
    println!("  Templates: {}", store.count::<WorkoutTemplate>()?);
    println!("  Workouts: {}", store.count::<WorkoutSession>()?);
    Ok(())
}
