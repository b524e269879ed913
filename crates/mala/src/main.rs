//! Thin command-line surface over the session synchronization engine.

// This binary reports to stdout by design.
#![allow(clippy::print_stdout)]

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use mala::app::{App, AppEvent, mala_home};
use mala::domain::session::{self, TAPS_PER_CYCLE};
use mala::domain::settings::SettingKey;
use mala::infra::db::{DB_DIR, DB_FILE, Database};
use mala::infra::identity::{EnvIdentityProvider, IdentityProvider};
use mala::infra::remote::{HttpRemoteStore, OfflineRemoteStore, RemoteStore};

#[derive(Parser)]
#[command(name = "mala", version, about = "Daily japa counter with best-effort remote sync")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record taps for today.
    Tap {
        #[arg(default_value_t = 1)]
        count: u32,
    },
    /// Remove the most recent tap.
    Undo,
    /// Reset today's count to zero.
    Reset,
    /// Show today's progress and aggregate totals.
    Status,
    /// Re-fetch the session collection from the remote store.
    Sync,
    /// Read one settings value, or write it when VALUE is given.
    Config {
        key: String,
        value: Option<String>,
    },
    /// Write all settings and legacy counters to a backup document.
    Export {
        path: Option<PathBuf>,
    },
    /// Restore settings and legacy counters from a backup document.
    Import {
        path: PathBuf,
    },
    /// Delete every stored key and restore defaults.
    ResetAll {
        /// Confirms this irreversible operation.
        #[arg(long)]
        yes: bool,
    },
    /// Keep polling for settings changes made by other contexts.
    Watch,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let db_path = mala_home().join(DB_DIR).join(DB_FILE);
    let db = Database::open(&db_path).await.map_err(io::Error::other)?;

    let remote: Arc<dyn RemoteStore> = match HttpRemoteStore::try_from_env() {
        Ok(store) => Arc::new(store),
        Err(reason) => {
            tracing::info!(%reason, "running with local persistence only");

            Arc::new(OfflineRemoteStore)
        }
    };
    let identity: Arc<dyn IdentityProvider> = Arc::new(EnvIdentityProvider::from_env());

    let mut app = App::new(db, remote, identity).await;
    run_command(&mut app, cli.command)
        .await
        .map_err(io::Error::other)?;
    print_feedback(&mut app);

    Ok(())
}

async fn run_command(app: &mut App, command: Command) -> Result<(), String> {
    match command {
        Command::Tap { count } => {
            for _ in 0..count {
                app.tap().await?;
            }
            print_status(app);
        }
        Command::Undo => {
            app.undo().await?;
            print_status(app);
        }
        Command::Reset => {
            app.reset_today().await?;
            print_status(app);
        }
        Command::Status => {
            print_status(app);
        }
        Command::Sync => {
            app.refresh_sessions().await?;
            print_status(app);
        }
        Command::Config { key, value } => {
            let key: SettingKey = key.parse()?;

            if let Some(value) = value {
                app.set_setting(key, &normalize_json_value(&value)).await?;
            }
            println!("{} = {}", key.as_str(), app.setting_value(key));
        }
        Command::Export { path } => {
            let path = path.unwrap_or_else(|| {
                PathBuf::from(format!("mala-backup-{}.json", session::date_key(session::today())))
            });
            let document = app.export_backup().await?;
            tokio::fs::write(&path, document)
                .await
                .map_err(|err| format!("Failed to write backup file: {err}"))?;
            println!("backup written to {}", path.display());
        }
        Command::Import { path } => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|err| format!("Failed to read backup file: {err}"))?;
            app.import_backup(&raw).await.map_err(|err| err.to_string())?;
            println!("backup restored from {}", path.display());
        }
        Command::ResetAll { yes } => {
            if !yes {
                return Err(
                    "This irreversibly deletes all stored data; pass --yes to confirm".to_string(),
                );
            }
            app.reset_all_data().await?;
            println!("all data reset to defaults");
        }
        Command::Watch => {
            watch(app).await;
        }
    }

    Ok(())
}

/// Accepts either a JSON literal or a bare string for a settings value.
fn normalize_json_value(value: &str) -> String {
    if serde_json::from_str::<serde_json::Value>(value).is_ok() {
        value.to_string()
    } else {
        serde_json::Value::String(value.to_string()).to_string()
    }
}

async fn watch(app: &mut App) {
    let mut last_settings = app.settings.settings.clone();

    loop {
        tokio::time::sleep(Duration::from_millis(250)).await;

        if app.poll_watcher().await && app.settings.settings != last_settings {
            last_settings = app.settings.settings.clone();
            println!(
                "settings changed elsewhere (daily goal: {} japs)",
                last_settings.daily_target
            );
        }

        // Watch mode has no user transitions; drop feedback noise.
        while app.try_next_event().is_some() {}
    }
}

fn print_status(app: &App) {
    let date = app.counter.date();

    println!("{}", session::date_key(date));
    println!(
        "  taps: {} ({}/{TAPS_PER_CYCLE} into the current cycle)",
        app.counter.taps(),
        app.counter.cycle_progress()
    );
    println!(
        "  japs: {} of {} daily goal",
        app.counter.completed_cycles(),
        app.counter.goal()
    );
    println!(
        "  this month: {}  this year: {}",
        app.repository.cycles_in_month(date.year(), date.month()),
        app.repository.cycles_in_year(date.year())
    );
}

fn print_feedback(app: &mut App) {
    while let Some(event) = app.try_next_event() {
        match event {
            AppEvent::CycleCompleted { japs } => {
                println!("Cycle complete! {japs} japa(s) today.");
            }
            AppEvent::GoalReached { goal } => {
                println!("Today's goal of {goal} japa(s) is complete!");
            }
            AppEvent::CountChanged { .. } | AppEvent::SettingsChanged => {}
        }
    }
}
