use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use soul_lib::config::{self, JsonConfigStore};
use soul_lib::loadsim::{self, LoadSimConfig, LoadSimulator};
use soul_lib::storage::{Database, NoteRepository, NoteStore};

#[derive(Parser)]
#[command(
    name = "soul-loadsim",
    about = "Run random write load against a soul database",
    version
)]
struct Cli {
    /// Database file (default: stored DB_PATH, then the platform data dir)
    #[arg(long)]
    db: Option<PathBuf>,

    /// How long to run, in seconds
    #[arg(long, default_value = "30")]
    duration: u64,

    /// Folder names the simulator must never touch (repeatable)
    #[arg(long = "except")]
    exceptions: Vec<String>,

    /// Fill this folder with random notes first and protect it
    #[arg(long)]
    seed_folder: Option<String>,

    /// Password for --seed-folder
    #[arg(long, default_value = "loadsim")]
    password: String,

    /// Upper bound of the pause between cycles, in milliseconds
    #[arg(long, default_value = "4000")]
    max_pause_ms: u64,
}

fn resolve_db_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(path) = &cli.db {
        return Ok(path.clone());
    }

    match JsonConfigStore::open_default() {
        Ok(store) => {
            if let Some(path) = config::db_path(&store) {
                return Ok(path);
            }
        }
        Err(e) => log::warn!("Could not read settings: {}", e),
    }

    config::default_db_path().context("No data directory available, pass --db")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let path = resolve_db_path(&cli)?;
    let db = Database::open(&path).with_context(|| format!("Failed to open {:?}", path))?;

    let mut exceptions = cli.exceptions.clone();
    let seeded = match &cli.seed_folder {
        Some(folder) => {
            let repo = NoteRepository::with_database(&db, folder, &cli.password)?;
            repo.update_all(&loadsim::random_notes())?;
            exceptions.push(folder.clone());

            let notes = repo.get_all()?;
            println!("Seeded {} note(s) into {:?}", notes.len(), folder);
            Some((repo, notes))
        }
        None => None,
    };

    let config = LoadSimConfig {
        max_pause_ms: cli.max_pause_ms,
        ..LoadSimConfig::default()
    };
    let handle = LoadSimulator::new(db.clone(), &exceptions, config)
        .start(&tokio::runtime::Handle::current());

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(cli.duration)) => {}
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
    }
    handle.shutdown().await;

    if let Some((repo, before)) = seeded {
        let after = repo.get_all().context("Protected folder no longer readable")?;
        anyhow::ensure!(after == before, "Protected folder was modified");
    }

    println!("{}", loadsim::key_count(&db)?);
    Ok(())
}
