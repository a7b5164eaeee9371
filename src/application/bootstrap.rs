use crate::application::planner::Planner;
use crate::infrastructure::config::{PlannerConfig, ensure_default_configs, load_planner_config};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::google_calendar_client::ReqwestGoogleCalendarClient;
use crate::infrastructure::storage::{SqliteKeyValueStore, initialize_database};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "TIMEBLOCKS_LOG";
const LOG_FILE_NAME: &str = "timeblocks.log";

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
    pub config: PlannerConfig,
}

/// Creates `config/`, `state/` and `logs/` under `workspace_root`, writes default config and
/// prepares the database.
pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join("timeblocks.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_planner_config(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        logs_dir,
        database_path,
        config,
    })
}

/// Planner over the workspace database, fed by the Google calendar client.
pub fn open_planner(bootstrap: &BootstrapResult) -> Result<Planner<ReqwestGoogleCalendarClient>, InfraError> {
    let storage = Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));
    Planner::load(
        bootstrap.config.clone(),
        storage,
        Arc::new(ReqwestGoogleCalendarClient::new()),
    )
}

/// Installs the global fmt subscriber writing to `logs_dir/timeblocks.log`. The filter comes from
/// `TIMEBLOCKS_LOG` and defaults to `info`. Returns false when a subscriber is already installed
/// or the log file cannot be opened.
pub fn init_tracing(logs_dir: &Path) -> bool {
    if fs::create_dir_all(logs_dir).is_err() {
        return false;
    }
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(logs_dir.join(LOG_FILE_NAME))
    else {
        return false;
    };

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .is_ok()
}
