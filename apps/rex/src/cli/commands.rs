//! CLI command implementations, one `cmd_*` function per subcommand.

use crate::api::payload::{PostView, SaveBody, SaveData};
use crate::api::{AppState, create_router};
use crate::backend::{Backend, BackendKind};
use crate::config::Config;
use crate::directory::UserDirectory;
use crate::error::AppError;
use rex_core::formats::{SNAPSHOT_MAGIC, decode_snapshot, encode_snapshot};
use rex_core::staging;
use rex_core::{
    Caller, ContentStore, ForkOutcome, PostId, PostStatus, PublishOutcome, SaveOutcome,
    SerializableStore,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

// =============================================================================
// DATABASE COMMANDS
// =============================================================================

/// Create an empty database.
pub fn cmd_init(db: &Path, backend: &str, force: bool) -> Result<(), AppError> {
    let kind: BackendKind = backend.parse()?;
    Backend::create(db, kind, force)?;
    info!(db = %db.display(), backend = %kind, "database initialized");
    println!("Initialized {} database at {}", kind, db.display());
    Ok(())
}

/// Summary printed by `rex status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub backend: String,
    pub db_path: PathBuf,
    pub items: usize,
    /// Item count per status name
    pub by_status: BTreeMap<&'static str, usize>,
    /// Items carrying an original link
    pub staging_items: usize,
}

pub fn cmd_status(db: &Path, backend: &str, json: bool) -> Result<StatusReport, AppError> {
    let kind: BackendKind = backend.parse()?;
    let store = Backend::open(db, kind)?;

    let (by_status, staging_items, items) = store.read(|store| {
        let mut by_status = BTreeMap::new();
        let mut linked = 0usize;
        let ids = store.ids()?;
        for id in &ids {
            if let Some(item) = store.get(*id)? {
                *by_status.entry(item.status.as_str()).or_insert(0) += 1;
                if item.original.is_some() {
                    linked += 1;
                }
            }
        }
        Ok((by_status, linked, ids.len()))
    })?;

    let report = StatusReport {
        backend: kind.to_string(),
        db_path: db.to_path_buf(),
        items,
        by_status,
        staging_items,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Database: {} ({})", report.db_path.display(), report.backend);
        println!("Items:    {}", report.items);
        for (status, count) in &report.by_status {
            println!("  {:<8} {}", status, count);
        }
        println!("Staging:  {}", report.staging_items);
    }
    Ok(report)
}

/// Export the database as a binary snapshot (`canonical`) or as JSON.
pub fn cmd_export(db: &Path, backend: &str, output: &Path, format: &str) -> Result<(), AppError> {
    let kind: BackendKind = backend.parse()?;
    let snapshot = Backend::open(db, kind)?.snapshot()?;

    let bytes = match format {
        "canonical" => encode_snapshot(&snapshot)?,
        "json" => serde_json::to_vec_pretty(&snapshot)?,
        other => {
            return Err(AppError::InvalidArgument(format!(
                "unknown export format '{}' (expected 'canonical' or 'json')",
                other
            )));
        }
    };
    std::fs::write(output, bytes)?;

    info!(items = snapshot.items.len(), output = %output.display(), format, "exported");
    println!(
        "Exported {} items to {}",
        snapshot.items.len(),
        output.display()
    );
    Ok(())
}

/// Import an export into an empty database; the format is detected.
pub fn cmd_import(db: &Path, backend: &str, input: &Path) -> Result<(), AppError> {
    let kind: BackendKind = backend.parse()?;
    let bytes = std::fs::read(input)?;
    let snapshot: SerializableStore = if bytes.starts_with(&SNAPSHOT_MAGIC) {
        decode_snapshot(&bytes)?
    } else {
        serde_json::from_slice(&bytes)?
    };
    let count = snapshot.items.len();

    Backend::open(db, kind)?.import(snapshot)?;

    info!(items = count, db = %db.display(), "imported");
    println!("Imported {} items into {}", count, db.display());
    Ok(())
}

// =============================================================================
// ENGINE COMMANDS
// =============================================================================

/// Resolve `login` to a caller through the configured user directory.
fn caller_for(config: &Config, login: &str) -> Result<Caller, AppError> {
    let directory = UserDirectory::from_config(config)?;
    let user = directory
        .find_login(login)
        .ok_or_else(|| AppError::UnknownUser(login.to_string()))?;
    Caller::resolve(&directory, user).ok_or_else(|| AppError::UnknownUser(login.to_string()))
}

fn open(db: &Path, backend: &str) -> Result<Backend, AppError> {
    Backend::open(db, backend.parse()?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn cmd_fork(
    db: &Path,
    backend: &str,
    config: &Config,
    user: &str,
    source_id: u64,
    status: &str,
) -> Result<ForkOutcome, AppError> {
    let caller = caller_for(config, user)?;
    let status: PostStatus = status.parse()?;
    let outcome = open(db, backend)?
        .transact(|store| staging::fork(store, &caller, PostId(source_id), status))?;

    info!(source = source_id, id = %outcome.id, "forked");
    print_json(&outcome)?;
    Ok(outcome)
}

/// Save from a file holding the `data` object of a Save request.
pub fn cmd_save(
    db: &Path,
    backend: &str,
    config: &Config,
    user: &str,
    id: Option<u64>,
    post_type: &str,
    data: &Path,
) -> Result<SaveOutcome, AppError> {
    let caller = caller_for(config, user)?;
    let data: SaveData = serde_json::from_slice(&std::fs::read(data)?)?;
    let request = SaveBody {
        id,
        post_type: Some(post_type.to_string()),
        data,
    }
    .into_request()?;

    let outcome = open(db, backend)?.transact(|store| staging::save(store, &caller, request))?;

    if outcome.forked {
        warn!(requested = ?id, id = %outcome.id, "save conflicted; forked");
    } else {
        info!(id = %outcome.id, "saved");
    }
    print_json(&outcome)?;
    Ok(outcome)
}

pub fn cmd_publish(
    db: &Path,
    backend: &str,
    config: &Config,
    user: &str,
    staging_id: u64,
) -> Result<PublishOutcome, AppError> {
    let caller = caller_for(config, user)?;
    let outcome = open(db, backend)?
        .transact(|store| staging::publish(store, &caller, PostId(staging_id)))?;

    info!(
        staging = staging_id,
        published = %outcome.published_id,
        used_original = outcome.used_original,
        "published"
    );
    print_json(&outcome)?;
    Ok(outcome)
}

pub fn cmd_show(
    db: &Path,
    backend: &str,
    config: &Config,
    user: &str,
    id: u64,
) -> Result<PostView, AppError> {
    let caller = caller_for(config, user)?;
    let item = open(db, backend)?.read(|store| staging::read(store, &caller, PostId(id)))?;
    let view = PostView::from(&item);
    print_json(&view)?;
    Ok(view)
}

// =============================================================================
// SERVER
// =============================================================================

/// Run the HTTP API until Ctrl-C.
///
/// With a `config_path`, `SIGHUP` reloads the user directory from it.
pub async fn cmd_serve(config: Config, config_path: Option<PathBuf>) -> Result<(), AppError> {
    let kind: BackendKind = config.backend.parse()?;
    let backend = Backend::open(&config.db_path, kind)?;

    let directory = UserDirectory::from_config(&config)?;
    if directory.is_empty() {
        warn!("no users configured; every authenticated request will be rejected");
    }
    let directory = directory.shared();

    #[cfg(unix)]
    {
        if let Some(path) = config_path {
            crate::directory::spawn_reload_on_sighup(path, std::sync::Arc::clone(&directory));
        }
    }
    #[cfg(not(unix))]
    let _ = config_path;

    let app = create_router(AppState::new(backend, directory), &config)?;
    let listener = TcpListener::bind(&config.bind).await?;

    info!(
        bind = %config.bind,
        backend = %kind,
        db = %config.db_path.display(),
        "REX server listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => error!(error = %e, "cannot listen for Ctrl-C; shutting down"),
    }
}
