//! REX staging server and CLI.
//!
//! ```bash
//! rex --config rex.json init
//! rex --config rex.json serve --bind 0.0.0.0:8080
//! rex --config rex.json fork --user editor 10
//! RUST_LOG=rex=debug rex --config rex.json status --json
//! ```

use clap::Parser;
use rex::cli::{
    Cli, Command, cmd_export, cmd_fork, cmd_import, cmd_init, cmd_publish, cmd_save, cmd_serve,
    cmd_show, cmd_status,
};
use rex::error::AppError;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so command output on stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "rex=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = cli.settings()?;
    let db = config.db_path.clone();
    let backend = config.backend.clone();

    match cli.command {
        Command::Init { force } => cmd_init(&db, &backend, force),
        Command::Serve { bind } => {
            let mut config = config;
            if let Some(bind) = bind {
                config.bind = bind;
            }
            cmd_serve(config, cli.config).await
        }
        Command::Status { json } => cmd_status(&db, &backend, json).map(drop),
        Command::Fork {
            user,
            source_id,
            status,
        } => cmd_fork(&db, &backend, &config, &user, source_id, &status).map(drop),
        Command::Save {
            user,
            id,
            post_type,
            data,
        } => cmd_save(&db, &backend, &config, &user, id, &post_type, &data).map(drop),
        Command::Publish { user, staging_id } => {
            cmd_publish(&db, &backend, &config, &user, staging_id).map(drop)
        }
        Command::Show { user, id } => cmd_show(&db, &backend, &config, &user, id).map(drop),
        Command::Export { output, format } => cmd_export(&db, &backend, &output, &format),
        Command::Import { input } => cmd_import(&db, &backend, &input),
    }
}
