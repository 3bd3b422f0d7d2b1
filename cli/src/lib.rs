//! Prospect command-line shell
//!
//! This is the thin application shell that parses arguments, wires state
//! and prints results. Core pipeline logic lives in the `crates/` directory.

pub mod cli;
pub mod commands;
pub mod error;
pub mod state;

use cli::{Cli, Command, ListsAction};
use error::CommandError;
use serde::Serialize;
use state::AppState;
use std::fmt::Display;
use tracing::info;

/// Initialize tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,prospect=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Execute one parsed command line.
pub async fn run(cli: Cli) -> Result<(), CommandError> {
    info!("Starting Prospect v{}", env!("CARGO_PKG_VERSION"));

    let config = state::load_config(cli.config.as_deref(), cli.database)?;
    let state = AppState::initialize(config).await?;

    match cli.command {
        Command::Scrape(args) => {
            let service = state.scrape_service()?;
            let report = commands::scrape::run_scrape(&service, args, commands::scrape::ctrl_c())
                .await?;
            emit(&report, cli.json)?;
        }
        Command::Status { list } => {
            let report = commands::status::scrape_status(&state, &list).await?;
            emit(&report, cli.json)?;
        }
        Command::Lists { action } => match action.unwrap_or(ListsAction::List) {
            ListsAction::List => {
                let report = commands::lists::list_lists(&state).await?;
                emit(&report, cli.json)?;
            }
            ListsAction::Create {
                name,
                id,
                description,
            } => {
                let list = commands::lists::create_list(&state, name, id, description).await?;
                if cli.json {
                    emit_json(&list)?;
                } else {
                    print!("{}", commands::lists::Created(&list));
                }
            }
        },
    }

    Ok(())
}

fn emit<T: Serialize + Display>(value: &T, json: bool) -> Result<(), CommandError> {
    if json {
        emit_json(value)
    } else {
        print!("{value}");
        Ok(())
    }
}

fn emit_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        CommandError::new("SERIALIZATION_ERROR", format!("Serialization error: {e}"))
    })?;
    println!("{text}");
    Ok(())
}
