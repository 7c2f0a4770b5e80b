mod cli;
mod config;
mod render;
mod state;
mod sweep;
mod wiring;

use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::config::ConfigError;
use crate::state::AppState;
use crate::sweep::SweepReport;
use crate::wiring::WiringError;
use threadline_core::domain::comments::CommentInput;
use threadline_core::domain::thread::build_thread;
use threadline_core::types::comment_id::CommentId;
use threadline_core::ValidationError;
use threadline_infra::db::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("wiring error: {0}")]
    Wiring(#[from] WiringError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("invalid json input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("deleted {removed} comment(s) before failing; {remaining} left in place: {source}")]
    IncompleteDelete {
        removed: usize,
        remaining: usize,
        source: StoreError,
    },
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Store(StoreError::Validation(err))
    }
}

const STORAGE_FAILURE: &str = "the comment database reported an error";

impl AppError {
    /// Validation messages are shown verbatim; engine failures get a generic
    /// notice and the detail goes to the log.
    fn user_message(&self) -> String {
        match self {
            AppError::Store(StoreError::Validation(err)) => err.to_string(),
            AppError::Store(StoreError::Connection(_))
            | AppError::Wiring(WiringError::Store(StoreError::Connection(_))) => {
                "could not open the comment database; try again later".to_string()
            }
            AppError::Store(_) => STORAGE_FAILURE.to_string(),
            AppError::IncompleteDelete {
                removed, remaining, ..
            } => format!(
                "deleted {removed} comment(s) before failing; {remaining} left in place. {STORAGE_FAILURE}"
            ),
            other => other.to_string(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    config::load_dotenv()?;
    let config = config::AppConfig::from_env()?;
    let state = wiring::build_state(config)?;

    match cli.command {
        Command::Add {
            text,
            reply_to,
            json,
        } => {
            let input = match json {
                Some(raw) => CommentInput::from_json(&serde_json::from_str(&raw)?)?,
                None => CommentInput::new(text.unwrap_or_default(), reply_to.as_deref()),
            };
            let comment = state.store.insert(input).await?;
            println!("{}", comment.id);
        }
        Command::List { json } => {
            let comments = state.store.get_all().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&comments)?);
            } else {
                print!("{}", render::render_list(&comments));
            }
        }
        Command::Tree { json } => {
            let comments = state.store.get_all().await?;
            let thread = build_thread(&comments);
            if json {
                println!("{}", serde_json::to_string_pretty(&thread)?);
            } else {
                print!("{}", render::render_thread(&thread));
            }
        }
        Command::Remove { id } => {
            let id = CommentId::try_from(id.as_str())?;
            state.store.remove(&id).await?;
        }
        Command::Delete { id, sweep } => {
            let id = CommentId::try_from(id.as_str())?;
            delete_thread(&state, id, sweep).await?;
        }
        Command::Info => {
            let version = state.store.schema_version().await?;
            println!("database: {}", state.store.options().location);
            match version {
                Some(version) => println!("schema version: {version}"),
                None => println!("schema version: none"),
            }
            info!(data_dir = %state.config.data_dir.display(), "info printed");
        }
    }
    Ok(())
}

async fn delete_thread(state: &AppState, id: CommentId, sweep: bool) -> Result<(), AppError> {
    if !sweep {
        let removed = state.store.remove_thread(&id).await?;
        println!("removed {} comment(s)", removed.len());
        return Ok(());
    }

    let mut comments = state.store.get_all().await?;
    let report = sweep::sweep_delete(&state.store, id, &comments).await;
    for removed in &report.removed {
        println!("removed {removed}");
    }
    if !report.is_complete() {
        report.reconcile(&mut comments);
        println!("remaining thread:");
        print!("{}", render::render_thread(&build_thread(&comments)));
    }
    sweep_result(report)
}

fn sweep_result(report: SweepReport) -> Result<(), AppError> {
    match report.failed {
        None => Ok(()),
        Some((failed_id, source)) => {
            // Whatever the walk did remove is committed; the failed comment
            // and everything after it is still stored.
            let remaining = report.skipped.len() + 1;
            error!(id = %failed_id, remaining, "thread only partially deleted");
            Err(AppError::IncompleteDelete {
                removed: report.removed.len(),
                remaining,
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    use threadline_infra::db::CommentStore;

    use super::*;
    use crate::config::AppConfig;

    fn memory_state() -> AppState {
        AppState {
            config: Arc::new(AppConfig {
                data_dir: PathBuf::from("./data"),
                database_path: None,
                max_connections: 1,
                busy_timeout: Duration::from_secs(1),
            }),
            store: CommentStore::in_memory().unwrap(),
        }
    }

    #[tokio::test]
    async fn blocked_sweep_reports_counts_without_engine_detail() {
        let state = memory_state();
        let root = state.store.add("root", None).await.unwrap();
        let root_id = root.id.to_string();
        let mid = state.store.add("mid", Some(&root_id)).await.unwrap();
        let mid_id = mid.id.to_string();
        state.store.add("leaf", Some(&mid_id)).await.unwrap();
        let pool = state.store.connect().await.unwrap();
        sqlx::query(&format!(
            "CREATE TRIGGER block_mid BEFORE DELETE ON comments WHEN old.id = '{mid_id}' \
             BEGIN SELECT RAISE(ABORT, 'engine detail'); END"
        ))
        .execute(&pool)
        .await
        .unwrap();

        let err = delete_thread(&state, root.id, true).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::IncompleteDelete {
                removed: 1,
                remaining: 2,
                ..
            }
        ));
        let message = err.user_message();
        assert!(message.contains("deleted 1 comment(s)"));
        assert!(message.contains("2 left in place"));
        assert!(!message.contains("engine detail"));
        assert_eq!(state.store.get_all().await.unwrap(), vec![mid, root]);
    }

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = AppError::from(ValidationError::EmptyText);
        assert_eq!(err.user_message(), "Comment cannot be empty");
    }
}
