use std::sync::Arc;

use thiserror::Error;

use crate::config::AppConfig;
use crate::state::AppState;
use threadline_infra::db::{CommentStore, StoreError};

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("comment store error: {0}")]
    Store(#[from] StoreError),
}

pub fn build_state(config: AppConfig) -> Result<AppState, WiringError> {
    let store = CommentStore::new(config.db_options())?;
    Ok(AppState {
        config: Arc::new(config),
        store,
    })
}
