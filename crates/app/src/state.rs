use std::sync::Arc;

use crate::config::AppConfig;
use threadline_infra::db::CommentStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: CommentStore,
}
