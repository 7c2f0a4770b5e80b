use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use threadline_core::domain::comments::{Comment, CommentInput};
use threadline_core::domain::thread::ChildIndex;
use threadline_core::types::comment_id::CommentId;
use threadline_core::ValidationError;

use super::comments_repo::{self, StorageError};
use super::migrations::{applied_version, run_migrations};
use super::pool::{connect_lazy, ensure_parent_dir, ConnectionError, DbOptions, DbPool};

pub const COLLECTION_NAME: &str = "comments";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Handle to the local comment database. Build one per process and share it;
/// clones use the same pool.
///
/// Every operation runs in its own transaction and reads straight from the
/// database, so there is nothing to invalidate between calls.
#[derive(Clone)]
pub struct CommentStore {
    options: Arc<DbOptions>,
    pool: DbPool,
    ready: Arc<OnceCell<()>>,
}

impl CommentStore {
    pub fn new(options: DbOptions) -> Result<Self, StoreError> {
        let pool = connect_lazy(&options)?;
        Ok(Self {
            options: Arc::new(options),
            pool,
            ready: Arc::new(OnceCell::new()),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(DbOptions::in_memory())
    }

    pub fn options(&self) -> &DbOptions {
        &self.options
    }

    /// Opens the database on first use and brings the schema up to date.
    /// Later and concurrent calls wait on the same initialisation.
    pub async fn connect(&self) -> Result<DbPool, StoreError> {
        self.ready
            .get_or_try_init(|| async {
                ensure_parent_dir(&self.options)?;
                run_migrations(&self.pool).await?;
                info!(
                    location = %self.options.location,
                    collection = COLLECTION_NAME,
                    "comment store ready"
                );
                Ok::<(), ConnectionError>(())
            })
            .await?;
        Ok(self.pool.clone())
    }

    pub async fn add(&self, text: &str, parent_id: Option<&str>) -> Result<Comment, StoreError> {
        self.insert(CommentInput::new(text, parent_id)).await
    }

    pub async fn insert(&self, input: CommentInput) -> Result<Comment, StoreError> {
        let mut comment = input.validate(Utc::now())?;
        let pool = self.connect().await?;
        let mut tx = pool.begin().await.map_err(ConnectionError::from)?;
        comment.created_at = comments_repo::insert_comment(&mut tx, &comment).await?;
        tx.commit().await.map_err(StorageError::from)?;
        debug!(
            id = %comment.id,
            parent_id = ?comment.parent_id.map(|id| id.to_string()),
            "comment added"
        );
        Ok(comment)
    }

    /// Every comment, most recent first.
    pub async fn get_all(&self) -> Result<Vec<Comment>, StoreError> {
        let pool = self.connect().await?;
        let mut tx = pool.begin().await.map_err(ConnectionError::from)?;
        let comments = comments_repo::list_comments(&mut tx).await?;
        tx.commit().await.map_err(StorageError::from)?;
        Ok(comments)
    }

    /// Deletes exactly `id`. Replies are left in place and a missing id is
    /// not an error.
    pub async fn remove(&self, id: &CommentId) -> Result<(), StoreError> {
        let pool = self.connect().await?;
        let mut tx = pool.begin().await.map_err(ConnectionError::from)?;
        let deleted = comments_repo::delete_comment(&mut tx, id).await?;
        tx.commit().await.map_err(StorageError::from)?;
        debug!(id = %id, deleted, "comment removed");
        Ok(())
    }

    /// Deletes `id` and all of its transitive replies in one transaction.
    /// Returns the removed ids, replies before their parents; empty when `id`
    /// does not exist.
    pub async fn remove_thread(&self, id: &CommentId) -> Result<Vec<CommentId>, StoreError> {
        let pool = self.connect().await?;
        let mut tx = pool.begin().await.map_err(ConnectionError::from)?;
        let edges = comments_repo::list_thread_edges(&mut tx, id).await?;
        if edges.is_empty() {
            tx.commit().await.map_err(StorageError::from)?;
            return Ok(Vec::new());
        }
        let subtree = ChildIndex::build(edges).subtree(*id);
        for comment_id in &subtree {
            comments_repo::delete_comment(&mut tx, comment_id).await?;
        }
        tx.commit().await.map_err(StorageError::from)?;
        info!(id = %id, removed = subtree.len(), "comment thread removed");
        Ok(subtree)
    }

    pub async fn schema_version(&self) -> Result<Option<i64>, StoreError> {
        let pool = self.connect().await?;
        Ok(applied_version(&pool).await.map_err(StorageError::from)?)
    }
}
