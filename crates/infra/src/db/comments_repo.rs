use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use thiserror::Error;

use threadline_core::domain::comments::Comment;
use threadline_core::types::comment_id::CommentId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("comment {0} already exists")]
    DuplicateId(CommentId),
    #[error("corrupt comment record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },
}

/// Row as laid out in the `comments` table.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub id: String,
    pub text: String,
    pub parent_id: Option<String>,
    pub created_at: i64,
}

impl TryFrom<CommentRecord> for Comment {
    type Error = StorageError;

    fn try_from(record: CommentRecord) -> Result<Self, Self::Error> {
        let id = parse_id(&record.id, &record.id)?;
        let parent_id = record
            .parent_id
            .as_deref()
            .map(|parent| parse_id(&record.id, parent))
            .transpose()?;
        let created_at = DateTime::<Utc>::from_timestamp_micros(record.created_at).ok_or_else(
            || StorageError::CorruptRecord {
                id: record.id.clone(),
                reason: format!("created_at out of range: {}", record.created_at),
            },
        )?;
        Ok(Comment {
            id,
            text: record.text,
            parent_id,
            created_at,
        })
    }
}

/// Inserts `comment`, moving its timestamp past the newest stored one when
/// the clock has not advanced. Returns the timestamp actually written.
pub async fn insert_comment(
    conn: &mut SqliteConnection,
    comment: &Comment,
) -> Result<DateTime<Utc>, StorageError> {
    let result = sqlx::query(
        r#"
        INSERT INTO comments (id, text, parent_id, created_at)
        VALUES (
            ?1,
            ?2,
            ?3,
            MAX(?4, IFNULL((SELECT MAX(created_at) FROM comments) + 1, ?4))
        )
        RETURNING created_at
        "#,
    )
    .bind(comment.id.to_string())
    .bind(&comment.text)
    .bind(comment.parent_id.map(|id| id.to_string()))
    .bind(comment.created_at.timestamp_micros())
    .fetch_one(&mut *conn)
    .await;
    let row = match result {
        Ok(row) => row,
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            return Err(StorageError::DuplicateId(comment.id));
        }
        Err(err) => return Err(err.into()),
    };
    let created_at: i64 = row.try_get("created_at")?;
    DateTime::<Utc>::from_timestamp_micros(created_at).ok_or_else(|| StorageError::CorruptRecord {
        id: comment.id.to_string(),
        reason: format!("created_at out of range: {created_at}"),
    })
}

/// Newest first; equal timestamps fall back to id order.
pub async fn list_comments(conn: &mut SqliteConnection) -> Result<Vec<Comment>, StorageError> {
    let rows = sqlx::query(
        r#"
        SELECT id, text, parent_id, created_at
        FROM comments
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;
    let mut comments = Vec::with_capacity(rows.len());
    for row in rows {
        comments.push(Comment::try_from(map_comment(&row)?)?);
    }
    Ok(comments)
}

/// `root` and its transitive replies as `(id, parent_id)` pairs. The root's
/// own parent is reported as `None`; rows outside the thread are never read.
pub async fn list_thread_edges(
    conn: &mut SqliteConnection,
    root: &CommentId,
) -> Result<Vec<(CommentId, Option<CommentId>)>, StorageError> {
    let rows = sqlx::query(
        r#"
        WITH RECURSIVE thread(id, parent_id) AS (
            SELECT id, NULL
            FROM comments
            WHERE id = ?1
            UNION
            SELECT comments.id, comments.parent_id
            FROM comments
            JOIN thread ON comments.parent_id = thread.id
        )
        SELECT id, parent_id
        FROM thread
        "#,
    )
    .bind(root.to_string())
    .fetch_all(&mut *conn)
    .await?;
    let mut edges = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.try_get("id")?;
        let parent_id: Option<String> = row.try_get("parent_id")?;
        let parent_id = parent_id
            .as_deref()
            .map(|parent| parse_id(&id, parent))
            .transpose()?;
        edges.push((parse_id(&id, &id)?, parent_id));
    }
    Ok(edges)
}

/// Returns whether a row was deleted.
pub async fn delete_comment(
    conn: &mut SqliteConnection,
    id: &CommentId,
) -> Result<bool, StorageError> {
    let result = sqlx::query(
        r#"
        DELETE FROM comments
        WHERE id = ?1
        "#,
    )
    .bind(id.to_string())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn map_comment(row: &SqliteRow) -> Result<CommentRecord, StorageError> {
    Ok(CommentRecord {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        parent_id: row.try_get("parent_id")?,
        created_at: row.try_get("created_at")?,
    })
}

fn parse_id(record_id: &str, value: &str) -> Result<CommentId, StorageError> {
    CommentId::try_from(value).map_err(|err| StorageError::CorruptRecord {
        id: record_id.to_string(),
        reason: err.to_string(),
    })
}
