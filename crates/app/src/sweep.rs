use std::collections::HashSet;

use tracing::{info, warn};

use threadline_core::domain::comments::Comment;
use threadline_core::domain::thread::ChildIndex;
use threadline_core::types::comment_id::CommentId;
use threadline_infra::db::{CommentStore, StoreError};

/// Outcome of removing a thread one comment at a time. Removals that
/// committed before a failure stay committed.
#[derive(Debug)]
pub struct SweepReport {
    pub removed: Vec<CommentId>,
    pub failed: Option<(CommentId, StoreError)>,
    pub skipped: Vec<CommentId>,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }

    /// Drops from `comments` exactly what the store confirmed as removed.
    pub fn reconcile(&self, comments: &mut Vec<Comment>) {
        let removed: HashSet<_> = self.removed.iter().collect();
        comments.retain(|comment| !removed.contains(&comment.id));
    }
}

/// Walks the thread under `target` as seen in `comments` and calls
/// [`CommentStore::remove`] for each comment, replies first. Stops at the
/// first failed removal.
pub async fn sweep_delete(
    store: &CommentStore,
    target: CommentId,
    comments: &[Comment],
) -> SweepReport {
    let order = if comments.iter().any(|comment| comment.id == target) {
        ChildIndex::from_comments(comments).subtree(target)
    } else {
        Vec::new()
    };

    let mut report = SweepReport {
        removed: Vec::with_capacity(order.len()),
        failed: None,
        skipped: Vec::new(),
    };
    let mut pending = order.into_iter();
    while let Some(id) = pending.next() {
        match store.remove(&id).await {
            Ok(()) => report.removed.push(id),
            Err(err) => {
                warn!(error = %err, id = %id, removed = report.removed.len(), "sweep stopped");
                report.failed = Some((id, err));
                report.skipped.extend(pending.by_ref());
                break;
            }
        }
    }
    if report.is_complete() {
        info!(id = %target, removed = report.removed.len(), "thread swept");
    }
    report
}
