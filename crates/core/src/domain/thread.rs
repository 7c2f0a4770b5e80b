use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::domain::comments::Comment;
use crate::types::comment_id::CommentId;

#[derive(Debug, Clone, Serialize)]
pub struct ThreadNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<ThreadNode>,
}

/// Deepest nesting level `build_thread` produces. Replies below it are listed
/// as siblings at this level, in conversation order.
pub const MAX_THREAD_DEPTH: usize = 32;

/// Nests replies under their parents, keeping the input order at every
/// level. A comment whose parent is not in `comments` becomes a root.
pub fn build_thread(comments: &[Comment]) -> Vec<ThreadNode> {
    let mut index = HashMap::with_capacity(comments.len());
    for (idx, comment) in comments.iter().enumerate() {
        index.insert(comment.id, idx);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut roots = Vec::new();
    for (idx, comment) in comments.iter().enumerate() {
        if let Some(parent_idx) = comment.parent_id.as_ref().and_then(|id| index.get(id)) {
            if *parent_idx != idx {
                children[*parent_idx].push(idx);
                continue;
            }
        }
        roots.push(idx);
    }

    // Pre-order walk assigning every reachable comment to the node it is
    // shown under, clamped at MAX_THREAD_DEPTH.
    let mut preorder = Vec::with_capacity(comments.len());
    let mut shown_under: Vec<Vec<usize>> = vec![Vec::new(); comments.len()];
    let mut stack: Vec<(usize, usize, Option<usize>)> =
        roots.iter().rev().map(|idx| (*idx, 0, None)).collect();
    while let Some((idx, depth, holder)) = stack.pop() {
        if let Some(holder) = holder {
            shown_under[holder].push(idx);
        }
        preorder.push(idx);
        let (child_depth, child_holder) = if depth < MAX_THREAD_DEPTH {
            (depth + 1, idx)
        } else {
            (depth, holder.unwrap_or(idx))
        };
        for child in children[idx].iter().rev() {
            stack.push((*child, child_depth, Some(child_holder)));
        }
    }

    // Replies come after their holder in pre-order, so walking it backwards
    // finishes every reply before the node that takes it.
    let mut built: Vec<Option<ThreadNode>> = comments.iter().map(|_| None).collect();
    for idx in preorder.into_iter().rev() {
        let replies = shown_under[idx]
            .iter()
            .filter_map(|reply| built[*reply].take())
            .collect();
        built[idx] = Some(ThreadNode {
            comment: comments[idx].clone(),
            replies,
        });
    }
    roots
        .into_iter()
        .filter_map(|idx| built[idx].take())
        .collect()
}

/// Parent id to direct reply ids, built once per cascading delete.
#[derive(Debug, Default)]
pub struct ChildIndex {
    children: HashMap<CommentId, Vec<CommentId>>,
}

impl ChildIndex {
    pub fn build<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (CommentId, Option<CommentId>)>,
    {
        let mut children: HashMap<CommentId, Vec<CommentId>> = HashMap::new();
        for (id, parent_id) in edges {
            if let Some(parent_id) = parent_id {
                children.entry(parent_id).or_default().push(id);
            }
        }
        Self { children }
    }

    pub fn from_comments(comments: &[Comment]) -> Self {
        Self::build(comments.iter().map(|comment| (comment.id, comment.parent_id)))
    }

    pub fn children_of(&self, id: &CommentId) -> &[CommentId] {
        self.children.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// `root` and every transitive reply, each listed after all of its own
    /// replies. Deleting in this order never leaves a reply whose parent is
    /// already gone mid-sweep.
    pub fn subtree(&self, root: CommentId) -> Vec<CommentId> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if !visited.insert(id) {
                continue;
            }
            stack.push((id, true));
            for child in self.children_of(&id).iter().rev() {
                if !visited.contains(child) {
                    stack.push((*child, false));
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn comment(text: &str, parent: Option<CommentId>, minute: u32) -> Comment {
        Comment {
            id: CommentId::generate(),
            text: text.to_string(),
            parent_id: parent,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap(),
        }
    }

    #[test]
    fn build_thread_nests_replies() {
        let root = comment("root", None, 0);
        let reply = comment("reply", Some(root.id), 1);
        let nested = comment("nested", Some(reply.id), 2);
        let tree = build_thread(&[nested.clone(), reply.clone(), root.clone()]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, root.id);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].comment.id, reply.id);
        assert_eq!(tree[0].replies[0].replies[0].comment.id, nested.id);
    }

    #[test]
    fn build_thread_keeps_orphans_as_roots() {
        let missing = CommentId::generate();
        let orphan = comment("orphan", Some(missing), 0);
        let tree = build_thread(&[orphan.clone()]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].comment.id, orphan.id);
    }

    #[test]
    fn build_thread_preserves_sibling_order() {
        let root = comment("root", None, 0);
        let newer = comment("newer", Some(root.id), 2);
        let older = comment("older", Some(root.id), 1);
        let tree = build_thread(&[newer.clone(), older.clone(), root]);
        let replies: Vec<_> = tree[0].replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(replies, vec![newer.id, older.id]);
    }

    fn chain(len: usize) -> Vec<Comment> {
        let mut comments: Vec<Comment> = Vec::with_capacity(len);
        for n in 0..len {
            let parent = comments.last().map(|c| c.id);
            comments.push(comment(&format!("c{n}"), parent, 0));
        }
        comments
    }

    #[test]
    fn build_thread_handles_deep_reply_chain() {
        let comments = chain(10_000);
        let tree = build_thread(&comments);
        assert_eq!(tree.len(), 1);

        let mut seen = Vec::new();
        let mut max_depth = 0;
        let mut stack = vec![(&tree[0], 0)];
        while let Some((node, depth)) = stack.pop() {
            seen.push(node.comment.id);
            max_depth = max_depth.max(depth);
            for reply in node.replies.iter().rev() {
                stack.push((reply, depth + 1));
            }
        }
        let expected: Vec<_> = comments.iter().map(|c| c.id).collect();
        assert_eq!(seen, expected);
        assert_eq!(max_depth, MAX_THREAD_DEPTH);

        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains("\"text\":\"c9999\""));
    }

    #[test]
    fn replies_below_depth_limit_become_siblings() {
        let comments = chain(MAX_THREAD_DEPTH + 3);
        let tree = build_thread(&comments);
        let mut holder = &tree[0];
        for _ in 0..MAX_THREAD_DEPTH - 1 {
            assert_eq!(holder.replies.len(), 1);
            holder = &holder.replies[0];
        }
        let flattened: Vec<_> = holder.replies.iter().map(|n| n.comment.id).collect();
        let expected: Vec<_> = comments[MAX_THREAD_DEPTH..].iter().map(|c| c.id).collect();
        assert_eq!(flattened, expected);
        assert!(holder.replies.iter().all(|n| n.replies.is_empty()));
    }

    #[test]
    fn subtree_lists_descendants_before_ancestors() {
        let root = comment("root", None, 0);
        let a = comment("a", Some(root.id), 1);
        let b = comment("b", Some(root.id), 2);
        let a1 = comment("a1", Some(a.id), 3);
        let unrelated = comment("other", None, 4);
        let all = [root.clone(), a.clone(), b.clone(), a1.clone(), unrelated.clone()];
        let index = ChildIndex::from_comments(&all);

        let order = index.subtree(root.id);
        assert_eq!(order.len(), 4);
        assert_eq!(order.last(), Some(&root.id));
        let pos = |id: CommentId| order.iter().position(|x| *x == id).unwrap();
        assert!(pos(a1.id) < pos(a.id));
        assert!(order.contains(&b.id));
        assert!(!order.contains(&unrelated.id));
    }

    #[test]
    fn subtree_of_leaf_is_itself() {
        let leaf = CommentId::generate();
        assert_eq!(ChildIndex::default().subtree(leaf), vec![leaf]);
    }

    #[test]
    fn subtree_terminates_on_cycle() {
        let a = CommentId::generate();
        let b = CommentId::generate();
        let index = ChildIndex::build([(a, Some(b)), (b, Some(a))]);
        let order = index.subtree(a);
        assert_eq!(order.len(), 2);
        assert_eq!(order.last(), Some(&a));
    }
}
