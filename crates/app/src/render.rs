use std::fmt::Write;

use threadline_core::domain::comments::Comment;
use threadline_core::domain::thread::ThreadNode;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn render_list(comments: &[Comment]) -> String {
    let mut out = String::new();
    for comment in comments {
        let parent = comment
            .parent_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{}  {}  {}  {}",
            comment.id,
            comment.created_at.format(TIME_FORMAT),
            parent,
            comment.text.replace('\n', " ")
        );
    }
    out
}

pub fn render_thread(nodes: &[ThreadNode]) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&ThreadNode, usize)> = nodes.iter().rev().map(|node| (node, 0)).collect();
    while let Some((node, depth)) = stack.pop() {
        let indent = "  ".repeat(depth);
        let _ = writeln!(
            out,
            "{indent}- {} ({})",
            node.comment.id,
            node.comment.created_at.format(TIME_FORMAT)
        );
        for line in node.comment.text.lines() {
            let _ = writeln!(out, "{indent}  {line}");
        }
        stack.extend(node.replies.iter().rev().map(|reply| (reply, depth + 1)));
    }
    out
}
