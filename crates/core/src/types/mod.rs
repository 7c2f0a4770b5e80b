pub mod comment_id;
