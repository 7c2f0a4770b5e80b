pub mod comments;
pub mod thread;
