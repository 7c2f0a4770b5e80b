pub mod comments_repo;
pub mod migrations;
pub mod pool;
pub mod store;

pub use comments_repo::{CommentRecord, StorageError};
pub use migrations::{run_migrations, SCHEMA_VERSION};
pub use pool::{connect_lazy, ConnectionError, DbLocation, DbOptions, DbPool, DATABASE_NAME};
pub use store::{CommentStore, StoreError, COLLECTION_NAME};
