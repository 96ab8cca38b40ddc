mod constraints;
mod models;
mod schema;
mod store;
mod writer;

pub use constraints::{ForeignKeyViolations, LoadWindow};
pub use models::*;
pub use schema::PLAYLIST_VERSIONED_SCHEMAS;
pub use store::SqlitePlaylistStore;
pub use writer::{AssociationPolicy, BulkRow, BulkWriter, DEFAULT_BATCH_SIZE};
