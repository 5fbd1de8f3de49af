//! Persisted recognition records and the vector-id mapping table.

mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod model;
pub mod sqlite;
pub mod store;


pub use error::RecordStoreError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockRecordStore;
pub use model::{NewRecord, NewVectorMapping, Record, VectorMapping};
pub use sqlite::SqliteRecordStore;
pub use store::RecordStore;
