//! Content persistence.
//!
//! The store file is the source of truth; it is replayed into memory at startup.

mod journal;
mod seed;
mod store;

pub use seed::*;
pub use store::*;

use std::path::Path;

use crate::errors::AppError;

/// Default share of corrupt lines tolerated when loading the store file.
pub const DEFAULT_CORRUPT_THRESHOLD: f64 = 0.1;

/// Ensure the data directory exists and open the content store.
pub async fn init_store(db_path: &Path, options: StoreOptions) -> Result<ContentStore, AppError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    ContentStore::open(db_path, options).await
}
