#![allow(dead_code)]

mod catalog;

pub use catalog::{InMemoryCatalog, project_json, version_json};

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use modrinth_compat::version::fetcher::SegmentedFetcher;
use modrinth_compat::version::resolver::VersionResolver;
use modrinth_compat::version::store::SqliteVersionStore;

/// Opens a store in a fresh temporary directory
pub fn create_test_store() -> (TempDir, SqliteVersionStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = SqliteVersionStore::new(&temp_dir.path().join("test.db")).unwrap();
    (temp_dir, store)
}

pub fn create_test_resolver(
    catalog: Arc<InMemoryCatalog>,
    store: SqliteVersionStore,
    segment_size: usize,
) -> VersionResolver<SqliteVersionStore> {
    let fetcher = SegmentedFetcher::with_limits(catalog, segment_size, 20, Duration::from_secs(5));
    VersionResolver::new(Arc::new(store), Arc::new(fetcher))
}
