//! Catalog trait for fetching raw records by id batch

#[cfg(test)]
use mockall::automock;

use serde_json::Value;

use crate::version::error::CatalogError;

/// Which record collection a batch request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Version,
    Project,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Version => "version",
            RecordKind::Project => "project",
        }
    }
}

/// Trait for fetching raw records from the upstream catalog
///
/// Records are returned undecoded; shape validation happens in the caller.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Fetches the versions with the given ids
    ///
    /// Ids unknown to the catalog are simply absent from the result.
    async fn fetch_versions(&self, ids: &[String]) -> Result<Vec<Value>, CatalogError>;

    /// Fetches the projects with the given ids or slugs
    async fn fetch_projects(&self, ids: &[String]) -> Result<Vec<Value>, CatalogError>;
}
