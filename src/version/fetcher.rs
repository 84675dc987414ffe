//! Segmented, concurrency-limited batch fetching
//!
//! An id list is split into fixed-size segments and every segment is requested
//! at once. A shared semaphore caps the number of requests in flight across all
//! callers of the same fetcher. A failed segment only loses its own ids.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::CatalogConfig;
use crate::version::catalog::{Catalog, RecordKind};
use crate::version::error::CatalogError;

/// Combined result of all segments of one fetch
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub records: Vec<Value>,
    /// Ids sent in a segment that completed successfully
    pub answered: HashSet<String>,
    /// Ids sent in a segment that failed
    pub failed: HashSet<String>,
}

impl FetchOutcome {
    /// Answered ids for which no record came back
    pub fn missing(&self) -> HashSet<String> {
        let returned: HashSet<&str> = self
            .records
            .iter()
            .filter_map(|record| record.get("id").and_then(Value::as_str))
            .collect();

        self.answered
            .iter()
            .filter(|id| !returned.contains(id.as_str()))
            .cloned()
            .collect()
    }
}

pub struct SegmentedFetcher {
    catalog: Arc<dyn Catalog>,
    semaphore: Arc<Semaphore>,
    segment_size: usize,
    timeout: Duration,
}

impl SegmentedFetcher {
    pub fn new(catalog: Arc<dyn Catalog>, config: &CatalogConfig) -> Self {
        Self::with_limits(
            catalog,
            config.segment_size,
            config.max_concurrent_requests,
            Duration::from_millis(config.request_timeout),
        )
    }

    pub fn with_limits(
        catalog: Arc<dyn Catalog>,
        segment_size: usize,
        max_concurrent_requests: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
            segment_size: segment_size.max(1),
            timeout,
        }
    }

    /// Fetch all `ids`, tolerating per-segment failures
    pub async fn fetch(&self, kind: RecordKind, ids: &[String]) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        if ids.is_empty() {
            return outcome;
        }

        let segments: Vec<&[String]> = ids.chunks(self.segment_size).collect();
        debug!(
            "Fetching {} {} ids in {} segments",
            ids.len(),
            kind.as_str(),
            segments.len()
        );

        let futures = segments.into_iter().enumerate().map(|(index, segment)| async move {
            let result = self.fetch_segment(kind, segment).await;
            (index, segment, result)
        });

        for (index, segment, result) in join_all(futures).await {
            match result {
                Ok(records) => {
                    outcome.answered.extend(segment.iter().cloned());
                    outcome.records.extend(records);
                }
                Err(e) => {
                    warn!(
                        "Segment {} of {} {} ids failed: {}",
                        index + 1,
                        segment.len(),
                        kind.as_str(),
                        e
                    );
                    outcome.failed.extend(segment.iter().cloned());
                }
            }
        }

        // An id repeated across segments counts as answered if any copy was
        outcome.failed.retain(|id| !outcome.answered.contains(id));
        outcome
    }

    async fn fetch_segment(
        &self,
        kind: RecordKind,
        segment: &[String],
    ) -> Result<Vec<Value>, CatalogError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| CatalogError::LimiterClosed)?;

        let request = match kind {
            RecordKind::Version => self.catalog.fetch_versions(segment),
            RecordKind::Project => self.catalog.fetch_projects(segment),
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| CatalogError::Timeout(self.timeout.as_millis() as u64))?
    }
}
