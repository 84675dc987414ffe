//! Dependency-closure resolver over the version store and the catalog
//!
//! Given a set of version ids, the resolver decides every version in their
//! transitive dependency closure. Each level of the closure is answered from
//! the store first; only the remaining ids are fetched from the catalog.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::version::catalog::RecordKind;
use crate::version::error::StoreError;
use crate::version::fetcher::SegmentedFetcher;
use crate::version::stack::{DemotionCause, ResolutionStack};
use crate::version::store::VersionStore;
use crate::version::validate::{Classified, classify_version};

pub struct VersionResolver<S: VersionStore> {
    store: Arc<S>,
    fetcher: Arc<SegmentedFetcher>,
}

impl<S: VersionStore> VersionResolver<S> {
    pub fn new(store: Arc<S>, fetcher: Arc<SegmentedFetcher>) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn fetcher(&self) -> &Arc<SegmentedFetcher> {
        &self.fetcher
    }

    /// Resolve `ids` and persist every new decision
    ///
    /// Ids the catalog answered for without returning a record become invalid
    /// here. Only a store failure is an error; catalog problems degrade to
    /// invalid or unresolved ids.
    pub async fn get(&self, ids: &HashSet<String>) -> Result<ResolutionStack, StoreError> {
        info!("Getting {} versions", ids.len());

        let mut stack = ResolutionStack::new();
        self.resolve(&mut stack, ids.clone()).await?;

        // Missing ids already counted as invalid during propagation
        stack.materialize_missing();

        self.persist(&stack)?;

        info!(
            "Resolved {} valid and {} invalid versions ({} unresolved)",
            stack.valid().len(),
            stack.invalid().len(),
            stack.unresolved().len()
        );
        Ok(stack)
    }

    /// Resolve the dependency closure of `requested` into `stack`
    ///
    /// Ids already known to the stack are skipped, which bounds the number of
    /// levels by the number of distinct ids and makes cycles terminate.
    pub async fn resolve(
        &self,
        stack: &mut ResolutionStack,
        requested: HashSet<String>,
    ) -> Result<(), StoreError> {
        let mut pending = requested;
        let mut level = 0;

        loop {
            pending.retain(|id| !stack.is_known(id));
            if pending.is_empty() {
                break;
            }
            level += 1;

            let stored = self.store.lookup(&pending)?;
            debug!(
                "Level {}: {} ids, {} valid and {} invalid in store",
                level,
                pending.len(),
                stored.valid.len(),
                stored.invalid.len()
            );
            for (id, version) in stored.valid {
                pending.remove(&id);
                stack.insert_stored_valid(version);
            }
            for (id, version) in stored.invalid {
                pending.remove(&id);
                stack.insert_stored_invalid(version);
            }

            if !pending.is_empty() {
                let mut to_fetch: Vec<String> = pending.drain().collect();
                to_fetch.sort();
                self.fetch_into(stack, &to_fetch).await;
            }

            pending = stack.dependency_ids();
        }

        let demoted = stack.propagate_invalid();
        if demoted > 0 {
            info!("Demoted {} versions with invalid dependencies", demoted);
        }

        Ok(())
    }

    async fn fetch_into(&self, stack: &mut ResolutionStack, ids: &[String]) {
        info!("Fetching {} versions", ids.len());

        stack.mark_queried(ids);
        let outcome = self.fetcher.fetch(RecordKind::Version, ids).await;

        let mut valid = 0;
        let mut invalid = 0;
        for raw in &outcome.records {
            match classify_version(raw) {
                Some(Classified::Valid(version)) => {
                    if stack.insert_valid(version) {
                        valid += 1;
                    }
                }
                Some(Classified::Invalid(version)) => {
                    debug!("Version {} failed validation", version.id);
                    stack.insert_invalid(version);
                    invalid += 1;
                }
                None => warn!("Skipping version record without an id"),
            }
        }

        let missing = outcome.missing();
        if !missing.is_empty() {
            debug!("{} versions not found upstream", missing.len());
        }
        stack.record_missing(missing);
        stack.record_unresolved(outcome.failed);

        debug!("Parsed {} valid and {} invalid versions", valid, invalid);
    }

    /// Write the stack's new decisions to the store
    ///
    /// Versions demoted only because a dependency could not be fetched are
    /// saved as valid so a later run re-checks them.
    fn persist(&self, stack: &ResolutionStack) -> Result<(), StoreError> {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        let mut invalidated = Vec::new();

        for (id, version) in stack.valid() {
            if !stack.is_from_store(id) {
                valid.push(version.clone());
            }
        }

        for (id, version) in stack.invalid() {
            let from_store = stack.is_from_store(id);
            match stack.demotions().get(id) {
                Some(demotion) if demotion.cause == DemotionCause::UnresolvedDependency => {
                    if !from_store {
                        valid.push(demotion.version.clone());
                    }
                }
                Some(_) if from_store => invalidated.push(id.clone()),
                Some(_) => invalid.push(version.clone()),
                None if from_store => {}
                None => invalid.push(version.clone()),
            }
        }

        invalidated.sort();
        self.store.apply(&valid, &invalid, &invalidated)?;

        debug!(
            "Cached {} valid and {} invalid versions, invalidated {}",
            valid.len(),
            invalid.len(),
            invalidated.len()
        );
        Ok(())
    }
}
