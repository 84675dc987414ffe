//! Per-request memo of resolved versions
//!
//! The stack records every decision taken during one resolution: which ids
//! resolved valid, which resolved invalid, and which ids were already asked
//! for. It is the cycle guard of the dependency traversal: an id is never
//! requested twice, so tangled or mutually dependent graphs still terminate.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::version::types::{InvalidVersionRecord, VersionRecord};

/// Why a structurally valid version was demoted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemotionCause {
    /// A dependency is invalid or does not exist upstream
    InvalidDependency,
    /// A dependency could not be fetched (failed or timed out request)
    UnresolvedDependency,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demotion {
    pub version: VersionRecord,
    pub cause: DemotionCause,
}

/// Resolution state of one top-level request
///
/// Invariant: an id is in at most one of the valid and invalid maps, and an
/// id in the invalid map never moves back.
#[derive(Debug, Clone, Default)]
pub struct ResolutionStack {
    resolved_valid: HashMap<String, VersionRecord>,
    resolved_invalid: HashMap<String, InvalidVersionRecord>,
    /// Ids sent to the catalog
    queried: HashSet<String>,
    /// Queried ids the catalog answered for without returning a record
    missing: HashSet<String>,
    /// Queried ids whose request failed
    unresolved: HashSet<String>,
    /// Ids whose decision was read back from the store
    from_store: HashSet<String>,
    demotions: HashMap<String, Demotion>,
}

/// Two stacks are equal when they reached the same decisions
impl PartialEq for ResolutionStack {
    fn eq(&self, other: &Self) -> bool {
        self.resolved_valid == other.resolved_valid
            && self.resolved_invalid == other.resolved_invalid
    }
}

impl Eq for ResolutionStack {}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn valid(&self) -> &HashMap<String, VersionRecord> {
        &self.resolved_valid
    }

    pub fn invalid(&self) -> &HashMap<String, InvalidVersionRecord> {
        &self.resolved_invalid
    }

    pub fn get_valid(&self, id: &str) -> Option<&VersionRecord> {
        self.resolved_valid.get(id)
    }

    pub fn get_invalid(&self, id: &str) -> Option<&InvalidVersionRecord> {
        self.resolved_invalid.get(id)
    }

    /// Whether a valid/invalid decision exists for `id`
    pub fn is_decided(&self, id: &str) -> bool {
        self.resolved_valid.contains_key(id) || self.resolved_invalid.contains_key(id)
    }

    /// Whether `id` needs no further lookup or fetch
    pub fn is_known(&self, id: &str) -> bool {
        self.is_decided(id) || self.queried.contains(id)
    }

    pub fn missing(&self) -> &HashSet<String> {
        &self.missing
    }

    pub fn unresolved(&self) -> &HashSet<String> {
        &self.unresolved
    }

    pub fn demotions(&self) -> &HashMap<String, Demotion> {
        &self.demotions
    }

    pub fn is_from_store(&self, id: &str) -> bool {
        self.from_store.contains(id)
    }

    /// Insert a valid record unless its id was already decided invalid
    pub fn insert_valid(&mut self, version: VersionRecord) -> bool {
        if self.resolved_invalid.contains_key(&version.id) {
            return false;
        }
        self.resolved_valid.insert(version.id.clone(), version);
        true
    }

    /// Insert an invalid record, removing any valid record with the same id
    pub fn insert_invalid(&mut self, version: InvalidVersionRecord) {
        self.resolved_valid.remove(&version.id);
        self.resolved_invalid.insert(version.id.clone(), version);
    }

    pub(crate) fn insert_stored_valid(&mut self, version: VersionRecord) {
        self.from_store.insert(version.id.clone());
        self.insert_valid(version);
    }

    pub(crate) fn insert_stored_invalid(&mut self, version: InvalidVersionRecord) {
        self.from_store.insert(version.id.clone());
        self.insert_invalid(version);
    }

    pub(crate) fn mark_queried<'a>(&mut self, ids: impl IntoIterator<Item = &'a String>) {
        self.queried.extend(ids.into_iter().cloned());
    }

    pub(crate) fn record_missing(&mut self, ids: impl IntoIterator<Item = String>) {
        for id in ids {
            if !self.is_decided(&id) {
                self.missing.insert(id);
            }
        }
    }

    pub(crate) fn record_unresolved(&mut self, ids: impl IntoIterator<Item = String>) {
        self.unresolved.extend(ids);
    }

    /// Union of the dependencies of every valid version on the stack
    pub fn dependency_ids(&self) -> HashSet<String> {
        self.resolved_valid
            .values()
            .flat_map(|version| version.dependencies.iter().cloned())
            .collect()
    }

    /// Turn ids the catalog does not know into invalid records
    pub fn materialize_missing(&mut self) {
        let missing: Vec<String> = self
            .missing
            .iter()
            .filter(|id| !self.is_decided(id))
            .cloned()
            .collect();

        for id in missing {
            self.insert_invalid(InvalidVersionRecord::new(id));
        }
    }

    /// Demote every valid version that transitively depends on an invalid or
    /// absent version
    ///
    /// Definitive causes run first so that a demotion is only marked
    /// [`DemotionCause::UnresolvedDependency`] when no invalid dependency
    /// explains it. Returns the number of demotions.
    pub fn propagate_invalid(&mut self) -> usize {
        let definitive = self.demote_where(DemotionCause::InvalidDependency, |stack, id| {
            stack.resolved_invalid.contains_key(id)
                || (!stack.resolved_valid.contains_key(id) && stack.missing.contains(id))
        });
        let provisional = self.demote_where(DemotionCause::UnresolvedDependency, |stack, id| {
            !stack.resolved_valid.contains_key(id)
        });

        definitive + provisional
    }

    fn demote_where(
        &mut self,
        cause: DemotionCause,
        is_bad: impl Fn(&Self, &str) -> bool,
    ) -> usize {
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for version in self.resolved_valid.values() {
            for dependency in &version.dependencies {
                dependents
                    .entry(dependency.clone())
                    .or_default()
                    .push(version.id.clone());
            }
        }

        let mut queue: VecDeque<String> = self
            .resolved_valid
            .values()
            .filter(|version| {
                version
                    .dependencies
                    .iter()
                    .any(|dependency| is_bad(self, dependency))
            })
            .map(|version| version.id.clone())
            .collect();

        let mut demoted = 0;
        while let Some(id) = queue.pop_front() {
            let Some(version) = self.resolved_valid.remove(&id) else {
                continue;
            };
            debug!("Demoting version {} ({:?})", id, cause);

            self.resolved_invalid.insert(id.clone(), version.to_invalid());
            self.demotions.insert(id.clone(), Demotion { version, cause });
            demoted += 1;

            if let Some(parents) = dependents.get(&id) {
                queue.extend(
                    parents
                        .iter()
                        .filter(|parent| self.resolved_valid.contains_key(*parent))
                        .cloned(),
                );
            }
        }

        demoted
    }
}
