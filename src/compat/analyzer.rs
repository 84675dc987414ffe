//! End-to-end compatibility analysis of a project list

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::compat::error::AnalyzeError;
use crate::compat::input::parse_project_ids;
use crate::compat::matrix::{CompatibilityMatrix, ProjectsByKind, build_matrix, prune};
use crate::compat::project::{InvalidProjectRecord, ProjectKind, ProjectRecord, validate_projects};
use crate::version::catalog::RecordKind;
use crate::version::fetcher::{FetchOutcome, SegmentedFetcher};
use crate::version::resolver::VersionResolver;
use crate::version::store::VersionStore;

/// Per-project line of an [`AnalysisReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub kind: ProjectKind,
    pub valid_versions: usize,
    pub invalid_versions: usize,
}

impl From<&ProjectRecord> for ProjectSummary {
    fn from(project: &ProjectRecord) -> Self {
        Self {
            id: project.id.clone(),
            slug: project.slug.clone(),
            title: project.title.clone(),
            kind: project.kind,
            valid_versions: project.parsed_versions.len(),
            invalid_versions: project.invalid_versions.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub matrix: CompatibilityMatrix,
    pub counted_projects: usize,
    pub projects: Vec<ProjectSummary>,
    pub invalid_projects: Vec<InvalidProjectRecord>,
    /// Requested identifiers whose project request failed
    pub unresolved_projects: Vec<String>,
}

pub struct CompatAnalyzer<S: VersionStore> {
    resolver: VersionResolver<S>,
    acceptable_fail_count: usize,
}

impl<S: VersionStore> CompatAnalyzer<S> {
    pub fn new(resolver: VersionResolver<S>, acceptable_fail_count: usize) -> Self {
        Self {
            resolver,
            acceptable_fail_count,
        }
    }

    fn fetcher(&self) -> &Arc<SegmentedFetcher> {
        self.resolver.fetcher()
    }

    /// Fetch raw project records for `ids` (ids or slugs)
    pub async fn request_projects(&self, ids: &[String]) -> FetchOutcome {
        info!("Requesting {} projects", ids.len());
        self.fetcher().fetch(RecordKind::Project, ids).await
    }

    /// Run the whole pipeline on newline-separated project identifiers
    pub async fn analyze(&self, input: &str) -> Result<AnalysisReport, AnalyzeError> {
        let ids = parse_project_ids(input)?;
        let outcome = self.request_projects(&ids).await;

        let (mut projects, mut invalid_projects) = validate_projects(&outcome.records);
        invalid_projects.extend(not_found(&ids, &outcome).into_iter().map(|id| {
            InvalidProjectRecord {
                id: None,
                slug: Some(id),
                reason: "Project not found".to_string(),
            }
        }));

        let mut unresolved_projects: Vec<String> = ids
            .iter()
            .filter(|id| outcome.failed.contains(*id))
            .cloned()
            .collect();
        unresolved_projects.sort();
        if !unresolved_projects.is_empty() {
            warn!(
                "{} projects could not be requested",
                unresolved_projects.len()
            );
        }

        let version_ids: HashSet<String> = projects
            .iter()
            .flat_map(|p| p.versions.iter().cloned())
            .collect();
        let stack = self.resolver.get(&version_ids).await?;

        for project in &mut projects {
            project.enrich(&stack);
        }

        let summaries = projects.iter().map(ProjectSummary::from).collect();
        let grouped = ProjectsByKind::group(projects);
        let counted_projects = grouped.counted_projects();

        let mut matrix = build_matrix(&grouped);
        prune(&mut matrix, counted_projects, self.acceptable_fail_count);

        info!(
            "Analysed {} projects ({} invalid): {} loaders compatible",
            counted_projects,
            invalid_projects.len(),
            matrix.len()
        );

        Ok(AnalysisReport {
            matrix,
            counted_projects,
            projects: summaries,
            invalid_projects,
            unresolved_projects,
        })
    }
}

/// Answered identifiers matching neither the id nor the slug of any record
///
/// Ids are compared exactly; slugs are matched ignoring ASCII case, as the
/// catalog does.
fn not_found(requested: &[String], outcome: &FetchOutcome) -> Vec<String> {
    let field = |record: &Value, name: &str| -> Option<String> {
        record.get(name).and_then(Value::as_str).map(str::to_string)
    };
    let ids: HashSet<String> = outcome.records.iter().filter_map(|r| field(r, "id")).collect();
    let slugs: HashSet<String> = outcome
        .records
        .iter()
        .filter_map(|r| field(r, "slug"))
        .map(|slug| slug.to_ascii_lowercase())
        .collect();

    requested
        .iter()
        .filter(|id| outcome.answered.contains(*id))
        .filter(|id| !ids.contains(*id) && !slugs.contains(&id.to_ascii_lowercase()))
        .cloned()
        .collect()
}
