//! Loader / game-version compatibility matrix

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::compat::project::{ProjectKind, ProjectRecord};

/// loader → game version → ids of the versions supporting it
pub type CompatibilityMatrix = IndexMap<String, IndexMap<String, Vec<String>>>;

/// Projects grouped by the pass that consumes them
#[derive(Debug, Default, Clone)]
pub struct ProjectsByKind {
    pub mods: Vec<ProjectRecord>,
    pub shaders: Vec<ProjectRecord>,
    pub resource_packs: Vec<ProjectRecord>,
}

impl ProjectsByKind {
    pub fn group(projects: impl IntoIterator<Item = ProjectRecord>) -> Self {
        let mut grouped = Self::default();
        for project in projects {
            match project.kind {
                ProjectKind::Mod => grouped.mods.push(project),
                ProjectKind::Shader => grouped.shaders.push(project),
                ProjectKind::ResourcePack => grouped.resource_packs.push(project),
            }
        }
        grouped
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectRecord> {
        self.mods
            .iter()
            .chain(self.shaders.iter())
            .chain(self.resource_packs.iter())
    }

    /// Number of projects that can contribute to the matrix at all
    pub fn counted_projects(&self) -> usize {
        let mut ids: Vec<&str> = self
            .iter()
            .filter(|p| p.has_valid_versions())
            .map(|p| p.id.as_str())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }
}

/// Build the unpruned matrix
///
/// Only mods introduce loaders. Shaders and then resource packs are spread
/// across every loader the mods produced.
pub fn build_matrix(projects: &ProjectsByKind) -> CompatibilityMatrix {
    let mut matrix = CompatibilityMatrix::new();

    for project in &projects.mods {
        for version in &project.parsed_versions {
            for loader in &version.loaders {
                let games = matrix.entry(loader.clone()).or_default();
                for game in &version.game_versions {
                    push_unique(games.entry(game.clone()).or_default(), &version.id);
                }
            }
        }
    }

    for project in projects.shaders.iter().chain(projects.resource_packs.iter()) {
        for version in &project.parsed_versions {
            for games in matrix.values_mut() {
                for game in &version.game_versions {
                    push_unique(games.entry(game.clone()).or_default(), &version.id);
                }
            }
        }
    }

    debug!(
        "Built matrix with {} loaders from {} mods, {} shaders and {} resource packs",
        matrix.len(),
        projects.mods.len(),
        projects.shaders.len(),
        projects.resource_packs.len()
    );
    matrix
}

/// Drop game versions supported by fewer than `total - acceptable_fail`
/// versions, then loaders left empty
///
/// The quorum counts version ids, not projects. A project with several
/// versions on the same loader and game version counts once per version, so
/// a surviving entry does not prove that every project supports it.
pub fn prune(matrix: &mut CompatibilityMatrix, total: usize, acceptable_fail: usize) {
    let threshold = total.saturating_sub(acceptable_fail);

    for (loader, games) in matrix.iter_mut() {
        games.retain(|game, ids| {
            let keep = ids.len() >= threshold;
            if !keep {
                debug!(
                    "Dropping {}/{}: {} of {} required",
                    loader,
                    game,
                    ids.len(),
                    threshold
                );
            }
            keep
        });
    }
    matrix.retain(|_, games| !games.is_empty());

    info!(
        "Pruned matrix to {} loaders (threshold {})",
        matrix.len(),
        threshold
    );
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}
