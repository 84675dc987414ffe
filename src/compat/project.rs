//! Catalog projects and their resolved versions

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::version::error::ShapeError;
use crate::version::stack::ResolutionStack;
use crate::version::types::{InvalidVersionRecord, VersionRecord};

/// Project kinds taking part in the compatibility matrix
///
/// Mods are the primary kind and anchor the set of loaders; shaders and
/// resource packs only add game-version coverage under those loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProjectKind {
    #[serde(rename = "mod")]
    Mod,
    #[serde(rename = "shader")]
    Shader,
    #[serde(rename = "resourcepack")]
    ResourcePack,
}

impl FromStr for ProjectKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mod" => Ok(ProjectKind::Mod),
            "shader" => Ok(ProjectKind::Shader),
            "resourcepack" => Ok(ProjectKind::ResourcePack),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub kind: ProjectKind,
    /// Version ids the project declares
    pub versions: Vec<String>,
    /// Declared versions that resolved valid
    pub parsed_versions: Vec<VersionRecord>,
    /// Declared versions that resolved invalid
    pub invalid_versions: Vec<InvalidVersionRecord>,
}

impl ProjectRecord {
    /// Attach the resolution result of the project's declared versions
    ///
    /// Declared ids the stack has no decision for are left out of both lists.
    pub fn enrich(&mut self, stack: &ResolutionStack) {
        self.parsed_versions = self
            .versions
            .iter()
            .filter_map(|id| stack.get_valid(id).cloned())
            .collect();
        self.invalid_versions = self
            .versions
            .iter()
            .filter_map(|id| stack.get_invalid(id).cloned())
            .collect();
    }

    pub fn has_valid_versions(&self) -> bool {
        !self.parsed_versions.is_empty()
    }
}

/// A project record that could not be used
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidProjectRecord {
    pub id: Option<String>,
    pub slug: Option<String>,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    id: String,
    slug: String,
    title: String,
    project_type: String,
    versions: Vec<String>,
}

/// Parse a raw catalog record into a project
pub fn parse_project(raw: &Value) -> Result<ProjectRecord, ShapeError> {
    if !raw.is_object() {
        return Err(ShapeError::NotAnObject);
    }

    let parsed = RawProject::deserialize(raw).map_err(|e| ShapeError::Malformed(e.to_string()))?;
    if parsed.id.is_empty() {
        return Err(ShapeError::EmptyField("id"));
    }

    let kind = parsed.project_type.parse().map_err(|_| {
        ShapeError::Malformed(format!(
            "unsupported project type {:?}",
            parsed.project_type
        ))
    })?;

    Ok(ProjectRecord {
        id: parsed.id,
        slug: parsed.slug,
        title: parsed.title,
        kind,
        versions: parsed.versions,
        parsed_versions: Vec::new(),
        invalid_versions: Vec::new(),
    })
}

/// Salvage the identity of a project that failed [`parse_project`]
pub fn parse_invalid_project(raw: &Value, reason: &ShapeError) -> InvalidProjectRecord {
    let field = |name: &str| raw.get(name).and_then(Value::as_str).map(str::to_string);

    InvalidProjectRecord {
        id: field("id"),
        slug: field("slug"),
        reason: reason.to_string(),
    }
}

/// Pick between [`parse_project`] and [`parse_invalid_project`]
pub fn classify_project(raw: &Value) -> Result<ProjectRecord, InvalidProjectRecord> {
    parse_project(raw).map_err(|e| {
        debug!("Project record failed validation: {}", e);
        parse_invalid_project(raw, &e)
    })
}

/// Split raw project records into usable and rejected projects
pub fn validate_projects(raw: &[Value]) -> (Vec<ProjectRecord>, Vec<InvalidProjectRecord>) {
    let mut parsed = Vec::new();
    let mut failed = Vec::new();

    for record in raw {
        match classify_project(record) {
            Ok(project) => {
                if !parsed.iter().any(|p: &ProjectRecord| p.id == project.id) {
                    parsed.push(project);
                }
            }
            Err(invalid) => failed.push(invalid),
        }
    }

    (parsed, failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::types::ReleaseChannel;
    use chrono::Utc;
    use rstest::rstest;
    use serde_json::json;

    fn raw_project(project_type: &str) -> Value {
        json!({
            "id": "AANobbMI",
            "slug": "sodium",
            "title": "Sodium",
            "description": "Rendering engine",
            "project_type": project_type,
            "versions": ["v1", "v2", "v3"],
            "game_versions": ["1.20.1"],
            "loaders": ["fabric"]
        })
    }

    #[rstest]
    #[case("mod", ProjectKind::Mod)]
    #[case("shader", ProjectKind::Shader)]
    #[case("resourcepack", ProjectKind::ResourcePack)]
    fn parse_project_maps_project_type(#[case] project_type: &str, #[case] kind: ProjectKind) {
        let project = parse_project(&raw_project(project_type)).unwrap();

        assert_eq!(project.kind, kind);
        assert_eq!(project.slug, "sodium");
        assert_eq!(project.versions, vec!["v1", "v2", "v3"]);
    }

    #[rstest]
    #[case("modpack")]
    #[case("datapack")]
    #[case("plugin")]
    fn parse_project_rejects_unsupported_type(#[case] project_type: &str) {
        assert!(matches!(
            parse_project(&raw_project(project_type)),
            Err(ShapeError::Malformed(_))
        ));
    }

    #[test]
    fn validate_projects_splits_and_salvages_identity() {
        let mut broken = raw_project("mod");
        broken.as_object_mut().unwrap().remove("versions");
        broken["id"] = json!("BROKEN01");
        broken["slug"] = json!("broken");

        let (parsed, failed) =
            validate_projects(&[raw_project("mod"), broken, raw_project("mod")]);

        assert_eq!(parsed.len(), 1);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id.as_deref(), Some("BROKEN01"));
        assert_eq!(failed[0].slug.as_deref(), Some("broken"));
    }

    #[test]
    fn enrich_splits_declared_versions_by_decision() {
        let mut project = parse_project(&raw_project("mod")).unwrap();
        let mut stack = ResolutionStack::new();
        stack.insert_valid(VersionRecord {
            id: "v1".to_string(),
            project_id: "AANobbMI".to_string(),
            name: "v1".to_string(),
            version_number: "1.0".to_string(),
            loaders: vec!["fabric".to_string()],
            game_versions: vec!["1.20.1".to_string()],
            dependencies: vec![],
            channel: ReleaseChannel::Release,
            published: Utc::now(),
        });
        stack.insert_invalid(InvalidVersionRecord::new("v2"));

        project.enrich(&stack);

        assert_eq!(project.parsed_versions.len(), 1);
        assert_eq!(project.parsed_versions[0].id, "v1");
        assert_eq!(project.invalid_versions, vec![InvalidVersionRecord::new("v2")]);
        assert!(project.has_valid_versions());
    }
}
