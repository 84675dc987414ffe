//! In-memory catalog for integration tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use modrinth_compat::version::catalog::Catalog;
use modrinth_compat::version::error::CatalogError;

/// Serves canned records and records every batch it is asked for
#[derive(Default)]
pub struct InMemoryCatalog {
    versions: HashMap<String, Value>,
    projects: Vec<Value>,
    failing: HashSet<String>,
    version_requests: Mutex<Vec<Vec<String>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a release version for fabric 1.20.1 requiring `dependencies`
    pub fn with_version(self, id: &str, dependencies: &[&str]) -> Self {
        self.with_raw_version(id, version_json(id, &["fabric"], &["1.20.1"], dependencies))
    }

    pub fn with_raw_version(mut self, id: &str, raw: Value) -> Self {
        self.versions.insert(id.to_string(), raw);
        self
    }

    pub fn with_project(mut self, raw: Value) -> Self {
        self.projects.push(raw);
        self
    }

    /// Any version batch containing `id` fails
    pub fn failing_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    pub fn version_requests(&self) -> Vec<Vec<String>> {
        self.version_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn fetch_versions(&self, ids: &[String]) -> Result<Vec<Value>, CatalogError> {
        self.version_requests.lock().unwrap().push(ids.to_vec());
        if ids.iter().any(|id| self.failing.contains(id)) {
            return Err(CatalogError::InvalidResponse("Unexpected status: 502".into()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.versions.get(id).cloned())
            .collect())
    }

    async fn fetch_projects(&self, ids: &[String]) -> Result<Vec<Value>, CatalogError> {
        Ok(self
            .projects
            .iter()
            .filter(|p| {
                ids.iter().any(|id| {
                    p["id"] == id.as_str()
                        || p["slug"]
                            .as_str()
                            .is_some_and(|slug| slug.eq_ignore_ascii_case(id))
                })
            })
            .cloned()
            .collect())
    }
}

pub fn version_json(id: &str, loaders: &[&str], games: &[&str], dependencies: &[&str]) -> Value {
    json!({
        "id": id,
        "project_id": format!("project-{}", id),
        "name": format!("Version {}", id),
        "version_number": "1.0.0",
        "loaders": loaders,
        "game_versions": games,
        "dependencies": dependencies
            .iter()
            .map(|d| json!({"version_id": d, "project_id": null, "dependency_type": "required"}))
            .collect::<Vec<_>>(),
        "version_type": "release",
        "status": "listed",
        "date_published": "2024-03-01T12:00:00Z"
    })
}

pub fn project_json(slug: &str, project_type: &str, versions: &[&str]) -> Value {
    json!({
        "id": format!("id-{}", slug),
        "slug": slug,
        "title": slug,
        "description": "",
        "client_side": "required",
        "server_side": "optional",
        "project_type": project_type,
        "game_versions": [],
        "loaders": [],
        "versions": versions,
        "updated": "2024-03-01T12:00:00Z"
    })
}
