//! Shape validation of raw catalog version records
//!
//! A raw record either matches the full version shape and becomes a
//! [`VersionRecord`], or is reduced to an [`InvalidVersionRecord`] carrying
//! whatever identity could be salvaged from it.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::version::error::ShapeError;
use crate::version::types::{InvalidVersionRecord, ReleaseChannel, VersionRecord};

/// Outcome of validating one raw record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    Valid(VersionRecord),
    Invalid(InvalidVersionRecord),
}

#[derive(Debug, Deserialize)]
struct RawVersion {
    id: String,
    project_id: String,
    name: String,
    version_number: String,
    loaders: Vec<String>,
    game_versions: Vec<String>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    version_type: ReleaseChannel,
    date_published: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDependency {
    VersionId(String),
    Detailed {
        #[serde(default)]
        version_id: Option<String>,
        #[serde(default)]
        dependency_type: Option<String>,
    },
}

impl RawDependency {
    /// Version id this entry pins, if it is a hard requirement
    fn required_version_id(self) -> Option<String> {
        match self {
            RawDependency::VersionId(id) => Some(id),
            RawDependency::Detailed {
                version_id,
                dependency_type,
            } => match dependency_type.as_deref() {
                None | Some("required") => version_id,
                Some(_) => None,
            },
        }
    }
}

/// Parse a raw record into a valid version
pub fn parse_version(raw: &Value) -> Result<VersionRecord, ShapeError> {
    if !raw.is_object() {
        return Err(ShapeError::NotAnObject);
    }

    let parsed = RawVersion::deserialize(raw).map_err(|e| ShapeError::Malformed(e.to_string()))?;

    if parsed.id.is_empty() {
        return Err(ShapeError::EmptyField("id"));
    }
    if parsed.loaders.is_empty() {
        return Err(ShapeError::EmptyField("loaders"));
    }
    if parsed.game_versions.is_empty() {
        return Err(ShapeError::EmptyField("game_versions"));
    }

    let mut dependencies: Vec<String> = Vec::new();
    for id in parsed
        .dependencies
        .into_iter()
        .filter_map(RawDependency::required_version_id)
    {
        if !dependencies.contains(&id) {
            dependencies.push(id);
        }
    }

    Ok(VersionRecord {
        id: parsed.id,
        project_id: parsed.project_id,
        name: parsed.name,
        version_number: parsed.version_number,
        loaders: parsed.loaders,
        game_versions: parsed.game_versions,
        dependencies,
        channel: parsed.version_type,
        published: parsed.date_published,
    })
}

/// Salvage the identity of a record that failed [`parse_version`]
///
/// Returns `None` when the record does not even carry a string id.
pub fn parse_invalid_version(raw: &Value) -> Option<InvalidVersionRecord> {
    let id = raw.get("id")?.as_str().filter(|id| !id.is_empty())?;
    let project_id = raw
        .get("project_id")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(InvalidVersionRecord {
        id: id.to_string(),
        project_id,
    })
}

/// Validate a raw record, falling back to the invalid shape on mismatch
pub fn classify_version(raw: &Value) -> Option<Classified> {
    match parse_version(raw) {
        Ok(version) => Some(Classified::Valid(version)),
        Err(_) => parse_invalid_version(raw).map(Classified::Invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn raw_version() -> Value {
        json!({
            "id": "IIJJKKLL",
            "project_id": "AABBCCDD",
            "name": "Sodium 0.5.3",
            "version_number": "mc1.20.1-0.5.3",
            "loaders": ["fabric", "quilt"],
            "game_versions": ["1.20.1"],
            "dependencies": [],
            "version_type": "release",
            "date_published": "2023-09-20T18:03:05.000000Z",
            "status": "listed",
            "downloads": 1234
        })
    }

    #[test]
    fn parse_version_accepts_full_record() {
        let result = parse_version(&raw_version()).unwrap();

        assert_eq!(result.id, "IIJJKKLL");
        assert_eq!(result.project_id, "AABBCCDD");
        assert_eq!(result.loaders, vec!["fabric", "quilt"]);
        assert_eq!(result.game_versions, vec!["1.20.1"]);
        assert_eq!(result.channel, ReleaseChannel::Release);
        assert!(result.dependencies.is_empty());
    }

    #[test]
    fn parse_version_keeps_only_required_pinned_dependencies() {
        let mut raw = raw_version();
        raw["dependencies"] = json!([
            {"version_id": "REQ00001", "project_id": "P1", "dependency_type": "required"},
            {"version_id": "OPT00001", "project_id": "P2", "dependency_type": "optional"},
            {"version_id": null, "project_id": "P3", "dependency_type": "required"},
            {"version_id": "INC00001", "dependency_type": "incompatible"},
            {"version_id": "EMB00001", "dependency_type": "embedded"},
            "BARE0001",
            {"version_id": "REQ00001", "dependency_type": "required"}
        ]);

        let result = parse_version(&raw).unwrap();

        assert_eq!(result.dependencies, vec!["REQ00001", "BARE0001"]);
    }

    #[rstest]
    #[case("loaders", json!([]), ShapeError::EmptyField("loaders"))]
    #[case("game_versions", json!([]), ShapeError::EmptyField("game_versions"))]
    #[case("id", json!(""), ShapeError::EmptyField("id"))]
    fn parse_version_rejects_empty_required_fields(
        #[case] field: &str,
        #[case] value: Value,
        #[case] expected: ShapeError,
    ) {
        let mut raw = raw_version();
        raw[field] = value;

        assert_eq!(parse_version(&raw), Err(expected));
    }

    #[rstest]
    #[case("loaders")]
    #[case("game_versions")]
    #[case("project_id")]
    #[case("version_type")]
    #[case("date_published")]
    fn parse_version_rejects_missing_fields(#[case] field: &str) {
        let mut raw = raw_version();
        raw.as_object_mut().unwrap().remove(field);

        assert!(matches!(parse_version(&raw), Err(ShapeError::Malformed(_))));
    }

    #[test]
    fn parse_version_rejects_unknown_channel() {
        let mut raw = raw_version();
        raw["version_type"] = json!("nightly");

        assert!(matches!(parse_version(&raw), Err(ShapeError::Malformed(_))));
    }

    #[test]
    fn parse_version_rejects_non_object() {
        assert_eq!(parse_version(&json!(["id"])), Err(ShapeError::NotAnObject));
    }

    #[rstest]
    #[case(json!({"id": "X1", "project_id": "P1"}), Some(("X1", Some("P1"))))]
    #[case(json!({"id": "X1", "project_id": 42}), Some(("X1", None)))]
    #[case(json!({"id": "X1"}), Some(("X1", None)))]
    #[case(json!({"id": ""}), None)]
    #[case(json!({"id": 7}), None)]
    #[case(json!("X1"), None)]
    fn parse_invalid_version_salvages_identity(
        #[case] raw: Value,
        #[case] expected: Option<(&str, Option<&str>)>,
    ) {
        let expected = expected.map(|(id, project_id)| InvalidVersionRecord {
            id: id.to_string(),
            project_id: project_id.map(str::to_string),
        });

        assert_eq!(parse_invalid_version(&raw), expected);
    }

    #[test]
    fn classify_version_falls_back_to_invalid_record() {
        let mut raw = raw_version();
        raw["loaders"] = json!("fabric");

        assert_eq!(
            classify_version(&raw),
            Some(Classified::Invalid(InvalidVersionRecord {
                id: "IIJJKKLL".to_string(),
                project_id: Some("AABBCCDD".to_string()),
            }))
        );
    }
}
