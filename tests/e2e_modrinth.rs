//! End-to-end analysis against a mock Modrinth API

mod helper;

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;

use helper::{create_test_store, project_json, version_json};
use modrinth_compat::compat::analyzer::CompatAnalyzer;
use modrinth_compat::compat::error::AnalyzeError;
use modrinth_compat::version::fetcher::SegmentedFetcher;
use modrinth_compat::version::modrinth::ModrinthCatalog;
use modrinth_compat::version::resolver::VersionResolver;
use modrinth_compat::version::store::SqliteVersionStore;

fn create_analyzer(base_url: &str, store: SqliteVersionStore) -> CompatAnalyzer<SqliteVersionStore> {
    let catalog = ModrinthCatalog::new(base_url);
    let fetcher = SegmentedFetcher::with_limits(Arc::new(catalog), 50, 4, Duration::from_secs(5));
    CompatAnalyzer::new(VersionResolver::new(Arc::new(store), Arc::new(fetcher)), 0)
}

#[tokio::test]
async fn analyze_reports_versions_supported_by_every_project() {
    let mut server = Server::new_async().await;
    let projects = server
        .mock("GET", "/v2/projects")
        .match_query(Matcher::UrlEncoded(
            "ids".into(),
            r#"["sodium","iris","complementary-reimagined"]"#.into(),
        ))
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                project_json("sodium", "mod", &["s1", "s2"]),
                project_json("iris", "mod", &["i1"]),
                project_json("complementary-reimagined", "shader", &["c1"]),
            ])
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;
    let versions = server
        .mock("GET", "/v2/versions")
        .match_query(Matcher::UrlEncoded(
            "ids".into(),
            r#"["c1","i1","s1","s2"]"#.into(),
        ))
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                version_json("s1", &["fabric"], &["1.20.1", "1.19.2"], &[]),
                version_json("s2", &["quilt"], &["1.20.1"], &[]),
                version_json("i1", &["fabric"], &["1.20.1"], &[]),
                version_json("c1", &["iris", "optifine"], &["1.20.1"], &[]),
            ])
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let (_temp_dir, store) = create_test_store();
    let analyzer = create_analyzer(&server.url(), store);
    let input = "https://modrinth.com/mod/sodium\niris\nhttps://modrinth.com/shader/complementary-reimagined\n";

    let report = analyzer.analyze(input).await.unwrap();
    let again = analyzer.analyze(input).await.unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["matrix"], json!({ "fabric": { "1.20.1": ["s1", "i1", "c1"] } }));
    assert_eq!(json["countedProjects"], 3);
    assert_eq!(json["projects"][0]["kind"], "mod");
    assert_eq!(json["projects"][2]["kind"], "shader");
    assert_eq!(json["projects"][0]["validVersions"], 2);
    assert_eq!(json, serde_json::to_value(&again).unwrap());

    projects.assert_async().await;
    versions.assert_async().await;
}

#[tokio::test]
async fn analyze_survives_catalog_outage() {
    let mut server = Server::new_async().await;
    let _projects = server
        .mock("GET", "/v2/projects")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let (_temp_dir, store) = create_test_store();
    let analyzer = create_analyzer(&server.url(), store);

    let report = analyzer.analyze("sodium\nlithium").await.unwrap();

    assert!(report.matrix.is_empty());
    assert_eq!(report.counted_projects, 0);
    assert_eq!(report.unresolved_projects, vec!["lithium", "sodium"]);
}

#[tokio::test]
async fn analyze_rejects_malformed_identifiers() {
    let server = Server::new_async().await;
    let (_temp_dir, store) = create_test_store();
    let analyzer = create_analyzer(&server.url(), store);

    let result = analyzer.analyze("sodium\n<script>").await;

    assert!(matches!(result, Err(AnalyzeError::Input(_))));
}
