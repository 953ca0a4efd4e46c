//! Archivist over the Kibana HTTP client, against a mocked Kibana

mod common;

use common::*;
use dashvault_app::{ImportOutcome, Target};
use dashvault_artifacts::ArtifactType;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_listing(server: &MockServer, objects: Vec<Value>) {
    let total = objects.len();
    Mock::given(method("GET"))
        .and(path("/api/saved_objects"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1, "per_page": 20, "total": total, "saved_objects": objects
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/saved_objects"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 2, "per_page": 20, "total": 0, "saved_objects": []
        })))
        .mount(server)
        .await;
}

async fn mount_dashboard_export(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/kibana/dashboards/export"))
        .and(query_param("dashboard", "git-dash"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"version": "6.8.0", "objects": git_dashboard()})),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_export_dashboard_by_title_over_http() {
    let server = MockServer::start().await;
    mount_listing(&server, git_dashboard()).await;
    mount_dashboard_export(&server).await;
    let root = TestRoot::empty();

    let saved = root
        .kibana_archivist(&server.uri())
        .export_to_disk(&Target::title(ArtifactType::Dashboard, "Git"), false, false)
        .await
        .unwrap();

    assert_eq!(saved.len(), 5);
    assert!(root.join("dashboard_git-dash.json").is_file());
    assert!(root.join("visualizations/visualization_authors.json").is_file());
    assert!(root.join("index-patterns/index-pattern_git-ip.json").is_file());
}

#[tokio::test]
async fn test_import_with_dependencies_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/kibana/dashboards/import"))
        .and(query_param("force", "false"))
        .and(header("kbn-xsrf", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"objects": []})))
        .expect(5)
        .mount(&server)
        .await;
    let root = TestRoot::with(git_dashboard());

    let outcome = root
        .kibana_archivist(&server.uri())
        .import_from_disk(&Target::id(ArtifactType::Dashboard, "git-dash"), true, false)
        .await
        .unwrap();
    assert!(matches!(outcome, ImportOutcome::Imported { .. }));

    let requests = server.received_requests().await.unwrap();
    let ids: Vec<String> = requests
        .iter()
        .map(|request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            body["objects"][0]["id"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(ids, vec!["git-ip", "git-search", "commits", "authors", "git-dash"]);
}

#[tokio::test]
async fn test_populate_registry_over_http_skips_other_types() {
    let server = MockServer::start().await;
    let mut objects = git_dashboard();
    objects.push(json!({"id": "6.8.0", "type": "config", "version": 1, "attributes": {"buildNum": 1}}));
    mount_listing(&server, objects).await;
    let root = TestRoot::empty();
    let mut archivist = root.kibana_archivist(&server.uri());

    let summary = archivist.populate_registry(false).await.unwrap();

    assert_eq!(summary.added.len(), 5);
    assert!(summary.added.iter().all(|(_, id)| id != "6.8.0"));
    assert_eq!(archivist.query_registry("5").unwrap().id, "git-ip");
}

#[tokio::test]
async fn test_export_missing_dashboard_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/kibana/dashboards/export"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "objects": [{"id": "nope", "type": "dashboard", "error": {"message": "Not found"}}]
        })))
        .mount(&server)
        .await;
    let root = TestRoot::empty();

    let err = root
        .kibana_archivist(&server.uri())
        .export_to_disk(&Target::id(ArtifactType::Dashboard, "nope"), false, false)
        .await
        .unwrap_err();

    assert!(matches!(err, dashvault_common::Error::NotFound(_)));
}
