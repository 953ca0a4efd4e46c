//! Export to disk, then import back, through the mock store

mod common;

use common::*;
use dashvault_app::{ImportOutcome, Target};
use dashvault_artifacts::{Artifact, ArtifactType, SaveOutcome};
use dashvault_common::Error;
use dashvault_kibana::mock::MockArtifactStore;

#[tokio::test]
async fn test_exported_dashboard_imports_in_dependency_order() {
    let root = TestRoot::empty();
    let source = MockArtifactStore::with_objects(artifacts(git_dashboard()));

    let saved = root
        .archivist(&source)
        .export_to_disk(&Target::title(ArtifactType::Dashboard, "Git"), false, false)
        .await
        .unwrap();
    assert_eq!(saved.len(), 5);
    assert!(root.join("dashboard_git-dash.json").is_file());
    assert!(root.join("visualizations/visualization_commits.json").is_file());
    assert!(root.join("searches/search_git-search.json").is_file());
    assert!(root.join("index-patterns/index-pattern_git-ip.json").is_file());

    let target = MockArtifactStore::new();
    let outcome = root
        .archivist(&target)
        .import_from_disk(&Target::id(ArtifactType::Dashboard, "git-dash"), true, false)
        .await
        .unwrap();

    let ImportOutcome::Imported { files, report } = outcome else {
        panic!("Expected the dashboard to be imported");
    };
    assert_eq!(files.len(), 5);
    assert!(report.is_success());
    assert_eq!(
        imported_ids(&target),
        vec!["git-ip", "git-search", "commits", "authors", "git-dash"]
    );

    let mut expected = artifacts(git_dashboard());
    let mut actual = target.objects();
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    actual.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_import_without_visualizations_folder_sends_dashboard_only() {
    let root = TestRoot::with(vec![
        dashboard("git-dash", "Git", &[("visualization", "commits")]),
        index_pattern("git-ip", "git"),
    ]);
    let store = MockArtifactStore::new();

    root.archivist(&store)
        .import_from_disk(&Target::id(ArtifactType::Dashboard, "git-dash"), true, false)
        .await
        .unwrap();

    assert_eq!(imported_ids(&store), vec!["git-dash"]);
}

#[tokio::test]
async fn test_import_missing_panel_sends_nothing() {
    let root = TestRoot::with(vec![
        dashboard("git-dash", "Git", &[("visualization", "commits"), ("visualization", "gone")]),
        visualization("commits", "Commits", None, None),
    ]);
    let store = MockArtifactStore::new();

    let err = root
        .archivist(&store)
        .import_from_disk(&Target::id(ArtifactType::Dashboard, "git-dash"), true, false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.to_string().contains("visualization_gone.json"));
    assert!(store.recorded_imports().is_empty());
}

#[tokio::test]
async fn test_import_unsupported_panel_sends_nothing() {
    let root = TestRoot::with(vec![
        dashboard("git-dash", "Git", &[("map", "world")]),
        visualization("commits", "Commits", None, None),
    ]);
    let store = MockArtifactStore::new();

    let err = root
        .archivist(&store)
        .import_from_disk(&Target::id(ArtifactType::Dashboard, "git-dash"), true, false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedPanelType(_)));
    assert!(store.recorded_imports().is_empty());
}

#[tokio::test]
async fn test_reexport_keeps_local_edits_unless_forced() {
    let root = TestRoot::empty();
    let store = MockArtifactStore::with_objects(artifacts(git_dashboard()));
    let archivist = root.archivist(&store);
    let target = Target::id(ArtifactType::Visualization, "authors");
    let path = root.join("visualizations/visualization_authors.json");

    archivist.export_to_disk(&target, false, true).await.unwrap();
    assert!(root.join("index-patterns/index-pattern_git-ip.json").is_file());

    let mut edited = Artifact::load(&path).unwrap();
    edited.attributes.insert("title".to_string(), serde_json::json!("Edited"));
    dashvault_common::save_json(&edited, &path).unwrap();

    let kept = archivist.export_to_disk(&target, false, false).await.unwrap();
    assert_eq!(kept, vec![SaveOutcome::Kept(path.clone())]);
    assert_eq!(Artifact::load(&path).unwrap().title(), Some("Edited"));

    let written = archivist.export_to_disk(&target, true, false).await.unwrap();
    assert_eq!(written, vec![SaveOutcome::Written(path.clone())]);
    assert_eq!(Artifact::load(&path).unwrap().title(), Some("Authors"));
}

#[tokio::test]
async fn test_export_unknown_dashboard() {
    let root = TestRoot::empty();
    let store = MockArtifactStore::with_objects(artifacts(git_dashboard()));

    let err = root
        .archivist(&store)
        .export_to_disk(&Target::id(ArtifactType::Dashboard, "nope"), false, false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(std::fs::read_dir(root.path())
        .unwrap()
        .all(|entry| entry.unwrap().file_name() == ".registry"));
}
