//! Alias registry lifecycle: populate from the store, rename, use, delete

mod common;

use common::*;
use dashvault_app::Target;
use dashvault_artifacts::{ArtifactType, REGISTRY_FILE_NAME};
use dashvault_common::{load_json, Error};
use dashvault_kibana::mock::MockArtifactStore;

#[test_log::test(tokio::test)]
async fn test_alias_lifecycle() {
    let root = TestRoot::empty();
    let store = MockArtifactStore::with_objects(artifacts(git_dashboard()));
    let mut archivist = root.archivist(&store);

    let summary = archivist.populate_registry(false).await.unwrap();
    assert_eq!(summary.added.len(), 5);

    let (dashboard_alias, meta) = archivist
        .list_registry(Some("dashboard"))
        .unwrap()
        .remove(0);
    assert_eq!(meta.id, "git-dash");
    assert_eq!(meta.title, "Git");

    archivist.update_registry(&dashboard_alias, "git").unwrap();
    let saved = archivist
        .export_to_disk(&Target::alias("git"), false, false)
        .await
        .unwrap();
    assert_eq!(saved.len(), 5);

    let store_copy = MockArtifactStore::new();
    let copy = root.archivist(&store_copy);
    copy.import_from_disk(&Target::alias("git"), true, true)
        .await
        .unwrap();
    assert_eq!(imported_ids(&store_copy).last().map(String::as_str), Some("git-dash"));

    archivist.delete_registry("git").unwrap();
    let err = archivist.query_registry("git").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_registry_file_layout() {
    let root = TestRoot::empty();
    let store = MockArtifactStore::with_objects(artifacts(vec![
        index_pattern("git-ip", "git"),
        search("git-search", "Git search", "git-ip"),
    ]));
    let mut archivist = root.archivist(&store);

    archivist.populate_registry(false).await.unwrap();

    let raw = std::fs::read_to_string(root.join(REGISTRY_FILE_NAME)).unwrap();
    assert!(raw.starts_with("{\n    \"1\": {"));

    let content = load_json(&root.join(REGISTRY_FILE_NAME)).unwrap();
    assert_eq!(content["1"]["id"], "git-ip");
    assert_eq!(content["1"]["type"], "index-pattern");
    assert_eq!(content["2"]["title"], "Git search");
    assert_eq!(content["2"]["version"], 1);
}

#[tokio::test]
async fn test_new_alias_after_delete_skips_taken_keys() {
    let root = TestRoot::empty();
    let store = MockArtifactStore::with_objects(artifacts(vec![
        index_pattern("ip-1", "one"),
        index_pattern("ip-2", "two"),
        index_pattern("ip-3", "three"),
    ]));
    let mut archivist = root.archivist(&store);
    archivist.populate_registry(false).await.unwrap();

    archivist.delete_registry("1").unwrap();
    store.insert(artifacts(vec![index_pattern("ip-4", "four")]).remove(0));
    let summary = archivist.populate_registry(false).await.unwrap();

    assert_eq!(summary.added, vec![("4".to_string(), "ip-1".to_string()), ("5".to_string(), "ip-4".to_string())]);
    assert_eq!(summary.duplicates, vec!["ip-2", "ip-3"]);
    let aliases: Vec<String> = archivist
        .list_registry(None)
        .unwrap()
        .into_iter()
        .map(|(alias, _)| alias)
        .collect();
    assert_eq!(aliases, vec!["2", "3", "4", "5"]);
}

#[tokio::test]
async fn test_list_registry_by_type() {
    let root = TestRoot::empty();
    let store = MockArtifactStore::with_objects(artifacts(git_dashboard()));
    let mut archivist = root.archivist(&store);
    archivist.populate_registry(false).await.unwrap();

    let visualizations = archivist.list_registry(Some("visualization")).unwrap();
    assert_eq!(visualizations.len(), 2);
    assert!(visualizations
        .iter()
        .all(|(_, meta)| meta.artifact_type == ArtifactType::Visualization));

    let err = archivist.list_registry(Some("lens")).unwrap_err();
    assert!(matches!(err, Error::UnknownType(_)));

    archivist.clear_registry().unwrap();
    assert!(archivist.list_registry(None).unwrap().is_empty());
    assert_eq!(
        load_json(&root.join(REGISTRY_FILE_NAME)).unwrap(),
        serde_json::json!({})
    );
}
