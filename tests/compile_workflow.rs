//! Compose, hash, and version artifacts against a real output directory.

use std::fs;

use serde_json::json;
use tempfile::TempDir;

use skillmatrix::compose::CompositionEngine;
use skillmatrix::core::SelectionResolver;
use skillmatrix::loader::Matrix;
use skillmatrix::storage::StackStore;
use skillmatrix::test_utils::fixtures::{
    MatrixFixture, frontend_graph, frontend_template, selection,
};
use skillmatrix::versioning::{
    ArtifactKey, FsManifestStore, ManifestStore, VersionStatus, VersionTracker,
};

#[test]
fn test_versions_follow_content_not_runs() {
    let graph = frontend_graph();
    let template = frontend_template();
    let engine = CompositionEngine::new(&graph);
    let out = TempDir::new().unwrap();
    let store = FsManifestStore::new(out.path());
    let tracker = VersionTracker::new(&store);
    let key = ArtifactKey::new("web", "frontend-agent");

    let compile = |ids: &[&str]| {
        let artifact = engine.compose(&selection(ids), &template).unwrap();
        let hash = engine.composed_hash(&artifact, &template).unwrap();
        tracker.track(&key, &artifact, hash).unwrap()
    };

    let first = compile(&["react", "redux"]);
    assert_eq!(first.status, VersionStatus::Created);
    assert_eq!(first.manifest.version, 1);
    let written = fs::read_to_string(store.artifact_path(&key)).unwrap();
    assert!(written.starts_with("You are a frontend engineer.\n\n<slot name=\"stack\">"));

    assert_eq!(compile(&["redux", "react"]).status, VersionStatus::Unchanged);

    let bumped = compile(&["react", "redux", "vitest"]);
    assert_eq!(bumped.status, VersionStatus::Updated);
    assert_eq!(bumped.manifest.version, 2);

    fs::remove_file(store.artifact_path(&key)).unwrap();
    let restored = compile(&["react", "redux", "vitest"]);
    assert_eq!(restored.status, VersionStatus::Restored);
    assert_eq!(restored.manifest.version, 2);
    assert!(store.has_artifact(&key).unwrap());

    let persisted = store.load_manifest(&key).unwrap().unwrap();
    assert_eq!(persisted, restored.manifest);
}

#[test]
fn test_manifest_file_layout() {
    let graph = frontend_graph();
    let template = frontend_template();
    let engine = CompositionEngine::new(&graph);
    let out = TempDir::new().unwrap();
    let store = FsManifestStore::new(out.path());
    let key = ArtifactKey::new("admin", "frontend-agent");

    let artifact = engine
        .compose(&selection(&["vue", "pinia", "jest"]), &template)
        .unwrap();
    let hash = engine.composed_hash(&artifact, &template).unwrap();
    VersionTracker::new(&store)
        .track(&key, &artifact, hash.clone())
        .unwrap();

    let raw = fs::read_to_string(store.manifest_path(&key)).unwrap();
    let mut manifest: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(manifest["composedHash"], json!(hash));
    manifest["composedHash"] = json!("[hash]");
    insta::with_settings!({sort_maps => true}, {
        insta::assert_json_snapshot!(manifest, @r#"
        {
          "artifact": "admin/frontend-agent",
          "composedHash": "[hash]",
          "selectedUnitIds": [
            "jest",
            "pinia",
            "vue"
          ],
          "template": "frontend-agent",
          "version": 1
        }
        "#);
    });
}

#[test]
fn test_matrix_to_artifact_round_trip() {
    let fixture = MatrixFixture::frontend();
    let matrix = Matrix::load(&fixture.matrix_path()).unwrap();
    let resolver = SelectionResolver::new(&matrix.graph);

    let stacks = StackStore::new(fixture.root().join(".smx/stacks"));
    let spa = matrix.preset("spa").unwrap();
    let resolution = resolver.apply_preset(&stacks.load("web").unwrap(), spa).unwrap();
    stacks.save("web", &resolution.selection).unwrap();

    let template = matrix.template("frontend-agent").unwrap();
    let engine = CompositionEngine::new(&matrix.graph);
    let artifact = engine
        .compose(&stacks.load("web").unwrap(), template)
        .unwrap();

    assert_eq!(artifact.selected_unit_ids, vec!["react", "redux", "vitest"]);
    assert!(artifact.content.contains("react body\n\n---\n\nredux body"));
    assert!(artifact.content.contains("<slot name=\"quality\">\nvitest body\n</slot>"));

    let from_fixture = CompositionEngine::new(&frontend_graph())
        .compose(&selection(&["react", "redux", "vitest"]), &frontend_template())
        .unwrap();
    assert_eq!(artifact.content, from_fixture.content);
}
