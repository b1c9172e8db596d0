//! Persisted artifact manifests and the stores that hold them.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SmxError};
use crate::utils::fs::{is_file_stem, read_optional, write_atomic};

/// Identifies one artifact: a profile compiled against one template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub profile: String,
    pub template: String,
}

impl ArtifactKey {
    #[must_use]
    pub fn new(profile: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            template: template.into(),
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.profile, self.template)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    pub artifact: String,
    pub template: String,
    pub selected_unit_ids: Vec<String>,
    pub composed_hash: String,
    pub version: u64,
}

/// Where manifests and artifact bytes live between compiles.
pub trait ManifestStore: Send + Sync {
    fn load_manifest(&self, key: &ArtifactKey) -> Result<Option<ArtifactManifest>>;

    fn has_artifact(&self, key: &ArtifactKey) -> Result<bool>;

    /// Persist artifact bytes and manifest together.
    fn save(&self, key: &ArtifactKey, content: &str, manifest: &ArtifactManifest) -> Result<()>;
}

/// `<root>/<profile>/<template>.md` next to `<template>.manifest.json`.
#[derive(Debug, Clone)]
pub struct FsManifestStore {
    root: PathBuf,
}

impl FsManifestStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn artifact_path(&self, key: &ArtifactKey) -> PathBuf {
        self.root
            .join(&key.profile)
            .join(format!("{}.md", key.template))
    }

    #[must_use]
    pub fn manifest_path(&self, key: &ArtifactKey) -> PathBuf {
        self.root
            .join(&key.profile)
            .join(format!("{}.manifest.json", key.template))
    }
}

impl ManifestStore for FsManifestStore {
    fn load_manifest(&self, key: &ArtifactKey) -> Result<Option<ArtifactManifest>> {
        let path = self.manifest_path(key);
        let Some(raw) = read_optional(&path)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map(Some).map_err(|err| {
            SmxError::Serialization(format!("parse manifest {}: {err}", path.display()))
        })
    }

    fn has_artifact(&self, key: &ArtifactKey) -> Result<bool> {
        Ok(self.artifact_path(key).is_file())
    }

    fn save(&self, key: &ArtifactKey, content: &str, manifest: &ArtifactManifest) -> Result<()> {
        if !is_file_stem(&key.profile) || !is_file_stem(&key.template) {
            return Err(SmxError::ValidationFailed(format!(
                "artifact {key} does not map to a file under {}",
                self.root.display()
            )));
        }
        // Artifact first: a manifest never describes bytes that are not on disk.
        write_atomic(self.artifact_path(key), content.as_bytes())?;
        let mut json = serde_json::to_string_pretty(manifest)?;
        json.push('\n');
        write_atomic(self.manifest_path(key), json.as_bytes())
    }
}

/// In-process store, mainly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    entries: Mutex<HashMap<ArtifactKey, (Option<String>, ArtifactManifest)>>,
}

impl MemoryManifestStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn artifact(&self, key: &ArtifactKey) -> Option<String> {
        self.entries
            .lock()
            .get(key)
            .and_then(|(content, _)| content.clone())
    }

    /// Drop the artifact bytes but keep the manifest.
    pub fn forget_artifact(&self, key: &ArtifactKey) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.0 = None;
        }
    }
}

impl ManifestStore for MemoryManifestStore {
    fn load_manifest(&self, key: &ArtifactKey) -> Result<Option<ArtifactManifest>> {
        Ok(self.entries.lock().get(key).map(|(_, manifest)| manifest.clone()))
    }

    fn has_artifact(&self, key: &ArtifactKey) -> Result<bool> {
        Ok(self
            .entries
            .lock()
            .get(key)
            .is_some_and(|(content, _)| content.is_some()))
    }

    fn save(&self, key: &ArtifactKey, content: &str, manifest: &ArtifactManifest) -> Result<()> {
        self.entries
            .lock()
            .insert(key.clone(), (Some(content.to_string()), manifest.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manifest() -> ArtifactManifest {
        ArtifactManifest {
            artifact: "web/frontend-agent".into(),
            template: "frontend-agent".into(),
            selected_unit_ids: vec!["react".into(), "redux".into()],
            composed_hash: "sha256:abc".into(),
            version: 3,
        }
    }

    #[test]
    fn manifest_uses_camel_case_keys() {
        let json = serde_json::to_value(manifest()).unwrap();
        assert_eq!(json["selectedUnitIds"][1], "redux");
        assert_eq!(json["composedHash"], "sha256:abc");
        assert_eq!(json["version"], 3);
    }

    #[test]
    fn fs_store_lays_out_profile_directories() {
        let dir = tempdir().unwrap();
        let store = FsManifestStore::new(dir.path());
        let key = ArtifactKey::new("web", "frontend-agent");

        assert!(store.load_manifest(&key).unwrap().is_none());
        assert!(!store.has_artifact(&key).unwrap());

        store.save(&key, "content\n", &manifest()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("web/frontend-agent.md")).unwrap(),
            "content\n"
        );
        assert!(dir.path().join("web/frontend-agent.manifest.json").is_file());
        assert_eq!(store.load_manifest(&key).unwrap(), Some(manifest()));
        assert!(store.has_artifact(&key).unwrap());
    }

    #[test]
    fn fs_store_refuses_keys_outside_its_root() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("out");
        let store = FsManifestStore::new(&out);

        for key in [
            ArtifactKey::new("web", "../../escaped"),
            ArtifactKey::new("..", "agent"),
        ] {
            assert!(matches!(
                store.save(&key, "content\n", &manifest()),
                Err(SmxError::ValidationFailed(_))
            ));
        }
        assert!(!dir.path().join("escaped.md").exists());
        assert!(!dir.path().join("agent.md").exists());
    }

    #[test]
    fn fs_store_reports_corrupt_manifest() {
        let dir = tempdir().unwrap();
        let store = FsManifestStore::new(dir.path());
        let key = ArtifactKey::new("web", "agent");
        std::fs::create_dir_all(dir.path().join("web")).unwrap();
        std::fs::write(store.manifest_path(&key), "{not json").unwrap();
        assert!(matches!(
            store.load_manifest(&key),
            Err(SmxError::Serialization(_))
        ));
    }

    #[test]
    fn memory_store_can_lose_artifact() {
        let store = MemoryManifestStore::new();
        let key = ArtifactKey::new("web", "agent");
        store.save(&key, "x", &manifest()).unwrap();
        assert_eq!(store.artifact(&key).as_deref(), Some("x"));
        store.forget_artifact(&key);
        assert!(!store.has_artifact(&key).unwrap());
        assert!(store.load_manifest(&key).unwrap().is_some());
    }
}
