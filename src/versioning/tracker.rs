//! Integer versioning of composed artifacts.

use serde::Serialize;
use tracing::{debug, info};

use crate::compose::ComposedArtifact;
use crate::error::Result;

use super::manifest::{ArtifactKey, ArtifactManifest, ManifestStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    /// First compile of this artifact.
    Created,
    /// Content changed; version bumped.
    Updated,
    /// Same content as the persisted manifest; nothing written.
    Unchanged,
    /// Manifest was current but the artifact was missing; rewritten as-is.
    Restored,
}

impl VersionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Restored => "restored",
        }
    }

    #[must_use]
    pub const fn wrote(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackOutcome {
    pub manifest: ArtifactManifest,
    pub status: VersionStatus,
}

pub struct VersionTracker<'s> {
    store: &'s dyn ManifestStore,
}

impl<'s> VersionTracker<'s> {
    #[must_use]
    pub fn new(store: &'s dyn ManifestStore) -> Self {
        Self { store }
    }

    /// Record `artifact` under `key`, bumping the version only if
    /// `composed_hash` differs from what was last persisted.
    pub fn track(
        &self,
        key: &ArtifactKey,
        artifact: &ComposedArtifact,
        composed_hash: String,
    ) -> Result<TrackOutcome> {
        let previous = self.store.load_manifest(key)?;

        let (version, status) = match &previous {
            None => (1, VersionStatus::Created),
            Some(manifest) if manifest.composed_hash == composed_hash => {
                if self.store.has_artifact(key)? {
                    debug!(
                        target: "version",
                        artifact = %key,
                        version = manifest.version,
                        "unchanged"
                    );
                    return Ok(TrackOutcome {
                        manifest: manifest.clone(),
                        status: VersionStatus::Unchanged,
                    });
                }
                (manifest.version, VersionStatus::Restored)
            }
            Some(manifest) => (manifest.version + 1, VersionStatus::Updated),
        };

        let manifest = ArtifactManifest {
            artifact: key.to_string(),
            template: artifact.template_id.clone(),
            selected_unit_ids: artifact.selected_unit_ids.clone(),
            composed_hash,
            version,
        };
        self.store.save(key, &artifact.content, &manifest)?;

        info!(
            target: "version",
            artifact = %key,
            version,
            status = status.as_str(),
            "artifact written"
        );

        Ok(TrackOutcome { manifest, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::logging::capture_logs;
    use crate::versioning::manifest::MemoryManifestStore;

    fn artifact(content: &str, ids: &[&str]) -> ComposedArtifact {
        ComposedArtifact {
            template_id: "agent".into(),
            content: content.into(),
            selected_unit_ids: ids.iter().map(|id| (*id).to_string()).collect(),
            slots: Vec::new(),
        }
    }

    #[test]
    fn versions_start_at_one_and_bump_on_change_only() {
        let store = MemoryManifestStore::new();
        let tracker = VersionTracker::new(&store);
        let key = ArtifactKey::new("web", "agent");

        let first = tracker.track(&key, &artifact("a", &["react"]), "sha256:1".into()).unwrap();
        assert_eq!(first.status, VersionStatus::Created);
        assert_eq!(first.manifest.version, 1);
        assert_eq!(first.manifest.artifact, "web/agent");

        let again = tracker.track(&key, &artifact("a", &["react"]), "sha256:1".into()).unwrap();
        assert_eq!(again.status, VersionStatus::Unchanged);
        assert_eq!(again.manifest, first.manifest);

        let changed = tracker
            .track(&key, &artifact("b", &["react", "redux"]), "sha256:2".into())
            .unwrap();
        assert_eq!(changed.status, VersionStatus::Updated);
        assert_eq!(changed.manifest.version, 2);
        assert_eq!(store.artifact(&key).as_deref(), Some("b"));

        let back = tracker.track(&key, &artifact("a", &["react"]), "sha256:1".into()).unwrap();
        assert_eq!(back.manifest.version, 3);
    }

    #[test]
    fn missing_artifact_is_restored_without_bump() {
        let store = MemoryManifestStore::new();
        let tracker = VersionTracker::new(&store);
        let key = ArtifactKey::new("web", "agent");

        tracker.track(&key, &artifact("a", &[]), "sha256:1".into()).unwrap();
        store.forget_artifact(&key);

        let restored = tracker.track(&key, &artifact("a", &[]), "sha256:1".into()).unwrap();
        assert_eq!(restored.status, VersionStatus::Restored);
        assert_eq!(restored.manifest.version, 1);
        assert!(restored.status.wrote());
        assert_eq!(store.artifact(&key).as_deref(), Some("a"));
    }

    #[test]
    fn writes_are_logged_with_status() {
        let store = MemoryManifestStore::new();
        let tracker = VersionTracker::new(&store);
        let key = ArtifactKey::new("web", "agent");

        let (_, logs) = capture_logs(|| {
            tracker.track(&key, &artifact("a", &[]), "sha256:1".into()).unwrap();
            tracker.track(&key, &artifact("a", &[]), "sha256:1".into()).unwrap();
        });

        let written: Vec<_> = logs
            .iter()
            .filter(|entry| entry.target == "version" && entry.message == "artifact written")
            .collect();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].field("status"), Some("created"));
        assert_eq!(written[0].field("artifact"), Some("web/agent"));
    }
}
