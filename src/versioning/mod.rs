//! Content hashing and manifest versioning for composed artifacts

pub mod hash;
pub mod manifest;
pub mod tracker;

pub use manifest::{
    ArtifactKey, ArtifactManifest, FsManifestStore, ManifestStore, MemoryManifestStore,
};
pub use tracker::{TrackOutcome, VersionStatus, VersionTracker};
