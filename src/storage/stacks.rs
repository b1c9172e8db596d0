//! One JSON file per profile holding its selection.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Selection;
use crate::error::{Result, SmxError};
use crate::utils::fs::{is_file_stem, read_optional, write_atomic};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFile {
    pub profile: String,
    pub units: Selection,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StackStore {
    dir: PathBuf,
}

impl StackStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, profile: &str) -> Result<PathBuf> {
        validate_profile(profile)?;
        Ok(self.dir.join(format!("{profile}.json")))
    }

    #[must_use]
    pub fn exists(&self, profile: &str) -> bool {
        self.path(profile).is_ok_and(|path| path.is_file())
    }

    /// The stored selection; empty if the profile has never been saved.
    pub fn load(&self, profile: &str) -> Result<Selection> {
        let path = self.path(profile)?;
        let Some(raw) = read_optional(&path)? else {
            debug!(target: "stack", profile, "no stored selection");
            return Ok(Selection::new());
        };
        let file: StackFile = serde_json::from_str(&raw).map_err(|err| {
            SmxError::Serialization(format!("parse stack {}: {err}", path.display()))
        })?;
        Ok(file.units)
    }

    pub fn save(&self, profile: &str, selection: &Selection) -> Result<()> {
        let path = self.path(profile)?;
        let file = StackFile {
            profile: profile.to_string(),
            units: selection.clone(),
            updated_at: Utc::now(),
        };
        let mut json = serde_json::to_string_pretty(&file)?;
        json.push('\n');
        write_atomic(&path, json.as_bytes())?;
        debug!(target: "stack", profile, units = selection.len(), "selection saved");
        Ok(())
    }

    /// Saved profile names, sorted.
    pub fn profiles(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut profiles = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                if validate_profile(stem).is_ok() {
                    profiles.push(stem.to_string());
                }
            }
        }
        profiles.sort();
        Ok(profiles)
    }
}

fn validate_profile(profile: &str) -> Result<()> {
    if is_file_stem(profile) {
        Ok(())
    } else {
        Err(SmxError::ValidationFailed(format!(
            "invalid profile name {profile:?} (use letters, digits, '-', '_' or '.')"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::selection;
    use tempfile::tempdir;

    #[test]
    fn missing_profile_loads_empty() {
        let dir = tempdir().unwrap();
        let store = StackStore::new(dir.path().join("stacks"));
        assert!(store.load("web").unwrap().is_empty());
        assert!(!store.exists("web"));
        assert!(store.profiles().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_and_list() {
        let dir = tempdir().unwrap();
        let store = StackStore::new(dir.path());
        store.save("web", &selection(&["redux", "react"])).unwrap();
        store.save("api", &selection(&[])).unwrap();

        assert_eq!(store.load("web").unwrap(), selection(&["react", "redux"]));
        assert_eq!(store.profiles().unwrap(), vec!["api", "web"]);

        let raw = std::fs::read_to_string(dir.path().join("web.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["units"], serde_json::json!(["react", "redux"]));
        assert_eq!(value["profile"], "web");
    }

    #[test]
    fn rejects_path_like_profiles() {
        let store = StackStore::new("/tmp/unused");
        for bad in ["", "../etc", "a/b", ".hidden", "sp ace"] {
            assert!(matches!(store.path(bad), Err(SmxError::ValidationFailed(_))), "{bad}");
        }
        assert!(store.path("web-1.v2").is_ok());
    }
}
