use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compose::DEFAULT_SEPARATOR;
use crate::error::{Result, SmxError};

/// Name of the project config file; its directory is the project root.
pub const PROJECT_CONFIG_FILE: &str = "smx.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub compose: ComposeConfig,
    #[serde(default)]
    pub robot: RobotConfig,
}

impl Config {
    /// Defaults, then global and project files (or one explicit file), then
    /// `SMX_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("SMX_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                SmxError::Config(format!("config file not found: {}", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&root.join(PROJECT_CONFIG_FILE))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match dirs::config_dir() {
            Some(dir) => Self::load_patch(&dir.join("smx/config.toml")),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| SmxError::Config(format!("read config {}: {err}", path.display())))?;
        Self::parse_patch(&raw)
            .map(Some)
            .map_err(|err| SmxError::Config(format!("parse config {}: {err}", path.display())))
    }

    fn parse_patch(raw: &str) -> std::result::Result<ConfigPatch, toml::de::Error> {
        toml::from_str(raw)
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.paths {
            self.paths.merge(patch);
        }
        if let Some(patch) = patch.compose {
            self.compose.merge(patch);
        }
        if let Some(patch) = patch.robot {
            self.robot.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = env("SMX_MATRIX") {
            self.paths.matrix = PathBuf::from(value);
        }
        if let Some(value) = env("SMX_STACKS_DIR") {
            self.paths.stacks = PathBuf::from(value);
        }
        if let Some(value) = env("SMX_OUTPUT_DIR") {
            self.paths.output = PathBuf::from(value);
        }
        if let Some(value) = env("SMX_COMPOSE_SEPARATOR") {
            self.compose.separator = unescape(&value);
        }
        if let Some(value) = env("SMX_DEFAULT_TEMPLATE") {
            self.compose.default_template = Some(value);
        }
        if let Some(value) = env("SMX_ROBOT_PRETTY") {
            self.robot.pretty = parse_bool("SMX_ROBOT_PRETTY", &value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Matrix document (YAML or TOML by extension).
    pub matrix: PathBuf,
    /// One JSON selection file per profile.
    pub stacks: PathBuf,
    /// Compiled artifacts and manifests.
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            matrix: PathBuf::from("matrix.yaml"),
            stacks: PathBuf::from(".smx/stacks"),
            output: PathBuf::from("dist"),
        }
    }
}

impl PathsConfig {
    fn merge(&mut self, patch: PathsPatch) {
        if let Some(value) = patch.matrix {
            self.matrix = value;
        }
        if let Some(value) = patch.stacks {
            self.stacks = value;
        }
        if let Some(value) = patch.output {
            self.output = value;
        }
    }

    #[must_use]
    pub fn matrix_in(&self, root: &Path) -> PathBuf {
        root.join(&self.matrix)
    }

    #[must_use]
    pub fn stacks_in(&self, root: &Path) -> PathBuf {
        root.join(&self.stacks)
    }

    #[must_use]
    pub fn output_in(&self, root: &Path) -> PathBuf {
        root.join(&self.output)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    pub separator: String,
    /// Template compiled when `compile` is not given one. Unset means all.
    #[serde(default)]
    pub default_template: Option<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            default_template: None,
        }
    }
}

impl ComposeConfig {
    fn merge(&mut self, patch: ComposePatch) {
        if let Some(value) = patch.separator {
            self.separator = value;
        }
        if let Some(value) = patch.default_template {
            self.default_template = Some(value);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Pretty-print robot JSON.
    #[serde(default)]
    pub pretty: bool,
}

impl RobotConfig {
    fn merge(&mut self, patch: RobotPatch) {
        if let Some(value) = patch.pretty {
            self.pretty = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    pub paths: Option<PathsPatch>,
    pub compose: Option<ComposePatch>,
    pub robot: Option<RobotPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsPatch {
    pub matrix: Option<PathBuf>,
    pub stacks: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ComposePatch {
    pub separator: Option<String>,
    pub default_template: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RobotPatch {
    pub pretty: Option<bool>,
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SmxError::Config(format!("invalid {key} value {value}"))),
    }
}

/// Environment variables cannot easily carry newlines; accept `\n` escapes.
fn unescape(value: &str) -> String {
    value.replace("\\n", "\n").replace("\\t", "\t")
}
