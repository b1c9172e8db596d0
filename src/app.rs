use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Config, PROJECT_CONFIG_FILE};
use crate::error::Result;
use crate::loader::Matrix;
use crate::storage::StackStore;
use crate::versioning::FsManifestStore;

pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub robot_mode: bool,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let root = match &cli.root {
            Some(root) => root.clone(),
            None => Self::find_root()?,
        };
        let config = Config::load(cli.config.as_deref(), &root)?;
        debug!(target: "config", root = %root.display(), "project root resolved");

        Ok(Self {
            root,
            config,
            robot_mode: cli.robot,
        })
    }

    fn find_root() -> Result<PathBuf> {
        if let Ok(root) = std::env::var("SMX_ROOT") {
            return Ok(PathBuf::from(root));
        }
        let cwd = std::env::current_dir()?;
        Ok(find_upwards(&cwd, PROJECT_CONFIG_FILE).unwrap_or(cwd))
    }

    /// Parse the matrix and build catalog and graph. Done once per command.
    pub fn load_matrix(&self) -> Result<Matrix> {
        Matrix::load(&self.config.paths.matrix_in(&self.root))
    }

    #[must_use]
    pub fn stacks(&self) -> StackStore {
        StackStore::new(self.config.paths.stacks_in(&self.root))
    }

    #[must_use]
    pub fn manifest_store(&self) -> FsManifestStore {
        FsManifestStore::new(self.config.paths.output_in(&self.root))
    }
}

/// Nearest ancestor of `start` (inclusive) containing the file `name`.
fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(name).is_file())
        .map(Path::to_path_buf)
}
