use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::compose::{RoleTemplate, TemplateSlot};
use crate::core::{CategoryRecord, RelationshipGraph, Selection, UnitCatalog, UnitRecord};
use crate::versioning::hash::hash_bytes;

/// A unit record whose body is `"<id> body"`, hashed.
#[must_use]
pub fn unit(id: &str, category: &str) -> UnitRecord {
    let mut record = UnitRecord::new(id, category);
    record.body = format!("{id} body");
    record.content_hash = Some(hash_bytes(record.body.as_bytes()));
    record
}

fn with(mut record: UnitRecord, edit: impl FnOnce(&mut UnitRecord)) -> UnitRecord {
    edit(&mut record);
    record
}

fn strings(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| (*id).to_string()).collect()
}

/// Small frontend matrix used across tests:
///
/// - `framework` (exclusive): react (recommends vitest), vue
/// - `state`: redux -> react, redux-toolkit -> redux, pinia -> vue, mobx conflicts redux
/// - `testing`: jest conflicts vitest
/// - `analytics`: posthog needs setup from env-setup (`setup`)
/// - `styling`: tailwind discourages css-modules
#[must_use]
pub fn frontend_records() -> (Vec<CategoryRecord>, Vec<UnitRecord>) {
    let categories = vec![
        CategoryRecord {
            id: "framework".into(),
            exclusive: true,
            description: Some("UI framework".into()),
        },
        CategoryRecord {
            id: "state".into(),
            exclusive: false,
            description: None,
        },
    ];
    let records = vec![
        with(unit("react", "framework"), |u| u.recommends = strings(&["vitest"])),
        unit("vue", "framework"),
        with(unit("redux", "state"), |u| u.requires = strings(&["react"])),
        with(unit("redux-toolkit", "state"), |u| {
            u.requires = strings(&["redux"]);
        }),
        with(unit("pinia", "state"), |u| u.requires = strings(&["vue"])),
        with(unit("mobx", "state"), |u| u.conflicts = strings(&["redux"])),
        with(unit("jest", "testing"), |u| u.conflicts = strings(&["vitest"])),
        unit("vitest", "testing"),
        with(unit("posthog", "analytics"), |u| {
            u.requires_setup = strings(&["env-setup"]);
        }),
        unit("env-setup", "setup"),
        with(unit("tailwind", "styling"), |u| {
            u.discourages = strings(&["css-modules"]);
        }),
        unit("css-modules", "styling"),
    ];
    (categories, records)
}

/// # Panics
/// If the fixture records stop forming a valid catalog.
#[must_use]
pub fn frontend_catalog() -> UnitCatalog {
    let (categories, records) = frontend_records();
    UnitCatalog::build(categories, records).expect("frontend fixture catalog")
}

/// # Panics
/// If the fixture records stop forming an acyclic graph.
#[must_use]
pub fn frontend_graph() -> RelationshipGraph {
    RelationshipGraph::build(Arc::new(frontend_catalog())).expect("frontend fixture graph")
}

#[must_use]
pub fn frontend_template() -> RoleTemplate {
    let mut template = RoleTemplate::new(
        "frontend-agent",
        vec![
            TemplateSlot::new("stack", &["framework", "state"]),
            TemplateSlot::new("quality", &["testing"]),
            TemplateSlot::any("everything"),
        ],
    );
    template.preamble = Some("You are a frontend engineer.".into());
    template
}

#[must_use]
pub fn selection(ids: &[&str]) -> Selection {
    ids.iter().copied().collect()
}

/// The frontend fixture as a matrix document.
pub const FRONTEND_MATRIX_YAML: &str = r"categories:
  - id: framework
    exclusive: true
    description: UI framework
  - id: state

units:
  - id: react
    category: framework
    description: React with hooks
    aliases: [reactjs]
    body: react body
    recommends: [vitest]
  - id: vue
    category: framework
    body: vue body
  - id: redux
    category: state
    body: redux body
    requires: [react]
  - id: redux-toolkit
    category: state
    body: redux-toolkit body
    requires: [redux]
  - id: pinia
    category: state
    body: pinia body
    requires: [vue]
  - id: mobx
    category: state
    body: mobx body
    conflicts: [redux]
  - id: jest
    category: testing
    body: jest body
    conflicts: [vitest]
  - id: vitest
    category: testing
    body: vitest body
  - id: posthog
    category: analytics
    body: posthog body
  - id: env-setup
    category: setup
    body: env-setup body
    provides_setup_for: [posthog]
  - id: tailwind
    category: styling
    body: tailwind body
    discourages: [css-modules]
  - id: css-modules
    category: styling
    body: css-modules body

templates:
  - id: frontend-agent
    preamble: You are a frontend engineer.
    slots:
      - name: stack
        categories: [framework, state]
      - name: quality
        categories: [testing]
      - name: everything

presets:
  spa: [react, redux, vitest]
  vue-stack: [pinia, vitest]
";

/// An isolated project directory holding `smx.toml` and a matrix file.
pub struct MatrixFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl MatrixFixture {
    /// # Panics
    /// If the temp directory or files cannot be created.
    #[must_use]
    pub fn new(matrix_yaml: &str) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let root = temp_dir.path().to_path_buf();
        let fixture = Self { temp_dir, root };
        fixture.create_file("smx.toml", "");
        fixture.create_file("matrix.yaml", matrix_yaml);
        fixture
    }

    #[must_use]
    pub fn frontend() -> Self {
        Self::new(FRONTEND_MATRIX_YAML)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn matrix_path(&self) -> PathBuf {
        self.root.join("matrix.yaml")
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("dist")
    }

    /// # Panics
    /// If the file cannot be written.
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.root.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&full_path, content).expect("write fixture file");
        full_path
    }
}
