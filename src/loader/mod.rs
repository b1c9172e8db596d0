//! Matrix loading: the YAML/TOML document that declares categories, units,
//! role templates and presets.
//!
//! Unit bodies may be inline or in a sibling file (`body_file`). Additional
//! units can live one per file under `units_dir`. Units without a
//! `content_hash` get the hash of their body.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::compose::RoleTemplate;
use crate::core::{CategoryRecord, RelationshipGraph, UnitCatalog, UnitRecord};
use crate::error::{Result, SmxError};
use crate::versioning::hash::hash_bytes;

/// A unit as written in a matrix file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitEntry {
    #[serde(flatten)]
    pub record: UnitRecord,
    /// Body read from this path, relative to the declaring file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatrixDocument {
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
    #[serde(default)]
    pub units: Vec<UnitEntry>,
    /// Directory of `*.yaml` unit files, relative to the matrix file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_dir: Option<PathBuf>,
    #[serde(default)]
    pub templates: Vec<RoleTemplate>,
    #[serde(default)]
    pub presets: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    Yaml,
    Toml,
}

impl MatrixFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

impl MatrixDocument {
    pub fn parse(raw: &str, format: MatrixFormat) -> Result<Self> {
        match format {
            MatrixFormat::Yaml => serde_yaml::from_str(raw)
                .map_err(|err| SmxError::InvalidCatalog(format!("matrix YAML parse error: {err}"))),
            MatrixFormat::Toml => toml::from_str(raw)
                .map_err(|err| SmxError::InvalidCatalog(format!("matrix TOML parse error: {err}"))),
        }
    }
}

/// Everything one invocation needs from the matrix. Read-only once built.
#[derive(Debug, Clone)]
pub struct Matrix {
    pub graph: Arc<RelationshipGraph>,
    pub templates: BTreeMap<String, RoleTemplate>,
    /// Preset name to canonical unit ids, in application order.
    pub presets: BTreeMap<String, Vec<String>>,
}

impl Matrix {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SmxError::NotFound(format!("matrix file {}", path.display()))
            } else {
                SmxError::Io(err)
            }
        })?;
        let document = MatrixDocument::parse(&raw, MatrixFormat::from_path(path))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let matrix = Self::from_document(document, base_dir)?;
        info!(
            target: "catalog",
            path = %path.display(),
            units = matrix.catalog().len(),
            templates = matrix.templates.len(),
            presets = matrix.presets.len(),
            "matrix loaded"
        );
        Ok(matrix)
    }

    /// Build from an already parsed document. Relative paths resolve
    /// against `base_dir`.
    pub fn from_document(document: MatrixDocument, base_dir: &Path) -> Result<Self> {
        let MatrixDocument {
            categories,
            units,
            units_dir,
            templates,
            presets,
        } = document;

        let mut records = Vec::with_capacity(units.len());
        for entry in units {
            records.push(finish_record(entry, base_dir)?);
        }
        if let Some(dir) = units_dir {
            records.extend(load_units_dir(&base_dir.join(dir))?);
        }

        let catalog = Arc::new(UnitCatalog::build(categories, records)?);
        let graph = Arc::new(RelationshipGraph::build(catalog)?);

        let mut by_id = BTreeMap::new();
        for template in templates {
            template.validate(graph.catalog())?;
            let id = template.id.clone();
            if by_id.insert(id.clone(), template).is_some() {
                return Err(SmxError::InvalidTemplate {
                    template: id,
                    message: "declared more than once".to_string(),
                });
            }
        }

        let mut canonical_presets = BTreeMap::new();
        for (name, members) in presets {
            let ids = members
                .iter()
                .map(|member| graph.catalog().resolve_name(member).map(str::to_string))
                .collect::<Result<Vec<_>>>()?;
            canonical_presets.insert(name, ids);
        }

        Ok(Self {
            graph,
            templates: by_id,
            presets: canonical_presets,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> &UnitCatalog {
        self.graph.catalog()
    }

    pub fn template(&self, id: &str) -> Result<&RoleTemplate> {
        self.templates
            .get(id)
            .ok_or_else(|| SmxError::NotFound(format!("template {id}")))
    }

    pub fn preset(&self, name: &str) -> Result<&[String]> {
        self.presets
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| SmxError::NotFound(format!("preset {name}")))
    }
}

fn finish_record(entry: UnitEntry, base_dir: &Path) -> Result<UnitRecord> {
    let UnitEntry {
        mut record,
        body_file,
    } = entry;

    if let Some(file) = body_file {
        if !record.body.is_empty() {
            return Err(SmxError::InvalidCatalog(format!(
                "unit {} declares both body and body_file",
                record.id
            )));
        }
        let path = base_dir.join(&file);
        record.body = std::fs::read_to_string(&path).map_err(|err| {
            SmxError::InvalidCatalog(format!(
                "unit {}: read body_file {}: {err}",
                record.id,
                path.display()
            ))
        })?;
    }

    if record.content_hash.is_none() {
        record.content_hash = Some(hash_bytes(record.body.as_bytes()));
    }
    Ok(record)
}

fn load_units_dir(dir: &Path) -> Result<Vec<UnitRecord>> {
    if !dir.is_dir() {
        return Err(SmxError::NotFound(format!("units_dir {}", dir.display())));
    }

    let mut records = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| {
            SmxError::Io(std::io::Error::other(format!("walk {}: {err}", dir.display())))
        })?;
        let path = entry.path();
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        );
        if !entry.file_type().is_file() || !is_yaml {
            continue;
        }

        let raw = std::fs::read_to_string(path)?;
        let unit: UnitEntry = serde_yaml::from_str(&raw).map_err(|err| {
            SmxError::InvalidCatalog(format!("unit file {}: {err}", path.display()))
        })?;
        let base = path.parent().unwrap_or(dir);
        debug!(target: "catalog", file = %path.display(), unit = %unit.record.id, "unit file read");
        records.push(finish_record(unit, base)?);
    }
    Ok(records)
}
