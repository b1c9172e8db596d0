//! Immutable index of all known units.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::error::{Result, SmxError};

use super::unit::{CategoryRecord, EdgeKind, Relations, Unit, UnitRecord};

#[derive(Debug, Clone, Default)]
struct CategoryInfo {
    exclusive: bool,
    description: Option<String>,
    members: BTreeSet<String>,
}

/// Units indexed by id and category. Built once, never mutated; a changed
/// matrix means a new catalog.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    units: BTreeMap<String, Unit>,
    categories: BTreeMap<String, CategoryInfo>,
    aliases: HashMap<String, String>,
}

impl UnitCatalog {
    /// Build a catalog, validating every relationship declaration.
    pub fn build(categories: Vec<CategoryRecord>, records: Vec<UnitRecord>) -> Result<Self> {
        let mut catalog = Self::default();
        // category -> (exclusive, who said so)
        let mut exclusivity: HashMap<String, (bool, String)> = HashMap::new();

        for category in categories {
            if category.id.trim().is_empty() {
                return Err(SmxError::InvalidCatalog(
                    "category id must be non-empty".to_string(),
                ));
            }
            if catalog.categories.contains_key(&category.id) {
                return Err(SmxError::InvalidCatalog(format!(
                    "duplicate category: {}",
                    category.id
                )));
            }
            exclusivity.insert(
                category.id.clone(),
                (category.exclusive, format!("category table entry {}", category.id)),
            );
            catalog.categories.insert(
                category.id,
                CategoryInfo {
                    exclusive: category.exclusive,
                    description: category.description,
                    members: BTreeSet::new(),
                },
            );
        }

        let mut records = records;
        records.sort_by(|a, b| a.id.cmp(&b.id));

        for record in &records {
            if record.id.trim().is_empty() {
                return Err(SmxError::InvalidCatalog(
                    "unit id must be non-empty".to_string(),
                ));
            }
            if record.category.trim().is_empty() {
                return Err(SmxError::InvalidCatalog(format!(
                    "unit {} has an empty category",
                    record.id
                )));
            }
            if catalog.units.contains_key(&record.id) {
                return Err(SmxError::InvalidCatalog(format!(
                    "duplicate unit id: {}",
                    record.id
                )));
            }

            if let Some(exclusive) = record.exclusive {
                match exclusivity.get(&record.category) {
                    Some((declared, source)) if *declared != exclusive => {
                        return Err(SmxError::InvalidCatalog(format!(
                            "category {} is declared {} by {source} but {} by unit {}",
                            record.category,
                            exclusive_label(*declared),
                            exclusive_label(exclusive),
                            record.id
                        )));
                    }
                    Some(_) => {}
                    None => {
                        exclusivity.insert(
                            record.category.clone(),
                            (exclusive, format!("unit {}", record.id)),
                        );
                    }
                }
            }

            let info = catalog.categories.entry(record.category.clone()).or_default();
            info.members.insert(record.id.clone());

            catalog.units.insert(
                record.id.clone(),
                Unit {
                    id: record.id.clone(),
                    category: record.category.clone(),
                    description: record.description.clone(),
                    body: record.body.clone(),
                    content_hash: record.content_hash.clone().unwrap_or_default(),
                    aliases: record.aliases.clone(),
                    relations: Relations::default(),
                },
            );
        }

        for (category, (exclusive, _)) in exclusivity {
            if let Some(info) = catalog.categories.get_mut(&category) {
                info.exclusive = exclusive;
            }
        }

        catalog.index_aliases(&records)?;
        catalog.link_relations(&records)?;

        debug!(
            target: "catalog",
            units = catalog.units.len(),
            categories = catalog.categories.len(),
            "catalog built"
        );
        Ok(catalog)
    }

    fn index_aliases(&mut self, records: &[UnitRecord]) -> Result<()> {
        for record in records {
            for alias in &record.aliases {
                if alias.trim().is_empty() {
                    return Err(SmxError::InvalidCatalog(format!(
                        "unit {} declares an empty alias",
                        record.id
                    )));
                }
                if self.units.contains_key(alias) && alias != &record.id {
                    return Err(SmxError::InvalidCatalog(format!(
                        "alias {alias} of unit {} shadows another unit id",
                        record.id
                    )));
                }
                if let Some(owner) = self.aliases.insert(alias.clone(), record.id.clone()) {
                    if owner != record.id {
                        return Err(SmxError::InvalidCatalog(format!(
                            "alias {alias} is claimed by both {owner} and {}",
                            record.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn link_relations(&mut self, records: &[UnitRecord]) -> Result<()> {
        let mut edges: Vec<(String, EdgeKind, String)> = Vec::new();
        for record in records {
            for (kind, target) in record.declared_edges() {
                self.ensure_referenced(target, &record.id, kind)?;
                if kind == EdgeKind::Conflicts && target == record.id {
                    return Err(SmxError::InvalidCatalog(format!(
                        "unit {} declares a conflict with itself",
                        record.id
                    )));
                }
                edges.push((record.id.clone(), kind, target.to_string()));
                if kind == EdgeKind::Conflicts {
                    edges.push((target.to_string(), kind, record.id.clone()));
                }
            }

            for target in record.incoming_setup() {
                self.ensure_referenced(target, &record.id, EdgeKind::SetupDependency)?;
                edges.push((target.to_string(), EdgeKind::SetupDependency, record.id.clone()));
            }
        }

        for (from, kind, to) in edges {
            if let Some(unit) = self.units.get_mut(&from) {
                unit.relations.get_mut(kind).insert(to);
            }
        }
        Ok(())
    }

    fn ensure_referenced(&self, target: &str, source: &str, kind: EdgeKind) -> Result<()> {
        if self.units.contains_key(target) {
            return Ok(());
        }
        Err(SmxError::UnknownUnitReference {
            unit: target.to_string(),
            referenced_by: Some((source.to_string(), kind)),
        })
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Look up a unit, failing with `UnknownUnitReference`.
    pub fn require(&self, id: &str) -> Result<&Unit> {
        self.units.get(id).ok_or_else(|| SmxError::unknown_unit(id))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    /// Resolve a unit id or alias to the canonical id.
    pub fn resolve_name(&self, name: &str) -> Result<&str> {
        if let Some((id, _)) = self.units.get_key_value(name) {
            return Ok(id.as_str());
        }
        self.aliases
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| SmxError::unknown_unit(name))
    }

    /// Units in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Members of a category in id order; empty for unknown categories.
    #[must_use]
    pub fn units_in_category(&self, category: &str) -> Vec<&Unit> {
        self.categories
            .get(category)
            .map(|info| {
                info.members
                    .iter()
                    .filter_map(|id| self.units.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_exclusive(&self, category: &str) -> bool {
        self.categories
            .get(category)
            .is_some_and(|info| info.exclusive)
    }

    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    /// `(category, exclusive)` pairs in name order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, bool)> {
        self.categories
            .iter()
            .map(|(name, info)| (name.as_str(), info.exclusive))
    }

    #[must_use]
    pub fn category_description(&self, category: &str) -> Option<&str> {
        self.categories
            .get(category)
            .and_then(|info| info.description.as_deref())
    }
}

const fn exclusive_label(exclusive: bool) -> &'static str {
    if exclusive { "exclusive" } else { "non-exclusive" }
}
