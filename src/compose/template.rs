//! Role templates: fixed, ordered slot layouts that units are merged into.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::{Unit, UnitCatalog};
use crate::error::{Result, SmxError};
use crate::utils::fs::is_file_stem;
use crate::versioning::hash::hash_bytes;

/// Which units a slot accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPredicate {
    Categories(BTreeSet<String>),
    Any,
}

impl SlotPredicate {
    #[must_use]
    pub fn matches(&self, unit: &Unit) -> bool {
        match self {
            Self::Categories(categories) => categories.contains(&unit.category),
            Self::Any => true,
        }
    }
}

/// A named slot. In matrix files a slot without `categories` accepts any unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SlotRecord", into = "SlotRecord")]
pub struct TemplateSlot {
    pub name: String,
    pub predicate: SlotPredicate,
}

impl TemplateSlot {
    #[must_use]
    pub fn new(name: impl Into<String>, categories: &[&str]) -> Self {
        Self {
            name: name.into(),
            predicate: SlotPredicate::Categories(
                categories.iter().map(|c| (*c).to_string()).collect(),
            ),
        }
    }

    #[must_use]
    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            predicate: SlotPredicate::Any,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SlotRecord {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    categories: Option<BTreeSet<String>>,
}

impl From<SlotRecord> for TemplateSlot {
    fn from(record: SlotRecord) -> Self {
        Self {
            name: record.name,
            predicate: record
                .categories
                .map_or(SlotPredicate::Any, SlotPredicate::Categories),
        }
    }
}

impl From<TemplateSlot> for SlotRecord {
    fn from(slot: TemplateSlot) -> Self {
        Self {
            name: slot.name,
            categories: match slot.predicate {
                SlotPredicate::Categories(categories) => Some(categories),
                SlotPredicate::Any => None,
            },
        }
    }
}

/// An agent definition: an optional preamble followed by ordered slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTemplate {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    pub slots: Vec<TemplateSlot>,
}

impl RoleTemplate {
    #[must_use]
    pub fn new(id: impl Into<String>, slots: Vec<TemplateSlot>) -> Self {
        Self {
            id: id.into(),
            description: None,
            preamble: None,
            slots,
        }
    }

    /// Check the template's shape, and that every category it names exists.
    pub fn validate(&self, catalog: &UnitCatalog) -> Result<()> {
        let invalid = |message: String| SmxError::InvalidTemplate {
            template: self.id.clone(),
            message,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("template id must be non-empty".to_string()));
        }
        if !is_file_stem(&self.id) {
            return Err(invalid(
                "invalid template id (use letters, digits, '-', '_' or '.')".to_string(),
            ));
        }
        if self.slots.is_empty() {
            return Err(invalid("template declares no slots".to_string()));
        }

        let mut names = HashSet::new();
        for slot in &self.slots {
            if slot.name.trim().is_empty() {
                return Err(invalid("slot name must be non-empty".to_string()));
            }
            if slot.name.contains('"') {
                return Err(invalid(format!("slot name {} contains a quote", slot.name)));
            }
            if !names.insert(slot.name.as_str()) {
                return Err(invalid(format!("duplicate slot {}", slot.name)));
            }
            if let SlotPredicate::Categories(categories) = &slot.predicate {
                if categories.is_empty() {
                    return Err(invalid(format!("slot {} lists no categories", slot.name)));
                }
                if let Some(unknown) = categories.iter().find(|c| !catalog.has_category(c)) {
                    return Err(invalid(format!(
                        "slot {} names unknown category {unknown}",
                        slot.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Hash of the canonical JSON form. Changes whenever the definition does.
    pub fn fingerprint(&self) -> Result<String> {
        let canonical = serde_json::to_vec(self).map_err(|err| {
            SmxError::HashComputationFailure(format!("fingerprint template {}: {err}", self.id))
        })?;
        Ok(hash_bytes(&canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{frontend_catalog, frontend_template};

    #[test]
    fn slots_without_categories_accept_anything() {
        let yaml = r"
id: reviewer
preamble: You review code.
slots:
  - name: stack
    categories: [framework, state]
  - name: extras
";
        let template: RoleTemplate = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(template.slots[0], TemplateSlot::new("stack", &["state", "framework"]));
        assert_eq!(template.slots[1].predicate, SlotPredicate::Any);
        assert!(template.validate(&frontend_catalog()).is_ok());
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        let catalog = frontend_catalog();
        let cases = [
            RoleTemplate::new("", vec![TemplateSlot::any("a")]),
            RoleTemplate::new("t", vec![]),
            RoleTemplate::new("t", vec![TemplateSlot::any("a"), TemplateSlot::any("a")]),
            RoleTemplate::new("t", vec![TemplateSlot::new("a", &[])]),
            RoleTemplate::new("t", vec![TemplateSlot::new("a", &["databases"])]),
            RoleTemplate::new("t", vec![TemplateSlot::any("a\"b")]),
            RoleTemplate::new("../../escaped", vec![TemplateSlot::any("a")]),
            RoleTemplate::new("nested/agent", vec![TemplateSlot::any("a")]),
            RoleTemplate::new(".hidden", vec![TemplateSlot::any("a")]),
        ];
        for template in cases {
            assert!(
                matches!(template.validate(&catalog), Err(SmxError::InvalidTemplate { .. })),
                "{template:?} should be rejected"
            );
        }
    }

    #[test]
    fn fingerprint_changes_with_definition() {
        let template = frontend_template();
        let same = frontend_template();
        assert_eq!(template.fingerprint().unwrap(), same.fingerprint().unwrap());

        let mut edited = frontend_template();
        edited.preamble = Some("Different role.".to_string());
        assert_ne!(template.fingerprint().unwrap(), edited.fingerprint().unwrap());
    }
}
