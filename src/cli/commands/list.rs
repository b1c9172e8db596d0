//! smx list - List catalogued units

use clap::Args;
use itertools::Itertools;
use serde::Serialize;
use tracing::debug;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::core::{Unit, UnitCatalog};
use crate::error::{Result, SmxError};
use crate::utils::format::{short_hash, truncate_string};

use super::CommandOutcome;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only units in this category
    #[arg(long, short)]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
struct UnitEntry<'a> {
    id: &'a str,
    category: &'a str,
    exclusive: bool,
    description: Option<&'a str>,
    aliases: &'a [String],
    content_hash: &'a str,
}

impl<'a> UnitEntry<'a> {
    fn new(catalog: &UnitCatalog, unit: &'a Unit) -> Self {
        Self {
            id: &unit.id,
            category: &unit.category,
            exclusive: catalog.is_exclusive(&unit.category),
            description: unit.description.as_deref(),
            aliases: &unit.aliases,
            content_hash: &unit.content_hash,
        }
    }
}

pub fn run(ctx: &AppContext, args: &ListArgs) -> Result<CommandOutcome> {
    let matrix = ctx.load_matrix()?;
    let catalog = matrix.catalog();

    if let Some(category) = &args.category {
        if !catalog.has_category(category) {
            return Err(SmxError::NotFound(format!("category {category}")));
        }
    }

    let mut units: Vec<&Unit> = catalog
        .iter()
        .filter(|unit| args.category.as_ref().is_none_or(|c| &unit.category == c))
        .collect();
    units.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    debug!(target: "catalog", count = units.len(), category = ?args.category, "listing units");

    if ctx.robot_mode {
        let entries: Vec<UnitEntry<'_>> =
            units.iter().map(|unit| UnitEntry::new(catalog, unit)).collect();
        emit_robot(ctx, &robot_ok(entries))?;
        return Ok(CommandOutcome::Success);
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("{} units", units.len()));
    let groups = units.into_iter().chunk_by(|unit| unit.category.clone());
    for (index, (category, members)) in groups.into_iter().enumerate() {
        if index > 0 {
            layout.blank();
        }
        let marker = if catalog.is_exclusive(&category) {
            " (exclusive)"
        } else {
            ""
        };
        layout.section(&format!("{category}{marker}"));
        if let Some(description) = catalog.category_description(&category) {
            layout.note(description);
        }
        for unit in members {
            let description = unit
                .description
                .as_deref()
                .map(|d| format!("  {}", truncate_string(d, 60)))
                .unwrap_or_default();
            layout.bullet(&format!(
                "{} [{}]{description}",
                unit.id,
                short_hash(&unit.content_hash)
            ));
        }
    }
    emit_human(layout);
    Ok(CommandOutcome::Success)
}
