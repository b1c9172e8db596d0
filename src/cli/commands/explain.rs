//! smx explain - Show everything the graph knows about one unit

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, join_or_none, robot_ok};
use crate::core::{EdgeKind, RelationshipGraph, Unit};
use crate::error::Result;

use super::CommandOutcome;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Unit id or alias
    pub unit: String,
}

#[derive(Debug, Serialize)]
struct Explanation<'a> {
    id: &'a str,
    category: &'a str,
    exclusive: bool,
    description: Option<&'a str>,
    aliases: &'a [String],
    content_hash: &'a str,
    relations: Vec<RelationEntry<'a>>,
    /// Everything selecting this unit pulls in.
    closure: Vec<&'a str>,
    /// Units that would cascade if this one were removed.
    dependents: Vec<&'a str>,
    /// Units that declare a dependency on this one.
    required_by: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct RelationEntry<'a> {
    kind: EdgeKind,
    targets: Vec<&'a str>,
}

fn explain<'a>(graph: &'a RelationshipGraph, unit: &'a Unit) -> Explanation<'a> {
    let catalog = graph.catalog();
    let relations = EdgeKind::ALL
        .into_iter()
        .map(|kind| RelationEntry {
            kind,
            targets: unit.relations.get(kind).iter().map(String::as_str).collect(),
        })
        .filter(|entry| !entry.targets.is_empty())
        .collect();
    let required_by = catalog
        .iter()
        .filter(|other| {
            EdgeKind::ALL
                .into_iter()
                .filter(|kind| kind.is_dependency())
                .any(|kind| other.relations.get(kind).contains(&unit.id))
        })
        .map(|other| other.id.as_str())
        .collect();

    Explanation {
        id: &unit.id,
        category: &unit.category,
        exclusive: catalog.is_exclusive(&unit.category),
        description: unit.description.as_deref(),
        aliases: &unit.aliases,
        content_hash: &unit.content_hash,
        relations,
        closure: graph.closure(&unit.id).iter().map(String::as_str).collect(),
        dependents: graph.dependents(&unit.id).iter().map(String::as_str).collect(),
        required_by,
    }
}

pub fn run(ctx: &AppContext, args: &ExplainArgs) -> Result<CommandOutcome> {
    let matrix = ctx.load_matrix()?;
    let id = matrix.catalog().resolve_name(&args.unit)?;
    let unit = matrix.catalog().require(id)?;
    let explanation = explain(&matrix.graph, unit);

    if ctx.robot_mode {
        emit_robot(ctx, &robot_ok(&explanation))?;
        return Ok(CommandOutcome::Success);
    }

    let mut layout = HumanLayout::new();
    layout.title(explanation.id);
    let category = if explanation.exclusive {
        format!("{} (exclusive)", explanation.category)
    } else {
        explanation.category.to_string()
    };
    layout.kv("category", &category);
    if let Some(description) = explanation.description {
        layout.kv("description", description);
    }
    if !explanation.aliases.is_empty() {
        layout.kv("aliases", &explanation.aliases.join(", "));
    }
    layout.kv("content hash", explanation.content_hash);
    layout.blank();

    layout.section("Relationships");
    if explanation.relations.is_empty() {
        layout.push_line("(none)");
    }
    for entry in &explanation.relations {
        layout.kv(entry.kind.as_str(), &entry.targets.join(", "));
    }
    layout.blank();

    layout.section("Graph");
    layout.kv("pulls in", &join_or_none(&explanation.closure));
    layout.kv("needed by", &join_or_none(&explanation.dependents));
    emit_human(layout);
    Ok(CommandOutcome::Success)
}
