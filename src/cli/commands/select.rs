//! smx select - Inspect and change a profile's selection

use clap::{Args, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::app::AppContext;
use crate::cli::output::{
    HumanLayout, RobotResponse, RobotStatus, emit_human, emit_robot, join_or_none, robot_ok,
};
use crate::core::{
    CascadeRequest, Resolution, ResolveOutcome, Selection, SelectionOp, SelectionResolver,
    SideEffect,
};
use crate::error::Result;

use super::{CommandOutcome, resolve_names};

#[derive(Args, Debug)]
pub struct SelectArgs {
    #[command(subcommand)]
    pub command: SelectCommand,
}

#[derive(Subcommand, Debug)]
pub enum SelectCommand {
    /// Show the current selection
    Show(ShowArgs),
    /// Add units, pulling in what they need
    Add(AddArgs),
    /// Remove a unit
    Remove(RemoveArgs),
    /// Apply a named preset
    Preset(PresetArgs),
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    pub profile: String,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub profile: String,

    /// Unit ids or aliases, applied in order
    #[arg(required = true)]
    pub units: Vec<String>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    pub profile: String,

    /// Unit id or alias
    pub unit: String,

    /// Also remove every selected unit that depends on it
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct PresetArgs {
    pub profile: String,
    pub preset: String,
}

#[derive(Debug, Serialize)]
struct SelectionReply<'a> {
    profile: &'a str,
    changed: bool,
    selection: &'a Selection,
    side_effects: &'a [SideEffect],
}

#[derive(Debug, Serialize)]
struct CascadeReply<'a> {
    profile: &'a str,
    unit: &'a str,
    dependents: &'a [String],
    hint: String,
}

pub fn run(ctx: &AppContext, args: &SelectArgs) -> Result<CommandOutcome> {
    match &args.command {
        SelectCommand::Show(args) => show(ctx, args),
        SelectCommand::Add(args) => add(ctx, args),
        SelectCommand::Remove(args) => remove(ctx, args),
        SelectCommand::Preset(args) => preset(ctx, args),
    }
}

fn show(ctx: &AppContext, args: &ShowArgs) -> Result<CommandOutcome> {
    let selection = ctx.stacks().load(&args.profile)?;
    let resolution = Resolution {
        selection,
        side_effects: Vec::new(),
    };
    report(ctx, &args.profile, &resolution, false)?;
    Ok(CommandOutcome::Success)
}

fn add(ctx: &AppContext, args: &AddArgs) -> Result<CommandOutcome> {
    let matrix = ctx.load_matrix()?;
    let ids = resolve_names(matrix.catalog(), &args.units)?;
    let stacks = ctx.stacks();
    let current = stacks.load(&args.profile)?;

    let resolver = SelectionResolver::new(&matrix.graph);
    let resolution = if let [single] = ids.as_slice() {
        match resolver.resolve(&current, &SelectionOp::Add(single.clone()))? {
            ResolveOutcome::Applied(resolution) => resolution,
            ResolveOutcome::CascadeRequired(request) => {
                return cascade(ctx, &args.profile, &request);
            }
        }
    } else {
        resolver.apply_preset(&current, &ids)?
    };

    commit(ctx, &args.profile, &current, &resolution)
}

fn remove(ctx: &AppContext, args: &RemoveArgs) -> Result<CommandOutcome> {
    let matrix = ctx.load_matrix()?;
    let id = matrix.catalog().resolve_name(&args.unit)?.to_string();
    let stacks = ctx.stacks();
    let current = stacks.load(&args.profile)?;

    let resolver = SelectionResolver::new(&matrix.graph);
    let op = SelectionOp::Remove {
        unit: id,
        confirm_cascade: args.yes,
    };
    match resolver.resolve(&current, &op)? {
        ResolveOutcome::Applied(resolution) => commit(ctx, &args.profile, &current, &resolution),
        ResolveOutcome::CascadeRequired(request) => cascade(ctx, &args.profile, &request),
    }
}

fn preset(ctx: &AppContext, args: &PresetArgs) -> Result<CommandOutcome> {
    let matrix = ctx.load_matrix()?;
    let units = matrix.preset(&args.preset)?;
    let stacks = ctx.stacks();
    let current = stacks.load(&args.profile)?;

    let resolution = SelectionResolver::new(&matrix.graph).apply_preset(&current, units)?;
    commit(ctx, &args.profile, &current, &resolution)
}

fn commit(
    ctx: &AppContext,
    profile: &str,
    previous: &Selection,
    resolution: &Resolution,
) -> Result<CommandOutcome> {
    let changed = &resolution.selection != previous;
    if changed {
        ctx.stacks().save(profile, &resolution.selection)?;
        info!(
            target: "stack",
            profile,
            units = resolution.selection.len(),
            side_effects = resolution.side_effects.len(),
            "selection updated"
        );
    }
    report(ctx, profile, resolution, changed)?;
    Ok(CommandOutcome::Success)
}

fn cascade(ctx: &AppContext, profile: &str, request: &CascadeRequest) -> Result<CommandOutcome> {
    let hint = format!("smx select remove {profile} {} --yes", request.unit);
    if ctx.robot_mode {
        let reply = CascadeReply {
            profile,
            unit: &request.unit,
            dependents: &request.dependents,
            hint,
        };
        emit_robot(ctx, &RobotResponse::new(RobotStatus::CascadeRequired, reply))?;
    } else {
        let mut layout = HumanLayout::new();
        layout.title(&format!("Removing {} needs confirmation", request.unit));
        layout.push_line("These selected units depend on it and would be removed too:");
        for dependent in &request.dependents {
            layout.bullet(dependent);
        }
        layout.blank();
        layout.note(&format!("Re-run with --yes to confirm: {hint}"));
        emit_human(layout);
    }
    Ok(CommandOutcome::CascadePending)
}

fn report(ctx: &AppContext, profile: &str, resolution: &Resolution, changed: bool) -> Result<()> {
    if ctx.robot_mode {
        let reply = SelectionReply {
            profile,
            changed,
            selection: &resolution.selection,
            side_effects: &resolution.side_effects,
        };
        let hints = resolution
            .side_effects
            .iter()
            .filter(|effect| effect.is_hint())
            .map(describe)
            .collect();
        return emit_robot(ctx, &robot_ok(reply).with_warnings(hints));
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Stack {profile}"));
    layout.kv("units", &join_or_none(resolution.selection.iter()));
    if !resolution.side_effects.is_empty() {
        layout.blank();
        layout.section("Changes");
        for effect in resolution.side_effects.iter().filter(|e| !e.is_hint()) {
            layout.bullet(&describe(effect));
        }
        for effect in resolution.side_effects.iter().filter(|e| e.is_hint()) {
            layout.note(&format!("- {}", describe(effect)));
        }
    }
    emit_human(layout);
    Ok(())
}

fn describe(effect: &SideEffect) -> String {
    match effect {
        SideEffect::ImplicitlyAdded { unit, required_by } => {
            format!("added {unit} (required by {required_by})")
        }
        SideEffect::Replaced {
            unit,
            replaced_by,
            category,
        } => format!("replaced {unit} with {replaced_by} (exclusive category {category})"),
        SideEffect::RemovedWithReplaced { unit, depended_on } => {
            format!("removed {unit} (depended on replaced {depended_on})")
        }
        SideEffect::CascadeRemoved { unit, depended_on } => {
            format!("removed {unit} (depended on {depended_on})")
        }
        SideEffect::Recommended {
            unit,
            recommended_by,
        } => format!("{recommended_by} recommends {unit}"),
        SideEffect::Discouraged {
            unit,
            discouraged_by,
        } => format!("{discouraged_by} discourages {unit}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_names_both_units() {
        let text = describe(&SideEffect::Replaced {
            unit: "react".into(),
            replaced_by: "vue".into(),
            category: "framework".into(),
        });
        assert_eq!(text, "replaced react with vue (exclusive category framework)");

        let text = describe(&SideEffect::Recommended {
            unit: "vitest".into(),
            recommended_by: "react".into(),
        });
        assert_eq!(text, "react recommends vitest");
    }
}
