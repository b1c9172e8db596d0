//! smx validate - Check a profile's selection against the relationship graph

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{
    HumanLayout, RobotResponse, RobotStatus, emit_human, emit_robot, robot_ok,
};
use crate::core::{Selection, SelectionReport};
use crate::error::Result;

use super::CommandOutcome;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    pub profile: String,
}

#[derive(Debug, Serialize)]
struct ValidationReply<'a> {
    profile: &'a str,
    valid: bool,
    selection: &'a Selection,
    #[serde(flatten)]
    report: &'a SelectionReport,
}

pub fn run(ctx: &AppContext, args: &ValidateArgs) -> Result<CommandOutcome> {
    let matrix = ctx.load_matrix()?;
    let selection = ctx.stacks().load(&args.profile)?;
    let report = matrix.graph.validate_selection(&selection);
    let outcome = if report.is_valid() {
        CommandOutcome::Success
    } else {
        CommandOutcome::ValidationFailed
    };

    if ctx.robot_mode {
        let reply = ValidationReply {
            profile: &args.profile,
            valid: report.is_valid(),
            selection: &selection,
            report: &report,
        };
        let response = if report.is_valid() {
            robot_ok(reply)
        } else {
            RobotResponse::new(RobotStatus::Invalid, reply)
        };
        emit_robot(ctx, &response)?;
        return Ok(outcome);
    }

    let mut layout = HumanLayout::new();
    layout.title(&format!("Validate {}", args.profile));
    layout.kv("units", &selection.len().to_string());
    if report.is_valid() {
        layout.kv("result", "valid");
    } else {
        layout.kv("result", &format!("{} violation(s)", report.violations.len()));
        layout.blank();
        layout.section("Violations");
        for violation in &report.violations {
            layout.bullet(&violation.to_string());
        }
    }
    if !report.discouraged.is_empty() {
        layout.blank();
        for (unit, discouraged) in &report.discouraged {
            layout.note(&format!("- {unit} discourages {discouraged}"));
        }
    }
    emit_human(layout);
    Ok(outcome)
}
