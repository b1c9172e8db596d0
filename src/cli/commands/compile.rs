//! smx compile - Compose artifacts for profiles and version them

use clap::Args;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, emit_human, emit_robot, robot_ok};
use crate::compose::{CompositionEngine, RoleTemplate};
use crate::error::{Result, SmxError};
use crate::loader::Matrix;
use crate::storage::StackStore;
use crate::utils::format::short_hash;
use crate::versioning::{ArtifactKey, FsManifestStore, VersionStatus, VersionTracker};

use super::CommandOutcome;

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Profiles to compile
    pub profiles: Vec<String>,

    /// Compile every saved profile
    #[arg(long, conflicts_with = "profiles")]
    pub all: bool,

    /// Only compile this template
    #[arg(long, short)]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompiledArtifact {
    pub profile: String,
    pub template: String,
    pub version: u64,
    pub status: VersionStatus,
    pub composed_hash: String,
    pub path: String,
    pub units: usize,
}

struct Compiler<'a> {
    matrix: &'a Matrix,
    engine: CompositionEngine<'a>,
    stacks: StackStore,
    store: FsManifestStore,
    templates: Vec<&'a RoleTemplate>,
}

impl Compiler<'_> {
    fn compile_profile(&self, profile: &str) -> Result<Vec<CompiledArtifact>> {
        if !self.stacks.exists(profile) {
            return Err(SmxError::NotFound(format!("profile {profile}")));
        }
        let selection = self.stacks.load(profile)?;

        let report = self.matrix.graph.validate_selection(&selection);
        if !report.is_valid() {
            let violations: Vec<String> =
                report.violations.iter().map(ToString::to_string).collect();
            return Err(SmxError::ValidationFailed(format!(
                "profile {profile}: {}",
                violations.join("; ")
            )));
        }

        let tracker = VersionTracker::new(&self.store);
        let mut compiled = Vec::with_capacity(self.templates.len());
        for template in &self.templates {
            let artifact = self.engine.compose(&selection, template)?;
            let hash = self.engine.composed_hash(&artifact, template)?;
            let key = ArtifactKey::new(profile, &template.id);
            let outcome = tracker.track(&key, &artifact, hash)?;
            compiled.push(CompiledArtifact {
                profile: profile.to_string(),
                template: template.id.clone(),
                version: outcome.manifest.version,
                status: outcome.status,
                composed_hash: outcome.manifest.composed_hash,
                path: self.store.artifact_path(&key).display().to_string(),
                units: artifact.selected_unit_ids.len(),
            });
        }
        Ok(compiled)
    }
}

pub fn run(ctx: &AppContext, args: &CompileArgs) -> Result<CommandOutcome> {
    let matrix = ctx.load_matrix()?;
    let stacks = ctx.stacks();

    let profiles = if args.all {
        stacks.profiles()?
    } else {
        args.profiles.clone()
    };
    if profiles.is_empty() {
        return Err(SmxError::ValidationFailed(
            "nothing to compile: name profiles or pass --all".to_string(),
        ));
    }

    let templates = select_templates(
        &matrix,
        args.template
            .as_deref()
            .or(ctx.config.compose.default_template.as_deref()),
    )?;

    let compiler = Compiler {
        matrix: &matrix,
        engine: CompositionEngine::with_separator(&matrix.graph, &ctx.config.compose.separator),
        stacks,
        store: ctx.manifest_store(),
        templates,
    };

    debug!(target: "compile", profiles = profiles.len(), "compiling");
    let results: Vec<(String, Result<Vec<CompiledArtifact>>)> = profiles
        .par_iter()
        .map(|profile| (profile.clone(), compiler.compile_profile(profile)))
        .collect();

    let mut compiled = Vec::new();
    let mut first_error = None;
    for (profile, result) in results {
        match result {
            Ok(artifacts) => compiled.extend(artifacts),
            Err(err) => {
                warn!(target: "compile", profile = %profile, error = %err, "compile failed");
                first_error.get_or_insert(err);
            }
        }
    }

    if let Some(err) = first_error {
        if !ctx.robot_mode && !compiled.is_empty() {
            emit_human(render(&compiled));
        }
        return Err(err);
    }

    if ctx.robot_mode {
        emit_robot(ctx, &robot_ok(&compiled))?;
    } else {
        emit_human(render(&compiled));
    }
    Ok(CommandOutcome::Success)
}

fn select_templates<'m>(matrix: &'m Matrix, only: Option<&str>) -> Result<Vec<&'m RoleTemplate>> {
    if let Some(id) = only {
        return Ok(vec![matrix.template(id)?]);
    }
    if matrix.templates.is_empty() {
        return Err(SmxError::NotFound("no templates defined in the matrix".to_string()));
    }
    Ok(matrix.templates.values().collect())
}

fn render(compiled: &[CompiledArtifact]) -> HumanLayout {
    let mut layout = HumanLayout::new();
    let written = compiled.iter().filter(|a| a.status.wrote()).count();
    layout.title(&format!(
        "Compiled {} artifact(s), {written} written",
        compiled.len()
    ));
    for artifact in compiled {
        layout.bullet(&format!(
            "{}/{} v{} {} [{}] {}",
            artifact.profile,
            artifact.template,
            artifact.version,
            artifact.status.as_str(),
            short_hash(&artifact.composed_hash),
            artifact.path
        ));
    }
    layout
}
