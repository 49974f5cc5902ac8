use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use tabletop_dsl::finalize_problem_v1;
use tabletop_ingest_json::{scene_skeleton, ObjectCatalog, SceneCatalog};

use crate::Session;

#[derive(Args, Debug, Clone)]
pub struct SkeletonArgs {
    /// Object catalog (`objects.json`).
    #[arg(long)]
    pub catalog: PathBuf,
    /// Scene catalog (`scenes.json`).
    #[arg(long)]
    pub scenes: PathBuf,
    #[arg(long)]
    pub scene_id: u32,
    /// Domain name written into the problem.
    #[arg(long, default_value = "manip")]
    pub domain: String,
    /// Write output to this file (defaults to stdout).
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn cmd_scene_skeleton(args: &SkeletonArgs, session: &Session) -> Result<()> {
    let objects = ObjectCatalog::from_path(&args.catalog)?;
    let scenes = SceneCatalog::from_path(&args.scenes)?;
    let scene = scenes
        .get(args.scene_id)
        .ok_or_else(|| anyhow!("scene {} not found in `{}`", args.scene_id, args.scenes.display()))?;

    let skeleton = scene_skeleton(scene, &objects, &args.domain)?;
    let compiled = finalize_problem_v1(skeleton, &session.lids)
        .map_err(|e| anyhow!("{} ({})", e, e.kind()))?;

    match &args.out {
        Some(out) => {
            std::fs::write(out, &compiled.text)?;
            eprintln!(
                "{} {} ({} objects)",
                "wrote".green().bold(),
                out.display().to_string().bold(),
                compiled.problem.objects.len()
            );
        }
        None => print!("{}", compiled.text),
    }
    Ok(())
}
