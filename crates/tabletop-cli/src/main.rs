//! Tabletop CLI
//!
//! Command-line interface for:
//! - Validating and formatting annotated tabletop problems (`problem_v1`)
//! - Batch compilation of problem directories (verify, goal merging)
//! - Rewriting catalog identifiers ↔ human-readable names
//! - Generating problem skeletons from the scene catalog

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use tabletop_dsl::{compile_problem_v1, LidTable, ParseOptions};

mod batch;
mod problem_fmt;
mod rename;
mod scene;

#[derive(Parser)]
#[command(name = "tabletop")]
#[command(
    author,
    version,
    about = "Tabletop: PDDL problem compiler for tabletop manipulation scenes"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct GlobalArgs {
    /// Container ↔ lid table (JSON list of `{container, lid}`); the built-in
    /// table is used when omitted.
    #[arg(long, global = true)]
    lids: Option<PathBuf>,
    /// Reject `(:objects` lines without a `- type` separator.
    #[arg(long, global = true)]
    strict_objects: bool,
    /// Increase log verbosity (`-v` info, `-vv` debug, `-vvv` trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check/format single problem files.
    Check {
        #[command(subcommand)]
        command: CheckCommands,
    },

    /// Compile whole directories of problems (one task per `*.pddl` file).
    ///
    /// Outputs are written only for problems that pass verification. Failures
    /// are reported per task and processing continues.
    Batch {
        #[command(subcommand)]
        command: BatchCommands,
    },

    /// Rewrite catalog identifiers ↔ human-readable names.
    Rename {
        #[command(subcommand)]
        command: RenameCommands,
    },

    /// Scene catalog tooling.
    Scene {
        #[command(subcommand)]
        command: SceneCommands,
    },
}

#[derive(Subcommand)]
enum CheckCommands {
    /// Parse, complete and verify a problem; print a summary.
    Validate {
        /// Input problem file.
        input: PathBuf,
    },

    /// Emit the canonical text of a problem.
    ///
    /// Default facts are inferred and the result verified first; use
    /// `--no-infer` to only normalize the layout.
    Fmt {
        /// Input problem file.
        input: PathBuf,
        /// Write formatted output to this file (defaults to stdout).
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Overwrite the input file in-place.
        #[arg(long)]
        write: bool,
        /// Skip inference and verification.
        #[arg(long)]
        no_infer: bool,
    },
}

#[derive(Subcommand)]
enum BatchCommands {
    /// Infer, verify and canonicalize every problem in a directory.
    Verify {
        /// Directory of annotated problems (`<task>.pddl`).
        #[arg(long)]
        input: PathBuf,
        /// Output directory for verified canonical problems.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        run: batch::RunArgs,
    },

    /// Use each target problem's init as the goal of the matching initial problem.
    MergeGoal {
        /// Directory of initial problems (`<task>.pddl`).
        #[arg(long)]
        init: PathBuf,
        /// Directory of target problems with the same task ids.
        #[arg(long)]
        target: PathBuf,
        /// Output directory for merged problems.
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        run: batch::RunArgs,
    },
}

#[derive(Subcommand)]
enum RenameCommands {
    /// Replace catalog identifiers with object names (`kitchen_17_2` → `red chili pepper_2`).
    IdsToNames(rename::TextRenameArgs),
    /// Replace object names with catalog identifiers.
    NamesToIds(rename::TextRenameArgs),
    /// Rename declared objects of a parsed problem using an explicit JSON map.
    Objects(rename::ObjectRenameArgs),
}

#[derive(Subcommand)]
enum SceneCommands {
    /// Generate a verified problem with the objects of one scene.
    Skeleton(scene::SkeletonArgs),
}

/// Settings shared by every command.
pub struct Session {
    pub lids: LidTable,
    pub options: ParseOptions,
}

impl Session {
    fn from_args(args: &GlobalArgs) -> Result<Self> {
        let lids = match &args.lids {
            Some(path) => load_lid_table(path)?,
            None => LidTable::builtin(),
        };
        Ok(Session {
            lids,
            options: ParseOptions {
                strict_objects: args.strict_objects,
            },
        })
    }
}

fn load_lid_table(path: &Path) -> Result<LidTable> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read lid table `{}`", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid lid table `{}`", path.display()))
}

fn init_tracing(verbose: u8) {
    let fallback_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    let session = Session::from_args(&cli.global)?;

    match cli.command {
        Commands::Check { command } => match command {
            CheckCommands::Validate { input } => cmd_validate(&input, &session)?,
            CheckCommands::Fmt {
                input,
                out,
                write,
                no_infer,
            } => problem_fmt::cmd_fmt_problem(&input, out.as_deref(), write, no_infer, &session)?,
        },
        Commands::Batch { command } => match command {
            BatchCommands::Verify { input, out, run } => {
                batch::cmd_batch_verify(&input, &out, &run, &session)?
            }
            BatchCommands::MergeGoal {
                init,
                target,
                out,
                run,
            } => batch::cmd_batch_merge_goal(&init, &target, &out, &run, &session)?,
        },
        Commands::Rename { command } => match command {
            RenameCommands::IdsToNames(args) => {
                rename::cmd_rename_text(&args, rename::Direction::IdsToNames, &session)?
            }
            RenameCommands::NamesToIds(args) => {
                rename::cmd_rename_text(&args, rename::Direction::NamesToIds, &session)?
            }
            RenameCommands::Objects(args) => rename::cmd_rename_objects(&args, &session)?,
        },
        Commands::Scene { command } => match command {
            SceneCommands::Skeleton(args) => scene::cmd_scene_skeleton(&args, &session)?,
        },
    }
    Ok(())
}

fn cmd_validate(input: &Path, session: &Session) -> Result<()> {
    println!("{} {}", "Validating".green().bold(), input.display());

    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read `{}`", input.display()))?;
    let compiled = compile_problem_v1(&text, session.options, &session.lids)
        .map_err(|e| anyhow!("{} ({})", e, e.kind()))?;
    let problem = &compiled.problem;

    println!("  Dialect: {}", "problem_v1 (objects/init/goal)".cyan());
    println!("  Problem: {}", problem.name.cyan());
    println!("  Domain: {}", problem.domain.cyan());
    println!("  Objects: {}", problem.objects.len());
    println!(
        "  Init: {} facts ({} inferred, {} removed)",
        problem.init.len(),
        compiled.inferred.added.len(),
        compiled.inferred.removed.len()
    );
    println!("  Goal: {} facts", problem.goal.len());

    let undeclared = problem.undeclared_references();
    if !undeclared.is_empty() {
        let names: Vec<&str> = undeclared.iter().map(String::as_str).collect();
        println!(
            "  {} facts mention undeclared objects: {}",
            "note:".yellow().bold(),
            names.join(", ").yellow()
        );
    }

    println!("{}", "Valid.".green());
    Ok(())
}
