//! Directory-level compilation.
//!
//! A task is one `<task>.pddl` file (task ids look like `46_0`: scene 46,
//! variant 0). Tasks are independent: each worker owns its `Problem`, and the
//! lid table is shared read-only. An output file is written only after its
//! problem verified; a failing task is logged and reported, never fatal to
//! the rest of the batch.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tabletop_dsl::digest::problem_digest_v1;
use tabletop_dsl::{
    compile_problem_v1, finalize_problem_v1, parse_problem_v1_with, ProblemError,
};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::Session;

pub const PROBLEM_EXTENSION: &str = "pddl";

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Worker threads (defaults to the number of CPUs).
    #[arg(long)]
    pub jobs: Option<usize>,
    /// Write a JSON report of every task to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Exit successfully even when some tasks fail.
    #[arg(long)]
    pub no_fail: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub task: String,
    pub status: TaskStatus,
    pub error_kind: Option<String>,
    pub message: Option<String>,
    pub digest: Option<String>,
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<TaskReport>,
}

impl BatchReport {
    fn from_items(items: Vec<TaskReport>) -> Self {
        let failed = items
            .iter()
            .filter(|item| item.status == TaskStatus::Failed)
            .count();
        BatchReport {
            processed: items.len(),
            succeeded: items.len() - failed,
            failed,
            items,
        }
    }
}

#[derive(Debug)]
struct TaskFailure {
    kind: String,
    message: String,
}

impl From<ProblemError> for TaskFailure {
    fn from(err: ProblemError) -> Self {
        TaskFailure {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<io::Error> for TaskFailure {
    fn from(err: io::Error) -> Self {
        TaskFailure {
            kind: "Io".to_string(),
            message: err.to_string(),
        }
    }
}

/// `(task id, path)` of every problem file directly under `dir`, sorted by task id.
pub fn list_tasks(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Err(anyhow!("`{}` is not a directory", dir.display()));
    }
    let mut tasks: Vec<(String, PathBuf)> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|s| s == PROBLEM_EXTENSION).unwrap_or(false))
        .filter_map(|p| {
            let task = p.file_stem()?.to_str()?.to_string();
            Some((task, p))
        })
        .collect();
    tasks.sort();
    Ok(tasks)
}

fn run_tasks<F>(tasks: &[(String, PathBuf)], out_dir: &Path, args: &RunArgs, work: F) -> Result<BatchReport>
where
    F: Fn(&str, &Path) -> Result<String, TaskFailure> + Sync,
{
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create `{}`", out_dir.display()))?;

    let process = |(task, path): &(String, PathBuf)| -> TaskReport {
        let result = work(task, path).and_then(|text| {
            let output = out_dir.join(format!("{task}.{PROBLEM_EXTENSION}"));
            fs::write(&output, &text)?;
            Ok((text, output))
        });
        match result {
            Ok((text, output)) => {
                info!(task = %task, output = %output.display(), "problem verified");
                TaskReport {
                    task: task.clone(),
                    status: TaskStatus::Ok,
                    error_kind: None,
                    message: None,
                    digest: Some(problem_digest_v1(&text)),
                    output: Some(output.display().to_string()),
                }
            }
            Err(failure) => {
                warn!(task = %task, kind = %failure.kind, "{}", failure.message);
                TaskReport {
                    task: task.clone(),
                    status: TaskStatus::Failed,
                    error_kind: Some(failure.kind),
                    message: Some(failure.message),
                    digest: None,
                    output: None,
                }
            }
        }
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = args.jobs {
        builder = builder.num_threads(jobs.max(1));
    }
    let pool = builder.build().context("failed to start worker pool")?;
    let items: Vec<TaskReport> = pool.install(|| tasks.par_iter().map(process).collect());

    Ok(BatchReport::from_items(items))
}

fn finish(report: &BatchReport, args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(report)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write report `{}`", path.display()))?;
    }

    for item in report.items.iter().filter(|i| i.status == TaskStatus::Failed) {
        println!(
            "  {} {}: {}",
            "✗".red(),
            item.task.bold(),
            item.message.as_deref().unwrap_or("").red()
        );
    }
    let summary = format!(
        "{} processed, {} ok, {} failed",
        report.processed, report.succeeded, report.failed
    );
    if report.failed == 0 {
        println!("{} {}", "ok".green().bold(), summary);
        return Ok(());
    }
    println!("{} {}", "failed".red().bold(), summary);
    if args.no_fail {
        return Ok(());
    }
    Err(anyhow!("{} of {} problems failed", report.failed, report.processed))
}

pub fn batch_verify(input: &Path, out: &Path, args: &RunArgs, session: &Session) -> Result<BatchReport> {
    let tasks = list_tasks(input)?;
    run_tasks(&tasks, out, args, |_task, path| {
        let text = fs::read_to_string(path)?;
        let compiled = compile_problem_v1(&text, session.options, &session.lids)?;
        Ok(compiled.text)
    })
}

pub fn batch_merge_goal(
    init: &Path,
    target: &Path,
    out: &Path,
    args: &RunArgs,
    session: &Session,
) -> Result<BatchReport> {
    let tasks = list_tasks(init)?;
    run_tasks(&tasks, out, args, |task, path| {
        let target_path = target.join(format!("{task}.{PROBLEM_EXTENSION}"));
        if !target_path.is_file() {
            return Err(TaskFailure {
                kind: "MissingTarget".to_string(),
                message: format!("no target problem `{}`", target_path.display()),
            });
        }
        let initial = parse_problem_v1_with(&fs::read_to_string(path)?, session.options)
            .map_err(ProblemError::from)?;
        let goal = parse_problem_v1_with(&fs::read_to_string(&target_path)?, session.options)
            .map_err(ProblemError::from)?;

        let mut merged = initial;
        merged.set_goal_from_init(&goal);
        Ok(finalize_problem_v1(merged, &session.lids)?.text)
    })
}

pub fn cmd_batch_verify(input: &Path, out: &Path, args: &RunArgs, session: &Session) -> Result<()> {
    println!(
        "{} {} → {}",
        "Verifying".green().bold(),
        input.display(),
        out.display()
    );
    let report = batch_verify(input, out, args, session)?;
    finish(&report, args)
}

pub fn cmd_batch_merge_goal(
    init: &Path,
    target: &Path,
    out: &Path,
    args: &RunArgs,
    session: &Session,
) -> Result<()> {
    println!(
        "{} {} + {} → {}",
        "Merging goals".green().bold(),
        init.display(),
        target.display(),
        out.display()
    );
    let report = batch_merge_goal(init, target, out, args, session)?;
    finish(&report, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_dsl::{LidTable, ParseOptions};

    fn session() -> Session {
        Session {
            lids: LidTable::builtin(),
            options: ParseOptions::default(),
        }
    }

    const VALID: &str = "(define (problem a) (:domain manip) (:objects x - item) (:init))";
    const INVALID: &str = "(define (problem b) (:domain manip) (:objects x y - item) (:init (in x y)))";

    #[test]
    fn writes_only_verified_problems_and_keeps_going() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in");
        let out = dir.path().join("out");
        fs::create_dir_all(&input).expect("mkdir");
        fs::write(input.join("1_0.pddl"), VALID).expect("write");
        fs::write(input.join("1_1.pddl"), INVALID).expect("write");
        fs::write(input.join("notes.txt"), "ignored").expect("write");

        let report = batch_verify(&input, &out, &RunArgs::default(), &session()).expect("batch");
        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.items[0].task, "1_0");
        assert_eq!(report.items[0].status, TaskStatus::Ok);
        assert!(report.items[0]
            .digest
            .as_deref()
            .is_some_and(|d| d.starts_with("fnv1a64:")));
        assert_eq!(report.items[1].error_kind.as_deref(), Some("InvalidInTarget"));

        assert!(out.join("1_0.pddl").is_file());
        assert!(!out.join("1_1.pddl").exists());
    }

    #[test]
    fn failing_batch_is_an_error_unless_no_fail() {
        let report = BatchReport::from_items(vec![TaskReport {
            task: "t".to_string(),
            status: TaskStatus::Failed,
            error_kind: Some("Io".to_string()),
            message: Some("boom".to_string()),
            digest: None,
            output: None,
        }]);
        assert!(finish(&report, &RunArgs::default()).is_err());
        let lenient = RunArgs {
            no_fail: true,
            ..RunArgs::default()
        };
        assert!(finish(&report, &lenient).is_ok());
    }

    #[test]
    fn merge_goal_reports_missing_targets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let init = dir.path().join("init");
        let target = dir.path().join("target");
        fs::create_dir_all(&init).expect("mkdir");
        fs::create_dir_all(&target).expect("mkdir");
        fs::write(init.join("2_0.pddl"), VALID).expect("write");
        fs::write(init.join("2_1.pddl"), VALID).expect("write");
        fs::write(
            target.join("2_0.pddl"),
            "(define (problem a) (:domain manip) (:objects x - item) (:init (ontable x)))",
        )
        .expect("write");

        let out = dir.path().join("out");
        let report =
            batch_merge_goal(&init, &target, &out, &RunArgs::default(), &session()).expect("batch");
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.items[1].error_kind.as_deref(), Some("MissingTarget"));

        let merged = fs::read_to_string(out.join("2_0.pddl")).expect("merged");
        assert!(merged.contains("  (:goal (and\n    (ontable x)\n  ))\n"), "{merged}");
    }
}
