//! Identifier ↔ name rewriting.
//!
//! Text mode rewrites the file as-is (comments included). `--structured`
//! round-trips through the parser so the output is canonical text.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use tabletop_dsl::{format_problem_v1, parse_problem_v1_with, NameSubstitution};
use tabletop_ingest_json::ObjectCatalog;

use crate::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    IdsToNames,
    NamesToIds,
}

#[derive(Args, Debug, Clone)]
pub struct TextRenameArgs {
    /// Object catalog (`objects.json`).
    #[arg(long)]
    pub catalog: PathBuf,
    /// Input file.
    pub input: PathBuf,
    /// Write output to this file (defaults to stdout).
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    /// Parse the problem and emit canonical text instead of rewriting verbatim.
    #[arg(long)]
    pub structured: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ObjectRenameArgs {
    /// Input problem file.
    pub input: PathBuf,
    /// JSON object mapping old identifiers to new ones.
    #[arg(long)]
    pub map: PathBuf,
    /// Apply the map from values back to keys.
    #[arg(long)]
    pub reverse: bool,
    /// Write output to this file (defaults to stdout).
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn rename_text(
    text: &str,
    subst: &NameSubstitution,
    direction: Direction,
    structured: bool,
    session: &Session,
) -> Result<String> {
    match (direction, structured) {
        (Direction::IdsToNames, false) => Ok(subst.ids_to_names(text)),
        (Direction::NamesToIds, false) => Ok(subst.names_to_ids(text)),
        (Direction::IdsToNames, true) => {
            let problem = parse_problem_v1_with(text, session.options)?;
            Ok(subst.ids_to_names(&format_problem_v1(&problem)))
        }
        (Direction::NamesToIds, true) => {
            // Names may contain spaces, so the text only parses once ids are back.
            let problem = parse_problem_v1_with(&subst.names_to_ids(text), session.options)?;
            Ok(format_problem_v1(&problem))
        }
    }
}

/// Load an `{old: new}` map, inverted when `reverse` is set.
pub fn load_rename_map(path: &Path, reverse: bool) -> Result<BTreeMap<String, String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read rename map `{}`", path.display()))?;
    let map: BTreeMap<String, String> = serde_json::from_str(&text)
        .with_context(|| format!("invalid rename map `{}`", path.display()))?;
    if !reverse {
        return Ok(map);
    }

    let mut inverted = BTreeMap::new();
    for (from, to) in map {
        if let Some(previous) = inverted.insert(to.clone(), from.clone()) {
            return Err(anyhow!(
                "cannot reverse rename map: `{previous}` and `{from}` both map to `{to}`"
            ));
        }
    }
    Ok(inverted)
}

fn emit(rendered: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(out) => {
            fs::write(out, rendered)?;
            println!("wrote {}", out.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn cmd_rename_text(args: &TextRenameArgs, direction: Direction, session: &Session) -> Result<()> {
    let catalog = ObjectCatalog::from_path(&args.catalog)?;
    let subst = catalog.substitution()?;
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read `{}`", args.input.display()))?;
    let rendered = rename_text(&text, &subst, direction, args.structured, session)?;
    emit(&rendered, args.out.as_deref())
}

pub fn cmd_rename_objects(args: &ObjectRenameArgs, session: &Session) -> Result<()> {
    let mapping = load_rename_map(&args.map, args.reverse)?;
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read `{}`", args.input.display()))?;
    let mut problem = parse_problem_v1_with(&text, session.options)?;
    problem.rename_objects(&mapping)?;
    emit(&format_problem_v1(&problem), args.out.as_deref())
}
