//! Canonical problem text.
//!
//! Unlike a surgical formatter, the canonical layout is regenerated from the
//! parsed model: comments are dropped, objects are grouped by type, and facts
//! are sorted. By default the problem is also completed and verified, so the
//! output is exactly what batch mode would write.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tabletop_dsl::{compile_problem_v1, format_problem_v1, parse_problem_v1_with};

use crate::Session;

pub fn render_problem(text: &str, no_infer: bool, session: &Session) -> Result<String> {
    if no_infer {
        let problem = parse_problem_v1_with(text, session.options)?;
        return Ok(format_problem_v1(&problem));
    }
    let compiled = compile_problem_v1(text, session.options, &session.lids)
        .map_err(|e| anyhow!("{} ({})", e, e.kind()))?;
    Ok(compiled.text)
}

pub fn cmd_fmt_problem(
    input: &Path,
    out: Option<&Path>,
    write: bool,
    no_infer: bool,
    session: &Session,
) -> Result<()> {
    if write && out.is_some() {
        return Err(anyhow!("cannot use --write and --out together"));
    }
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read `{}`", input.display()))?;
    let rendered = render_problem(&text, no_infer, session)?;
    if write {
        std::fs::write(input, rendered)?;
        println!("formatted {}", input.display());
        return Ok(());
    }
    if let Some(out) = out {
        std::fs::write(out, rendered)?;
        println!("wrote {}", out.display());
        return Ok(());
    }
    print!("{rendered}");
    Ok(())
}
