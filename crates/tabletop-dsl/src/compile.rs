//! Unified entrypoint: parse → infer → verify → canonical text.
//!
//! Canonical text is only produced for a problem that passed verification, so
//! callers can write it without re-checking.

use tracing::debug;

use crate::error::ProblemError;
use crate::infer::InferenceSummary;
use crate::lid_table::LidTable;
use crate::problem_v1::{format_problem_v1, parse_problem_v1_with, ParseOptions, Problem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProblem {
    pub problem: Problem,
    pub inferred: InferenceSummary,
    pub text: String,
}

pub fn compile_problem_v1(
    text: &str,
    options: ParseOptions,
    lids: &LidTable,
) -> Result<CompiledProblem, ProblemError> {
    let problem = parse_problem_v1_with(text, options)?;
    finalize_problem_v1(problem, lids)
}

/// Infer defaults, verify, and render an already-built problem.
pub fn finalize_problem_v1(
    mut problem: Problem,
    lids: &LidTable,
) -> Result<CompiledProblem, ProblemError> {
    let inferred = problem.ensure_defaults(lids);
    problem.verify(lids)?;

    let undeclared = problem.undeclared_references();
    if !undeclared.is_empty() {
        debug!(problem = %problem.name, ?undeclared, "facts reference undeclared objects");
    }

    let text = format_problem_v1(&problem);
    Ok(CompiledProblem {
        problem,
        inferred,
        text,
    })
}
