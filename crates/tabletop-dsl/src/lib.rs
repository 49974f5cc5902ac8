//! Tabletop PDDL problems (`problem_v1`)
//!
//! This crate reads the restricted PDDL problem subset used to describe
//! tabletop manipulation scenes, completes the facts annotators leave implicit,
//! checks the domain invariants, and writes the canonical problem text consumed
//! by the planner.
//!
//! Pipeline: `problem_v1::parse_problem_v1` → `Problem::ensure_defaults` →
//! `Problem::verify` → `problem_v1::format_problem_v1`, bundled as
//! `compile::compile_problem_v1`.
//!
//! `substitute` is independent of the model: it rewrites identifiers and
//! human-readable names in arbitrary text.

pub mod compile;
pub mod digest;
pub mod error;
pub mod index;
pub mod infer;
pub mod lid_table;
pub mod problem_v1;
pub mod substitute;
pub mod verify;

pub use compile::{compile_problem_v1, finalize_problem_v1, CompiledProblem};
pub use error::ProblemError;
pub use infer::InferenceSummary;
pub use lid_table::{LidPair, LidTable, LidTableError};
pub use problem_v1::{
    format_problem_v1, parse_problem_v1, parse_problem_v1_with, Fact, FactSet, ObjectType,
    ParseError, ParseOptions, Problem,
};
pub use substitute::NameSubstitution;
pub use verify::Violation;
