use thiserror::Error;

use crate::problem_v1::ParseError;
use crate::verify::Violation;

/// Any failure of the parse → infer → verify pipeline for one problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProblemError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Violation(#[from] Violation),
}

impl ProblemError {
    /// `MalformedInput` or the violated rule name.
    pub fn kind(&self) -> &'static str {
        match self {
            ProblemError::Parse(ParseError::MalformedInput { .. }) => "MalformedInput",
            ProblemError::Violation(violation) => violation.kind(),
        }
    }
}
