//! Domain invariants for tabletop problems.
//!
//! Verification is read-only and runs after `ensure_defaults`: omissions are
//! repaired by inference, so what reaches this pass is a contradiction the
//! author has to fix (wrong support type, `in` a non-container, a closed
//! object nobody can close).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::FactIndex;
use crate::lid_table::LidTable;
use crate::problem_v1::{Name, Problem};

/// Label used for the type of an identifier that was never declared.
pub const UNDECLARED_TYPE: &str = "undeclared";

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    #[error("invalid support `{support}` of type `{support_type}` for `(on {object} {support})`")]
    InvalidSupportType {
        object: Name,
        support: Name,
        support_type: Name,
    },
    #[error("only containers with a configured lid may be closed, but `{object}` (type `{object_type}`) has none")]
    ClosedNotClosable { object: Name, object_type: Name },
    #[error("closed container `{container}` has no lid `{lid}` on it")]
    MissingLidOnClosedContainer { container: Name, lid: Name },
    #[error("`in` target `{target}` of `{object}` must be a container, got `{target_type}`")]
    InvalidInTarget {
        object: Name,
        target: Name,
        target_type: Name,
    },
    #[error("missing `ontable` for `{object}`")]
    MissingOntable { object: Name },
    #[error("`{object}` must have exactly one placement, got {}", .placements.join(", "))]
    MultiplePlacements { object: Name, placements: Vec<Name> },
    #[error("container `{object}` must not be marked `clear`")]
    ContainerMarkedClear { object: Name },
    #[error("missing `clear` for `{object}`")]
    MissingClear { object: Name },
    #[error("missing `handempty`")]
    MissingHandempty,
}

impl Violation {
    /// Stable rule name, used in logs and batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Violation::InvalidSupportType { .. } => "InvalidSupportType",
            Violation::ClosedNotClosable { .. } => "ClosedNotClosable",
            Violation::MissingLidOnClosedContainer { .. } => "MissingLidOnClosedContainer",
            Violation::InvalidInTarget { .. } => "InvalidInTarget",
            Violation::MissingOntable { .. } => "MissingOntable",
            Violation::MultiplePlacements { .. } => "MultiplePlacements",
            Violation::ContainerMarkedClear { .. } => "ContainerMarkedClear",
            Violation::MissingClear { .. } => "MissingClear",
            Violation::MissingHandempty => "MissingHandempty",
        }
    }
}

impl Problem {
    /// First violated invariant, in rule order.
    pub fn verify(&self, lids: &LidTable) -> Result<(), Violation> {
        match self.violations(lids).into_iter().next() {
            Some(violation) => Err(violation),
            None => Ok(()),
        }
    }

    /// Every violated invariant, in rule order.
    pub fn violations(&self, lids: &LidTable) -> Vec<Violation> {
        let index = FactIndex::build(&self.init);
        let mut out = Vec::new();

        for (object, support) in &index.on {
            if !self.object_type(support).is_some_and(|ty| ty.can_support()) {
                out.push(Violation::InvalidSupportType {
                    object: object.clone(),
                    support: support.clone(),
                    support_type: self.type_label(support),
                });
            }
        }

        for object in &index.closed {
            match lids.lid_for(object) {
                None => out.push(Violation::ClosedNotClosable {
                    object: object.clone(),
                    object_type: self.type_label(object),
                }),
                Some(lid) if !index.has_on(lid, object) => {
                    out.push(Violation::MissingLidOnClosedContainer {
                        container: object.clone(),
                        lid: lid.to_string(),
                    })
                }
                Some(_) => {}
            }
        }

        for (object, target) in &index.inside {
            if !self.object_type(target).is_some_and(|ty| ty.is_container()) {
                out.push(Violation::InvalidInTarget {
                    object: object.clone(),
                    target: target.clone(),
                    target_type: self.type_label(target),
                });
            }
        }

        let supports = index.supports();
        for (object, ty) in &self.objects {
            let placements = index.placements(object);
            match placements.len() {
                0 => out.push(Violation::MissingOntable {
                    object: object.clone(),
                }),
                1 => {}
                _ => out.push(Violation::MultiplePlacements {
                    object: object.clone(),
                    placements,
                }),
            }
            if ty.is_container() {
                if index.clear.contains(object) {
                    out.push(Violation::ContainerMarkedClear {
                        object: object.clone(),
                    });
                }
            } else if !supports.contains(object.as_str()) && !index.clear.contains(object) {
                out.push(Violation::MissingClear {
                    object: object.clone(),
                });
            }
        }

        if !index.handempty {
            out.push(Violation::MissingHandempty);
        }

        out
    }

    fn type_label(&self, id: &str) -> Name {
        self.object_type(id)
            .map(|ty| ty.as_str().to_string())
            .unwrap_or_else(|| UNDECLARED_TYPE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem_v1::parse_problem_v1;

    fn problem(objects: &str, init: &str) -> Problem {
        parse_problem_v1(&format!(
            "(define (problem p) (:domain manip) (:objects {objects}) (:init {init}))"
        ))
        .expect("parse")
    }

    #[test]
    fn lid_is_not_a_valid_support() {
        let p = problem(
            "a - item\n l - lid",
            "(on a l) (ontable l) (clear a) (handempty)",
        );
        let err = p.verify(&LidTable::default()).expect_err("violation");
        assert_eq!(
            err,
            Violation::InvalidSupportType {
                object: "a".to_string(),
                support: "l".to_string(),
                support_type: "lid".to_string(),
            }
        );
        assert_eq!(err.kind(), "InvalidSupportType");
    }

    #[test]
    fn undeclared_support_is_reported_as_undeclared() {
        let p = problem("a - item", "(on a ghost) (clear a) (handempty)");
        let err = p.verify(&LidTable::default()).expect_err("violation");
        assert!(err.to_string().contains("`undeclared`"), "err={err}");
    }

    #[test]
    fn closed_without_lid_entry_is_not_closable() {
        let p = problem(
            "bowl1 - container\n lid1 - item",
            "(closed bowl1) (ontable bowl1) (on lid1 bowl1) (clear lid1) (handempty)",
        );
        let err = p.verify(&LidTable::default()).expect_err("violation");
        assert!(matches!(err, Violation::ClosedNotClosable { ref object, .. } if object == "bowl1"));
    }

    #[test]
    fn closed_without_lid_on_it() {
        let lids = LidTable::from_pairs([("bowl1", "lid1")]).expect("lids");
        let p = problem(
            "bowl1 - container\n lid1 - item",
            "(closed bowl1) (ontable bowl1) (ontable lid1) (clear lid1) (handempty)",
        );
        assert_eq!(
            p.verify(&lids),
            Err(Violation::MissingLidOnClosedContainer {
                container: "bowl1".to_string(),
                lid: "lid1".to_string(),
            })
        );
    }

    #[test]
    fn in_target_must_be_a_container() {
        let p = problem(
            "item1 item2 - item",
            "(in item1 item2) (ontable item2) (clear item1) (clear item2) (handempty)",
        );
        let err = p.verify(&LidTable::default()).expect_err("violation");
        assert_eq!(err.kind(), "InvalidInTarget");
    }

    #[test]
    fn reports_every_violation_in_rule_order() {
        let p = problem("bowl - container\n cup - item", "(clear bowl)");
        let kinds: Vec<&str> = p
            .violations(&LidTable::default())
            .iter()
            .map(Violation::kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                "MissingOntable",
                "ContainerMarkedClear",
                "MissingOntable",
                "MissingClear",
                "MissingHandempty",
            ]
        );
    }

    #[test]
    fn object_on_the_table_and_on_a_bowl_is_rejected() {
        let p = problem(
            "bowl - container\n cup - item",
            "(ontable bowl) (ontable cup) (on cup bowl) (clear cup) (handempty)",
        );
        assert_eq!(
            p.verify(&LidTable::default()),
            Err(Violation::MultiplePlacements {
                object: "cup".to_string(),
                placements: vec!["ontable".to_string(), "on bowl".to_string()],
            })
        );
        let err = p.verify(&LidTable::default()).expect_err("violation");
        assert!(err.to_string().contains("got ontable, on bowl"), "err={err}");
    }

    #[test]
    fn lid_stored_in_another_container_does_not_close_the_bowl() {
        let lids = LidTable::from_pairs([("bowl1", "lid1")]).expect("lids");
        let mut p = problem(
            "bowl1 box - container\n lid1 cup - item",
            "(closed bowl1) (in lid1 box) (ontable cup) (on cup bowl1)",
        );
        p.ensure_defaults(&lids);

        let index = FactIndex::build(&p.init);
        assert_eq!(index.placements("lid1"), vec!["in box"]);
        assert!(!index.has_on("lid1", "bowl1"));

        let violations = p.violations(&lids);
        assert!(violations.contains(&Violation::MissingLidOnClosedContainer {
            container: "bowl1".to_string(),
            lid: "lid1".to_string(),
        }));
        assert!(violations.contains(&Violation::MultiplePlacements {
            object: "cup".to_string(),
            placements: vec!["ontable".to_string(), "on bowl1".to_string()],
        }));
        assert!(p.verify(&lids).is_err());
    }

    #[test]
    fn inferred_problem_verifies() {
        let lids = LidTable::builtin();
        let mut p = problem(
            "container_07 - container\n lid_01 kitchen_17 - item",
            "(closed container_07) (in kitchen_17 container_07)",
        );
        p.ensure_defaults(&lids);
        assert_eq!(p.verify(&lids), Ok(()));
        assert!(p.violations(&lids).is_empty());
    }

    #[test]
    fn violation_serializes_with_kind_tag() {
        let json = serde_json::to_value(Violation::MissingClear {
            object: "a".to_string(),
        })
        .expect("serialize");
        assert_eq!(json["kind"], "missing_clear");
        assert_eq!(json["object"], "a");
    }
}
