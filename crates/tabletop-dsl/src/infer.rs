//! Default inference: fill in facts that annotators leave implicit.
//!
//! Rules run once, in order, and the fact index is rebuilt after each rule
//! group so that later rules see the edits of earlier ones:
//!
//! 1. `ontable` for every object that is not `in` or `on` something;
//! 2. `clear` for every non-container nothing rests on; containers are never
//!    `clear`;
//! 3. a single `handempty`;
//! 4. a closed container with a configured (and declared) lid gets the lid
//!    `on` it, the lid is taken off the table and marked `clear`, and the
//!    container loses `clear`. A lid already `in` something or `on` another
//!    object is left where it is.
//!
//! The pass never fails and is idempotent. Contradictions it cannot repair
//! are left for `verify`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::FactIndex;
use crate::lid_table::LidTable;
use crate::problem_v1::{predicates, Fact, FactSet, Problem};

/// Net effect of one inference pass on the init facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceSummary {
    pub added: Vec<Fact>,
    pub removed: Vec<Fact>,
}

impl InferenceSummary {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl Problem {
    pub fn ensure_defaults(&mut self, lids: &LidTable) -> InferenceSummary {
        let before = self.init.clone();

        self.infer_ontable(&FactIndex::build(&self.init));
        self.infer_clear(&FactIndex::build(&self.init));
        self.infer_handempty(&FactIndex::build(&self.init));
        self.infer_lid_closure(&FactIndex::build(&self.init), lids);

        let summary = InferenceSummary {
            added: self.init.difference(&before),
            removed: before.difference(&self.init),
        };
        debug!(
            problem = %self.name,
            added = summary.added.len(),
            removed = summary.removed.len(),
            "inferred default facts"
        );
        summary
    }

    fn infer_ontable(&mut self, index: &FactIndex) {
        for id in self.objects.keys() {
            if !index.is_placed(id) {
                self.init.insert(Fact::unary(predicates::ONTABLE, id.as_str()));
            }
        }
    }

    fn infer_clear(&mut self, index: &FactIndex) {
        let supports = index.supports();
        for (id, ty) in &self.objects {
            if ty.is_container() {
                self.init.remove(&Fact::unary(predicates::CLEAR, id.as_str()));
            } else if !supports.contains(id.as_str()) && !index.clear.contains(id) {
                self.init.insert(Fact::unary(predicates::CLEAR, id.as_str()));
            }
        }
    }

    fn infer_handempty(&mut self, index: &FactIndex) {
        if !index.handempty {
            self.init.insert(Fact::nullary(predicates::HANDEMPTY));
        }
    }

    fn infer_lid_closure(&mut self, index: &FactIndex, lids: &LidTable) {
        for container in &index.closed {
            let Some(lid) = lids.lid_for(container) else {
                continue;
            };
            if !self.objects.contains_key(lid) {
                debug!(container = %container, lid, "lid of closed container is not declared");
                continue;
            }
            let elsewhere = index.inside.iter().any(|(o, _)| o == lid)
                || index.on.iter().any(|(top, s)| top == lid && s != container);
            if elsewhere {
                debug!(container = %container, lid, "lid is placed elsewhere, not closing");
                continue;
            }
            close_with_lid(&mut self.init, container, lid);
        }
    }
}

fn close_with_lid(init: &mut FactSet, container: &str, lid: &str) {
    init.remove(&Fact::unary(predicates::ONTABLE, lid));
    init.insert(Fact::binary(predicates::ON, lid, container));
    init.remove(&Fact::unary(predicates::CLEAR, container));
    init.insert(Fact::unary(predicates::CLEAR, lid));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem_v1::{parse_problem_v1, ObjectType};

    fn bowl_problem(init: &str) -> Problem {
        parse_problem_v1(&format!(
            "(define (problem p) (:domain manip)
               (:objects
                 bowl1 - container
                 lid1 cup1 - item)
               (:init {init}))"
        ))
        .expect("parse")
    }

    #[test]
    fn isolated_objects_go_on_the_table() {
        let mut problem = Problem::new("a", "manip");
        problem.declare("cup1", ObjectType::Item);
        problem.declare("table_support", ObjectType::Item);
        problem.ensure_defaults(&LidTable::default());

        let expected: FactSet = [
            Fact::unary("ontable", "cup1"),
            Fact::unary("clear", "cup1"),
            Fact::unary("ontable", "table_support"),
            Fact::unary("clear", "table_support"),
            Fact::nullary("handempty"),
        ]
        .into_iter()
        .collect();
        assert_eq!(problem.init, expected);
    }

    #[test]
    fn containers_never_stay_clear() {
        let mut problem = bowl_problem("(clear bowl1) (in cup1 bowl1)");
        let summary = problem.ensure_defaults(&LidTable::default());
        assert!(!problem.init.contains(&Fact::unary("clear", "bowl1")));
        assert!(problem.init.contains(&Fact::unary("ontable", "bowl1")));
        assert!(!problem.init.contains(&Fact::unary("ontable", "cup1")));
        assert!(problem.init.contains(&Fact::unary("clear", "cup1")));
        assert_eq!(summary.removed, vec![Fact::unary("clear", "bowl1")]);
    }

    #[test]
    fn supports_are_not_marked_clear() {
        let mut problem = bowl_problem("(on cup1 lid1)");
        problem.ensure_defaults(&LidTable::default());
        assert!(!problem.init.contains(&Fact::unary("clear", "lid1")));
        assert!(problem.init.contains(&Fact::unary("clear", "cup1")));
        assert!(!problem.init.contains(&Fact::unary("ontable", "cup1")));
        assert!(problem.init.contains(&Fact::unary("ontable", "lid1")));
    }

    #[test]
    fn closed_container_gets_its_lid() {
        let lids = LidTable::from_pairs([("bowl1", "lid1")]).expect("lids");
        let mut problem = bowl_problem("(closed bowl1)");
        problem.ensure_defaults(&lids);

        assert!(problem.init.contains(&Fact::binary("on", "lid1", "bowl1")));
        assert!(problem.init.contains(&Fact::unary("clear", "lid1")));
        assert!(!problem.init.contains(&Fact::unary("ontable", "lid1")));
        assert!(!problem.init.contains(&Fact::unary("clear", "bowl1")));
        assert!(problem.init.contains(&Fact::unary("ontable", "bowl1")));
    }

    #[test]
    fn undeclared_lid_is_not_introduced() {
        let lids = LidTable::from_pairs([("bowl1", "lid9")]).expect("lids");
        let mut problem = bowl_problem("(closed bowl1)");
        problem.ensure_defaults(&lids);
        assert!(!problem.init.contains(&Fact::binary("on", "lid9", "bowl1")));
        assert!(problem.undeclared_references().is_empty());
    }

    #[test]
    fn lid_placed_elsewhere_stays_put() {
        let lids = LidTable::from_pairs([("bowl1", "lid1")]).expect("lids");
        let mut problem = bowl_problem("(closed bowl1) (on lid1 cup1)");
        problem.ensure_defaults(&lids);
        assert!(problem.init.contains(&Fact::binary("on", "lid1", "cup1")));
        assert!(!problem.init.contains(&Fact::binary("on", "lid1", "bowl1")));
        assert!(!problem.init.contains(&Fact::unary("ontable", "lid1")));
    }

    #[test]
    fn second_pass_changes_nothing() {
        let lids = LidTable::from_pairs([("bowl1", "lid1")]).expect("lids");
        let mut problem = bowl_problem("(closed bowl1) (ontable lid1) (clear bowl1) (on cup1 lid1)");
        let first = problem.ensure_defaults(&lids);
        assert!(!first.is_empty());
        let snapshot = problem.clone();
        let second = problem.ensure_defaults(&lids);
        assert!(second.is_empty(), "second pass: {second:?}");
        assert_eq!(problem, snapshot);
    }

    #[test]
    fn existing_handempty_is_kept_once() {
        let mut problem = bowl_problem("(handempty)");
        problem.ensure_defaults(&LidTable::default());
        assert_eq!(problem.init.with_predicate("handempty").count(), 1);
    }
}
