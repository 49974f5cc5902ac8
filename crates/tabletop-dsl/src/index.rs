//! Per-predicate view of a fact set.
//!
//! Inference rebuilds this after every rule group; it is a snapshot and does
//! not follow later edits of the underlying `FactSet`.

use std::collections::BTreeSet;

use crate::problem_v1::{predicates, FactSet, Name};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactIndex {
    /// `(top, support)` for every `(on top support)`.
    pub on: Vec<(Name, Name)>,
    /// `(object, container)` for every `(in object container)`.
    pub inside: Vec<(Name, Name)>,
    pub clear: BTreeSet<Name>,
    pub ontable: BTreeSet<Name>,
    pub closed: BTreeSet<Name>,
    pub handempty: bool,
}

impl FactIndex {
    pub fn build(facts: &FactSet) -> Self {
        let mut index = FactIndex::default();
        for fact in facts {
            match (fact.predicate.as_str(), fact.args.as_slice()) {
                (predicates::ON, [top, support]) => index.on.push((top.clone(), support.clone())),
                (predicates::IN, [object, container]) => {
                    index.inside.push((object.clone(), container.clone()))
                }
                (predicates::CLEAR, [object]) => {
                    index.clear.insert(object.clone());
                }
                (predicates::ONTABLE, [object]) => {
                    index.ontable.insert(object.clone());
                }
                (predicates::CLOSED, [object]) => {
                    index.closed.insert(object.clone());
                }
                (predicates::HANDEMPTY, []) => index.handempty = true,
                _ => {}
            }
        }
        index
    }

    /// Objects something rests on (second argument of `on`).
    pub fn supports(&self) -> BTreeSet<&str> {
        self.on.iter().map(|(_, support)| support.as_str()).collect()
    }

    pub fn has_on(&self, top: &str, support: &str) -> bool {
        self.on.iter().any(|(t, s)| t == top && s == support)
    }

    /// Whether `object` is placed: inside something, on something, or on the table.
    pub fn is_placed(&self, object: &str) -> bool {
        self.ontable.contains(object)
            || self.on.iter().any(|(top, _)| top == object)
            || self.inside.iter().any(|(o, _)| o == object)
    }

    /// Every placement of `object`, rendered as `ontable`, `on <support>` or
    /// `in <container>`. A well-formed problem has exactly one.
    pub fn placements(&self, object: &str) -> Vec<Name> {
        let mut out = Vec::new();
        if self.ontable.contains(object) {
            out.push(predicates::ONTABLE.to_string());
        }
        for (top, support) in &self.on {
            if top == object {
                out.push(format!("{} {support}", predicates::ON));
            }
        }
        for (o, container) in &self.inside {
            if o == object {
                out.push(format!("{} {container}", predicates::IN));
            }
        }
        out
    }
}
