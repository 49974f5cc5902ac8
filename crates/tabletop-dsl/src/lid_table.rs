//! Container ↔ lid association.
//!
//! Which lid closes which container is configuration, not something inferred
//! from a problem. The table is passed explicitly to inference and
//! verification so that problems with different tables can be processed side
//! by side.
//!
//! JSON form (`serde`):
//!
//! ```json
//! [{"container": "container_07", "lid": "lid_01"}]
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::problem_v1::Name;

/// Pairs used by the annotated tabletop scenes.
pub const BUILTIN_LID_PAIRS: [(&str, &str); 4] = [
    ("container_07", "lid_01"),
    ("container_08", "lid_02"),
    ("container_09", "lid_03"),
    ("container_10", "lid_04"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LidPair {
    pub container: Name,
    pub lid: Name,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LidTableError {
    #[error("container `{0}` is associated with more than one lid")]
    DuplicateContainer(Name),
    #[error("lid `{0}` is associated with more than one container")]
    DuplicateLid(Name),
}

/// One-to-one container ↔ lid mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LidPair>", into = "Vec<LidPair>")]
pub struct LidTable {
    lid_by_container: BTreeMap<Name, Name>,
    lids: BTreeSet<Name>,
}

impl LidTable {
    pub fn from_pairs<I, C, L>(pairs: I) -> Result<Self, LidTableError>
    where
        I: IntoIterator<Item = (C, L)>,
        C: Into<Name>,
        L: Into<Name>,
    {
        let mut table = LidTable::default();
        for (container, lid) in pairs {
            let (container, lid) = (container.into(), lid.into());
            if table.lid_by_container.contains_key(&container) {
                return Err(LidTableError::DuplicateContainer(container));
            }
            if !table.lids.insert(lid.clone()) {
                return Err(LidTableError::DuplicateLid(lid));
            }
            table.lid_by_container.insert(container, lid);
        }
        Ok(table)
    }

    /// The table shipped with the annotated scene corpus.
    pub fn builtin() -> Self {
        let mut table = LidTable::default();
        for (container, lid) in BUILTIN_LID_PAIRS {
            table
                .lid_by_container
                .insert(container.to_string(), lid.to_string());
            table.lids.insert(lid.to_string());
        }
        table
    }

    pub fn lid_for(&self, container: &str) -> Option<&str> {
        self.lid_by_container.get(container).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lid_by_container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lid_by_container.is_empty()
    }
}

impl TryFrom<Vec<LidPair>> for LidTable {
    type Error = LidTableError;

    fn try_from(pairs: Vec<LidPair>) -> Result<Self, Self::Error> {
        LidTable::from_pairs(pairs.into_iter().map(|p| (p.container, p.lid)))
    }
}

impl From<LidTable> for Vec<LidPair> {
    fn from(table: LidTable) -> Self {
        table
            .lid_by_container
            .into_iter()
            .map(|(container, lid)| LidPair { container, lid })
            .collect()
    }
}
