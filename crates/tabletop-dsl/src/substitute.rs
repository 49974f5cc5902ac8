//! Identifier ↔ name substitution over raw text.
//!
//! Problems are annotated with opaque catalog identifiers (`kitchen_17`) but
//! are easier to review with human names (`red chili pepper`). The rewrite
//! works on text rather than on a parsed `Problem` so it also covers comments
//! and sibling files.
//!
//! Matching rules:
//! - whole words only (`\b` on both sides);
//! - an instance suffix `_<digits>` after a match is kept
//!   (`kitchen_17_2` → `red chili pepper_2`);
//! - candidates are tried longest-first over the whole text; a span claimed
//!   by a longer candidate is locked, so a shorter one never splits it and
//!   replaced text is never matched again.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;

/// Bidirectional identifier ↔ name rewriter.
#[derive(Debug, Clone)]
pub struct NameSubstitution {
    to_names: Option<Rewriter>,
    to_ids: Option<Rewriter>,
}

impl NameSubstitution {
    /// Build from `(identifier, name)` pairs.
    ///
    /// When an identifier or a name occurs more than once, the first pair
    /// wins for that direction.
    pub fn new<I, K, V>(id_to_name: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs: Vec<(String, String)> = id_to_name
            .into_iter()
            .map(|(id, name)| (id.into(), name.into()))
            .collect();

        let to_names = Rewriter::new(pairs.iter().map(|(id, name)| (id.as_str(), name.as_str())))?;
        let to_ids = Rewriter::new(pairs.iter().map(|(id, name)| (name.as_str(), id.as_str())))?;
        Ok(NameSubstitution { to_names, to_ids })
    }

    pub fn ids_to_names(&self, text: &str) -> String {
        match &self.to_names {
            Some(rewriter) => rewriter.apply(text),
            None => text.to_string(),
        }
    }

    pub fn names_to_ids(&self, text: &str) -> String {
        match &self.to_ids {
            Some(rewriter) => rewriter.apply(text),
            None => text.to_string(),
        }
    }
}

/// Per-candidate patterns, longest candidate first.
#[derive(Debug, Clone)]
struct Rewriter {
    rules: Vec<(Regex, String)>,
}

impl Rewriter {
    fn new<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> Result<Option<Self>, regex::Error> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut keys: Vec<(&str, &str)> = Vec::new();
        for (from, to) in pairs {
            if from.is_empty() || !seen.insert(from) {
                continue;
            }
            keys.push((from, to));
        }
        if keys.is_empty() {
            return Ok(None);
        }

        keys.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let rules = keys
            .into_iter()
            .map(|(from, to)| {
                let pattern = Regex::new(&format!(r"\b({})(_\d+)?\b", regex::escape(from)))?;
                Ok((pattern, to.to_string()))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Some(Rewriter { rules }))
    }

    fn apply(&self, text: &str) -> String {
        // start -> (end, replacement); spans never overlap.
        let mut locked: BTreeMap<usize, (usize, String)> = BTreeMap::new();

        for (pattern, replacement) in &self.rules {
            let mut at = 0;
            while at <= text.len() {
                let Some(caps) = pattern.captures_at(text, at) else {
                    break;
                };
                let Some(whole) = caps.get(0) else {
                    break;
                };
                let (start, end) = (whole.start(), whole.end());
                let overlaps = locked
                    .range(..end)
                    .next_back()
                    .is_some_and(|(_, (locked_end, _))| *locked_end > start);
                if overlaps {
                    at = start + text[start..].chars().next().map_or(1, char::len_utf8);
                    continue;
                }
                let suffix = caps.get(2).map_or("", |m| m.as_str());
                locked.insert(start, (end, format!("{replacement}{suffix}")));
                at = end;
            }
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, (end, replacement)) in locked {
            out.push_str(&text[cursor..start]);
            out.push_str(&replacement);
            cursor = end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}
