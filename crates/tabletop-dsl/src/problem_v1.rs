//! PDDL problem dialect: `problem_v1`
//!
//! The restricted problem subset used to describe tabletop manipulation scenes:
//!
//! ```text
//! (define (problem 46_0)
//!   (:domain manip)
//!   (:objects
//!     container_07 - container
//!     lid_01 kitchen_17 - item
//!   )
//!   (:init
//!     (closed container_07)
//!     (in kitchen_17 container_07)
//!   )
//!   (:goal (and
//!     (ontable kitchen_17)
//!   ))
//! )
//! ```
//!
//! Notes:
//! - Only ground facts are supported. Goals are read as a flat conjunction;
//!   there is no `not`, `or`, quantifiers, axioms or type hierarchy.
//! - Comments (`;` to end of line) are stripped before any block is located.
//! - `format_problem_v1` is the canonical layout: `parse(format(p)) == p`.

use std::collections::{btree_set, BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use nom::{
    bytes::complete::{tag_no_case, take_while1},
    character::complete::{char as pchar, multispace1},
    sequence::{delimited, preceded, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub type Name = String;

/// Problem name used when the source has no `(problem <name>)` header.
pub const DEFAULT_PROBLEM_NAME: &str = "generated";

/// Type tag written by older annotation tooling; collapsed onto `item`.
pub const LEGACY_SUPPORT_TYPE: &str = "support";

/// Predicate names the inference and verification rules understand.
pub mod predicates {
    pub const ON: &str = "on";
    pub const IN: &str = "in";
    pub const CLEAR: &str = "clear";
    pub const ONTABLE: &str = "ontable";
    pub const CLOSED: &str = "closed";
    pub const HANDEMPTY: &str = "handempty";
}

// ============================================================================
// Model
// ============================================================================

/// Flat object type tag.
///
/// Unknown tags are preserved verbatim (`Other`) so that problems written for
/// a richer domain still round-trip; the rules treat them as non-containers
/// that cannot support anything.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectType {
    Container,
    Lid,
    Item,
    Other(Name),
}

impl ObjectType {
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "container" => ObjectType::Container,
            "lid" => ObjectType::Lid,
            "item" | LEGACY_SUPPORT_TYPE => ObjectType::Item,
            _ => ObjectType::Other(tag.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::Container => "container",
            ObjectType::Lid => "lid",
            ObjectType::Item => "item",
            ObjectType::Other(tag) => tag,
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, ObjectType::Container)
    }

    /// Whether an object of this type may appear as the support of `on`.
    pub fn can_support(&self) -> bool {
        matches!(self, ObjectType::Container | ObjectType::Item)
    }
}

impl From<String> for ObjectType {
    fn from(tag: String) -> Self {
        ObjectType::from_tag(&tag)
    }
}

impl From<ObjectType> for String {
    fn from(ty: ObjectType) -> Self {
        ty.as_str().to_string()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ground fact: predicate plus argument tokens.
///
/// The derived ordering compares the predicate first and then the arguments
/// lexicographically (a shorter argument list sorts first on a shared prefix),
/// which is the canonical output order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fact {
    pub predicate: Name,
    pub args: Vec<Name>,
}

impl Fact {
    pub fn new<P, I, A>(predicate: P, args: I) -> Self
    where
        P: Into<Name>,
        I: IntoIterator<Item = A>,
        A: Into<Name>,
    {
        Fact {
            predicate: predicate.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn nullary(predicate: impl Into<Name>) -> Self {
        Fact {
            predicate: predicate.into(),
            args: vec![],
        }
    }

    pub fn unary(predicate: impl Into<Name>, arg: impl Into<Name>) -> Self {
        Fact {
            predicate: predicate.into(),
            args: vec![arg.into()],
        }
    }

    pub fn binary(predicate: impl Into<Name>, first: impl Into<Name>, second: impl Into<Name>) -> Self {
        Fact {
            predicate: predicate.into(),
            args: vec![first.into(), second.into()],
        }
    }

    /// `true` when the fact uses `predicate` with exactly `arity` arguments.
    pub fn is(&self, predicate: &str, arity: usize) -> bool {
        self.predicate == predicate && self.args.len() == arity
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn map_args(&self, mut rename: impl FnMut(&str) -> Name) -> Fact {
        Fact {
            predicate: self.predicate.clone(),
            args: self.args.iter().map(|a| rename(a.as_str())).collect(),
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.predicate)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        f.write_str(")")
    }
}

/// Set of ground facts, iterated in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactSet(BTreeSet<Fact>);

impl FactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the fact was already present.
    pub fn insert(&mut self, fact: Fact) -> bool {
        self.0.insert(fact)
    }

    /// Returns `false` if the fact was not present.
    pub fn remove(&mut self, fact: &Fact) -> bool {
        self.0.remove(fact)
    }

    pub fn contains(&self, fact: &Fact) -> bool {
        self.0.contains(fact)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Fact> {
        self.0.iter()
    }

    pub fn with_predicate<'a>(&'a self, predicate: &'a str) -> impl Iterator<Item = &'a Fact> + 'a {
        self.0.iter().filter(move |f| f.predicate == predicate)
    }

    /// Facts present in `self` but not in `other`, in canonical order.
    pub fn difference(&self, other: &FactSet) -> Vec<Fact> {
        self.0.difference(&other.0).cloned().collect()
    }
}

impl FromIterator<Fact> for FactSet {
    fn from_iter<T: IntoIterator<Item = Fact>>(iter: T) -> Self {
        FactSet(iter.into_iter().collect())
    }
}

impl Extend<Fact> for FactSet {
    fn extend<T: IntoIterator<Item = Fact>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl IntoIterator for FactSet {
    type Item = Fact;
    type IntoIter = btree_set::IntoIter<Fact>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a FactSet {
    type Item = &'a Fact;
    type IntoIter = btree_set::Iter<'a, Fact>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One scene instance: objects, initial facts and goal facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub name: Name,
    pub domain: Name,
    pub objects: BTreeMap<Name, ObjectType>,
    pub init: FactSet,
    pub goal: FactSet,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("renaming would merge `{first}` and `{second}` into `{target}`")]
pub struct RenameCollision {
    pub first: Name,
    pub second: Name,
    pub target: Name,
}

impl Problem {
    pub fn new(name: impl Into<Name>, domain: impl Into<Name>) -> Self {
        Problem {
            name: name.into(),
            domain: domain.into(),
            objects: BTreeMap::new(),
            init: FactSet::new(),
            goal: FactSet::new(),
        }
    }

    pub fn declare(&mut self, id: impl Into<Name>, ty: ObjectType) {
        self.objects.insert(id.into(), ty);
    }

    pub fn object_type(&self, id: &str) -> Option<&ObjectType> {
        self.objects.get(id)
    }

    /// Identifiers used as fact arguments (init or goal) but never declared.
    pub fn undeclared_references(&self) -> BTreeSet<Name> {
        self.init
            .iter()
            .chain(self.goal.iter())
            .flat_map(|f| f.args.iter())
            .filter(|arg| !self.objects.contains_key(arg.as_str()))
            .cloned()
            .collect()
    }

    /// Replace the goal with the initial state of `target`.
    pub fn set_goal_from_init(&mut self, target: &Problem) {
        self.goal = target.init.clone();
    }

    /// Rename object identifiers in the registry and in every fact argument.
    ///
    /// Identifiers missing from `mapping` are kept. The problem is left
    /// untouched when two objects would end up with the same identifier.
    pub fn rename_objects(&mut self, mapping: &BTreeMap<Name, Name>) -> Result<(), RenameCollision> {
        let rename = |id: &str| mapping.get(id).cloned().unwrap_or_else(|| id.to_string());

        let mut objects = BTreeMap::new();
        let mut origin: BTreeMap<Name, Name> = BTreeMap::new();
        for (id, ty) in &self.objects {
            let target = rename(id);
            if let Some(first) = origin.insert(target.clone(), id.clone()) {
                return Err(RenameCollision {
                    first,
                    second: id.clone(),
                    target,
                });
            }
            objects.insert(target, ty.clone());
        }

        self.objects = objects;
        self.init = self.init.iter().map(|f| f.map_args(rename)).collect();
        self.goal = self.goal.iter().map(|f| f.map_args(rename)).collect();
        Ok(())
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_problem_v1(self))
    }
}

impl FromStr for Problem {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_problem_v1(s)
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed input in `{section}`: {message}")]
    MalformedInput {
        section: &'static str,
        message: String,
    },
}

impl ParseError {
    fn malformed(section: &'static str, message: impl Into<String>) -> Self {
        ParseError::MalformedInput {
            section,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Reject objects-block lines (or trailing names) without a `- type`
    /// separator instead of skipping them.
    #[serde(default)]
    pub strict_objects: bool,
}

/// The top-level sections of a problem, as spans of comment-free text.
///
/// Every span starts at the section's opening parenthesis and ends at its
/// matching closing parenthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemBlocks<'a> {
    pub problem: Option<&'a str>,
    pub domain: &'a str,
    pub objects: &'a str,
    pub init: &'a str,
    pub goal: Option<&'a str>,
}

const PROBLEM_HEADER: &str = "(problem";
const DOMAIN_HEADER: &str = "(:domain";
const OBJECTS_HEADER: &str = "(:objects";
const INIT_HEADER: &str = "(:init";
const GOAL_HEADER: &str = "(:goal";

pub fn parse_problem_v1(text: &str) -> Result<Problem, ParseError> {
    parse_problem_v1_with(text, ParseOptions::default())
}

pub fn parse_problem_v1_with(text: &str, options: ParseOptions) -> Result<Problem, ParseError> {
    let text = strip_comments(text);
    let blocks = extract_blocks(&text)?;

    let name = match blocks.problem {
        Some(block) => parse_header_name(block, PROBLEM_HEADER)
            .ok_or_else(|| ParseError::malformed("problem", "problem name missing"))?
            .to_string(),
        None => DEFAULT_PROBLEM_NAME.to_string(),
    };
    let domain = parse_header_name(blocks.domain, DOMAIN_HEADER)
        .ok_or_else(|| ParseError::malformed("domain", "domain name missing"))?
        .to_string();

    let objects_body = &blocks.objects[OBJECTS_HEADER.len()..blocks.objects.len() - 1];
    let objects = parse_objects_block(objects_body, options)?;

    let init = tokenize_facts(blocks.init, ":init").into_iter().collect();
    let goal = blocks
        .goal
        .map(|block| tokenize_facts(block, ":goal").into_iter().collect())
        .unwrap_or_default();

    Ok(Problem {
        name,
        domain,
        objects,
        init,
        goal,
    })
}

/// Remove `;` comments, keeping line structure.
pub fn strip_comments(text: &str) -> String {
    text.lines()
        .map(|line| line.split_once(';').map(|(code, _)| code).unwrap_or(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Locate the problem sections in comment-free text.
///
/// `domain`, `objects` and `init` are required; `problem` and `goal` are
/// optional.
pub fn extract_blocks(text: &str) -> Result<ProblemBlocks<'_>, ParseError> {
    check_balanced(text)?;

    let problem = find_block(text, PROBLEM_HEADER, "problem")?;
    let domain = find_block(text, DOMAIN_HEADER, "domain")?
        .ok_or_else(|| ParseError::malformed("domain", "`(:domain` block not found"))?;
    let objects = find_block(text, OBJECTS_HEADER, "objects")?
        .ok_or_else(|| ParseError::malformed("objects", "`(:objects` block not found"))?;
    let init = find_block(text, INIT_HEADER, "init")?
        .ok_or_else(|| ParseError::malformed("init", "`(:init` block not found"))?;
    let goal = find_block(text, GOAL_HEADER, "goal")?;

    Ok(ProblemBlocks {
        problem,
        domain,
        objects,
        init,
        goal,
    })
}

/// Every maximal parenthesized group without nested parentheses, as a fact.
///
/// Groups headed by `keyword` (e.g. `:init`) or by `and` are structural and
/// dropped, as are empty groups.
pub fn tokenize_facts(block: &str, keyword: &str) -> Vec<Fact> {
    let mut facts = Vec::new();
    let mut rest = block;
    while let Some(offset) = rest.find('(') {
        let candidate = &rest[offset..];
        match fact_group(candidate) {
            Ok((remaining, body)) => {
                if let Some(fact) = fact_from_body(body, keyword) {
                    facts.push(fact);
                }
                rest = remaining;
            }
            Err(_) => rest = &candidate[1..],
        }
    }
    facts
}

fn fact_group(input: &str) -> IResult<&str, &str> {
    delimited(
        pchar('('),
        take_while1(|c: char| c != '(' && c != ')'),
        pchar(')'),
    )(input)
}

fn fact_from_body(body: &str, keyword: &str) -> Option<Fact> {
    let mut tokens = body.split_whitespace();
    let predicate = tokens.next()?;
    if predicate.eq_ignore_ascii_case(keyword) || predicate.eq_ignore_ascii_case("and") {
        return None;
    }
    Some(Fact::new(predicate, tokens))
}

fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

fn parse_header_name<'a>(block: &'a str, header: &'static str) -> Option<&'a str> {
    let parsed: IResult<&str, &str> = preceded(
        tuple((tag_no_case(header), multispace1)),
        take_while1(is_token_char),
    )(block);
    parsed.ok().map(|(_, name)| name)
}

fn check_balanced(text: &str) -> Result<(), ParseError> {
    let mut depth: i64 = 0;
    for ch in text.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParseError::malformed("problem", "unexpected `)`"));
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::malformed("problem", "unclosed parenthesis"));
    }
    Ok(())
}

fn find_block<'a>(
    text: &'a str,
    header: &str,
    section: &'static str,
) -> Result<Option<&'a str>, ParseError> {
    // ASCII lowercasing keeps byte offsets valid for `text`.
    let lowered = text.to_ascii_lowercase();
    let mut from = 0usize;
    while let Some(offset) = lowered[from..].find(header) {
        let start = from + offset;
        let after = start + header.len();
        let at_boundary = lowered[after..].chars().next().map_or(true, |c| !is_name_char(c));
        if at_boundary {
            let end = matching_paren(text, start)
                .ok_or_else(|| ParseError::malformed(section, "unbalanced parentheses"))?;
            return Ok(Some(&text[start..=end]));
        }
        from = after;
    }
    Ok(None)
}

fn matching_paren(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in text[start..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_objects_block(
    body: &str,
    options: ParseOptions,
) -> Result<BTreeMap<Name, ObjectType>, ParseError> {
    let mut objects = BTreeMap::new();

    for line in body.lines() {
        let mut pending: Vec<&str> = Vec::new();
        let mut tokens = line.split_whitespace();
        while let Some(token) = tokens.next() {
            let tag = if token == "-" {
                tokens.next()
            } else if let Some(glued) = token.strip_prefix('-') {
                Some(glued)
            } else {
                pending.push(token);
                continue;
            };

            let Some(tag) = tag else {
                untyped_names(line.trim(), &mut pending, options)?;
                break;
            };
            let ty = ObjectType::from_tag(tag);
            for name in pending.drain(..) {
                objects.insert(name.to_string(), ty.clone());
            }
        }

        if !pending.is_empty() {
            untyped_names(line.trim(), &mut pending, options)?;
        }
    }

    Ok(objects)
}

fn untyped_names(
    line: &str,
    pending: &mut Vec<&str>,
    options: ParseOptions,
) -> Result<(), ParseError> {
    if options.strict_objects {
        return Err(ParseError::malformed(
            "objects",
            format!("expected `<names> - <type>`, got `{line}`"),
        ));
    }
    warn!(line, names = ?pending, "skipping objects without a type separator");
    pending.clear();
    Ok(())
}

// ============================================================================
// Formatter
// ============================================================================

/// Canonical problem text.
///
/// Objects are grouped by type tag (tags sorted, identifiers sorted within a
/// tag), init facts are sorted, and goal facts are always wrapped in `(and ...)`.
pub fn format_problem_v1(problem: &Problem) -> String {
    let mut by_type: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (id, ty) in &problem.objects {
        by_type.entry(ty.as_str()).or_default().push(id);
    }

    let mut out = String::new();
    out.push_str(&format!("(define (problem {})\n", problem.name));
    out.push_str(&format!("  (:domain {})\n", problem.domain));

    out.push_str("  (:objects\n");
    for (ty, ids) in &by_type {
        out.push_str(&format!("    {} - {ty}\n", ids.join(" ")));
    }
    out.push_str("  )\n");

    out.push_str("  (:init\n");
    for fact in &problem.init {
        out.push_str(&format!("    {fact}\n"));
    }
    out.push_str("  )\n");

    if problem.goal.is_empty() {
        out.push_str("  (:goal (and))\n");
    } else {
        out.push_str("  (:goal (and\n");
        for fact in &problem.goal {
            out.push_str(&format!("    {fact}\n"));
        }
        out.push_str("  ))\n");
    }

    out.push_str(")\n");
    out
}
