//! Selector model and selector algebra
//!
//! A [`Selector`] is a chain of [`SimpleSelectorSequence`]s joined by
//! combinators. Sequences support the set operations used by `@extend`:
//! difference, union, subsumption and unification.

use crate::context::Extension;
use crate::error::{CompilerError, Result};
use crate::types::SourcePosition;
use indexmap::IndexSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimpleSelector {
    Type(String),
    Universal,
    Id(String),
    Class(String),
    /// Attribute test, stored without the surrounding brackets
    Attribute(String),
    PseudoClass { name: String, argument: Option<String> },
    PseudoElement { name: String, argument: Option<String> },
    Placeholder(String),
    /// `&`, optionally followed by a suffix as in `&-primary`
    ParentReference { suffix: Option<String> },
}

impl SimpleSelector {
    /// Canonical position inside a sequence
    fn rank(&self) -> i8 {
        match self {
            SimpleSelector::Type(_) | SimpleSelector::Universal | SimpleSelector::ParentReference { .. } => -1,
            SimpleSelector::PseudoClass { .. } => 2,
            SimpleSelector::PseudoElement { .. } => 3,
            _ => 0,
        }
    }

    pub fn is_type_selector(&self) -> bool {
        matches!(self, SimpleSelector::Type(_) | SimpleSelector::Universal)
    }

    fn with_suffix(&self, suffix: &str) -> Option<SimpleSelector> {
        let extended = |name: &str| format!("{}{}", name, suffix);
        match self {
            SimpleSelector::Type(n) => Some(SimpleSelector::Type(extended(n))),
            SimpleSelector::Id(n) => Some(SimpleSelector::Id(extended(n))),
            SimpleSelector::Class(n) => Some(SimpleSelector::Class(extended(n))),
            SimpleSelector::Placeholder(n) => Some(SimpleSelector::Placeholder(extended(n))),
            _ => None,
        }
    }
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimpleSelector::Type(name) => write!(f, "{}", name),
            SimpleSelector::Universal => write!(f, "*"),
            SimpleSelector::Id(name) => write!(f, "#{}", name),
            SimpleSelector::Class(name) => write!(f, ".{}", name),
            SimpleSelector::Attribute(inner) => write!(f, "[{}]", inner),
            SimpleSelector::PseudoClass { name, argument } => match argument {
                Some(arg) => write!(f, ":{}({})", name, arg),
                None => write!(f, ":{}", name),
            },
            SimpleSelector::PseudoElement { name, argument } => match argument {
                Some(arg) => write!(f, "::{}({})", name, arg),
                None => write!(f, "::{}", name),
            },
            SimpleSelector::Placeholder(name) => write!(f, "%{}", name),
            SimpleSelector::ParentReference { suffix } => {
                write!(f, "&{}", suffix.as_deref().unwrap_or(""))
            }
        }
    }
}

/// One compound selector such as `a.foo:hover`; never holds duplicates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SimpleSelectorSequence {
    selectors: Vec<SimpleSelector>,
}

impl SimpleSelectorSequence {
    pub fn new(selectors: Vec<SimpleSelector>) -> Self {
        let mut unique: Vec<SimpleSelector> = Vec::with_capacity(selectors.len());
        for selector in selectors {
            if !unique.contains(&selector) {
                unique.push(selector);
            }
        }
        Self { selectors: unique }
    }

    pub fn selectors(&self) -> &[SimpleSelector] {
        &self.selectors
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn type_selector(&self) -> Option<&SimpleSelector> {
        self.selectors.iter().find(|s| s.is_type_selector())
    }

    fn has_real_type(&self) -> bool {
        matches!(self.type_selector(), Some(SimpleSelector::Type(_)))
    }

    pub fn has_placeholder(&self) -> bool {
        self.selectors.iter().any(|s| matches!(s, SimpleSelector::Placeholder(_)))
    }

    pub fn has_parent_reference(&self) -> bool {
        self.selectors
            .iter()
            .any(|s| matches!(s, SimpleSelector::ParentReference { .. }))
    }

    /// Stable sort into canonical order: type, others, pseudo-classes, pseudo-elements
    fn canonicalize(mut self) -> Self {
        self.selectors.sort_by_key(SimpleSelector::rank);
        self
    }

    /// Selectors of `self` that are not in `other`
    pub fn difference(&self, other: &SimpleSelectorSequence) -> SimpleSelectorSequence {
        SimpleSelectorSequence {
            selectors: self
                .selectors
                .iter()
                .filter(|s| !other.selectors.contains(s))
                .cloned()
                .collect(),
        }
    }

    /// `self` followed by the selectors of `other` it lacks, in canonical order
    pub fn union(&self, other: &SimpleSelectorSequence) -> SimpleSelectorSequence {
        let mut selectors = self.selectors.clone();
        for selector in &other.selectors {
            if !selectors.contains(selector) {
                selectors.push(selector.clone());
            }
        }
        SimpleSelectorSequence { selectors }.canonicalize()
    }

    /// True if every element matched by `other` is matched by `self`.
    /// A universal or missing type selector in `self` is ignored.
    pub fn subsumes(&self, other: &SimpleSelectorSequence) -> bool {
        let ignore_type = !self.has_real_type();
        self.selectors
            .iter()
            .filter(|s| !(ignore_type && s.is_type_selector()))
            .all(|s| other.selectors.contains(s))
    }

    /// Two different id selectors can never match the same element
    pub fn cannot_match_anything(&self) -> bool {
        let mut ids = self.selectors.iter().filter_map(|s| match s {
            SimpleSelector::Id(id) => Some(id),
            _ => None,
        });
        match ids.next() {
            Some(first) => ids.any(|id| id != first),
            None => false,
        }
    }

    /// Unify `self` against the `@extend` target `extend`, substituting the
    /// extending sequence. `None` when the target does not apply.
    pub fn unify(
        &self,
        extend: &SimpleSelectorSequence,
        extending: &SimpleSelectorSequence,
    ) -> Option<SimpleSelectorSequence> {
        if !extend.subsumes(self) {
            return None;
        }
        let extending_type = extending.type_selector().filter(|_| extending.has_real_type());
        if !extend.has_real_type() {
            if let (Some(wanted), Some(SimpleSelector::Type(own))) = (extending_type, self.type_selector()) {
                if wanted != &SimpleSelector::Type(own.clone()) {
                    return None;
                }
            }
        }

        let mut remaining = self.difference(extend);
        if extending_type.is_some() {
            remaining.selectors.retain(|s| s != &SimpleSelector::Universal);
        }
        let unified = remaining.union(extending);
        if unified.cannot_match_anything() {
            return None;
        }
        Some(unified)
    }

    /// Replace `&` with the last compound of `parent`
    fn substitute_parent(
        &self,
        parent: &SimpleSelectorSequence,
        position: &SourcePosition,
    ) -> Result<SimpleSelectorSequence> {
        let mut selectors = Vec::new();
        for selector in &self.selectors {
            match selector {
                SimpleSelector::ParentReference { suffix: None } => {
                    selectors.extend(parent.selectors.iter().cloned());
                }
                SimpleSelector::ParentReference { suffix: Some(suffix) } => {
                    let mut replaced = parent.selectors.clone();
                    let last = replaced.pop().and_then(|s| s.with_suffix(suffix)).ok_or_else(|| {
                        CompilerError::compile(
                            position,
                            format!("Invalid parent selector for suffix \"&{}\": \"{}\"", suffix, parent),
                        )
                    })?;
                    replaced.push(last);
                    selectors.extend(replaced);
                }
                other => selectors.push(other.clone()),
            }
        }
        Ok(SimpleSelectorSequence::new(selectors))
    }
}

impl fmt::Display for SimpleSelectorSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for selector in &self.selectors {
            write!(f, "{}", selector)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    Descendant,
    Child,
    Adjacent,
    General,
}

impl Combinator {
    fn symbol(self) -> &'static str {
        match self {
            Combinator::Descendant => " ",
            Combinator::Child => " > ",
            Combinator::Adjacent => " + ",
            Combinator::General => " ~ ",
        }
    }
}

/// A compound selector and the combinator that precedes it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorSegment {
    pub combinator: Option<Combinator>,
    pub sequence: SimpleSelectorSequence,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    pub segments: Vec<SelectorSegment>,
}

impl Selector {
    pub fn from_sequence(sequence: SimpleSelectorSequence) -> Self {
        Self {
            segments: vec![SelectorSegment {
                combinator: None,
                sequence,
            }],
        }
    }

    /// A simple selector has exactly one segment and no leading combinator
    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1 && self.segments[0].combinator.is_none()
    }

    pub fn last_sequence(&self) -> Option<&SimpleSelectorSequence> {
        self.segments.last().map(|s| &s.sequence)
    }

    pub fn has_parent_reference(&self) -> bool {
        self.segments.iter().any(|s| s.sequence.has_parent_reference())
    }

    pub fn has_placeholder(&self) -> bool {
        self.segments.iter().any(|s| s.sequence.has_placeholder())
    }

    pub fn cannot_match_anything(&self) -> bool {
        self.segments.iter().any(|s| s.sequence.cannot_match_anything())
    }

    /// Same shape with each compound of `self` subsuming its counterpart
    pub fn subsumes(&self, other: &Selector) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.combinator == b.combinator && a.sequence.subsumes(&b.sequence))
    }

    /// Resolve `&` against one parent selector. Without `&` the parent is
    /// prepended as a descendant ancestor.
    pub fn replace_parent_references(&self, parent: &Selector, position: &SourcePosition) -> Result<Selector> {
        if !self.has_parent_reference() {
            let mut segments = parent.segments.clone();
            for (i, segment) in self.segments.iter().enumerate() {
                let combinator = match (i, segment.combinator) {
                    (0, None) => Some(Combinator::Descendant),
                    (_, c) => c,
                };
                segments.push(SelectorSegment {
                    combinator,
                    sequence: segment.sequence.clone(),
                });
            }
            return Ok(Selector { segments });
        }

        let mut segments = Vec::new();
        for segment in &self.segments {
            if !segment.sequence.has_parent_reference() {
                segments.push(segment.clone());
                continue;
            }
            let (parent_last, parent_prefix) = match parent.segments.split_last() {
                Some(split) => split,
                None => continue,
            };
            for (i, prefix) in parent_prefix.iter().enumerate() {
                let combinator = if i == 0 {
                    segment.combinator.or(prefix.combinator)
                } else {
                    prefix.combinator
                };
                segments.push(SelectorSegment {
                    combinator,
                    sequence: prefix.sequence.clone(),
                });
            }
            let combinator = if parent_prefix.is_empty() {
                segment.combinator.or(parent_last.combinator)
            } else {
                parent_last.combinator
            };
            segments.push(SelectorSegment {
                combinator,
                sequence: segment.sequence.substitute_parent(&parent_last.sequence, position)?,
            });
        }
        if let Some(first) = segments.first_mut() {
            if first.combinator == Some(Combinator::Descendant) {
                first.combinator = None;
            }
        }
        Ok(Selector { segments })
    }

    /// Remove every `&`; compounds left empty are dropped. `None` if nothing remains.
    pub fn strip_parent_references(&self) -> Option<Selector> {
        let mut segments: Vec<SelectorSegment> = Vec::new();
        for segment in &self.segments {
            let kept: Vec<SimpleSelector> = segment
                .sequence
                .selectors
                .iter()
                .filter(|s| !matches!(s, SimpleSelector::ParentReference { .. }))
                .cloned()
                .collect();
            if kept.is_empty() {
                continue;
            }
            segments.push(SelectorSegment {
                combinator: if segments.is_empty() { None } else { segment.combinator.or(Some(Combinator::Descendant)) },
                sequence: SimpleSelectorSequence::new(kept),
            });
        }
        if segments.is_empty() {
            None
        } else {
            Some(Selector { segments })
        }
    }

    /// Every selector produced by applying `extension` to one compound of `self`
    pub fn extend_with(&self, extension: &Extension) -> Vec<Selector> {
        let extending_last = match extension.extending.segments.last() {
            Some(last) => last,
            None => return Vec::new(),
        };
        let extending_prefix = &extension.extending.segments[..extension.extending.segments.len() - 1];

        let mut results = Vec::new();
        for (i, segment) in self.segments.iter().enumerate() {
            let unified = match segment.sequence.unify(&extension.target, &extending_last.sequence) {
                Some(unified) => unified,
                None => continue,
            };
            let own_prefix = &self.segments[..i];
            let mut segments = weave(own_prefix, extending_prefix, &extension.context);
            let combinator = if extending_prefix.is_empty() || segments.len() == own_prefix.len() {
                segment.combinator
            } else {
                extending_last.combinator
            };
            segments.push(SelectorSegment {
                combinator: if segments.is_empty() { None } else { combinator.or(Some(Combinator::Descendant)) },
                sequence: unified,
            });
            segments.extend(self.segments[i + 1..].iter().cloned());
            let selector = Selector { segments };
            if &selector != self {
                results.push(selector);
            }
        }
        results
    }
}

/// Join the ancestry of the extended selector with the ancestry of the
/// extending one. Shared ancestry recorded in `context` is not repeated.
fn weave(own: &[SelectorSegment], extending: &[SelectorSegment], context: &[Selector]) -> Vec<SelectorSegment> {
    if own.is_empty() {
        return extending.to_vec();
    }
    if extending.is_empty() || own.starts_with(extending) {
        return own.to_vec();
    }
    if extending.starts_with(own) {
        return extending.to_vec();
    }
    let shared = context
        .iter()
        .map(|c| c.segments.as_slice())
        .filter(|c| !c.is_empty() && own.starts_with(c) && extending.starts_with(c))
        .map(|c| c.len())
        .max()
        .unwrap_or(0);

    let mut woven = own.to_vec();
    for (i, segment) in extending[shared..].iter().enumerate() {
        let combinator = if i == 0 {
            segment.combinator.or(Some(Combinator::Descendant))
        } else {
            segment.combinator
        };
        woven.push(SelectorSegment {
            combinator,
            sequence: segment.sequence.clone(),
        });
    }
    woven
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match (i, segment.combinator) {
                (0, Some(c)) => write!(f, "{} ", c.symbol().trim())?,
                (0, None) => {}
                (_, c) => write!(f, "{}", c.unwrap_or(Combinator::Descendant).symbol())?,
            }
            write!(f, "{}", segment.sequence)?;
        }
        Ok(())
    }
}

/// Insertion-ordered set of selectors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorSet {
    selectors: IndexSet<Selector>,
}

impl SelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the selector was already present
    pub fn insert(&mut self, selector: Selector) -> bool {
        self.selectors.insert(selector)
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.selectors.contains(selector)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.selectors.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Selector> {
        self.selectors.get_index(index)
    }

    pub fn retain(&mut self, keep: impl FnMut(&Selector) -> bool) {
        self.selectors.retain(keep);
    }

    pub fn into_vec(self) -> Vec<Selector> {
        self.selectors.into_iter().collect()
    }

    /// Drop every selector subsumed by another entry
    pub fn eliminate_redundant(&mut self) {
        self.eliminate_redundant_from(0);
    }

    /// Like [`eliminate_redundant`](Self::eliminate_redundant) but entries
    /// before `first` are never removed. Of two equivalent entries the
    /// earlier one survives.
    pub fn eliminate_redundant_from(&mut self, first: usize) {
        let entries: Vec<Selector> = self.selectors.iter().cloned().collect();
        let redundant: Vec<bool> = entries
            .iter()
            .enumerate()
            .map(|(j, candidate)| {
                j >= first
                    && entries.iter().enumerate().any(|(i, other)| {
                        i != j && other.subsumes(candidate) && (i < j || !candidate.subsumes(other))
                    })
            })
            .collect();
        let mut index = 0;
        self.selectors.retain(|_| {
            let keep = !redundant[index];
            index += 1;
            keep
        });
    }
}

impl FromIterator<Selector> for SelectorSet {
    fn from_iter<I: IntoIterator<Item = Selector>>(iter: I) -> Self {
        Self {
            selectors: iter.into_iter().collect(),
        }
    }
}

/// Parse a comma separated selector list. Percentages such as `50%` are
/// accepted as type selectors so keyframe blocks parse like rules.
pub fn parse_selector_list(text: &str, position: &SourcePosition) -> Result<Vec<Selector>> {
    let mut selectors = Vec::new();
    for part in split_top_level(text, ',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            return Err(CompilerError::parse(position, format!("Invalid selector list \"{}\"", text.trim())));
        }
        selectors.push(SelectorParser::new(trimmed, position).parse()?);
    }
    Ok(selectors)
}

/// Split on `separator` outside parentheses, brackets and quotes
fn split_top_level(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for ch in text.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '(' | '[' => depth += 1,
                ')' | ']' => depth -= 1,
                c if c == separator && depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            },
        }
        current.push(ch);
    }
    parts.push(current);
    parts
}

struct SelectorParser<'a> {
    chars: Vec<char>,
    position: usize,
    source: &'a SourcePosition,
    text: &'a str,
}

impl<'a> SelectorParser<'a> {
    fn new(text: &'a str, source: &'a SourcePosition) -> Self {
        Self {
            chars: text.chars().collect(),
            position: 0,
            source,
            text,
        }
    }

    fn error(&self, message: &str) -> CompilerError {
        CompilerError::parse(self.source, format!("{} in selector \"{}\"", message, self.text))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.position;
        while self.peek().map_or(false, char::is_whitespace) {
            self.position += 1;
        }
        self.position > start
    }

    fn parse(mut self) -> Result<Selector> {
        let mut segments = Vec::new();
        let mut pending: Option<Combinator> = None;
        self.skip_whitespace();
        while self.peek().is_some() {
            if let Some(combinator) = self.read_combinator() {
                if pending.map_or(false, |c| c != Combinator::Descendant) {
                    return Err(self.error("Consecutive combinators"));
                }
                pending = Some(combinator);
                self.skip_whitespace();
                continue;
            }
            let sequence = self.parse_sequence()?;
            segments.push(SelectorSegment {
                combinator: if segments.is_empty() {
                    pending.filter(|c| *c != Combinator::Descendant)
                } else {
                    Some(pending.unwrap_or(Combinator::Descendant))
                },
                sequence,
            });
            pending = None;
            if self.skip_whitespace() {
                pending = Some(Combinator::Descendant);
            }
        }
        if matches!(pending, Some(c) if c != Combinator::Descendant) {
            return Err(self.error("Trailing combinator"));
        }
        if segments.is_empty() {
            return Err(self.error("Empty selector"));
        }
        Ok(Selector { segments })
    }

    fn read_combinator(&mut self) -> Option<Combinator> {
        let combinator = match self.peek()? {
            '>' => Combinator::Child,
            '+' => Combinator::Adjacent,
            '~' => Combinator::General,
            _ => return None,
        };
        self.position += 1;
        Some(combinator)
    }

    fn parse_sequence(&mut self) -> Result<SimpleSelectorSequence> {
        let mut selectors = Vec::new();
        while let Some(ch) = self.peek() {
            let selector = match ch {
                '&' => {
                    self.position += 1;
                    let suffix = self.read_name();
                    SimpleSelector::ParentReference {
                        suffix: if suffix.is_empty() { None } else { Some(suffix) },
                    }
                }
                '*' => {
                    self.position += 1;
                    SimpleSelector::Universal
                }
                '.' => {
                    self.position += 1;
                    SimpleSelector::Class(self.read_required_name("class")?)
                }
                '#' => {
                    self.position += 1;
                    SimpleSelector::Id(self.read_required_name("id")?)
                }
                '%' => {
                    self.position += 1;
                    SimpleSelector::Placeholder(self.read_required_name("placeholder")?)
                }
                '[' => {
                    self.position += 1;
                    SimpleSelector::Attribute(self.read_balanced('[', ']')?.trim().to_string())
                }
                ':' => self.parse_pseudo()?,
                c if is_name_start(c) || c.is_ascii_digit() => {
                    let mut name = self.read_name();
                    if self.peek() == Some('%') {
                        self.position += 1;
                        name.push('%');
                    }
                    SimpleSelector::Type(name)
                }
                c if c.is_whitespace() || matches!(c, '>' | '+' | '~') => break,
                c => return Err(self.error(&format!("Unexpected character '{}'", c))),
            };
            if matches!(selector, SimpleSelector::ParentReference { .. }) && !selectors.is_empty() {
                return Err(self.error("\"&\" may only be used at the beginning of a compound selector"));
            }
            selectors.push(selector);
        }
        if selectors.is_empty() {
            return Err(self.error("Expected selector"));
        }
        Ok(SimpleSelectorSequence::new(selectors))
    }

    fn parse_pseudo(&mut self) -> Result<SimpleSelector> {
        self.position += 1;
        let element = self.peek() == Some(':');
        if element {
            self.position += 1;
        }
        let name = self.read_required_name("pseudo selector")?;
        let argument = if self.peek() == Some('(') {
            self.position += 1;
            Some(self.read_balanced('(', ')')?.trim().to_string())
        } else {
            None
        };
        Ok(if element {
            SimpleSelector::PseudoElement { name, argument }
        } else {
            SimpleSelector::PseudoClass { name, argument }
        })
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if is_name_char(ch) {
                name.push(ch);
                self.position += 1;
            } else if ch == '\\' {
                name.push(ch);
                self.position += 1;
                if let Some(escaped) = self.peek() {
                    name.push(escaped);
                    self.position += 1;
                }
            } else {
                break;
            }
        }
        name
    }

    fn read_required_name(&mut self, what: &str) -> Result<String> {
        let name = self.read_name();
        if name.is_empty() {
            return Err(self.error(&format!("Expected {} name", what)));
        }
        Ok(name)
    }

    /// Read up to the matching close character, which is consumed
    fn read_balanced(&mut self, open: char, close: char) -> Result<String> {
        let mut depth = 1;
        let mut content = String::new();
        let mut quote: Option<char> = None;
        while let Some(ch) = self.peek() {
            self.position += 1;
            match quote {
                Some(q) if ch == q => quote = None,
                Some(_) => {}
                None if ch == '"' || ch == '\'' => quote = Some(ch),
                None if ch == open => depth += 1,
                None if ch == close => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(content);
                    }
                }
                None => {}
            }
            content.push(ch);
        }
        Err(self.error(&format!("Expected '{}'", close)))
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}
