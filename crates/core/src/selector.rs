//! CSS selector subset used by targets, containers and privacy exclusions.
//!
//! Supported grammar: type and universal selectors, `#id`, `.class`,
//! attribute selectors (`[a]`, `[a=v]`, `[a~=v]`, `[a|=v]`, `[a^=v]`,
//! `[a$=v]`, `[a*=v]`), descendant and child combinators, and comma
//! separated lists. Pseudo-classes are rejected at parse time.

use std::fmt;

use crate::dom::ElementRef;
use crate::error::{KollektorError, KollektorResult};

/// A parsed, comma separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    source: String,
    selectors: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    /// Left to right; `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`.
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeSelector {
    name: String,
    test: Option<(AttributeOp, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributeOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

impl SelectorList {
    /// Parse a selector list such as `"nav a, button.primary"`.
    pub fn parse(input: &str) -> KollektorResult<Self> {
        let mut selectors = Vec::new();
        for piece in split_top_level(input) {
            let piece = piece.trim();
            if piece.is_empty() {
                return Err(selector_error(input, "empty selector in list"));
            }
            let mut parser = Parser::new(piece);
            selectors.push(
                parser
                    .parse_complex()
                    .map_err(|reason| selector_error(input, &reason))?,
            );
        }
        Ok(Self {
            source: input.trim().to_string(),
            selectors,
        })
    }

    /// Combine several lists into one, joining their sources with `", "`.
    pub fn union<'a>(lists: impl IntoIterator<Item = &'a SelectorList>) -> Self {
        let mut sources = Vec::new();
        let mut selectors = Vec::new();
        for list in lists {
            sources.push(list.source.as_str());
            selectors.extend(list.selectors.iter().cloned());
        }
        Self {
            source: sources.join(", "),
            selectors,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when any selector of the list matches the element.
    pub fn matches(&self, element: ElementRef<'_>) -> bool {
        self.selectors.iter().any(|s| s.matches(element))
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for SelectorList {
    type Err = KollektorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn selector_error(selector: &str, reason: &str) -> KollektorError {
    KollektorError::Selector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

/// Split on commas that are not inside brackets or quotes.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                pieces.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(&input[start..]);
    pieces
}

impl ComplexSelector {
    fn matches(&self, element: ElementRef<'_>) -> bool {
        self.matches_at(self.compounds.len() - 1, element)
    }

    fn matches_at(&self, idx: usize, element: ElementRef<'_>) -> bool {
        if !self.compounds[idx].matches(element) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => element
                .parent()
                .is_some_and(|parent| self.matches_at(idx - 1, parent)),
            Combinator::Descendant => element
                .ancestors()
                .any(|ancestor| self.matches_at(idx - 1, ancestor)),
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }

    fn matches(&self, element: ElementRef<'_>) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.element_id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        self.attributes.iter().all(|a| a.matches(element))
    }
}

impl AttributeSelector {
    fn matches(&self, element: ElementRef<'_>) -> bool {
        let Some(actual) = element.attr(&self.name) else {
            return false;
        };
        let Some((op, expected)) = &self.test else {
            return true;
        };
        let expected = expected.as_str();
        match op {
            AttributeOp::Equals => actual == expected,
            AttributeOp::Includes => actual.split_whitespace().any(|w| w == expected),
            AttributeOp::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
            AttributeOp::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttributeOp::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttributeOp::Substring => !expected.is_empty() && actual.contains(expected),
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_complex(&mut self) -> Result<ComplexSelector, String> {
        let mut compounds = Vec::new();
        let mut combinators = Vec::new();
        let mut pending: Option<Combinator> = None;

        loop {
            let saw_whitespace = self.skip_whitespace();
            let Some(c) = self.peek() else { break };
            if c == '>' {
                if compounds.is_empty() || pending == Some(Combinator::Child) {
                    return Err("unexpected '>'".to_string());
                }
                self.bump();
                pending = Some(Combinator::Child);
                continue;
            }
            if !compounds.is_empty() {
                let combinator = match pending.take() {
                    Some(combinator) => combinator,
                    None if saw_whitespace => Combinator::Descendant,
                    None => return Err(format!("unexpected character '{c}'")),
                };
                combinators.push(combinator);
            }
            compounds.push(self.parse_compound()?);
        }

        if pending.is_some() {
            return Err("selector ends with a combinator".to_string());
        }
        if compounds.is_empty() {
            return Err("empty selector".to_string());
        }
        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, String> {
        let mut compound = Compound::default();
        let mut universal = false;

        match self.peek() {
            Some('*') => {
                self.bump();
                universal = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.bump();
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.bump();
                    compound.attributes.push(self.parse_attribute()?);
                }
                Some(':') => return Err("pseudo-classes are not supported".to_string()),
                _ => break,
            }
        }

        if compound.is_empty() && !universal {
            return Err(match self.peek() {
                Some(c) => format!("unexpected character '{c}'"),
                None => "unexpected end of selector".to_string(),
            });
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err("expected an identifier".to_string());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attribute(&mut self) -> Result<AttributeSelector, String> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op = match self.bump() {
            Some(']') => return Ok(AttributeSelector { name, test: None }),
            Some('=') => AttributeOp::Equals,
            Some(c @ ('~' | '|' | '^' | '$' | '*')) => {
                if self.bump() != Some('=') {
                    return Err(format!("expected '=' after '{c}'"));
                }
                match c {
                    '~' => AttributeOp::Includes,
                    '|' => AttributeOp::DashMatch,
                    '^' => AttributeOp::Prefix,
                    '$' => AttributeOp::Suffix,
                    _ => AttributeOp::Substring,
                }
            }
            Some(c) => return Err(format!("unexpected character '{c}' in attribute selector")),
            None => return Err("unterminated attribute selector".to_string()),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let start = self.pos;
                while self.peek().is_some_and(|c| c != q) {
                    self.pos += 1;
                }
                if self.peek().is_none() {
                    return Err("unterminated string in attribute selector".to_string());
                }
                let value: String = self.chars[start..self.pos].iter().collect();
                self.bump();
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        if self.bump() != Some(']') {
            return Err("expected ']'".to_string());
        }
        Ok(AttributeSelector {
            name,
            test: Some((op, value)),
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
