//! Compiled match patterns for predicate values.

use regex::{Regex, RegexBuilder};

use super::parser::negated_token;
use crate::error::PredicateError;

/// A predicate value compiled for unanchored matching.
///
/// Values of the form `^((?!X).)*$` produced by the `NOT` rewrite compile to
/// [`Pattern::Excludes`], matching text in which `X` does not occur.
#[derive(Debug, Clone)]
pub enum Pattern {
    Matches(Regex),
    Excludes(Regex),
}

impl Pattern {
    pub fn compile(value: &str) -> Result<Self, PredicateError> {
        Self::build(value, false)
    }

    pub fn compile_case_insensitive(value: &str) -> Result<Self, PredicateError> {
        Self::build(value, true)
    }

    fn build(value: &str, case_insensitive: bool) -> Result<Self, PredicateError> {
        let compile = |source: &str| {
            RegexBuilder::new(source)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| PredicateError::InvalidPattern {
                    pattern: value.to_string(),
                    reason: e.to_string(),
                })
        };

        match negated_token(value) {
            Some(token) => compile(token).map(Pattern::Excludes),
            None => compile(value).map(Pattern::Matches),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Pattern::Matches(re) => re.is_match(text),
            Pattern::Excludes(re) => !re.is_match(text),
        }
    }
}
