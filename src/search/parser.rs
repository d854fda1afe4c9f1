//! Tokenizer for the free-text search language.
//!
//! A search string is a whitespace-separated sequence of terms. A term is
//! either `key:value` or a bare value, which is shorthand for `name:value`.
//! Values may be wrapped in single or double quotes to include spaces:
//!
//! ```text
//! type:host hg:linux isnot:ack "vm fred" NOT backup
//! ```
//!
//! `NOT <token>` (or `not <token>`) is rewritten to `^((?!token).)*$` before
//! tokenizing, which the pattern compiler turns into a "does not contain"
//! matcher. Saved searches depend on this exact tokenization.

/// Key used for bare terms.
pub const NAME_KEY: &str = "name";

const NEGATION_PREFIX: &str = "^((?!";
const NEGATION_SUFFIX: &str = ").)*$";

/// A single `key:value` search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub key: String,
    pub value: String,
}

impl Predicate {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Parse a search string into predicates, in order of appearance.
pub fn parse(search: &str) -> Vec<Predicate> {
    tokenize(&rewrite_negations(search))
}

/// The regex fragment matching strings that do not contain `token`.
pub fn negation_fragment(token: &str) -> String {
    format!("{}{}{}", NEGATION_PREFIX, token, NEGATION_SUFFIX)
}

/// Inverse of [`negation_fragment`].
pub fn negated_token(value: &str) -> Option<&str> {
    value.strip_prefix(NEGATION_PREFIX)?.strip_suffix(NEGATION_SUFFIX)
}

/// Rewrite every `NOT <token>` then every `not <token>`.
///
/// A token runs up to the next space character.
pub fn rewrite_negations(search: &str) -> String {
    let upper = rewrite_operator(search, "NOT ");
    rewrite_operator(&upper, "not ")
}

fn rewrite_operator(search: &str, operator: &str) -> String {
    let mut out = String::with_capacity(search.len());
    let mut rest = search;

    while let Some(pos) = rest.find(operator) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + operator.len()..];
        let end = after.find(' ').unwrap_or(after.len());
        out.push_str(&negation_fragment(&after[..end]));
        rest = &after[end..];
    }

    out.push_str(rest);
    out
}

fn tokenize(search: &str) -> Vec<Predicate> {
    let mut predicates = Vec::new();
    let mut rest = search;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }

        match split_key(rest) {
            Some((key, after_colon)) => {
                let (value, consumed) = read_value(after_colon);
                predicates.push(Predicate::new(key, value));
                rest = &after_colon[consumed..];
            }
            None => {
                let (value, consumed) = read_value(rest);
                if !value.is_empty() {
                    predicates.push(Predicate::new(NAME_KEY, value));
                }
                rest = &rest[consumed..];
            }
        }
    }

    predicates
}

/// Split `word:rest` where `word` is a non-empty run of word characters.
fn split_key(term: &str) -> Option<(&str, &str)> {
    let end = term
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(term.len(), |(i, _)| i);

    if end == 0 {
        return None;
    }
    term[end..].strip_prefix(':').map(|after| (&term[..end], after))
}

/// Read one value, returning it and the number of bytes consumed.
///
/// A quoted value ends at the first matching quote followed by whitespace or
/// end of input. When the opening quote is never repeated the value runs to
/// the end of input. When it is repeated but never at a term boundary the
/// value is read unquoted, quotes included.
fn read_value(input: &str) -> (&str, usize) {
    if let Some(quote) = input.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let body = &input[1..];
        if let Some(close) = closing_quote(body, quote) {
            return (&body[..close], close + 2);
        }
        if !body.contains(quote) {
            return (body.trim_end(), input.len());
        }
    }

    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    (&input[..end], end)
}

fn closing_quote(body: &str, quote: char) -> Option<usize> {
    body.char_indices()
        .filter(|(_, c)| *c == quote)
        .map(|(i, _)| i)
        .find(|&i| body[i + 1..].chars().next().map_or(true, char::is_whitespace))
}
