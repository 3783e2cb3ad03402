//! Token substitution over text runs.

use crate::deck::Deck;

/// Opening and closing delimiters of a token.
pub const TOKEN_OPEN: &str = "{{";
pub const TOKEN_CLOSE: &str = "}}";

/// Wrap a bare name in token delimiters: `NAME` -> `{{NAME}}`.
pub fn token(name: &str) -> String {
    format!("{TOKEN_OPEN}{name}{TOKEN_CLOSE}")
}

/// Token literals and their replacement values.
///
/// Tokens are matched as whole literals only: `{{ADDRESS}}` never matches
/// inside `{{ADDRESS2}}` because the closing delimiter is part of the token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMap {
    entries: Vec<(String, String)>,
}

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `{{name}}` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.insert_literal(&token(name), value);
    }

    /// Map an already delimited literal to `value`.
    pub fn insert_literal(&mut self, literal: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(t, _)| t == literal) {
            Some((_, v)) => *v = value,
            None => self.entries.push((literal.to_string(), value)),
        }
    }

    /// The value for bare `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        let literal = token(name);
        self.entries
            .iter()
            .find(|(t, _)| *t == literal)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (token literal, value) pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Replace every known token in `text`. Returns `None` when nothing
    /// matched, so callers can leave the run alone.
    pub fn substitute(&self, text: &str) -> Option<String> {
        self.substitute_counted(text).map(|(text, _)| text)
    }

    fn substitute_counted(&self, text: &str) -> Option<(String, usize)> {
        if !text.contains(TOKEN_OPEN) {
            return None;
        }
        let mut result = text.to_string();
        let mut count = 0;
        for (literal, value) in &self.entries {
            let occurrences = result.matches(literal.as_str()).count();
            if occurrences > 0 {
                result = result.replace(literal.as_str(), value);
                count += occurrences;
            }
        }
        (count > 0).then_some((result, count))
    }

    /// Substitute tokens in every run of every slide. Returns the number of
    /// token occurrences replaced.
    pub fn apply(&self, deck: &mut Deck) -> usize {
        let mut total = 0;
        for (i, slide) in deck.slides_mut().iter_mut().enumerate() {
            slide.edit_runs(|text| {
                let (new_text, count) = self.substitute_counted(text)?;
                log::debug!("Replaced {count} token(s) on slide {}: {text:?} -> {new_text:?}", i + 1);
                total += count;
                Some(new_text)
            });
        }
        total
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for TokenMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = TokenMap::new();
        for (name, value) in iter {
            map.insert(name.as_ref(), value);
        }
        map
    }
}
