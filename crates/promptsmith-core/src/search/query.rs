//! Include/exclude tag queries.

use crate::codec::TokenSequence;

/// Marks a search tag as excluded.
pub const EXCLUDE_MARKER: char = '~';

/// A set of tags a prompt must contain and a set it must not contain.
///
/// Both lists are de-duplicated and keep first-seen order, which is the
/// order tags are validated in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl Query {
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut query = Self::default();
        for tag in include {
            push_unique(&mut query.include, tag.into());
        }
        for tag in exclude {
            push_unique(&mut query.exclude, tag.into());
        }
        query
    }

    /// Build a query from search tokens: `~tag` excludes, anything else includes.
    pub fn from_tokens(tokens: &TokenSequence) -> Self {
        let mut query = Self::default();
        for token in tokens {
            match token.text.strip_prefix(EXCLUDE_MARKER) {
                Some(tag) => push_unique(&mut query.exclude, tag.trim().to_string()),
                None => push_unique(&mut query.include, token.text.clone()),
            }
        }
        query
    }

    pub fn include(&self) -> &[String] {
        &self.include
    }

    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// True when there are neither include nor exclude tags.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Order-independent identity used by the query cache:
    /// `sorted(include).join(",") + "|" + sorted(exclude).join(",")`.
    pub fn cache_key(&self) -> String {
        let mut include: Vec<&str> = self.include.iter().map(String::as_str).collect();
        let mut exclude: Vec<&str> = self.exclude.iter().map(String::as_str).collect();
        include.sort_unstable();
        exclude.sort_unstable();
        format!("{}|{}", include.join(","), exclude.join(","))
    }
}

fn push_unique(list: &mut Vec<String>, tag: String) {
    if !tag.is_empty() && !list.contains(&tag) {
        list.push(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_tokens_splits_and_dedups() {
        let tokens = TokenSequence::parse("1girl, ~rain, outdoors, 1girl, ~rain, ~ night");
        let query = Query::from_tokens(&tokens);
        assert_eq!(query.include(), ["1girl", "outdoors"]);
        assert_eq!(query.exclude(), ["rain", "night"]);
    }

    #[test]
    fn test_bare_marker_is_ignored() {
        let query = Query::from_tokens(&TokenSequence::parse("~, a"));
        assert_eq!(query.include(), ["a"]);
        assert!(query.exclude().is_empty());
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let a = Query::new(["b", "a"], ["d", "c"]);
        let b = Query::new(["a", "b", "a"], ["c", "d"]);
        assert_eq!(a.cache_key(), "a,b|c,d");
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_separates_include_from_exclude() {
        let a = Query::new(["a"], ["b"]);
        let b = Query::new(["a", "b"], Vec::<String>::new());
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_empty() {
        assert!(Query::default().is_empty());
        assert!(Query::from_tokens(&TokenSequence::parse(" , ")).is_empty());
    }
}
