//! Weight-bracket codec, the canonical in-memory form of a prompt.
//!
//! A prompt is a comma-separated list of tags. Wrapping tags in `{}` raises
//! their weight by one level per brace pair, wrapping them in `[]` lowers it.
//! [`TokenSequence::parse`] turns text into `(text, depth)` pairs and
//! [`TokenSequence::to_prompt_string`] writes them back with the minimal
//! bracket transitions between neighbouring depths.
//!
//! ```text
//! "a, {b}, [c], {{d}}"  ⇄  [("a", 0), ("b", 1), ("c", -1), ("d", 2)]
//! ```

use std::collections::HashSet;
use std::fmt;

use crate::data::TagCategories;

/// Prefix carried by artist tags in the image service's standard vocabulary.
pub const ARTIST_PREFIX: &str = "artist:";

/// A single tag and the weight level it was captured at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Net bracket level: positive is up-weighted, negative down-weighted.
    pub depth: i32,
}

impl Token {
    pub fn new(text: impl Into<String>, depth: i32) -> Self {
        Self {
            text: text.into(),
            depth,
        }
    }
}

/// How [`TokenSequence::parse_with`] treats text after the last comma.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailingText {
    /// Flush the buffer at end of input as a final token.
    #[default]
    Keep,
    /// Discard it, matching prompts produced by older releases.
    Drop,
}

/// An ordered list of weighted tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSequence {
    tokens: Vec<Token>,
}

impl TokenSequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse weight-bracket text, keeping any trailing tag.
    pub fn parse(text: &str) -> Self {
        Self::parse_with(text, TrailingText::Keep)
    }

    /// Parse weight-bracket text.
    ///
    /// `{` and `]` raise the level, `}` and `[` lower it. A tag takes the
    /// level active when its last non-bracket character was read, spaces
    /// included, so `{a }` yields depth 1 but `{a} ,` yields depth 0. Tag
    /// text is trimmed and blank tags are dropped.
    pub fn parse_with(text: &str, trailing: TrailingText) -> Self {
        let mut tokens = Vec::new();
        let mut depth = 0i32;
        let mut buffer = String::new();
        let mut buffer_depth = 0i32;

        for ch in text.chars() {
            match ch {
                '{' | ']' => depth += 1,
                '}' | '[' => depth -= 1,
                ',' => {
                    tokens.push(Token::new(std::mem::take(&mut buffer), buffer_depth));
                    buffer_depth = 0;
                }
                _ => {
                    buffer.push(ch);
                    buffer_depth = depth;
                }
            }
        }

        if trailing == TrailingText::Keep && !buffer.is_empty() {
            tokens.push(Token::new(buffer, buffer_depth));
        }

        let tokens = tokens
            .into_iter()
            .filter_map(|t| {
                let text = t.text.trim();
                (!text.is_empty()).then(|| Token::new(text, t.depth))
            })
            .collect();

        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Token> {
        self.tokens.iter_mut()
    }

    /// Append a tag at the end.
    pub fn push(&mut self, text: impl Into<String>, depth: i32) {
        self.tokens.push(Token::new(text, depth));
    }

    /// Insert a tag at the front.
    pub fn prepend(&mut self, text: impl Into<String>, depth: i32) {
        self.tokens.insert(0, Token::new(text, depth));
    }

    /// Move every token of `other` to the end of this sequence.
    pub fn append(&mut self, other: TokenSequence) {
        self.tokens.extend(other.tokens);
    }

    /// Whether any token has exactly this text.
    pub fn contains(&self, text: &str) -> bool {
        self.tokens.iter().any(|t| t.text == text)
    }

    /// The tag texts in order, without depths.
    pub fn texts(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Keep the first token for each distinct text, preserving order.
    pub fn remove_duplicates(&mut self) {
        let mut seen = HashSet::new();
        self.tokens.retain(|t| seen.insert(t.text.clone()));
    }

    /// For each listed text, delete the first remaining token with that text.
    ///
    /// Pass `other.texts()` to remove the tags of another sequence.
    pub fn remove<I, S>(&mut self, list: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in list {
            let item = item.as_ref();
            if let Some(pos) = self.tokens.iter().position(|t| t.text == item) {
                self.tokens.remove(pos);
            }
        }
    }

    /// Keep only tokens for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&Token) -> bool) {
        self.tokens.retain(|t| keep(t));
    }

    /// Collect tokens whose text, minus an optional `prefix`, appears in `list`.
    ///
    /// Matches are gathered in the order of `list`, then sequence order within
    /// one list entry. With `remove_extracted` the matches are moved out of
    /// this sequence, otherwise they are copied.
    pub fn extract<I, S>(&mut self, list: I, remove_extracted: bool, prefix: &str) -> TokenSequence
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut extracted = TokenSequence::new();

        for item in list {
            let item = item.as_ref();
            let matches = |t: &Token| t.text.strip_prefix(prefix).unwrap_or(&t.text) == item;

            if remove_extracted {
                let mut i = 0;
                while i < self.tokens.len() {
                    if matches(&self.tokens[i]) {
                        extracted.tokens.push(self.tokens.remove(i));
                    } else {
                        i += 1;
                    }
                }
            } else {
                extracted
                    .tokens
                    .extend(self.tokens.iter().filter(|t| matches(t)).cloned());
            }
        }

        extracted
    }

    /// Rearrange into presentation order: count, character, copyright and
    /// artist tags first, then everything else, quality tags last.
    pub fn reorder(&mut self, categories: &TagCategories) {
        let mut result = TokenSequence::new();
        result.append(self.extract(&categories.count, true, ""));
        result.append(self.extract(&categories.character, true, ""));
        result.append(self.extract(&categories.copyright, true, ""));
        result.append(self.extract(&categories.artist, true, ARTIST_PREFIX));
        let quality = self.extract(&categories.quality, true, "");
        result.append(std::mem::take(self));
        result.append(quality);
        *self = result;
    }

    /// Rewrite tags into the image service's standard vocabulary and give
    /// bare artist names their `artist:` prefix.
    pub fn nai_standard(&mut self, categories: &TagCategories) {
        for token in &mut self.tokens {
            if let Some(replacement) = standard_replacement(&token.text) {
                token.text = replacement.to_string();
            } else if categories.artist.iter().any(|a| *a == token.text) {
                token.text = format!("{ARTIST_PREFIX}{}", token.text);
            }
        }
    }

    /// Serialize back into weight-bracket text.
    ///
    /// Brackets are opened and closed lazily between neighbouring tokens, so
    /// the output is only balanced when the final token sits at depth 0.
    pub fn to_prompt_string(&self) -> String {
        let mut out = String::new();
        let mut level = 0i32;
        let last = self.tokens.len().saturating_sub(1);

        for (i, token) in self.tokens.iter().enumerate() {
            if token.depth != level {
                if out.ends_with(", ") {
                    out.truncate(out.len() - 2);
                }

                if token.depth > level {
                    for j in level..token.depth {
                        if j < 0 {
                            out.push(']');
                        } else {
                            open_group(&mut out, '{');
                        }
                    }
                    if out.ends_with(']') {
                        out.push_str(", ");
                    }
                } else {
                    for j in (token.depth + 1..=level).rev() {
                        if j <= 0 {
                            open_group(&mut out, '[');
                        } else {
                            out.push('}');
                        }
                    }
                    if out.ends_with('}') {
                        out.push_str(", ");
                    }
                }

                level = token.depth;
            }

            out.push_str(&token.text);
            if i != last {
                out.push_str(", ");
            }
        }

        out
    }
}

/// Push an opening bracket, separated from preceding text by a comma.
fn open_group(out: &mut String, bracket: char) {
    if !out.is_empty() && !out.ends_with(bracket) {
        out.push_str(", ");
    }
    out.push(bracket);
}

fn standard_replacement(text: &str) -> Option<&'static str> {
    let replacement = match text {
        "v" => "peace sign",
        "double v" => "double peace",
        "| |" => "bar eyes",
        "\\| |/" => "open \\m/",
        ":|" | ";|" => "neutral face",
        "eyepatch bikini" => "square bikini",
        "tachi-e" => "character image",
        _ => return None,
    };
    Some(replacement)
}

impl fmt::Display for TokenSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_prompt_string())
    }
}

impl FromIterator<Token> for TokenSequence {
    fn from_iter<T: IntoIterator<Item = Token>>(iter: T) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TokenSequence {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(seq: &TokenSequence) -> Vec<(&str, i32)> {
        seq.iter().map(|t| (t.text.as_str(), t.depth)).collect()
    }

    fn categories() -> TagCategories {
        TagCategories {
            count: vec!["1girl".into(), "solo".into()],
            character: vec!["hatsune miku".into()],
            copyright: vec!["vocaloid".into()],
            artist: vec!["wlop".into(), "mika pikazo".into()],
            quality: vec!["masterpiece".into(), "best quality".into()],
            ..TagCategories::default()
        }
    }

    #[test]
    fn test_parse_depths() {
        let seq = TokenSequence::parse("a, {b}, [c], {{d}}");
        assert_eq!(pairs(&seq), vec![("a", 0), ("b", 1), ("c", -1), ("d", 2)]);
    }

    #[test]
    fn test_parse_group_spanning_commas() {
        let seq = TokenSequence::parse("{a, b}, c, [[d, e]]");
        assert_eq!(
            pairs(&seq),
            vec![("a", 1), ("b", 1), ("c", 0), ("d", -2), ("e", -2)]
        );
    }

    #[test]
    fn test_parse_depth_taken_from_last_character() {
        // The space after `}` is read at level 0 and decides the level.
        let seq = TokenSequence::parse("{x} , y");
        assert_eq!(pairs(&seq), vec![("x", 0), ("y", 0)]);

        let seq = TokenSequence::parse("{x }, y");
        assert_eq!(pairs(&seq), vec![("x", 1), ("y", 0)]);

        let seq = TokenSequence::parse("[a] , {b}");
        assert_eq!(pairs(&seq), vec![("a", 0), ("b", 1)]);
    }

    #[test]
    fn test_parse_filters_blank_tokens() {
        let seq = TokenSequence::parse(" , a,,  ,b , ");
        assert_eq!(seq.texts(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_trailing_text_policy() {
        let kept = TokenSequence::parse_with("a, b", TrailingText::Keep);
        assert_eq!(kept.texts(), vec!["a", "b"]);

        let dropped = TokenSequence::parse_with("a, b", TrailingText::Drop);
        assert_eq!(dropped.texts(), vec!["a"]);

        let terminated = TokenSequence::parse_with("a, b,", TrailingText::Drop);
        assert_eq!(terminated.texts(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(TokenSequence::parse("").is_empty());
        assert!(TokenSequence::parse("{[]}").is_empty());
    }

    #[test]
    fn test_serialize_flat() {
        let seq = TokenSequence::parse("a,b,  c");
        assert_eq!(seq.to_prompt_string(), "a, b, c");
    }

    #[test]
    fn test_serialize_groups() {
        let seq = TokenSequence::parse("a, {b, c}, d, [e], f");
        assert_eq!(seq.to_prompt_string(), "a, {b, c}, d, [e], f");
    }

    #[test]
    fn test_serialize_nested_levels() {
        let seq = TokenSequence::parse("{{a}}, b, [[c]], d");
        assert_eq!(seq.to_prompt_string(), "{{a}}, b, [[c]], d");
    }

    #[test]
    fn test_serialize_cross_zero() {
        let seq = TokenSequence::parse("{a}, [b], {c}, d");
        assert_eq!(seq.to_prompt_string(), "{a}, [b], {c}, d");
    }

    #[test]
    fn test_serialize_leaves_final_group_open() {
        let seq = TokenSequence::parse("a, {b}");
        assert_eq!(seq.to_prompt_string(), "a, {b");
    }

    #[test]
    fn test_round_trip_when_final_depth_is_zero() {
        let inputs = [
            "a, {b}, [c], {{d}}, e",
            "{{{a, b}}}, [c], d",
            "[[x]], {y}, z",
            "{a}, {{b}}, {c}, [d], [[e]], f",
        ];
        for input in inputs {
            let seq = TokenSequence::parse(input);
            let reparsed = TokenSequence::parse(&seq.to_prompt_string());
            assert_eq!(pairs(&reparsed), pairs(&seq), "input: {input}");
        }
    }

    #[test]
    fn test_remove_duplicates_keeps_first() {
        let mut seq = TokenSequence::parse("a, b, {a}, c");
        seq.remove_duplicates();
        assert_eq!(pairs(&seq), vec![("a", 0), ("b", 0), ("c", 0)]);
    }

    #[test]
    fn test_remove_first_occurrence_per_entry() {
        let mut seq = TokenSequence::parse("a, b, a, c");
        seq.remove(["a", "c", "missing"]);
        assert_eq!(seq.texts(), vec!["b", "a"]);
    }

    #[test]
    fn test_remove_using_other_sequence() {
        let mut seq = TokenSequence::parse("a, b, c");
        let other = TokenSequence::parse("{c}, a");
        seq.remove(other.texts());
        assert_eq!(seq.texts(), vec!["b"]);
    }

    #[test]
    fn test_extract_follows_list_order() {
        let mut seq = TokenSequence::parse("x, b, a, y, b");
        let extracted = seq.extract(["a", "b"], true, "");
        assert_eq!(extracted.texts(), vec!["a", "b", "b"]);
        assert_eq!(seq.texts(), vec!["x", "y"]);
    }

    #[test]
    fn test_extract_copy_leaves_sequence() {
        let mut seq = TokenSequence::parse("a, {b}");
        let extracted = seq.extract(["b"], false, "");
        assert_eq!(pairs(&extracted), vec![("b", 1)]);
        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn test_extract_strips_prefix() {
        let mut seq = TokenSequence::parse("artist:wlop, wlop, artistic");
        let extracted = seq.extract(["wlop"], true, ARTIST_PREFIX);
        assert_eq!(extracted.texts(), vec!["artist:wlop", "wlop"]);
        assert_eq!(seq.texts(), vec!["artistic"]);
    }

    #[test]
    fn test_reorder() {
        let mut seq = TokenSequence::parse(
            "masterpiece, smile, artist:wlop, vocaloid, hatsune miku, solo, outdoors, 1girl",
        );
        seq.reorder(&categories());
        assert_eq!(
            seq.texts(),
            vec![
                "1girl",
                "solo",
                "hatsune miku",
                "vocaloid",
                "artist:wlop",
                "smile",
                "outdoors",
                "masterpiece"
            ]
        );
    }

    #[test]
    fn test_reorder_independent_of_category_input_order() {
        let mut a = TokenSequence::parse("solo, 1girl, best quality, masterpiece, rain");
        let mut b = TokenSequence::parse("1girl, masterpiece, rain, solo, best quality");
        a.reorder(&categories());
        b.reorder(&categories());
        assert_eq!(a.texts(), b.texts());
        assert_eq!(
            a.texts(),
            vec!["1girl", "solo", "rain", "masterpiece", "best quality"]
        );
    }

    #[test]
    fn test_nai_standard() {
        let mut seq = TokenSequence::parse("v, mika pikazo, tachi-e, artist:wlop, smile");
        seq.nai_standard(&categories());
        assert_eq!(
            seq.texts(),
            vec![
                "peace sign",
                "artist:mika pikazo",
                "character image",
                "artist:wlop",
                "smile"
            ]
        );
    }

    #[test]
    fn test_prepend_and_contains() {
        let mut seq = TokenSequence::parse("b");
        seq.prepend("a", 2);
        seq.push("c", 0);
        assert!(seq.contains("a"));
        assert!(!seq.contains("d"));
        assert_eq!(seq.to_prompt_string(), "{{a}}, b, c");
    }
}
