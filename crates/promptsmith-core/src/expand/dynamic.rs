//! Dynamic-choice expansion: `<a|b|c>` becomes one of `a`, `b` or `c`.

use rand::Rng;
use rand::seq::IndexedRandom;

/// Replace every top-level `<...>` group with one of its alternatives.
///
/// Only `|` at the outermost group level separates alternatives; deeper `|`
/// stay part of the alternative text. After a group is replaced, scanning
/// resumes at the start of the inserted text, so nested groups inside the
/// chosen alternative are resolved in the same call. An unclosed `<` and a
/// stray `>` are left as literal text.
pub fn expand_dynamic<R: Rng + ?Sized>(text: &str, rng: &mut R) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut buffer = String::new();
    let mut alternatives: Vec<String> = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '<' => {
                depth += 1;
                if depth == 1 {
                    start = i;
                    buffer.clear();
                    alternatives.clear();
                    i += 1;
                    continue;
                }
            }
            '>' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    alternatives.push(std::mem::take(&mut buffer));
                    let chosen = alternatives.choose(rng).cloned().unwrap_or_default();
                    chars.splice(start..=i, chosen.chars());
                    alternatives.clear();
                    i = start;
                    continue;
                }
            }
            '|' if depth == 1 => {
                alternatives.push(std::mem::take(&mut buffer));
                i += 1;
                continue;
            }
            _ => {}
        }

        buffer.push(ch);
        i += 1;
    }

    chars.into_iter().collect()
}
