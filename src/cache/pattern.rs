//! Glob matching with the semantics of Redis `KEYS`/`SCAN MATCH`.
//!
//! `*` matches any run of characters (including `:`), `?` exactly one,
//! `[abc]`, `[a-z]` and `[^a]` match character classes, and `\` escapes the
//! next character both inside and outside classes.

/// Returns `true` when `text` matches the glob `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_from(&pattern, &text)
}

/// Escape glob metacharacters so `literal` only matches itself.
pub fn escape(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for ch in literal.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn match_from(pattern: &[char], text: &[char]) -> bool {
    let mut p = 0;
    let mut t = 0;

    while p < pattern.len() {
        match pattern[p] {
            '*' => {
                while p + 1 < pattern.len() && pattern[p + 1] == '*' {
                    p += 1;
                }
                if p + 1 == pattern.len() {
                    return true;
                }
                return (t..=text.len()).any(|start| match_from(&pattern[p + 1..], &text[start..]));
            }
            '?' => {
                if t >= text.len() {
                    return false;
                }
                t += 1;
                p += 1;
            }
            '[' => {
                let Some(&ch) = text.get(t) else {
                    return false;
                };
                let (matched, next) = match_class(pattern, p + 1, ch);
                if !matched {
                    return false;
                }
                p = next;
                t += 1;
            }
            '\\' if p + 1 < pattern.len() => {
                if text.get(t) != Some(&pattern[p + 1]) {
                    return false;
                }
                p += 2;
                t += 1;
            }
            literal => {
                if text.get(t) != Some(&literal) {
                    return false;
                }
                p += 1;
                t += 1;
            }
        }
    }

    t == text.len()
}

/// Match `ch` against the class starting at `start` (just past `[`). Returns
/// whether it matched and the index just past the closing `]`. An unclosed
/// class runs to the end of the pattern.
fn match_class(pattern: &[char], start: usize, ch: char) -> (bool, usize) {
    let mut i = start;
    let negate = pattern.get(i) == Some(&'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != ']' {
        if pattern[i] == '\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == ch;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == '-' && pattern[i + 2] != ']' {
            let (mut lo, mut hi) = (pattern[i], pattern[i + 2]);
            if lo > hi {
                std::mem::swap(&mut lo, &mut hi);
            }
            matched |= (lo..=hi).contains(&ch);
            i += 3;
        } else {
            matched |= pattern[i] == ch;
            i += 1;
        }
    }

    let next = if i < pattern.len() { i + 1 } else { i };
    (matched != negate, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_spans_segments() {
        assert!(glob_match("blog:list:*", "blog:list:category:all:tag:all"));
        assert!(glob_match(
            "blog:list:category:*:tag:fengguang",
            "blog:list:category:landscape:tag:fengguang"
        ));
        assert!(!glob_match(
            "blog:list:category:*:tag:fengguang",
            "blog:list:category:landscape:tag:fengguang-2"
        ));
        assert!(glob_match("*", ""));
        assert!(!glob_match("blog:list:*", "blog:detail:spring-west-lake"));
    }

    #[test]
    fn question_mark_matches_exactly_one_char() {
        assert!(glob_match("h?llo", "hello"));
        assert!(!glob_match("h?llo", "hllo"));
        assert!(!glob_match("h?llo", "heello"));
    }

    #[test]
    fn classes_ranges_and_negation() {
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(!glob_match("h[ae]llo", "hillo"));
        assert!(glob_match("h[^e]llo", "hallo"));
        assert!(!glob_match("h[^e]llo", "hello"));
        assert!(glob_match("h[a-b]llo", "hbllo"));
        assert!(glob_match("h[b-a]llo", "hallo"));
        assert!(!glob_match("h[a-b]llo", "hcllo"));
    }

    #[test]
    fn backslash_escapes_metacharacters() {
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
        assert!(glob_match("[\\]]", "]"));
        assert!(glob_match(&escape("odd[slug]*?"), "odd[slug]*?"));
        assert!(!glob_match(&escape("a*"), "abc"));
    }

    #[test]
    fn empty_segments_are_distinct_from_sentinels() {
        assert!(glob_match(
            "blog:list:category::tag:*",
            "blog:list:category::tag:"
        ));
        assert!(!glob_match(
            "blog:list:category::tag:*",
            "blog:list:category:all:tag:all"
        ));
    }
}
