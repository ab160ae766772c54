//! # Glob Matching
//!
//! Purpose: Decide whether a channel name satisfies a pattern subscription
//! without pulling in a regex engine.
//!
//! ## Design Principles
//! 1. **Anchored**: The whole channel name must match the whole pattern.
//! 2. **Case-Sensitive**: No folding; channel names are compared as-is.
//! 3. **Server-Compatible**: `*` matches any run, `?` exactly one byte,
//!    `[...]` one listed byte (ranges, `^` negation), `\` escapes the next
//!    byte. This mirrors the matching the upstream server applies to
//!    pattern subscriptions.

/// Returns true when `text` matches the glob `pattern`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    match_bytes(pattern.as_bytes(), text.as_bytes())
}

fn match_bytes(mut pattern: &[u8], mut text: &[u8]) -> bool {
    while let Some(&p) = pattern.first() {
        match p {
            b'*' => {
                // Collapse consecutive stars; a trailing star matches the rest.
                while pattern.get(1) == Some(&b'*') {
                    pattern = &pattern[1..];
                }
                if pattern.len() == 1 {
                    return true;
                }
                for skip in 0..=text.len() {
                    if match_bytes(&pattern[1..], &text[skip..]) {
                        return true;
                    }
                }
                return false;
            }
            b'?' => {
                if text.is_empty() {
                    return false;
                }
                pattern = &pattern[1..];
                text = &text[1..];
            }
            b'[' => {
                let (matched, rest) = match_class(&pattern[1..], text.first().copied());
                if text.is_empty() || !matched {
                    return false;
                }
                pattern = rest;
                text = &text[1..];
            }
            b'\\' if pattern.len() >= 2 => {
                if text.first() != Some(&pattern[1]) {
                    return false;
                }
                pattern = &pattern[2..];
                text = &text[1..];
            }
            _ => {
                if text.first() != Some(&p) {
                    return false;
                }
                pattern = &pattern[1..];
                text = &text[1..];
            }
        }
    }
    text.is_empty()
}

/// Matches one byte against a `[...]` class body (the leading `[` already
/// consumed). Returns whether it matched and the pattern after the class.
fn match_class(class: &[u8], byte: Option<u8>) -> (bool, &[u8]) {
    let mut idx = 0;
    let negate = class.first() == Some(&b'^');
    if negate {
        idx = 1;
    }

    let mut matched = false;
    while idx < class.len() && class[idx] != b']' {
        if class[idx] == b'\\' && idx + 1 < class.len() {
            if byte == Some(class[idx + 1]) {
                matched = true;
            }
            idx += 2;
        } else if idx + 2 < class.len() && class[idx + 1] == b'-' && class[idx + 2] != b']' {
            let (lo, hi) = if class[idx] <= class[idx + 2] {
                (class[idx], class[idx + 2])
            } else {
                (class[idx + 2], class[idx])
            };
            if let Some(b) = byte {
                if lo <= b && b <= hi {
                    matched = true;
                }
            }
            idx += 3;
        } else {
            if byte == Some(class[idx]) {
                matched = true;
            }
            idx += 1;
        }
    }

    // Skip the closing bracket when present; an unterminated class simply
    // consumes the rest of the pattern.
    let rest = if idx < class.len() { &class[idx + 1..] } else { &class[idx..] };
    (matched != negate, rest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_is_anchored() {
        assert!(glob_match("news", "news"));
        assert!(!glob_match("news", "news.sports"));
        assert!(!glob_match("news.sports", "news"));
    }

    #[test]
    fn star_matches_any_run() {
        assert!(glob_match("news.*", "news.sports"));
        assert!(glob_match("news.*", "news."));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*c", "abbbc"));
        assert!(!glob_match("news.*", "weather.sports"));
    }

    #[test]
    fn question_mark_matches_exactly_one() {
        assert!(glob_match("h?llo", "hello"));
        assert!(glob_match("h?llo", "hallo"));
        assert!(!glob_match("h?llo", "hllo"));
        assert!(!glob_match("h?llo", "heello"));
    }

    #[test]
    fn class_matches_listed_bytes() {
        assert!(glob_match("h[ae]llo", "hello"));
        assert!(glob_match("h[ae]llo", "hallo"));
        assert!(!glob_match("h[ae]llo", "hillo"));
    }

    #[test]
    fn class_ranges_and_negation() {
        assert!(glob_match("x[0-9]", "x7"));
        assert!(!glob_match("x[0-9]", "xa"));
        assert!(glob_match("h[^e]llo", "hallo"));
        assert!(!glob_match("h[^e]llo", "hello"));
    }

    #[test]
    fn escape_makes_metacharacters_literal() {
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
        assert!(glob_match("a\\?b", "a?b"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!glob_match("News.*", "news.sports"));
    }

    #[test]
    fn consecutive_stars_collapse() {
        assert!(glob_match("a**b", "ab"));
        assert!(glob_match("a**b", "axxxb"));
    }
}
