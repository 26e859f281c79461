//! Glob-style wildcard matching for node paths.

/// Match `subject` against `pattern` over the full string.
///
/// `*` matches any run of characters (including the empty run), `?` matches
/// exactly one character. Matching is case-sensitive and anchored at both
/// ends - this is not a substring search.
///
/// The implementation is the classic two-pointer matcher with backtracking:
/// literals are consumed until a `*` is seen; on a `*` the position just past
/// it and the current subject position are remembered; a later mismatch
/// resets the pattern to the remembered position and advances the subject
/// retry point by one.
#[must_use]
pub fn wildcard_match(subject: &str, pattern: &str) -> bool {
    let s: Vec<char> = subject.chars().collect();
    let p: Vec<char> = pattern.chars().collect();

    let mut si = 0;
    let mut pi = 0;

    // Literal prefix up to the first `*`.
    while si < s.len() && p.get(pi).is_some_and(|&c| c != '*') {
        if p[pi] != s[si] && p[pi] != '?' {
            return false;
        }
        pi += 1;
        si += 1;
    }

    let mut retry_p = 0;
    let mut retry_s = 0;
    let mut seen_star = false;

    while si < s.len() {
        if p.get(pi) == Some(&'*') {
            pi += 1;
            if pi == p.len() {
                // Trailing `*` swallows the rest of the subject.
                return true;
            }
            seen_star = true;
            retry_p = pi;
            retry_s = si + 1;
        } else if p.get(pi).is_some_and(|&c| c == s[si] || c == '?') {
            pi += 1;
            si += 1;
        } else {
            if !seen_star {
                return false;
            }
            pi = retry_p;
            si = retry_s;
            retry_s += 1;
        }
    }

    // Any trailing `*`s in the pattern match the empty run.
    while p.get(pi) == Some(&'*') {
        pi += 1;
    }

    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_literal_match() {
        assert!(wildcard_match("hello", "hello"));
        assert!(!wildcard_match("hello", "hellx"));
        assert!(!wildcard_match("hello", "hell"));
        assert!(!wildcard_match("hell", "hello"));
    }

    #[test]
    fn test_empty_strings() {
        assert!(wildcard_match("", ""));
        assert!(!wildcard_match("a", ""));
        assert!(wildcard_match("", "*"));
        assert!(!wildcard_match("", "?"));
    }

    #[test]
    fn test_question_mark_is_exactly_one_char() {
        assert!(wildcard_match("hello", "h?llo"));
        // No zero-width `?`.
        assert!(!wildcard_match("hllo", "h?llo"));
        assert!(!wildcard_match("heello", "h?llo"));
    }

    #[test]
    fn test_star_matches_any_run() {
        assert!(wildcard_match("anything at all", "*"));
        assert!(wildcard_match("abc", "a*c"));
        assert!(wildcard_match("ac", "a*c"));
        assert!(wildcard_match("a/b/c", "a*c"));
        assert!(!wildcard_match("ab", "a*c"));
    }

    #[test]
    fn test_star_backtracking() {
        // The first `c` after the star is the wrong one; the matcher has to
        // retry from a later subject position.
        assert!(wildcard_match("acdcde", "a*cde"));
        assert!(wildcard_match("aXbXcXd", "a*c*d"));
        assert!(!wildcard_match("aXbXcX", "a*c*d"));
    }

    #[test]
    fn test_full_path_patterns() {
        assert!(wildcard_match("world/EcalBarrel_12/stave_3", "*/stave*"));
        assert!(wildcard_match("world/DRICH_cooling_5", "*/DRICH_cooling*"));
        assert!(!wildcard_match("DRICH_cooling_5", "*/DRICH_cooling*"));
        // `**` degenerates to `*`, so patterns written glob-style still work.
        assert!(wildcard_match("pipe/v_upstream_coating", "**/v_upstream*"));
    }

    #[test]
    fn test_case_sensitive() {
        assert!(!wildcard_match("Hello", "hello"));
    }

    proptest! {
        #[test]
        fn prop_every_string_matches_itself(s in ".*") {
            prop_assert!(wildcard_match(&s, &s));
        }

        #[test]
        fn prop_star_matches_everything(s in ".*") {
            prop_assert!(wildcard_match(&s, "*"));
        }

        #[test]
        fn prop_star_prefix_and_suffix(s in ".+") {
            let star_prefix = format!("*{s}");
            let star_suffix = format!("{s}*");
            prop_assert!(wildcard_match(&s, &star_prefix));
            prop_assert!(wildcard_match(&s, &star_suffix));
        }
    }
}
