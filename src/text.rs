//! Text normalization for extracted runs and joined lines.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{FB05}', "st"),
    ('\u{FB06}', "st"),
];

static RE_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{00A0}]{2,}").unwrap());

/// Clean the text of a single run.
///
/// NFC-normalizes, expands typographic ligatures and drops the replacement
/// character and private-use code points that unmapped glyphs decode to.
/// Interior whitespace is preserved so code indentation survives.
pub fn normalize_run_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfc() {
        if let Some((_, expanded)) = LIGATURES.iter().find(|(lig, _)| *lig == c) {
            out.push_str(expanded);
        } else if c == '\u{FFFD}' || is_private_use(c) || (c.is_control() && c != '\t') {
            continue;
        } else {
            out.push(c);
        }
    }
    out
}

fn is_private_use(c: char) -> bool {
    let code = c as u32;
    (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}

/// Collapse runs of spaces to one and trim.
pub fn collapse_spaces(text: &str) -> String {
    RE_SPACES.replace_all(text.trim(), " ").into_owned()
}

/// Join wrapped lines of prose into one string.
///
/// A line ending in a hyphen directly after a letter is joined to a next
/// line starting with a lowercase letter without the hyphen ("infor-" +
/// "mation"); every other break becomes a single space.
pub fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    for line in lines {
        let line = collapse_spaces(line.as_ref());
        if line.is_empty() {
            continue;
        }
        if out.is_empty() {
            out.push_str(&line);
        } else if ends_with_word_hyphen(&out) && starts_lowercase(&line) {
            out.pop();
            out.push_str(&line);
        } else {
            out.push(' ');
            out.push_str(&line);
        }
    }
    out
}

fn ends_with_word_hyphen(s: &str) -> bool {
    let mut rev = s.chars().rev();
    matches!(
        (rev.next(), rev.next()),
        (Some('-'), Some(prev)) if prev.is_alphabetic()
    )
}

fn starts_lowercase(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_normalization() {
        // e + combining acute -> precomposed é
        assert_eq!(normalize_run_text("caf\u{0065}\u{0301}"), "caf\u{00E9}");
    }

    #[test]
    fn test_ligatures_expanded() {
        assert_eq!(normalize_run_text("\u{FB01}nd the \u{FB03}x"), "find the ffix");
    }

    #[test]
    fn test_garbage_dropped() {
        assert_eq!(normalize_run_text("a\u{FFFD}b\u{E001}c\u{0007}"), "abc");
        assert_eq!(normalize_run_text("  indented\tcode"), "  indented\tcode");
    }

    #[test]
    fn test_join_lines_dehyphenates() {
        assert_eq!(join_lines(&["infor-", "mation flows"]), "information flows");
        assert_eq!(join_lines(&["Wi-", "Fi networks"]), "Wi- Fi networks");
        assert_eq!(join_lines(&["first  line", "", "second"]), "first line second");
    }

    #[test]
    fn test_join_lines_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(join_lines(&empty), "");
    }
}
