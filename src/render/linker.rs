//! Wikilink and tag post-processing of rendered Markdown.
//!
//! The tagger works on the finished note. It wraps the first occurrence of
//! each key term in `[[...]]` and appends a single line of `#tags`. Fenced
//! code, inline code, image embeds, HTML comments, YAML frontmatter and
//! existing wikilinks are never rewritten. Running it twice gives the same
//! note as running it once.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::{AutoTerms, Vocabulary};
use crate::error::Result;

static FRONTMATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A---\n[\s\S]*?\n---[ \t]*(?:\n|\z)").unwrap());

static INLINE_PROTECTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"!\[\[[^\]\n]*\]\]|!\[[^\]\n]*\]\([^)\n]*\)|\[\[[^\]\n]+\]\]|<!--[\s\S]*?-->|`[^`\n]+`",
    )
    .unwrap()
});

static WIKILINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]|#\n]+)(?:[#|][^\]\n]*)?\]\]").unwrap());

static TAG_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[\p{L}\p{N}_/-]+$").unwrap());

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{L}[\p{L}\p{N}]*(?:['-][\p{L}\p{N}]+)*").unwrap());

/// What a [`LinkTagger::process_with_summary`] call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSummary {
    /// Terms newly wrapped as wikilinks, in the order they were linked
    pub linked: Vec<String>,
    /// Every tag on the final tag line, sorted
    pub tags: Vec<String>,
}

struct TagMatcher {
    tag: String,
    pattern: Regex,
}

/// Injects wikilinks and tags according to a [`Vocabulary`].
pub struct LinkTagger {
    terms: Vec<String>,
    tags: Vec<TagMatcher>,
    auto: Option<AutoTerms>,
}

#[derive(Debug)]
struct Segment {
    text: String,
    protected: bool,
}

impl Segment {
    fn open(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            protected: false,
        }
    }

    fn closed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            protected: true,
        }
    }
}

impl LinkTagger {
    pub fn new(vocabulary: &Vocabulary) -> Result<Self> {
        let mut tags = Vec::new();
        for rule in &vocabulary.tags {
            let keywords: Vec<&str> = rule
                .keywords
                .iter()
                .map(|k| k.trim())
                .filter(|k| !k.is_empty())
                .collect();
            if keywords.is_empty() {
                continue;
            }
            let alternatives: Vec<String> = keywords.iter().map(|k| whole_word(k)).collect();
            tags.push(TagMatcher {
                tag: rule.tag.trim_start_matches('#').to_string(),
                pattern: Regex::new(&format!("(?i){}", alternatives.join("|")))?,
            });
        }

        Ok(Self {
            terms: vocabulary
                .key_terms
                .iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            tags,
            auto: vocabulary.auto_terms.clone(),
        })
    }

    /// Link key terms and append tags.
    pub fn process(&self, text: &str) -> String {
        self.process_with_summary(text).0
    }

    pub fn process_with_summary(&self, text: &str) -> (String, LinkSummary) {
        let (body, existing_tags) = split_tag_line(text);
        let mut segments = segment(body);

        let mut terms = self.terms.clone();
        if let Some(ref auto) = self.auto {
            let found = discover_terms(&segments, auto);
            log::debug!("discovered {} key terms", found.len());
            terms.extend(found);
        }
        let terms = order_terms(terms);

        let mut already: HashSet<String> = segments
            .iter()
            .filter(|s| s.protected)
            .flat_map(|s| WIKILINK.captures_iter(&s.text))
            .filter_map(|c| c.get(1).map(|m| m.as_str().trim().to_lowercase()))
            .collect();

        let mut summary = LinkSummary::default();
        for term in terms {
            if !already.insert(term.to_lowercase()) {
                continue;
            }
            let pattern = match Regex::new(&format!("(?i){}", whole_word(&term))) {
                Ok(pattern) => pattern,
                Err(e) => {
                    log::warn!("skipping key term '{}': {}", term, e);
                    continue;
                }
            };
            if link_first(&mut segments, &pattern) {
                log::debug!("linked key term '{}'", term);
                summary.linked.push(term);
            }
        }

        let linked: String = segments.into_iter().map(|s| s.text).collect();

        let mut tags: BTreeSet<String> = existing_tags;
        for matcher in &self.tags {
            if matcher.pattern.is_match(&linked) {
                tags.insert(matcher.tag.clone());
            }
        }
        summary.tags = tags.iter().cloned().collect();

        if tags.is_empty() {
            return (linked, summary);
        }
        let line = tags
            .iter()
            .map(|t| format!("#{}", t))
            .collect::<Vec<_>>()
            .join(" ");
        let body = linked.trim_end();
        let out = if body.is_empty() {
            format!("{}\n", line)
        } else {
            format!("{}\n\n{}\n", body, line)
        };
        (out, summary)
    }
}

/// Case-insensitive whole-word pattern body; word boundaries are only
/// required at ends that are word characters. Characters the renderer
/// escapes may appear with their backslash.
fn whole_word(term: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = if term.chars().next().is_some_and(is_word) {
        r"\b"
    } else {
        ""
    };
    let end = if term.chars().last().is_some_and(is_word) {
        r"\b"
    } else {
        ""
    };
    let body: String = term
        .chars()
        .map(|c| {
            let literal = regex::escape(c.encode_utf8(&mut [0; 4]));
            if MARKDOWN_ESCAPED.contains(c) {
                format!(r"\\?{}", literal)
            } else {
                literal
            }
        })
        .collect();
    format!("{}{}{}", start, body, end)
}

/// Characters the Markdown renderer backslash-escapes in prose.
const MARKDOWN_ESCAPED: &str = "\\`*_[]";

/// Drop the escaping backslashes the renderer put into matched text.
fn unescape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match chars.peek() {
            Some(&next) if c == '\\' && MARKDOWN_ESCAPED.contains(next) => {
                out.push(next);
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

/// Longest first, then alphabetical; duplicates differing only in case are
/// dropped.
fn order_terms(terms: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique: Vec<String> = terms
        .into_iter()
        .filter(|t| seen.insert(t.to_lowercase()))
        .collect();
    unique.sort_by(|a, b| {
        b.chars()
            .count()
            .cmp(&a.chars().count())
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
    });
    unique
}

/// Wrap the first unprotected match; the new link becomes protected.
fn link_first(segments: &mut Vec<Segment>, pattern: &Regex) -> bool {
    for i in 0..segments.len() {
        if segments[i].protected {
            continue;
        }
        let Some((start, end)) = pattern
            .find(&segments[i].text)
            .map(|m| (m.start(), m.end()))
        else {
            continue;
        };
        let text = std::mem::take(&mut segments[i].text);
        let replacement = [
            Segment::open(&text[..start]),
            Segment::closed(format!("[[{}]]", unescape_markdown(&text[start..end]))),
            Segment::open(&text[end..]),
        ];
        segments.splice(i..=i, replacement);
        return true;
    }
    false
}

/// Separate a trailing line made only of `#tag` tokens.
fn split_tag_line(text: &str) -> (&str, BTreeSet<String>) {
    let trimmed = text.trim_end();
    let (body, last) = match trimmed.rfind('\n') {
        Some(at) => (&trimmed[..at], &trimmed[at + 1..]),
        None => ("", trimmed),
    };
    let tokens: Vec<&str> = last.split_whitespace().collect();
    if tokens.is_empty() || !tokens.iter().all(|t| TAG_TOKEN.is_match(t)) {
        return (text, BTreeSet::new());
    }
    let tags = tokens
        .iter()
        .map(|t| t.trim_start_matches('#').to_string())
        .collect();
    (body, tags)
}

fn segment(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    for block in split_fences(text) {
        if block.protected {
            segments.push(block);
            continue;
        }
        let mut last = 0;
        for m in INLINE_PROTECTED.find_iter(&block.text) {
            if m.start() > last {
                segments.push(Segment::open(&block.text[last..m.start()]));
            }
            segments.push(Segment::closed(m.as_str()));
            last = m.end();
        }
        if last < block.text.len() {
            segments.push(Segment::open(&block.text[last..]));
        }
    }
    segments
}

/// Split off frontmatter and fenced code blocks.
fn split_fences(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = text;
    if let Some(m) = FRONTMATTER.find(text) {
        segments.push(Segment::closed(m.as_str()));
        rest = &text[m.end()..];
    }

    let mut current = String::new();
    let mut fence: Option<(char, usize)> = None;
    for line in rest.split_inclusive('\n') {
        match fence {
            None => {
                if let Some(open) = fence_marker(line) {
                    if !current.is_empty() {
                        segments.push(Segment::open(std::mem::take(&mut current)));
                    }
                    fence = Some(open);
                }
                current.push_str(line);
            }
            Some((ch, len)) => {
                current.push_str(line);
                let closing = line.trim();
                if closing.chars().count() >= len && closing.chars().all(|c| c == ch) {
                    segments.push(Segment::closed(std::mem::take(&mut current)));
                    fence = None;
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(Segment {
            text: current,
            protected: fence.is_some(),
        });
    }
    segments
}

fn fence_marker(line: &str) -> Option<(char, usize)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == ch).count();
    (len >= 3).then_some((ch, len))
}

/// Frequent words and word pairs outside protected text.
fn discover_terms(segments: &[Segment], auto: &AutoTerms) -> Vec<String> {
    let stopwords: HashSet<String> = auto.stopwords.iter().map(|w| w.to_lowercase()).collect();
    let qualifies = |w: &str| w.chars().count() >= auto.min_word_len && !stopwords.contains(w);

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for segment in segments.iter().filter(|s| !s.protected) {
        for line in segment.text.lines() {
            let mut previous: Option<String> = None;
            for m in WORD.find_iter(line) {
                let word = m.as_str().to_lowercase();
                if !qualifies(&word) {
                    previous = None;
                    continue;
                }
                *counts.entry(word.clone()).or_default() += 1;
                if let Some(prev) = previous.take() {
                    *counts.entry(format!("{} {}", prev, word)).or_default() += 1;
                }
                previous = Some(word);
            }
        }
    }

    counts
        .into_iter()
        .filter(|(_, n)| *n >= auto.min_frequency)
        .map(|(term, _)| term)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagger(vocab: Vocabulary) -> LinkTagger {
        LinkTagger::new(&vocab).unwrap()
    }

    #[test]
    fn test_first_occurrence_only() {
        let t = tagger(Vocabulary::empty().with_key_terms(["OWASP"]));
        let out = t.process("The owasp list.\n\nOWASP again and OWASP.\n");
        assert_eq!(out, "The [[owasp]] list.\n\nOWASP again and OWASP.\n");
    }

    #[test]
    fn test_whole_word_only() {
        let t = tagger(Vocabulary::empty().with_key_terms(["scan"]));
        assert_eq!(t.process("scanning then scan.\n"), "scanning then [[scan]].\n");
    }

    #[test]
    fn test_longer_terms_first() {
        let t = tagger(Vocabulary::empty().with_key_terms(["Threat", "Threat Model"]));
        let out = t.process("A threat model covers each threat.\n");
        assert_eq!(out, "A [[threat model]] covers each [[threat]].\n");
    }

    #[test]
    fn test_protected_regions_untouched() {
        let t = tagger(Vocabulary::empty().with_key_terms(["nmap"]));
        let input = "```\nnmap -sV host\n```\n\n![](img/nmap.png)\n\n`nmap` then nmap\n";
        let out = t.process(input);
        assert_eq!(
            out,
            "```\nnmap -sV host\n```\n\n![](img/nmap.png)\n\n`nmap` then [[nmap]]\n"
        );
    }

    #[test]
    fn test_existing_wikilink_counts_as_linked() {
        let t = tagger(Vocabulary::empty().with_key_terms(["Scope"]));
        let input = "See [[scope|the scope]]. Scope matters.\n";
        assert_eq!(t.process(input), input);
    }

    #[test]
    fn test_tags_sorted_and_appended() {
        let t = tagger(Vocabulary::default());
        let out = t.process("Network security methods.\n");
        assert_eq!(
            out,
            "Network security methods.\n\n#methodology #network #security\n"
        );
    }

    #[test]
    fn test_processing_is_idempotent() {
        let t = tagger(Vocabulary::default().with_key_terms(["Penetration Test", "scope"]));
        let input = "# Penetration Test\n\nThe scope of the penetration test covers network security.\n";
        let once = t.process(input);
        let twice = t.process(&once);
        assert_eq!(once, twice);
        assert_eq!(once.matches("#network").count(), 1);
    }

    #[test]
    fn test_existing_tag_line_merged() {
        let t = tagger(Vocabulary::default());
        let out = t.process("Compliance review.\n\n#draft\n");
        assert_eq!(out, "Compliance review.\n\n#compliance #draft\n");
    }

    #[test]
    fn test_no_tags_leaves_text_unchanged() {
        let t = tagger(Vocabulary::empty());
        assert_eq!(t.process("# Heading\n\nText\n"), "# Heading\n\nText\n");
    }

    #[test]
    fn test_frontmatter_protected() {
        let t = tagger(Vocabulary::empty().with_key_terms(["Report"]));
        let out = t.process("---\ntitle: \"Report\"\n---\n\nReport body\n");
        assert_eq!(out, "---\ntitle: \"Report\"\n---\n\n[[Report]] body\n");
    }

    #[test]
    fn test_auto_terms() {
        let vocab = Vocabulary::empty().with_auto_terms(AutoTerms::default());
        let t = tagger(vocab);
        let (out, summary) = t.process_with_summary(
            "Attack surface review.\nThe attack surface grows.\nNothing else.\n",
        );
        assert!(out.starts_with("[[Attack surface]] review."));
        assert_eq!(summary.linked[0], "attack surface");
        assert!(!summary.linked.iter().any(|t| t == "the"));
    }

    #[test]
    fn test_first_match_keeps_source_casing_mid_line() {
        let t = tagger(Vocabulary::empty().with_key_terms(["red team"]));
        let out = t.process("Before the Red Team exercise, the red team met.\n");
        assert_eq!(out, "Before the [[Red Team]] exercise, the red team met.\n");
    }

    #[test]
    fn test_term_matches_escaped_rendering() {
        let t = tagger(Vocabulary::empty().with_key_terms(["snake_case", "C*"]));
        let out = t.process("Use snake\\_case names; C\\* too. snake\\_case again.\n");
        assert_eq!(out, "Use [[snake_case]] names; [[C*]] too. snake\\_case again.\n");
        assert_eq!(t.process(&out), out);
    }

    #[test]
    fn test_unescape_markdown() {
        assert_eq!(unescape_markdown(r"a\_b\*c\d"), r"a_b*c\d");
    }

    #[test]
    fn test_summary_counts() {
        let t = tagger(Vocabulary::default().with_key_terms(["audit"]));
        let (_, summary) = t.process_with_summary("An audit of network gear.\n");
        assert_eq!(summary.linked, vec!["audit"]);
        assert_eq!(summary.tags, vec!["network"]);
    }
}
