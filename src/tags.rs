//! Splits decorative markers (anniversary editions, dubs, event formats) out of film titles.
//!
//! Every rule is applied in turn against the shrinking title, so a title carrying
//! several markers is peeled down to the bare film name in one pass.

use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Kind of metadata split out of a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Anniversary,
    Rerelease,
    Remaster,
    Language,
    Version,
    Collection,
    Format,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Anniversary => "anniversary",
            Self::Rerelease => "rerelease",
            Self::Remaster => "remaster",
            Self::Language => "language",
            Self::Version => "version",
            Self::Collection => "collection",
            Self::Format => "format",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "type")]
    pub kind: TagKind,
    pub text: String,
}

impl Tag {
    pub fn new(kind: TagKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedTitle {
    pub title: String,
    pub tags: Vec<Tag>,
}

/// Ordered tag rules. Order matters: the specific anniversary form must win over the
/// catch-all at the end.
static TAG_RULES: LazyLock<Vec<(Regex, TagKind)>> = LazyLock::new(|| {
    [
        (r"(?i)\s*\((\d+(?:st|nd|rd|th) Anniversary[^)]*?)\)", TagKind::Anniversary),
        (r"(?i)\s*\((Re-Issue|Rerelease)\)", TagKind::Rerelease),
        (r"(?i)\s*\((4K Re-release)\)", TagKind::Remaster),
        (r"(?i)\s*\((Dubbed|Subbed)\)", TagKind::Language),
        (r"(?i)\s*\(Uncut\)", TagKind::Version),
        (r"(?i)\s*\(Double Bill[^)]*?\)", TagKind::Collection),
        (r"(?i)\s*\([^()]*?Anniversary[^()]*?\)", TagKind::Anniversary),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("Invalid tag rule"), kind))
    .collect()
});

/// Event-format prefixes that are not parenthesised: (prefix, tag text).
const FORMAT_PREFIXES: [(&str, &str); 1] = [("NT Live: ", "NT Live")];

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace pattern"));

/// Collapses whitespace runs to a single space and trims.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Decodes HTML character references (`&amp;`, `&#174;`) left in scraped titles.
///
/// Literal `<` is escaped first so angle-bracketed text survives as text.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let escaped = raw.replace('<', "&lt;");
    Html::parse_fragment(&escaped).root_element().text().collect()
}

/// Splits `raw` into a canonical title plus the decorative tags it carried.
pub fn normalize_title(raw: &str) -> NormalizedTitle {
    let mut title = decode_entities(raw);
    let mut tags = Vec::new();

    for (rule, kind) in TAG_RULES.iter() {
        let Some(caps) = rule.captures(&title) else {
            continue;
        };
        // The first match names the tag; every match is removed.
        let text = match caps.get(1) {
            Some(group) => group.as_str().trim().to_string(),
            None => caps[0]
                .trim()
                .trim_start_matches('(')
                .trim_end_matches(')')
                .trim()
                .to_string(),
        };
        tags.push(Tag::new(*kind, text));
        title = rule.replace_all(&title, "").trim().to_string();
    }

    for (prefix, text) in FORMAT_PREFIXES {
        if let Some(rest) = title.strip_prefix(prefix) {
            tags.push(Tag::new(TagKind::Format, text));
            title = rest.to_string();
        }
    }

    NormalizedTitle {
        title: collapse_whitespace(&title),
        tags,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anniversary_edition() {
        let n = normalize_title("Jaws (50th Anniversary Edition)");
        assert_eq!(n.title, "Jaws");
        assert_eq!(n.tags, vec![Tag::new(TagKind::Anniversary, "50th Anniversary Edition")]);
    }

    #[test]
    fn test_nt_live_prefix() {
        let n = normalize_title("NT Live: Hamlet");
        assert_eq!(n.title, "Hamlet");
        assert_eq!(n.tags, vec![Tag::new(TagKind::Format, "NT Live")]);
    }

    #[test]
    fn test_clean_title_is_noop() {
        let n = normalize_title("The Thing");
        assert_eq!(n.title, "The Thing");
        assert!(n.tags.is_empty());

        let once = normalize_title("Spirited Away (Dubbed) (25th Anniversary)");
        let twice = normalize_title(&once.title);
        assert_eq!(twice.title, once.title);
        assert!(twice.tags.is_empty());
    }

    #[test]
    fn test_multiple_markers_are_all_peeled() {
        let n = normalize_title("Spirited Away (Dubbed) (25th Anniversary)");
        assert_eq!(n.title, "Spirited Away");
        assert_eq!(
            n.tags,
            vec![
                Tag::new(TagKind::Anniversary, "25th Anniversary"),
                Tag::new(TagKind::Language, "Dubbed"),
            ]
        );
    }

    #[test]
    fn test_rules_without_capture_strip_parentheses() {
        let n = normalize_title("Apocalypse Now (Uncut)");
        assert_eq!(n.title, "Apocalypse Now");
        assert_eq!(n.tags, vec![Tag::new(TagKind::Version, "Uncut")]);

        let n = normalize_title("Alien (Double Bill with Aliens)");
        assert_eq!(n.title, "Alien");
        assert_eq!(n.tags, vec![Tag::new(TagKind::Collection, "Double Bill with Aliens")]);
    }

    #[test]
    fn test_catch_all_anniversary() {
        let n = normalize_title("Grease (Anniversary Screening)");
        assert_eq!(n.title, "Grease");
        assert_eq!(n.tags, vec![Tag::new(TagKind::Anniversary, "Anniversary Screening")]);
    }

    #[test]
    fn test_rules_are_case_insensitive() {
        let n = normalize_title("Akira (4k re-release)");
        assert_eq!(n.title, "Akira");
        assert_eq!(n.tags, vec![Tag::new(TagKind::Remaster, "4k re-release")]);

        let n = normalize_title("Paris, Texas (re-issue)");
        assert_eq!(n.tags[0].kind, TagKind::Rerelease);
    }

    #[test]
    fn test_unrelated_parenthetical_is_kept() {
        let n = normalize_title("Mission: Impossible (2025)");
        assert_eq!(n.title, "Mission: Impossible (2025)");
        assert!(n.tags.is_empty());
    }

    #[test]
    fn test_entities_are_decoded() {
        let n = normalize_title("Wallace &amp; Gromit (Re-Issue)");
        assert_eq!(n.title, "Wallace & Gromit");
        assert_eq!(n.tags, vec![Tag::new(TagKind::Rerelease, "Re-Issue")]);

        assert_eq!(decode_entities("F1 &#174;"), "F1 ®");
    }

    #[test]
    fn test_repeated_marker_is_removed_in_one_pass() {
        let n = normalize_title("Spirited Away (Dubbed) (Subbed)");
        assert_eq!(n.title, "Spirited Away");
        assert_eq!(n.tags, vec![Tag::new(TagKind::Language, "Dubbed")]);

        let again = normalize_title(&n.title);
        assert_eq!(again.title, n.title);
        assert!(again.tags.is_empty());
    }

    #[test]
    fn test_entity_decoding_keeps_angle_brackets() {
        let n = normalize_title("Rock &amp; Roll <Live> Special");
        assert_eq!(n.title, "Rock & Roll <Live> Special");
        assert_eq!(decode_entities("A &lt;B&gt; <C>"), "A <B> <C>");
    }

    #[test]
    fn test_whitespace_collapsed() {
        let n = normalize_title("  The   Shining  (Uncut)  ");
        assert_eq!(n.title, "The Shining");
    }

    #[test]
    fn test_tag_serializes_with_type_field() {
        let json = serde_json::to_string(&Tag::new(TagKind::Format, "NT Live")).unwrap();
        assert_eq!(json, r#"{"type":"format","text":"NT Live"}"#);
    }
}
