//! Picks a film title out of a classified container.
//!
//! Strategies run in a fixed order and the first one that yields a usable title wins.
//! Compare [`crate::tags::normalize_title`], which applies every rule instead.

use crate::classifier::{spaced_text, LEADING_TIME};
use crate::error::TitleError;
use crate::tags::collapse_whitespace;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

/// Placeholder title for a container no strategy could name.
pub const UNKNOWN_TITLE: &str = "Unknown Movie";

/// Marketing and navigation phrases that mean a container is not a film.
const DISQUALIFYING_PHRASES: [&str; 12] = [
    "stay in touch",
    "contact us",
    "newsletter",
    "subscribe",
    "follow us",
    "social media",
    "coming soon",
    "book now",
    "buy tickets",
    "gift cards",
    "membership",
    "accessibility",
];

static HEADING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, strong, b").expect("Invalid heading selector")
});

static INLINE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span, div, p").expect("Invalid inline selector"));

/// `12 30`, `7:45`-style fragments that are numbers, not names.
static BARE_NUMBERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[\s:]+\d+").expect("Invalid bare number pattern"));

/// Leading-text patterns, most to least strict. Group 1 is the text before the first time.
static LEADING_TEXT: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        r"^([A-Z][^0-9]+?)\s*\d{1,2}[:.]?\d{2}",
        r"^([^0-9]{4,}?)\s*\d{1,2}[:.]?\d{2}",
        r"^(.*?)\s*\d{1,2}[:.]?\d{2}",
    ]
    .map(|pattern| Regex::new(pattern).expect("Invalid leading text pattern"))
});

/// Which strategy produced a title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStrategy {
    Heading,
    Attribute,
    FilmClassChild,
    LeadingText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTitle {
    pub text: String,
    pub strategy: TitleStrategy,
}

impl ExtractedTitle {
    fn new(text: impl Into<String>, strategy: TitleStrategy) -> Self {
        Self {
            text: text.into(),
            strategy,
        }
    }
}

/// Longer than three characters and not opening with a time.
fn is_usable(candidate: &str) -> bool {
    candidate.chars().count() > 3 && !LEADING_TIME.is_match(candidate)
}

fn from_headings(container: ElementRef<'_>) -> Option<String> {
    container
        .select(&HEADING_SELECTOR)
        .map(spaced_text)
        .find(|text| is_usable(text))
}

fn from_attributes(container: ElementRef<'_>) -> Option<String> {
    ["data-title", "title"]
        .into_iter()
        .filter_map(|name| container.value().attr(name))
        .map(str::trim)
        .find(|text| is_usable(text))
        .map(str::to_string)
}

fn from_film_class_child(container: ElementRef<'_>) -> Option<String> {
    let el = container.value();
    let hints = el
        .classes()
        .chain(el.id())
        .any(|token| {
            let token = token.to_lowercase();
            token.contains("film") || token.contains("movie")
        });
    if !hints {
        return None;
    }
    container
        .select(&INLINE_SELECTOR)
        .filter(|child| child.id() != container.id())
        .map(spaced_text)
        .find(|text| is_usable(text) && !BARE_NUMBERS.is_match(text))
}

fn from_leading_text(container: ElementRef<'_>) -> Option<String> {
    let full_text = collapse_whitespace(&spaced_text(container));
    LEADING_TEXT.iter().find_map(|pattern| {
        let caps = pattern.captures(&full_text)?;
        let candidate = caps.get(1)?.as_str().trim();
        (candidate.chars().count() > 3).then(|| candidate.to_string())
    })
}

/// Runs the strategy chain over `container`; the first usable title wins.
pub fn extract_title(container: ElementRef<'_>) -> Result<ExtractedTitle, TitleError> {
    if let Some(text) = from_headings(container) {
        return Ok(ExtractedTitle::new(text, TitleStrategy::Heading));
    }
    if let Some(text) = from_attributes(container) {
        return Ok(ExtractedTitle::new(text, TitleStrategy::Attribute));
    }
    if let Some(text) = from_film_class_child(container) {
        return Ok(ExtractedTitle::new(text, TitleStrategy::FilmClassChild));
    }
    if let Some(text) = from_leading_text(container) {
        return Ok(ExtractedTitle::new(text, TitleStrategy::LeadingText));
    }
    Err(TitleError::NoTitle)
}

/// Strips `|` separators and collapses whitespace.
pub fn clean_title(raw: &str) -> String {
    collapse_whitespace(&raw.replace('|', ""))
}

/// Whether a cleaned title is site furniture rather than a film.
pub fn is_disqualified(title: &str) -> bool {
    let lower = title.to_lowercase();
    DISQUALIFYING_PHRASES
        .iter()
        .any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn title_of(html: &str) -> Result<ExtractedTitle, TitleError> {
        let doc = Html::parse_fragment(html);
        let sel = Selector::parse("#c").unwrap();
        let container = doc.select(&sel).next().unwrap();
        extract_title(container)
    }

    #[test]
    fn test_heading_wins() {
        let t = title_of(r#"<div id="c" data-title="Attr Title"><h3>Jaws</h3> 19:00</div>"#).unwrap();
        assert_eq!(t, ExtractedTitle::new("Jaws", TitleStrategy::Heading));
    }

    #[test]
    fn test_heading_skips_times_and_short_text() {
        let t = title_of(r#"<div id="c"><b>PG</b><strong>19:00</strong><h4>Alien</h4></div>"#).unwrap();
        assert_eq!(t.text, "Alien");
    }

    #[test]
    fn test_attribute_fallback() {
        let t = title_of(r#"<div id="c" data-title="The Thing"><span>21:00</span></div>"#).unwrap();
        assert_eq!(t, ExtractedTitle::new("The Thing", TitleStrategy::Attribute));

        let t = title_of(r#"<div id="c" title="Heat"><span>21:00</span></div>"#).unwrap();
        assert_eq!(t, ExtractedTitle::new("Heat", TitleStrategy::Attribute));
    }

    #[test]
    fn test_film_class_child() {
        let t = title_of(
            r#"<div id="c" class="film-item"><span>12 30</span><p>Paris, Texas</p><span>21:00</span></div>"#,
        )
        .unwrap();
        assert_eq!(t, ExtractedTitle::new("Paris, Texas", TitleStrategy::FilmClassChild));
    }

    #[test]
    fn test_leading_text_before_first_time() {
        let t = title_of(r#"<div id="c">Mulholland Drive 14:00 20:15</div>"#).unwrap();
        assert_eq!(t, ExtractedTitle::new("Mulholland Drive", TitleStrategy::LeadingText));

        let t = title_of(r#"<div id="c">eraserhead 14:00</div>"#).unwrap();
        assert_eq!(t.text, "eraserhead");
    }

    #[test]
    fn test_no_title() {
        assert_eq!(title_of(r#"<div id="c">14:00 20:15</div>"#), Err(TitleError::NoTitle));
        assert_eq!(title_of(r#"<div id="c">Up 14:00</div>"#), Err(TitleError::NoTitle));
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("  Jaws |  Book\n now "), "Jaws Book now");
        assert_eq!(clean_title("Alien|"), "Alien");
        assert_eq!(clean_title("Vertigo|12A"), "Vertigo12A");
    }

    #[test]
    fn test_disqualified_phrases() {
        assert!(is_disqualified("Sign up to our Newsletter"));
        assert!(is_disqualified("Gift Cards"));
        assert!(!is_disqualified("Jaws"));
    }
}
