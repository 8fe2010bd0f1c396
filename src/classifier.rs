//! Finds markup nodes that look like "one film with its showtimes".
//!
//! Precision is not the goal here. Nested containers that both qualify are both
//! returned; the identity key collapses the resulting duplicates later.

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

/// Containers are block elements only.
static CONTAINER_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div, article, section").expect("Invalid container selector")
});

/// Elements that may carry a film title inside a container.
static TITLE_CANDIDATE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, strong, b, span").expect("Invalid title candidate selector")
});

/// A time-like run anywhere in a string: `7:30`, `19.00`, `1930`.
pub(crate) static TIME_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}[:.]?\d{2}").expect("Invalid time pattern"));

/// A string that opens with a time.
pub(crate) static LEADING_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[:.]?\d{2}").expect("Invalid leading time pattern"));

/// Labels that decorate listings but are never titles.
const TITLE_STOPWORDS: [&str; 4] = ["captioned", "rewind", "explore", "iconic"];

/// Minimum trimmed text length for a container.
const MIN_CONTAINER_TEXT: usize = 20;

/// All text under `el`, concatenated as-is.
pub fn flat_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

/// All text under `el`, each fragment trimmed and joined with single spaces.
pub fn spaced_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether any class token marks a pure session list (times with no title).
fn is_sessions_list(el: ElementRef<'_>) -> bool {
    el.value().classes().any(|c| c.contains("sessions"))
}

/// Text that could be a title: long enough, not a time, not a stopword.
fn is_plausible_title(text: &str) -> bool {
    text.chars().count() > 3
        && !LEADING_TIME.is_match(text)
        && !TITLE_STOPWORDS.contains(&text.to_lowercase().as_str())
}

fn has_title_child(el: ElementRef<'_>) -> bool {
    el.select(&TITLE_CANDIDATE_SELECTOR)
        .any(|child| is_plausible_title(&spaced_text(child)))
}

/// Whether `el` qualifies as a film container.
pub fn is_film_container(el: ElementRef<'_>) -> bool {
    let text = flat_text(el);
    TIME_LIKE.is_match(&text)
        && text.trim().chars().count() > MIN_CONTAINER_TEXT
        && !is_sessions_list(el)
        && has_title_child(el)
}

/// Every qualifying container under `root`, in document order.
pub fn find_film_containers<'a>(root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    root.select(&CONTAINER_SELECTOR)
        .filter(|el| is_film_container(*el))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn containers(html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        find_film_containers(doc.root_element())
            .into_iter()
            .map(|el| el.value().attr("id").unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn test_film_block_qualifies() {
        let ids = containers(
            r#"<div id="film"><h3>Jaws</h3><p>12A, 124 mins</p><span>12:30</span><span>19:00</span></div>"#,
        );
        assert_eq!(ids, vec!["film"]);
    }

    #[test]
    fn test_short_text_is_rejected() {
        let ids = containers(r#"<div id="x"><h3>Jaws</h3>19:00</div>"#);
        assert!(ids.is_empty());
    }

    #[test]
    fn test_no_time_is_rejected() {
        let ids = containers(
            r#"<div id="x"><h3>Sign up to our newsletter</h3><p>Hear about films first</p></div>"#,
        );
        assert!(ids.is_empty());
    }

    #[test]
    fn test_sessions_list_is_rejected() {
        let ids = containers(
            r#"<div id="s" class="film-sessions"><span>Tuesday screenings</span> 12:30 15:00 19:00</div>"#,
        );
        assert!(ids.is_empty());
    }

    #[test]
    fn test_stopword_and_time_children_are_not_titles() {
        let ids = containers(
            r#"<div id="x"><span>Captioned</span><b>19:00</b><span>ICONIC</span> 21:00 extra text</div>"#,
        );
        assert!(ids.is_empty());
    }

    #[test]
    fn test_nested_matches_are_all_returned() {
        let ids = containers(
            r#"<section id="outer"><div id="inner"><h2>The Shining</h2> 18:15 20:45</div></section>"#,
        );
        assert_eq!(ids, vec!["outer", "inner"]);
    }

    #[test]
    fn test_spaced_text_joins_fragments() {
        let doc = Html::parse_fragment("<div><h3> Jaws </h3>\n<span>19:00</span></div>");
        let div = doc
            .select(&Selector::parse("div").unwrap())
            .next()
            .unwrap();
        assert_eq!(spaced_text(div), "Jaws 19:00");
    }
}
