//! Extraction pipeline: embedded guide literal first, heuristic markup second.
//!
//! The heuristic path is deliberately two-phase. [`candidate_showings`] over-generates
//! (nested containers, repeated times) and [`reduce`] collapses the result on the
//! showing identity key.

use crate::classifier::{find_film_containers, spaced_text};
use crate::error::{LiteralError, TitleError};
use crate::guide_data::{map_guide_films, GuideFilm};
use crate::literal::{decode_from_scripts, GUIDE_MARKERS};
use crate::tags::normalize_title;
use crate::title::{clean_title, extract_title, is_disqualified, UNKNOWN_TITLE};
use crate::{SeenKeys, ShowDate, Showing, Source};
use chrono::{Duration, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Session times inside a container's text.
static SESSION_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2}[:.]?\d{2})\b").expect("Invalid session time pattern"));

/// One day of the listings week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideDay {
    pub date: NaiveDate,
    /// e.g. `Wed 15 Jan`
    pub display: String,
    /// e.g. `wednesday`
    pub day_name: String,
}

impl GuideDay {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            display: date.format("%a %d %b").to_string(),
            day_name: date.format("%A").to_string().to_lowercase(),
        }
    }
}

/// `today` and the six days after it.
pub fn week_dates(today: NaiveDate) -> Vec<GuideDay> {
    (0..7).map(|i| GuideDay::new(today + Duration::days(i))).collect()
}

/// `1930` -> `19:30`. Other colon-less forms (`7.30`, `930`) are left as they are.
pub fn normalize_time_token(raw: &str) -> String {
    if !raw.contains(':') && raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        format!("{}:{}", &raw[..2], &raw[2..])
    } else {
        raw.to_string()
    }
}

/// Result of extracting one listings page.
#[derive(Debug, Clone)]
pub struct PageExtraction {
    pub showings: Vec<Showing>,
    pub source: Source,
}

/// Decodes the embedded guide literal and maps it to normalized showings.
pub fn extract_structured(doc: &Html, cinema: &str) -> Result<Vec<Showing>, LiteralError> {
    let films: Vec<GuideFilm> = decode_from_scripts(doc, &GUIDE_MARKERS)?;
    if films.is_empty() {
        return Err(LiteralError::NotFound);
    }
    info!("Successfully parsed guide data with {} films", films.len());

    let mut showings = map_guide_films(&films, cinema);
    for showing in &mut showings {
        showing.normalize_title();
    }
    Ok(showings)
}

/// Phase one: every (container, session time) pair as a showing, duplicates included.
///
/// Titles are cleaned, screened against the disqualifying phrases and normalized
/// here, so the identity key seen by [`reduce`] is built from the canonical title.
pub fn candidate_showings(root: ElementRef<'_>, day: &GuideDay, cinema: &str) -> Vec<Showing> {
    let containers = find_film_containers(root);
    debug!("Found {} film elements for {}", containers.len(), day.display);

    let mut candidates = Vec::new();
    for container in containers {
        let raw_title = match extract_title(container) {
            Ok(extracted) => extracted.text,
            Err(TitleError::NoTitle) => {
                let preview: String = spaced_text(container).chars().take(200).collect();
                debug!("no title for container: '{}...'", preview);
                UNKNOWN_TITLE.to_string()
            }
        };

        let title = clean_title(&raw_title);
        if title.chars().count() <= 2 || is_disqualified(&title) {
            debug!("skipping non-film container titled '{}'", title);
            continue;
        }
        let normalized = normalize_title(&title);

        let full_text = spaced_text(container);
        for caps in SESSION_TIME.captures_iter(&full_text) {
            let mut showing = Showing::new(
                normalized.title.clone(),
                normalize_time_token(&caps[1]),
                ShowDate::Day(day.date),
                Source::Heuristic,
            );
            showing.tags = normalized.tags.clone();
            showing.date_display = day.display.clone();
            showing.cinema = cinema.to_string();
            candidates.push(showing);
        }
    }
    candidates
}

/// Phase two: keeps the first showing for each identity key not already in `seen`.
pub fn reduce(candidates: Vec<Showing>, mut seen: SeenKeys) -> (Vec<Showing>, SeenKeys) {
    let total = candidates.len();
    let showings: Vec<Showing> = candidates
        .into_iter()
        .filter(|showing| seen.insert(showing.key()))
        .collect();
    debug!("reduced {} candidates to {} showings", total, showings.len());
    (showings, seen)
}

/// Heuristic extraction of one day's page.
///
/// `seen` carries the keys already emitted in this run and is handed back updated.
pub fn scrape_day(
    root: ElementRef<'_>,
    day: &GuideDay,
    cinema: &str,
    seen: SeenKeys,
) -> (Vec<Showing>, SeenKeys) {
    let candidates = candidate_showings(root, day, cinema);
    let (showings, seen) = reduce(candidates, seen);
    info!("Extracted {} unique showings for {}", showings.len(), day.display);
    (showings, seen)
}

/// Titles the heuristic path can name on a page, placeholder excluded.
pub fn film_titles(root: ElementRef<'_>) -> HashSet<String> {
    find_film_containers(root)
        .into_iter()
        .filter_map(|container| extract_title(container).ok())
        .map(|extracted| clean_title(&extracted.text))
        .filter(|title| title != UNKNOWN_TITLE)
        .collect()
}

/// Extracts a single page: the guide literal when present, otherwise the markup for `day`.
pub fn extract_page(doc: &Html, day: &GuideDay, cinema: &str) -> PageExtraction {
    match extract_structured(doc, cinema) {
        Ok(showings) => PageExtraction {
            showings,
            source: Source::Structured,
        },
        Err(e) => {
            if e.marker_found() {
                warn!("guide data unusable ({}), falling back to HTML parsing", e);
            } else {
                info!("no guide data on page, falling back to HTML parsing");
            }
            let (showings, _) = scrape_day(doc.root_element(), day, cinema, SeenKeys::new());
            PageExtraction {
                showings,
                source: Source::Heuristic,
            }
        }
    }
}
