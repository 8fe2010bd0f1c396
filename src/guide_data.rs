//! Flattens the embedded weekly guide (films -> dates -> sessions) into showings.

use crate::title::UNKNOWN_TITLE;
use crate::{ShowDate, Showing, Source};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info, warn};

/// One film of the guide literal.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuideFilm {
    #[serde(default, deserialize_with = "string_or_number")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub cert: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub runtime: String,
    #[serde(default)]
    pub dates: Vec<GuideDate>,
}

/// A day in the guide: `Key` is `YYYYMMDD`, `Display` is the site's own label.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuideDate {
    #[serde(default, deserialize_with = "string_or_number")]
    pub key: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub sessions: Vec<GuideSession>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GuideSession {
    #[serde(default, deserialize_with = "string_or_number")]
    pub display: String,
    #[serde(default)]
    pub css_class: String,
    #[serde(default)]
    pub format: String,
}

impl GuideSession {
    /// Sold-out and unavailable sessions are dropped, not flagged.
    pub fn is_unavailable(&self) -> bool {
        let class = self.css_class.to_lowercase();
        class.contains("unavailable") || class.contains("soldout")
    }
}

/// The guide mixes strings and bare numbers for certificates, runtimes and keys.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// One showing per available (film, date, session) triple.
///
/// The guide never repeats a session for the same film and day, so no dedup pass is
/// made here.
pub fn map_guide_films(films: &[GuideFilm], cinema: &str) -> Vec<Showing> {
    let mut showings = Vec::new();
    let mut dropped = 0usize;

    for film in films {
        let title = match film.title.trim() {
            "" => UNKNOWN_TITLE,
            t => t,
        };
        for day in &film.dates {
            let date = ShowDate::from_key(&day.key);
            if date.day().is_none() {
                warn!("unresolved date key {:?} for {}", day.key, title);
            }
            for session in &day.sessions {
                if session.is_unavailable() {
                    debug!("dropping {} session at {} ({})", title, session.display, session.css_class);
                    dropped += 1;
                    continue;
                }
                let mut showing = Showing::new(title, session.display.trim(), date.clone(), Source::Structured);
                showing.date_display = day.display.clone();
                showing.cinema = cinema.to_string();
                showing.cert = film.cert.clone();
                showing.runtime = film.runtime.clone();
                showing.format = session.format.clone();
                showing.availability = session.css_class.clone();
                showings.push(showing);
            }
        }
    }

    info!(
        "Parsed {} showings from guide data ({} unavailable sessions dropped)",
        showings.len(),
        dropped
    );
    showings
}
