pub mod classifier;
pub mod config;
pub mod error;
pub mod feed;
pub mod guide;
pub mod guide_data;
pub mod literal;
pub mod omdb;
pub mod pipeline;
pub mod score;
pub mod store;
pub mod tags;
pub mod title;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub use error::{ConfigError, LiteralError, RatingError, ScrapeError, TitleError};
pub use feed::generate_rss;
pub use score::{RatingSource, Ratings, RawRatings};
pub use tags::{NormalizedTitle, Tag, TagKind};

/// Where a showing came from. Diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Decoded from the embedded guide literal.
    Structured,
    /// Inferred from free-form listing markup.
    Heuristic,
}

/// Calendar day of a showing.
///
/// A date key that cannot be read is kept as `Unresolved` rather than guessed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShowDate {
    Day(NaiveDate),
    Unresolved { unresolved: String },
}

impl ShowDate {
    /// Reads an 8-digit `YYYYMMDD` key. Anything else is unresolved.
    pub fn from_key(key: &str) -> Self {
        let key = key.trim();
        if key.len() == 8 && key.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(day) = NaiveDate::parse_from_str(key, "%Y%m%d") {
                return Self::Day(day);
            }
        }
        Self::Unresolved {
            unresolved: key.to_string(),
        }
    }

    pub fn day(&self) -> Option<NaiveDate> {
        match self {
            Self::Day(d) => Some(*d),
            Self::Unresolved { .. } => None,
        }
    }
}

impl From<NaiveDate> for ShowDate {
    fn from(day: NaiveDate) -> Self {
        Self::Day(day)
    }
}

impl fmt::Display for ShowDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Unresolved { unresolved } => write!(f, "unresolved ({})", unresolved),
        }
    }
}

/// One scheduled screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Showing {
    pub title: String,
    #[serde(rename = "title_tags", default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    pub time: String,
    pub date: ShowDate,
    #[serde(default)]
    pub date_display: String,
    #[serde(default)]
    pub cinema: String,
    #[serde(default)]
    pub cert: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub availability: String,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<Ratings>,
}

impl Showing {
    pub fn new(title: impl Into<String>, time: impl Into<String>, date: ShowDate, source: Source) -> Self {
        Self {
            title: title.into(),
            tags: Vec::new(),
            time: time.into(),
            date,
            date_display: String::new(),
            cinema: String::new(),
            cert: String::new(),
            runtime: String::new(),
            format: String::new(),
            availability: String::new(),
            source,
            ratings: None,
        }
    }

    /// Identity of this showing within one extraction run.
    pub fn key(&self) -> ShowingKey {
        ShowingKey {
            title: self.title.to_lowercase(),
            time: self.time.clone(),
            date: self.date.clone(),
        }
    }

    /// Replaces the title with its normalized form and records the split-out tags.
    pub fn normalize_title(&mut self) {
        let normalized = tags::normalize_title(&self.title);
        self.title = normalized.title;
        self.tags.extend(normalized.tags);
    }

    /// Start of the showing, when both the date and the time can be read.
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        let day = self.date.day()?;
        let time = parse_show_time(&self.time)?;
        Some(day.and_time(time))
    }
}

/// Reads `HH:MM`, `H.MM`, `HHMM` and 12-hour `H:MM PM` show times.
pub fn parse_show_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim().to_uppercase();
    if raw.ends_with("AM") || raw.ends_with("PM") {
        return NaiveTime::parse_from_str(&raw, "%I:%M %p").ok();
    }
    if raw.contains(':') {
        return NaiveTime::parse_from_str(&raw, "%H:%M").ok();
    }
    if raw.contains('.') {
        return NaiveTime::parse_from_str(&raw, "%H.%M").ok();
    }
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let hour: u32 = raw[..2].parse().ok()?;
        let minute: u32 = raw[2..].parse().ok()?;
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }
    None
}

/// `(lowercased title, time, date)`: no two showings of one run share it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShowingKey {
    pub title: String,
    pub time: String,
    pub date: ShowDate,
}

/// Keys already emitted during one page or day of extraction.
///
/// Passed into and handed back from each day-scoped call; there is no global set.
#[derive(Debug, Clone, Default)]
pub struct SeenKeys(HashSet<ShowingKey>);

impl SeenKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key`, returning `false` if it was already present.
    pub fn insert(&mut self, key: ShowingKey) -> bool {
        self.0.insert(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Trait implemented by every cinema listings source.
#[async_trait::async_trait]
pub trait ShowtimeScraper {
    /// Fetch and extract the showings currently listed.
    async fn fetch_showings(&self, client: &Client) -> Result<Vec<Showing>, ScrapeError>;

    /// Optional: warm-up request to get cookies/auth (default: no-op)
    async fn warm_up(&self, _client: &Client) -> Result<(), ScrapeError> {
        Ok(())
    }

    /// Display name written into every showing.
    fn cinema_name(&self) -> &str;
}
