//! Rating lookups through the OMDb API (http://www.omdbapi.com/).
//!
//! One lookup is made per unique title, with a fixed delay between calls to stay
//! inside the free tier's limits.

use crate::error::RatingError;
use crate::score::{aggregate, RawRatings, Ratings};
use crate::tags::decode_entities;
use crate::Showing;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_URL: &str = "http://www.omdbapi.com/";

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)").expect("Invalid parenthetical pattern"));

/// What the lookup service reported for one title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupResult {
    pub raw: RawRatings,
    /// Title as matched by the service.
    pub matched_title: String,
    pub year: String,
}

/// Source of raw ratings for a film title.
#[async_trait::async_trait]
pub trait RatingLookup {
    async fn lookup(&self, title: &str) -> Result<LookupResult, RatingError>;
}

#[derive(Debug, Deserialize)]
struct OmdbRating {
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Error", default)]
    error: Option<String>,
    #[serde(rename = "Title", default)]
    title: String,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "imdbRating", default)]
    imdb_rating: Option<String>,
    #[serde(rename = "Ratings", default)]
    ratings: Vec<OmdbRating>,
}

impl OmdbResponse {
    fn into_result(self, searched: &str) -> Result<LookupResult, RatingError> {
        if self.response != "True" {
            let reason = self.error.unwrap_or_else(|| searched.to_string());
            return Err(RatingError::NotFound(reason));
        }
        let mut raw = RawRatings::default();
        for rating in self.ratings {
            if rating.source.contains("Rotten Tomatoes") && rating.value.contains('%') {
                raw.rotten_tomatoes = Some(rating.value);
            } else if rating.source.contains("Metacritic") && rating.value.contains("/100") {
                raw.metacritic = Some(rating.value);
            }
        }
        raw.imdb = self
            .imdb_rating
            .filter(|r| !r.is_empty() && r != "N/A");
        Ok(LookupResult {
            raw,
            matched_title: self.title,
            year: self.year,
        })
    }
}

/// Title as it should be searched: no parentheticals, event prefixes or trademark marks.
pub fn search_title(title: &str) -> String {
    let decoded = decode_entities(title);
    let stripped = PARENTHETICAL.replace_all(&decoded, "");
    let stripped = stripped.strip_prefix("NT Live: ").unwrap_or(&stripped);
    stripped
        .replace(['®', '™'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct OmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OmdbClient {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait::async_trait]
impl RatingLookup for OmdbClient {
    async fn lookup(&self, title: &str) -> Result<LookupResult, RatingError> {
        let query = search_title(title);
        debug!("Searching OMDb for: '{}'", query);

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("t", query.as_str()),
                ("type", "movie"),
            ])
            .timeout(Duration::from_secs(10))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RatingError::Status(resp.status().as_u16()));
        }
        let body: OmdbResponse = resp.json().await?;
        body.into_result(&query)
    }
}

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Look titles up again even when they already carry a score.
    pub force_refresh: bool,
    /// Only process the first `n` titles (alphabetical).
    pub limit: Option<usize>,
    /// Minimum pause between two lookups.
    pub delay: Duration,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            force_refresh: false,
            limit: None,
            delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub titles: usize,
    pub looked_up: usize,
    pub skipped: usize,
    pub scored: usize,
    pub updated_showings: usize,
}

/// Looks up every unique title once and writes the aggregated ratings onto each showing.
///
/// A failed lookup still records unscored ratings so the title is not retried on the
/// next run.
pub async fn enrich_showings<L>(
    lookup: &L,
    showings: &mut [Showing],
    options: &EnrichOptions,
) -> EnrichReport
where
    L: RatingLookup + Sync + ?Sized,
{
    let mut titles: Vec<String> = showings
        .iter()
        .map(|s| s.title.clone())
        .filter(|t| !t.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if let Some(limit) = options.limit {
        info!("Limited to first {} titles", limit);
        titles.truncate(limit);
    }

    let mut report = EnrichReport {
        titles: titles.len(),
        ..Default::default()
    };
    let mut results: BTreeMap<String, Ratings> = BTreeMap::new();

    for (i, title) in titles.iter().enumerate() {
        info!("[{}/{}] Processing: {}", i + 1, titles.len(), title);
        let already_scored = showings.iter().any(|s| {
            &s.title == title && s.ratings.as_ref().is_some_and(Ratings::is_scored)
        });
        if already_scored && !options.force_refresh {
            debug!("{} already has a score, skipping", title);
            report.skipped += 1;
            continue;
        }

        if report.looked_up > 0 && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
        report.looked_up += 1;

        let ratings = match lookup.lookup(title).await {
            Ok(found) => {
                let ratings = aggregate(&found.raw);
                if ratings.is_scored() {
                    let sources: Vec<String> =
                        ratings.available_sources.iter().map(|s| s.to_string()).collect();
                    info!(
                        "Found '{}' ({}) - {} (composite {})",
                        found.matched_title,
                        found.year,
                        sources.join(", "),
                        ratings.composite_score
                    );
                    report.scored += 1;
                } else {
                    warn!("Found '{}' but no usable scores", found.matched_title);
                }
                ratings
            }
            Err(e) if e.is_retryable() => {
                warn!("Lookup failed for {}: {}", title, e);
                Ratings::unscored()
            }
            Err(e) => {
                info!("No scores for {}: {}", title, e);
                Ratings::unscored()
            }
        };
        results.insert(title.clone(), ratings);
    }

    for showing in showings.iter_mut() {
        if let Some(ratings) = results.get(&showing.title) {
            showing.ratings = Some(ratings.clone());
            report.updated_showings += 1;
        }
    }
    report
}
