//! Weighted composite of critics, Metacritic and IMDb ratings.
//!
//! A source whose parsed value is zero counts as absent. A genuine zero rating is
//! therefore indistinguishable from missing data; this is inherited behaviour and is
//! kept as-is until there is a product decision to change it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// External rating source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RatingSource {
    #[serde(rename = "RT")]
    RottenTomatoes,
    #[serde(rename = "MC")]
    Metacritic,
    #[serde(rename = "IMDb")]
    Imdb,
}

impl RatingSource {
    pub fn weight(self) -> u32 {
        match self {
            Self::RottenTomatoes => 3,
            Self::Metacritic => 2,
            Self::Imdb => 1,
        }
    }
}

impl fmt::Display for RatingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RottenTomatoes => "RT",
            Self::Metacritic => "MC",
            Self::Imdb => "IMDb",
        };
        f.write_str(name)
    }
}

/// Raw rating strings as reported by the lookup service, e.g. `"85%"`, `"71/100"`, `"7.3"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRatings {
    pub rotten_tomatoes: Option<String>,
    pub metacritic: Option<String>,
    pub imdb: Option<String>,
}

/// Per-source scores on a 0-100 scale plus their weighted composite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratings {
    pub rt_score: u32,
    pub metacritic_score: u32,
    pub imdb_score: u32,
    pub composite_score: u32,
    pub available_sources: BTreeSet<RatingSource>,
}

impl Ratings {
    /// Ratings with no source present.
    pub fn unscored() -> Self {
        Self::default()
    }

    pub fn is_scored(&self) -> bool {
        !self.available_sources.is_empty()
    }
}

/// Upper bound of every per-source score.
const MAX_SCORE: u32 = 100;

/// `"85%"` -> 85. Values above 100 are clamped.
pub fn parse_percent(raw: &str) -> u32 {
    raw.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<u32>()
        .map(|v| v.min(MAX_SCORE))
        .unwrap_or(0)
}

/// `"71/100"` -> 71. A bare number is accepted too.
pub fn parse_points(raw: &str) -> u32 {
    raw.split('/')
        .next()
        .unwrap_or("")
        .trim()
        .parse::<u32>()
        .map(|v| v.min(MAX_SCORE))
        .unwrap_or(0)
}

/// `"7.3"` -> 73: the decimal scaled by ten and truncated.
///
/// Done on the digits rather than through a float so `x.y` always lands on `xy`.
pub fn parse_decimal_tenths(raw: &str) -> u32 {
    let raw = raw.trim();
    let (whole, frac) = raw.split_once('.').unwrap_or((raw, ""));
    let Ok(whole) = whole.parse::<u32>() else {
        return 0;
    };
    let tenth = match frac.chars().next() {
        None => 0,
        Some(c) => match c.to_digit(10) {
            Some(d) => d,
            None => return 0,
        },
    };
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return 0;
    }
    whole.saturating_mul(10).saturating_add(tenth).min(MAX_SCORE)
}

/// Combines whichever sources are present into one composite score.
///
/// Weights are fixed (critics 3, Metacritic 2, IMDb 1) and the composite is the
/// truncated weighted mean over present sources only. The result does not depend on
/// the order sources arrive in.
pub fn aggregate(raw: &RawRatings) -> Ratings {
    let rt_score = raw.rotten_tomatoes.as_deref().map(parse_percent).unwrap_or(0);
    let metacritic_score = raw.metacritic.as_deref().map(parse_points).unwrap_or(0);
    let imdb_score = raw.imdb.as_deref().map(parse_decimal_tenths).unwrap_or(0);

    let present: Vec<(RatingSource, u32)> = [
        (RatingSource::RottenTomatoes, rt_score),
        (RatingSource::Metacritic, metacritic_score),
        (RatingSource::Imdb, imdb_score),
    ]
    .into_iter()
    .filter(|(_, score)| *score > 0)
    .collect();

    let total_weight: u32 = present.iter().map(|(source, _)| source.weight()).sum();
    let composite_score = if total_weight == 0 {
        0
    } else {
        let weighted: u32 = present
            .iter()
            .map(|(source, score)| score.saturating_mul(source.weight()))
            .fold(0, u32::saturating_add);
        weighted / total_weight
    };

    Ratings {
        rt_score,
        metacritic_score,
        imdb_score,
        composite_score,
        available_sources: present.into_iter().map(|(source, _)| source).collect(),
    }
}
