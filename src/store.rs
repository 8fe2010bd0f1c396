//! The JSON listings file shared by the `scrape`, `clean`, `scores` and `feed` commands.

use crate::error::ScrapeError;
use crate::tags::{normalize_title, Tag};
use crate::Showing;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::info;

pub const DEFAULT_JSON_PATH: &str = "cinema-times.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub last_updated: DateTime<Utc>,
    pub cinema: String,
    pub showings: Vec<Showing>,
}

/// One title rewritten by [`Listing::renormalize_titles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleChange {
    pub clean_title: String,
    pub tags: Vec<Tag>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Keyed by the title as it was stored.
    pub changes: BTreeMap<String, TitleChange>,
    pub updated_showings: usize,
    pub unique_titles: usize,
    pub tagged_showings: usize,
}

impl Listing {
    pub fn new(cinema: impl Into<String>, showings: Vec<Showing>) -> Self {
        Self {
            last_updated: Utc::now(),
            cinema: cinema.into(),
            showings,
        }
    }

    pub fn load(path: &Path) -> Result<Self, ScrapeError> {
        let data = fs::read_to_string(path).map_err(|e| ScrapeError::io(path, e))?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ScrapeError> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).map_err(|e| ScrapeError::io(path, e))?;
        info!("Saved {} showings to {}", self.showings.len(), path.display());
        Ok(())
    }

    /// Runs title normalization again over a stored listing.
    ///
    /// Only showings whose title actually changes are touched; new tags are appended
    /// to any already recorded.
    pub fn renormalize_titles(&mut self) -> CleanReport {
        let mut report = CleanReport::default();

        for showing in &mut self.showings {
            if showing.title.is_empty() {
                continue;
            }
            let normalized = normalize_title(&showing.title);
            if normalized.title == showing.title {
                continue;
            }
            report
                .changes
                .entry(showing.title.clone())
                .or_insert_with(|| TitleChange {
                    clean_title: normalized.title.clone(),
                    tags: normalized.tags.clone(),
                    count: 0,
                })
                .count += 1;
            showing.title = normalized.title;
            showing.tags.extend(normalized.tags);
            report.updated_showings += 1;
        }

        report.unique_titles = self
            .showings
            .iter()
            .map(|s| s.title.as_str())
            .collect::<HashSet<_>>()
            .len();
        report.tagged_showings = self.showings.iter().filter(|s| !s.tags.is_empty()).count();
        report
    }
}
