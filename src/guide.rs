//! Scraper for a cinema "guide" listings page (The Light cinemas and sites built the same way).
//! Default: https://sheffield.thelight.co.uk/cinema/guide
//! The page normally embeds a week of programming in `__guideData`; without it only
//! today's markup is available, so other days are probed through date URLs.

use crate::pipeline::{extract_structured, film_titles, scrape_day, week_dates, GuideDay};
use crate::{ScrapeError, SeenKeys, ShowtimeScraper, Showing};
use chrono::{Local, NaiveDate};
use reqwest::{header, Client};
use scraper::Html;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/143.0.0.0 Safari/537.36";

/// What the base page gave us before any per-day probing.
enum BasePage {
    Structured(Vec<Showing>),
    Heuristic {
        showings: Vec<Showing>,
        seen: SeenKeys,
        titles: HashSet<String>,
    },
}

pub struct GuideScraper {
    url: String,
    name: String,
    timeout: Duration,
    day_timeout: Duration,
}

impl GuideScraper {
    pub fn new(url: String, name: String) -> Self {
        Self {
            url,
            name,
            timeout: Duration::from_secs(10),
            day_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeouts(mut self, timeout: Duration, day_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.day_timeout = day_timeout;
        self
    }

    /// Candidate URLs for another day's listing.
    fn day_urls(&self, day: &GuideDay) -> Vec<String> {
        let date = day.date.format("%Y-%m-%d");
        let base = self.url.trim_end_matches('/');
        vec![
            format!("{}?showdate={}", base, date),
            format!("{}?date={}", base, date),
            format!("{}/{}", base, date),
        ]
    }

    /// Fetches and extracts the listings with `today` as the first day of the week.
    pub async fn fetch_week(
        &self,
        client: &Client,
        today: NaiveDate,
    ) -> Result<Vec<Showing>, ScrapeError> {
        let body = fetch_page(client, &self.url, self.timeout).await?;
        let week = week_dates(today);

        let (mut all, mut seen, base_titles) = match read_base_page(&body, &week[0], &self.name) {
            BasePage::Structured(showings) => return Ok(showings),
            BasePage::Heuristic {
                showings,
                seen,
                titles,
            } => (showings, seen, titles),
        };

        for day in week.iter().skip(1) {
            let mut found = false;
            for url in self.day_urls(day) {
                let body = match fetch_page(client, &url, self.day_timeout).await {
                    Ok(b) => b,
                    Err(e) => {
                        debug!("Failed to fetch {}: {}", url, e);
                        continue;
                    }
                };
                let (day_showings, next_seen) =
                    read_day_page(&body, day, &base_titles, &self.name, seen);
                seen = next_seen;
                match day_showings {
                    Some(showings) => {
                        info!("Scraped {} showings for {} from {}", showings.len(), day.display, url);
                        all.extend(showings);
                        found = true;
                        break;
                    }
                    None => debug!("{} returned same films as the base page", url),
                }
            }
            if !found {
                info!("Could not find different content for {}", day.display);
            }
        }

        info!("Total showings scraped for the week: {}", all.len());
        Ok(all)
    }
}

#[async_trait::async_trait]
impl ShowtimeScraper for GuideScraper {
    async fn fetch_showings(&self, client: &Client) -> Result<Vec<Showing>, ScrapeError> {
        self.fetch_week(client, Local::now().date_naive()).await
    }

    fn cinema_name(&self) -> &str {
        &self.name
    }
}

async fn fetch_page(client: &Client, url: &str, timeout: Duration) -> Result<String, ScrapeError> {
    let resp = client
        .get(url)
        .header(header::USER_AGENT, USER_AGENT)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.text().await?)
}

fn read_base_page(body: &str, today: &GuideDay, cinema: &str) -> BasePage {
    let doc = Html::parse_document(body);
    match extract_structured(&doc, cinema) {
        Ok(showings) => return BasePage::Structured(showings),
        Err(e) if e.marker_found() => {
            warn!("guide data unusable ({}), falling back to HTML parsing", e);
        }
        Err(_) => info!("no guide data on page, falling back to HTML parsing"),
    }
    let (showings, seen) = scrape_day(doc.root_element(), today, cinema, SeenKeys::new());
    BasePage::Heuristic {
        showings,
        seen,
        titles: film_titles(doc.root_element()),
    }
}

/// Extracts `day` from a probed page, but only if it lists films the base page did not.
fn read_day_page(
    body: &str,
    day: &GuideDay,
    base_titles: &HashSet<String>,
    cinema: &str,
    seen: SeenKeys,
) -> (Option<Vec<Showing>>, SeenKeys) {
    let doc = Html::parse_document(body);
    let titles = film_titles(doc.root_element());
    let new_titles: Vec<&String> = titles.difference(base_titles).collect();
    if new_titles.is_empty() {
        return (None, seen);
    }
    debug!("{} new films for {}: {:?}", new_titles.len(), day.display, new_titles);
    let (showings, seen) = scrape_day(doc.root_element(), day, cinema, seen);
    (Some(showings), seen)
}
