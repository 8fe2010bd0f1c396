use anyhow::{bail, Context, Result};
use cinema_times::config::{load_config, Config};
use cinema_times::guide::GuideScraper;
use cinema_times::omdb::{enrich_showings, EnrichOptions, OmdbClient};
use cinema_times::store::Listing;
use cinema_times::{generate_rss, ScrapeError, ShowtimeScraper};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cinema-times")]
#[command(about = "Weekly cinema showtimes: scrape, clean, score and publish", long_about = None)]
struct Cli {
    /// Config file (default: ./cinema-times.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the week's listings and save them as JSON
    Scrape {
        /// Listings page URL (overrides config)
        url: Option<String>,
        /// Cinema name written into every showing (overrides config)
        name: Option<String>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Re-run title normalization over a saved listing
    Clean {
        input: Option<PathBuf>,
    },
    /// Look up ratings for every unique title in a saved listing
    Scores {
        input: Option<PathBuf>,
        /// Refresh titles that already have a score
        #[arg(long)]
        force: bool,
        /// Only process the first N titles
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Write an RSS feed from a saved listing
    Feed {
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Scrape { url, name, output } => scrape(&config, url, name, output).await,
        Commands::Clean { input } => clean(&config, input),
        Commands::Scores {
            input,
            force,
            limit,
        } => scores(&config, input, force, limit).await,
        Commands::Feed { input, output } => feed(&config, input, output),
    }
}

async fn scrape(
    config: &Config,
    url: Option<String>,
    name: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let url = url.unwrap_or_else(|| config.cinema.url.clone());
    let name = name.unwrap_or_else(|| config.cinema.name.clone());
    let output = output.unwrap_or_else(|| config.output.json_path.clone());

    // Client with cookie store so session cookies survive between day probes
    let client = reqwest::Client::builder().cookie_store(true).build()?;

    let scraper = GuideScraper::new(url.clone(), name)
        .with_timeouts(config.cinema.request_timeout(), config.cinema.day_timeout());

    info!("Scraping {} from {}", scraper.cinema_name(), url);
    scraper.warm_up(&client).await?;
    let showings = scraper.fetch_showings(&client).await?;
    if showings.is_empty() {
        return Err(ScrapeError::NoShowings(url).into());
    }

    Listing::new(scraper.cinema_name(), showings).save(&output)?;
    Ok(())
}

fn clean(config: &Config, input: Option<PathBuf>) -> Result<()> {
    let path = input.unwrap_or_else(|| config.output.json_path.clone());
    let mut listing = Listing::load(&path)?;
    let report = listing.renormalize_titles();

    if !report.changes.is_empty() {
        println!(
            "Cleaned {} unique titles affecting {} showings:\n",
            report.changes.len(),
            report.updated_showings
        );
        for (original, change) in &report.changes {
            println!("'{}'", original);
            println!("  -> '{}'", change.clean_title);
            if !change.tags.is_empty() {
                let tags: Vec<String> = change
                    .tags
                    .iter()
                    .map(|t| format!("{}: {}", t.kind, t.text))
                    .collect();
                println!("  -> Tags: {}", tags.join(", "));
            }
            println!("  -> {} showings affected\n", change.count);
        }
    }

    listing.save(&path)?;
    println!("Updated {} showings", report.updated_showings);
    println!("{} unique clean titles", report.unique_titles);
    println!("{} showings with tags", report.tagged_showings);
    Ok(())
}

async fn scores(
    config: &Config,
    input: Option<PathBuf>,
    force: bool,
    limit: Option<usize>,
) -> Result<()> {
    let Some(api_key) = config.ratings.api_key() else {
        bail!("no OMDb API key: set ratings.api_key or OMDB_API_KEY");
    };
    let path = input.unwrap_or_else(|| config.output.json_path.clone());
    let mut listing = Listing::load(&path)?;

    let client = reqwest::Client::builder().build()?;
    let omdb = OmdbClient::new(client, api_key).with_base_url(config.ratings.base_url.clone());
    let options = EnrichOptions {
        force_refresh: force,
        limit,
        delay: config.ratings.delay(),
    };

    let report = enrich_showings(&omdb, &mut listing.showings, &options).await;
    listing.save(&path)?;

    println!(
        "Scored {} of {} titles ({} looked up, {} already scored)",
        report.scored, report.titles, report.looked_up, report.skipped
    );
    println!("Updated {} showings", report.updated_showings);
    Ok(())
}

fn feed(config: &Config, input: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let path = input.unwrap_or_else(|| config.output.json_path.clone());
    let output = output.unwrap_or_else(|| config.output.feed_path.clone());
    let listing = Listing::load(&path)?;

    let rss = generate_rss(
        &listing.showings,
        &format!("{} showtimes", listing.cinema),
        &config.cinema.url,
        &format!("This week's showings at {}", listing.cinema),
    )?;
    std::fs::write(&output, rss).map_err(|e| ScrapeError::io(&output, e))?;
    info!("Wrote {} items to {}", listing.showings.len(), output.display());
    Ok(())
}
