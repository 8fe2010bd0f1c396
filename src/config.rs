use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "cinema-times.toml";

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cinema: CinemaConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub ratings: RatingsConfig,
}

/// Which listings page to scrape
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CinemaConfig {
    #[serde(default = "default_cinema_url")]
    pub url: String,
    #[serde(default = "default_cinema_name")]
    pub name: String,
    /// Timeout for the base listings page
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for each per-day probe
    #[serde(default = "default_day_timeout")]
    pub day_timeout_secs: u64,
}

impl Default for CinemaConfig {
    fn default() -> Self {
        Self {
            url: default_cinema_url(),
            name: default_cinema_name(),
            request_timeout_secs: default_request_timeout(),
            day_timeout_secs: default_day_timeout(),
        }
    }
}

impl CinemaConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn day_timeout(&self) -> Duration {
        Duration::from_secs(self.day_timeout_secs)
    }
}

fn default_cinema_url() -> String {
    "https://sheffield.thelight.co.uk/cinema/guide".to_string()
}

fn default_cinema_name() -> String {
    "The Light Cinema Sheffield".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_day_timeout() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_json_path")]
    pub json_path: PathBuf,
    #[serde(default = "default_feed_path")]
    pub feed_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: default_json_path(),
            feed_path: default_feed_path(),
        }
    }
}

fn default_json_path() -> PathBuf {
    PathBuf::from(crate::store::DEFAULT_JSON_PATH)
}

fn default_feed_path() -> PathBuf {
    PathBuf::from("cinema-times.xml")
}

/// OMDb lookup settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RatingsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ratings_url")]
    pub base_url: String,
    /// Pause between two lookups (default: 1000)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_ratings_url(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RatingsConfig {
    /// The configured key, or `OMDB_API_KEY` from the environment.
    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OMDB_API_KEY").ok().filter(|k| !k.is_empty()))
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

fn default_ratings_url() -> String {
    crate::omdb::DEFAULT_BASE_URL.to_string()
}

fn default_delay_ms() -> u64 {
    1000
}

/// Load configuration with `CINEMA_TIMES_` environment overrides
///
/// An explicit path must exist. Without one, `cinema-times.toml` is read if present.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::new();
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.display().to_string()));
            }
            figment = figment.merge(Toml::file(path));
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                figment = figment.merge(Toml::file(default));
            }
        }
    }

    let config: Config = figment
        .merge(Env::prefixed("CINEMA_TIMES_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = config.cinema.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Invalid(format!(
            "cinema.url must be an http(s) URL, got {:?}",
            config.cinema.url
        )));
    }
    if config.cinema.request_timeout_secs == 0 || config.cinema.day_timeout_secs == 0 {
        return Err(ConfigError::Invalid("timeouts cannot be 0".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.cinema.url, "https://sheffield.thelight.co.uk/cinema/guide");
        assert_eq!(config.cinema.request_timeout_secs, 10);
        assert_eq!(config.cinema.day_timeout_secs, 5);
        assert_eq!(config.output.json_path, PathBuf::from("cinema-times.json"));
        assert_eq!(config.ratings.delay_ms, 1000);
    }

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[cinema]
url = "https://example.com/guide"
name = "Example Picturehouse"

[ratings]
delay_ms = 250
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.cinema.name, "Example Picturehouse");
        assert_eq!(config.ratings.delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_config_from_str_bad_type() {
        let result = load_config_from_str("[cinema]\nrequest_timeout_secs = \"ten\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Some(Path::new("/nonexistent/cinema-times.toml")));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[cinema]
url = "https://example.com/cinema/guide"
day_timeout_secs = 3

[output]
json_path = "out/listing.json"
"#
        )
        .unwrap();

        let config = load_config(Some(temp_file.path())).unwrap();
        assert_eq!(config.cinema.url, "https://example.com/cinema/guide");
        assert_eq!(config.cinema.day_timeout_secs, 3);
        assert_eq!(config.output.json_path, PathBuf::from("out/listing.json"));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = Config::default();
        config.cinema.url = "ftp://example.com".to_string();
        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.cinema.day_timeout_secs = 0;
        assert!(matches!(validate_config(&config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_configured_api_key_wins() {
        let ratings = RatingsConfig {
            api_key: Some("abc123".to_string()),
            ..Default::default()
        };
        assert_eq!(ratings.api_key().as_deref(), Some("abc123"));
    }
}
