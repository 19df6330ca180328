use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const ALBUMART_FILE: &str = "albumart.jpg";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MqttConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 1883,
            username: None,
            password: None,
            topic: "media/gym".to_string(),
        }
    }
}

impl MqttConfig {
    pub fn is_configured(&self) -> bool {
        self.host.as_ref().is_some_and(|h| !h.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8099,
            static_dir: PathBuf::from("static"),
        }
    }
}

impl HttpConfig {
    pub fn albumart_path(&self) -> PathBuf {
        self.static_dir.join(ALBUMART_FILE)
    }
}

/// Tuning for candidate selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// Skip candidates whose artist neither contains nor is contained in the
    /// query artist.
    pub require_artist_match: bool,
    /// Search by album before title when the artist is unknown.
    pub prefer_album_when_no_artist: bool,
    pub min_title_ratio: f64,
    pub min_album_ratio: f64,
    pub max_results_per_query: usize,
    /// Edge length requested when upgrading catalog thumbnails.
    pub artwork_size: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            require_artist_match: false,
            prefer_album_when_no_artist: true,
            min_title_ratio: 0.55,
            min_album_ratio: 0.55,
            max_results_per_query: 5,
            artwork_size: 600,
        }
    }
}

impl Config {
    /// Overlays environment variables on top of the file configuration.
    /// `lookup` is `std::env::var(..).ok()` outside of tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MQTT_HOST") {
            self.mqtt.host = Some(v);
        }
        if let Some(v) = get("MQTT_PORT") {
            self.mqtt.port = parse_var("MQTT_PORT", &v)?;
        }
        if let Some(v) = get("MQTT_USERNAME") {
            self.mqtt.username = Some(v);
        }
        if let Some(v) = get("MQTT_PASSWORD") {
            self.mqtt.password = Some(v);
        }
        if let Some(v) = get("MQTT_TOPIC") {
            self.mqtt.topic = v;
        }

        if let Some(v) = get("HTTP_HOST") {
            self.http.host = v;
        }
        if let Some(v) = get("HTTP_PORT") {
            self.http.port = parse_var("HTTP_PORT", &v)?;
        }
        if let Some(v) = get("STATIC_DIR") {
            self.http.static_dir = PathBuf::from(v);
        }

        let m = &mut self.matching;
        if let Some(v) = get("REQUIRE_ARTIST_MATCH") {
            m.require_artist_match = parse_bool("REQUIRE_ARTIST_MATCH", &v)?;
        }
        if let Some(v) = get("PREFER_ALBUM_WHEN_NO_ARTIST") {
            m.prefer_album_when_no_artist = parse_bool("PREFER_ALBUM_WHEN_NO_ARTIST", &v)?;
        }
        if let Some(v) = get("MIN_TITLE_RATIO") {
            m.min_title_ratio = parse_var("MIN_TITLE_RATIO", &v)?;
        }
        if let Some(v) = get("MIN_ALBUM_RATIO") {
            m.min_album_ratio = parse_var("MIN_ALBUM_RATIO", &v)?;
        }
        if let Some(v) = get("MAX_RESULTS_PER_QUERY") {
            m.max_results_per_query = parse_var("MAX_RESULTS_PER_QUERY", &v)?;
        }
        if let Some(v) = get("ARTWORK_SIZE") {
            m.artwork_size = parse_var("ARTWORK_SIZE", &v)?;
        }

        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {name}: {value:?}"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("invalid value for {name}: {value:?} (expected true/false)"),
    }
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".config")
        .join("albumart-bridge")
        .join("config.toml")
}

/// Loads `KEY=VALUE` pairs from the file named by `ENV_FILE` (default
/// `.env`) without replacing variables already set. Returns the path used
/// when a file was found.
pub fn load_env_file() -> Option<PathBuf> {
    let path = PathBuf::from(std::env::var("ENV_FILE").unwrap_or_else(|_| ".env".to_string()));
    dotenvy::from_path(&path).ok().map(|_| path)
}

/// Reads the TOML file at `path` (missing file means defaults), then applies
/// environment overrides.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = read_config_file(path)?;
    config.apply_env(|name| std::env::var(name).ok())?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
}
