use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::site::Site;
use crate::util::paths::config_path;

use super::default_keys::default_shortcuts;
use super::keys::{parse_key_notation, KeyChord, ShortcutConfig};

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Timing of the theater-mode click after activation
    pub theater: TheaterTiming,
    /// Where the injected stylesheets live
    pub styles: StylesheetConfig,
    /// Page-level toggle shortcuts
    pub shortcuts: ShortcutConfig,
}

/// Readiness polling for the YouTube player.
///
/// The player initialises asynchronously after the page script runs, so the
/// size button may not exist yet. The first check happens after
/// `initial_delay`; if the player is missing it is re-checked every
/// `retry_interval`, at most `max_retries` more times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TheaterTiming {
    pub initial_delay: Duration,
    pub retry_interval: Duration,
    pub max_retries: u32,
}

impl Default for TheaterTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            retry_interval: Duration::from_millis(250),
            max_retries: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesheetConfig {
    /// Extension origin, stylesheet paths are resolved against it
    pub base_url: String,
    pub youtube: String,
    pub twitter: String,
}

impl Default for StylesheetConfig {
    fn default() -> Self {
        Self {
            base_url: "chrome-extension://dissatisfied/".to_string(),
            youtube: "styles/youtube.css".to_string(),
            twitter: "styles/twitter.css".to_string(),
        }
    }
}

impl StylesheetConfig {
    /// Packaged path of a site's stylesheet
    pub fn path_for(&self, site: Site) -> &str {
        match site {
            Site::YouTube => &self.youtube,
            Site::Twitter => &self.twitter,
        }
    }

    /// Absolute URL used for the injected `<link>`
    pub fn href_for(&self, site: Site) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path_for(site).trim_start_matches('/')
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theater: TheaterTiming::default(),
            styles: StylesheetConfig::default(),
            shortcuts: default_shortcuts(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlTheaterConfig {
    pub initial_delay_ms: Option<u64>,
    pub retry_interval_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlStylesConfig {
    pub base_url: Option<String>,
    pub youtube: Option<String>,
    pub twitter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlShortcutsConfig {
    pub youtube: Option<Vec<String>>,
    pub twitter: Option<Vec<String>>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub theater: Option<TomlTheaterConfig>,
    pub styles: Option<TomlStylesConfig>,
    pub shortcuts: Option<TomlShortcutsConfig>,
}

/// Parse a list of chords, skipping (and logging) invalid entries
fn parse_chords(site: Site, keys: &[String]) -> Vec<KeyChord> {
    keys.iter()
        .filter_map(|key| match parse_key_notation(key) {
            Ok(chord) => Some(chord),
            Err(e) => {
                tracing::warn!(site = %site, key = %key, error = %e, "Ignoring invalid shortcut");
                None
            }
        })
        .collect()
}

impl Config {
    /// Load configuration from file, merging with defaults
    pub fn load() -> Self {
        let config_file = config_path();

        // Create example config on first run
        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        match fs::read_to_string(&config_file) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(_) => Config::default(),
        }
    }

    /// Parse config text, merging on top of defaults. Unparseable files
    /// yield the defaults.
    pub fn from_toml_str(contents: &str) -> Self {
        let mut config = Config::default();

        let toml_config = match toml::from_str::<TomlConfig>(contents) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse config file, using defaults");
                return config;
            }
        };

        if let Some(theater) = toml_config.theater {
            if let Some(ms) = theater.initial_delay_ms {
                config.theater.initial_delay = Duration::from_millis(ms);
            }
            if let Some(ms) = theater.retry_interval_ms {
                config.theater.retry_interval = Duration::from_millis(ms);
            }
            if let Some(retries) = theater.max_retries {
                config.theater.max_retries = retries;
            }
        }

        if let Some(styles) = toml_config.styles {
            if let Some(base_url) = styles.base_url {
                config.styles.base_url = base_url;
            }
            if let Some(youtube) = styles.youtube {
                config.styles.youtube = youtube;
            }
            if let Some(twitter) = styles.twitter {
                config.styles.twitter = twitter;
            }
        }

        if let Some(shortcuts) = toml_config.shortcuts {
            for (site, keys) in [
                (Site::YouTube, shortcuts.youtube),
                (Site::Twitter, shortcuts.twitter),
            ] {
                if let Some(keys) = keys {
                    config.shortcuts.replace(site, parse_chords(site, &keys));
                }
            }
        }

        config
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!(error = %e, "Failed to create config directory");
                return;
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            tracing::warn!(error = %e, "Failed to write default config");
        }
    }

    pub fn with_theater_timing(mut self, timing: TheaterTiming) -> Self {
        self.theater = timing;
        self
    }

    pub fn config_file() -> PathBuf {
        config_path()
    }
}
