// src/config.rs
// =============================================================================
// Lookup preferences and site endpoints.
//
// Both can come from a TOML file:
//
//   [prefs]
//   max_downloads = 5
//   get_category = true
//   get_all_authors = false
//   append_toc = true
//
//   [site]
//   base_url = "http://www.kyobobook.co.kr"
//   search_url = "https://search.kyobobook.co.kr/web/search?vPstrKeyWord="
//
// Missing keys fall back to the defaults below. Command-line flags are
// applied on top by main.rs.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound for `max_downloads`, matching the range the store allows
/// the user to pick from.
pub const MAX_DOWNLOADS_LIMIT: usize = 20;

/// Preferences read by the search parser and the detail workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    /// How many search matches to evaluate (1 = fastest)
    pub max_downloads: usize,
    /// Turn the category breadcrumb into `[...]` tags
    pub get_category: bool,
    /// Keep illustrators, translators, editors... instead of primary authors only
    pub get_all_authors: bool,
    /// Append the table of contents to the comments
    pub append_toc: bool,
}

impl Default for Prefs {
    fn default() -> Self {
        Prefs {
            max_downloads: 5,
            get_category: true,
            get_all_authors: false,
            append_toc: true,
        }
    }
}

impl Prefs {
    /// `max_downloads` clamped into 1..=20
    pub fn max_results(&self) -> usize {
        self.max_downloads.clamp(1, MAX_DOWNLOADS_LIMIT)
    }
}

/// Where the bookstore lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    /// Root used for product pages and for resolving relative links
    pub base_url: String,
    /// Search endpoint; the keyword is appended as-is
    pub search_url: String,
}

impl Default for Site {
    fn default() -> Self {
        Site {
            base_url: "http://www.kyobobook.co.kr".to_string(),
            search_url: "https://search.kyobobook.co.kr/web/search?vPstrKeyWord=".to_string(),
        }
    }
}

/// Everything a settings file can hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub prefs: Prefs,
    pub site: Site,
}

impl Settings {
    /// Reads a TOML settings file.
    pub fn load(path: &Path) -> Result<Settings> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read settings file {}", path.display()))?;
        Settings::from_toml(&raw).with_context(|| format!("parse settings file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Settings> {
        let settings: Settings = toml::from_str(raw)?;
        Ok(settings)
    }
}
