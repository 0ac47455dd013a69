//! Pipeline configuration.
//!
//! Defaults are embedded from `config/source.toml` and the extraction
//! crate's `extract.toml`. A user file may carry a `[source]` table, an
//! `[extract]` table, or both; each table present replaces the embedded one
//! as a whole.

use std::path::Path;

use fuel_watch_extract::config::{ExtractConfig, ExtractSettings};
use fuel_watch_extract::section::HeaderPolicy;
use fuel_watch_models::SourceKind;
use fuel_watch_pdf::ocr::OcrOptions;
use fuel_watch_scraper::HttpConfig;
use fuel_watch_scraper::listing::LinkRanking;
use serde::Deserialize;
use url::Url;

use crate::PipelineError;

/// Default source settings, embedded at compile time.
const EMBEDDED_SOURCE_TOML: &str = include_str!("../config/source.toml");

/// Environment variable overriding the listing page or naming the
/// document directly.
pub const SOURCE_URL_ENV: &str = "FUEL_WATCH_SOURCE_URL";

/// Section header policy for each concrete source kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KindPolicies {
    pub html_table: HeaderPolicy,
    pub text_pdf: HeaderPolicy,
    pub scanned_pdf: HeaderPolicy,
}

impl Default for KindPolicies {
    fn default() -> Self {
        Self {
            html_table: HeaderPolicy::FallbackToWhole,
            text_pdf: HeaderPolicy::RequireHeader,
            scanned_pdf: HeaderPolicy::FallbackToWhole,
        }
    }
}

impl KindPolicies {
    /// Policy for a resolved kind. `Auto` is never resolved, so it gets the
    /// permissive default.
    #[must_use]
    pub const fn for_kind(&self, kind: SourceKind) -> HeaderPolicy {
        match kind {
            SourceKind::HtmlTable => self.html_table,
            SourceKind::TextPdf => self.text_pdf,
            SourceKind::ScannedPdf => self.scanned_pdf,
            SourceKind::Auto => HeaderPolicy::FallbackToWhole,
        }
    }
}

/// The `[source]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSettings {
    #[serde(default)]
    pub default_kind: SourceKind,
    pub listing_urls: Vec<String>,
    #[serde(default)]
    pub policy: KindPolicies,
    #[serde(default)]
    pub ranking: LinkRanking,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub ocr: OcrOptions,
}

impl SourceSettings {
    /// Parses the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Toml`] if the embedded file is malformed.
    pub fn embedded() -> Result<Self, PipelineError> {
        Ok(toml::from_str(EMBEDDED_SOURCE_TOML)?)
    }
}

#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    source: Option<SourceSettings>,
    extract: Option<ExtractSettings>,
}

/// Where the bulletin comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceTarget {
    /// Listing pages to search, in order.
    Listing(Vec<String>),
    /// A bulletin URL to download as is.
    Document(String),
}

/// Classifies a source URL: a path ending in `.pdf` is the document
/// itself, anything else is a listing page.
///
/// # Errors
///
/// Returns [`PipelineError::Url`] if `url` is not an absolute URL.
pub fn source_target(url: &str) -> Result<SourceTarget, PipelineError> {
    let parsed = Url::parse(url.trim())?;
    let is_pdf = parsed.path().to_ascii_lowercase().ends_with(".pdf");
    let url = parsed.to_string();
    Ok(if is_pdf {
        SourceTarget::Document(url)
    } else {
        SourceTarget::Listing(vec![url])
    })
}

/// Everything a scrape run needs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub source: SourceSettings,
    pub extract: ExtractConfig,
    /// Replaces the configured listing pages when set.
    pub source_url: Option<String>,
}

impl PipelineConfig {
    /// The embedded defaults, without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if an embedded file is malformed.
    pub fn embedded() -> Result<Self, PipelineError> {
        Ok(Self {
            source: SourceSettings::embedded()?,
            extract: ExtractConfig::embedded()?,
            source_url: None,
        })
    }

    /// Applies a user TOML document on top of the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if `contents` is malformed or its
    /// `[extract]` table does not compile.
    pub fn from_toml(contents: &str) -> Result<Self, PipelineError> {
        let user: UserConfig = toml::from_str(contents)?;

        let source = match user.source {
            Some(source) => source,
            None => SourceSettings::embedded()?,
        };
        let extract = match user.extract {
            Some(settings) => ExtractConfig::from_settings(&settings)?,
            None => ExtractConfig::embedded()?,
        };

        Ok(Self {
            source,
            extract,
            source_url: None,
        })
    }

    /// Loads the configuration: embedded defaults, then the optional user
    /// file, then [`SOURCE_URL_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the user file cannot be read or parsed.
    pub fn load(user_file: Option<&Path>) -> Result<Self, PipelineError> {
        let mut config = match user_file {
            Some(path) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            None => Self::embedded()?,
        };

        if let Ok(url) = std::env::var(SOURCE_URL_ENV) {
            let url = url.trim();
            if !url.is_empty() {
                log::info!("Source overridden by {SOURCE_URL_ENV}: {url}");
                config.source_url = Some(url.to_owned());
            }
        }

        Ok(config)
    }

    /// Resolves where to fetch from.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Url`] if the source override is not a URL.
    pub fn target(&self) -> Result<SourceTarget, PipelineError> {
        match &self.source_url {
            Some(url) => source_target(url),
            None => Ok(SourceTarget::Listing(self.source.listing_urls.clone())),
        }
    }
}
