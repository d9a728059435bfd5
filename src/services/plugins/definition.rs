//! Plugin Definition Files
//!
//! A definition is a self-contained TOML file: plugin metadata plus a
//! `[scraper]` table naming a scraper kind and its parameters.
//!
//! ```toml
//! name = "Luma"
//! source_url = "https://lu.ma/sf"
//! description = "Events from the Luma SF calendar"
//!
//! [scraper]
//! kind = "markdown"
//! event_pattern = '\[(?P<title>[^\]]+)\]\((?P<url>https?://lu\.ma/[^)]+)\)'
//! ```
//!
//! Parsing checks the metadata; kind-specific parameters are checked by the
//! scraper factory that builds the plugin.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a definition was rejected.
#[derive(Error, Debug)]
pub enum DefinitionError {
    /// Not valid TOML or missing required fields
    #[error("invalid definition: {0}")]
    Toml(#[from] toml::de::Error),

    /// Structurally valid but violates the plugin contract
    #[error("contract violation: {0}")]
    Invalid(String),

    /// The `[scraper] kind` has no registered factory
    #[error("unknown scraper kind '{0}'")]
    UnknownKind(String),
}

impl DefinitionError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Parsed definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginDefinition {
    pub name: String,
    pub source_url: String,
    pub description: String,
    /// Tags appended to every event the plugin produces
    #[serde(default)]
    pub tags: Vec<String>,
    pub scraper: ScraperSection,
}

/// The `[scraper]` table: a kind plus whatever parameters that kind takes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperSection {
    pub kind: String,
    #[serde(flatten)]
    pub params: toml::Table,
}

impl ScraperSection {
    /// Deserialize the kind-specific parameters.
    pub fn params_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, DefinitionError> {
        Ok(toml::Value::Table(self.params.clone()).try_into()?)
    }
}

impl PluginDefinition {
    /// Parse and validate the metadata of a definition.
    pub fn parse(text: &str) -> Result<Self, DefinitionError> {
        let definition: PluginDefinition = toml::from_str(text)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Check the metadata part of the contract.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        validate_name(&self.name)?;

        if self.description.trim().is_empty() {
            return Err(DefinitionError::invalid("description must not be empty"));
        }

        validate_source_url(&self.source_url)?;

        if self.scraper.kind.trim().is_empty() {
            return Err(DefinitionError::invalid("scraper kind must not be empty"));
        }

        Ok(())
    }
}

/// Names: non-empty, letters, digits, `_`, `-` and space only.
pub fn validate_name(name: &str) -> Result<(), DefinitionError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DefinitionError::invalid("name must not be empty"));
    }
    if trimmed.len() != name.len() {
        return Err(DefinitionError::invalid(
            "name must not have leading or trailing whitespace",
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '-' || *c == ' '))
    {
        return Err(DefinitionError::invalid(format!(
            "name '{}' contains invalid character '{}'",
            name, bad
        )));
    }
    Ok(())
}

/// Source URLs must be absolute http(s) URLs with a host.
pub fn validate_source_url(source_url: &str) -> Result<url::Url, DefinitionError> {
    let url = url::Url::parse(source_url.trim()).map_err(|e| {
        DefinitionError::invalid(format!("source_url '{}' is not a URL: {}", source_url, e))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DefinitionError::invalid(format!(
            "source_url must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(DefinitionError::invalid("source_url has no host"));
    }
    Ok(url)
}
