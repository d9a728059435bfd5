//! Plugin Generator
//!
//! Turns a target site URL into an active plugin:
//!
//! `Requested -> Fetching -> Drafting -> Writing -> Validating -> Activated | Failed`
//!
//! The page is fetched as markdown, the generation capability drafts a
//! definition from it, the draft is written atomically into the plugin
//! directory and then validated by the loader. A draft that fails validation
//! is kept on disk for inspection but never registered.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use eventfinder_core::{FetchError, PageFetcher};
use eventfinder_llm::{LlmError, LlmProvider, LlmRequestOptions, Message};
use eventfinder_tools::normalize_url;

use super::loader::{PluginLoader, DEFINITION_EXTENSION};
use super::models::{LoadFailure, PluginDescriptor};
use crate::services::prompts::{self, DraftRequest};

/// Workflow stage of one generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Requested,
    Fetching,
    Drafting,
    Writing,
    Validating,
    Activated,
    Failed,
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GenerationStage::Requested => "requested",
            GenerationStage::Fetching => "fetching",
            GenerationStage::Drafting => "drafting",
            GenerationStage::Writing => "writing",
            GenerationStage::Validating => "validating",
            GenerationStage::Activated => "activated",
            GenerationStage::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Why a generation request failed.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("'{0}' is not a usable site URL")]
    InvalidTarget(String),

    #[error("could not reach or parse the target site ({0})")]
    Fetch(#[from] FetchError),

    #[error("the plugin could not be drafted ({0})")]
    Draft(#[from] LlmError),

    #[error("could not save the plugin file ({0})")]
    Write(#[from] std::io::Error),

    #[error("the generated plugin failed validation: {}", .0.error)]
    Invalid(LoadFailure),
}

/// Result of the post-activation test scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SmokeTest {
    Passed { events: usize },
    Failed { reason: String },
    TimedOut { after_secs: u64 },
}

/// A plugin that was generated and registered.
#[derive(Debug, Clone)]
pub struct GeneratedPlugin {
    pub plugin_name: String,
    pub source_url: String,
    pub path: PathBuf,
    pub smoke_test: SmokeTest,
}

/// Terminal state of a generation request.
#[derive(Debug)]
pub enum GenerationOutcome {
    Activated(GeneratedPlugin),
    Failed {
        /// Stage the workflow was in when it failed
        stage: GenerationStage,
        url: String,
        /// Artifact left on disk, if the workflow got that far
        path: Option<PathBuf>,
        error: GenerationError,
    },
}

impl GenerationOutcome {
    pub fn is_activated(&self) -> bool {
        matches!(self, GenerationOutcome::Activated(_))
    }

    /// User-facing summary of the outcome.
    pub fn message(&self) -> String {
        match self {
            GenerationOutcome::Activated(plugin) => {
                let test = match &plugin.smoke_test {
                    SmokeTest::Passed { events } => format!(
                        "Plugin '{}' loaded successfully. Found {} events.",
                        plugin.plugin_name, events
                    ),
                    SmokeTest::Failed { reason } => format!(
                        "Plugin '{}' loaded successfully, but its test scrape failed: {}",
                        plugin.plugin_name, reason
                    ),
                    SmokeTest::TimedOut { after_secs } => format!(
                        "Plugin '{}' loaded successfully, but its test scrape did not finish within {}s.",
                        plugin.plugin_name, after_secs
                    ),
                };
                format!(
                    "Successfully created plugin for {}!\n\n{}\n\nThe plugin has been saved to `{}` and is now ready to use.",
                    plugin.source_url,
                    test,
                    file_name(&plugin.path)
                )
            }
            GenerationOutcome::Failed {
                path: Some(path),
                error: error @ GenerationError::Invalid(_),
                ..
            } => format!(
                "Plugin generated but {}.\n\nThe definition has been saved to `{}`. You may need to fix it manually or try again.",
                error,
                file_name(path)
            ),
            GenerationOutcome::Failed { url, error, .. } => {
                format!("Failed to create plugin for {}: {}", url, error)
            }
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Names derived from a target URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSite {
    pub url: String,
    /// File stem, e.g. `example_com`
    pub slug: String,
    /// CamelCase plugin name, e.g. `ExampleCom`
    pub plugin_name: String,
}

impl TargetSite {
    /// Normalize `raw` (bare domains get `https://`) and derive the names.
    pub fn parse(raw: &str) -> Result<Self, GenerationError> {
        let raw = raw.trim();
        let url =
            normalize_url(raw).map_err(|_| GenerationError::InvalidTarget(raw.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| GenerationError::InvalidTarget(raw.to_string()))?;

        let slug = slug_for_host(host);
        if slug.is_empty() {
            return Err(GenerationError::InvalidTarget(raw.to_string()));
        }
        let plugin_name = plugin_name_for_slug(&slug);

        Ok(Self {
            url: url.to_string(),
            slug,
            plugin_name,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.slug, DEFINITION_EXTENSION)
    }
}

/// `www.Example-Site.com` -> `example_site_com`
pub fn slug_for_host(host: &str) -> String {
    let host = host.strip_prefix("www.").unwrap_or(host);
    host.to_lowercase()
        .chars()
        .map(|c| if c == '.' || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// `example_site_com` -> `ExampleSiteCom`
pub fn plugin_name_for_slug(slug: &str) -> String {
    slug.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Overwrite `name` and `source_url` in a draft so regeneration for the same
/// site always targets the same registry entry. Drafts that are not TOML are
/// returned unchanged and left for validation to reject.
pub fn pin_metadata(draft: &str, target: &TargetSite) -> String {
    let Ok(mut table) = draft.parse::<toml::Table>() else {
        return draft.to_string();
    };
    table.insert("name".into(), toml::Value::String(target.plugin_name.clone()));
    table.insert("source_url".into(), toml::Value::String(target.url.clone()));
    toml::to_string(&table).unwrap_or_else(|_| draft.to_string())
}

/// Generator tuning.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub max_page_chars: usize,
    pub smoke_test_timeout: Duration,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            max_page_chars: 8000,
            smoke_test_timeout: Duration::from_secs(30),
        }
    }
}

/// Generates plugins into the loader's directory.
pub struct PluginGenerator {
    loader: Arc<PluginLoader>,
    fetcher: Arc<dyn PageFetcher>,
    provider: Arc<dyn LlmProvider>,
    options: GeneratorOptions,
    slug_locks: DashMap<String, Arc<Mutex<()>>>,
}

type StageResult<T> = Result<T, (GenerationStage, Option<PathBuf>, GenerationError)>;

impl PluginGenerator {
    pub fn new(
        loader: Arc<PluginLoader>,
        fetcher: Arc<dyn PageFetcher>,
        provider: Arc<dyn LlmProvider>,
        options: GeneratorOptions,
    ) -> Self {
        Self {
            loader,
            fetcher,
            provider,
            options,
            slug_locks: DashMap::new(),
        }
    }

    /// Run the whole workflow for `url`. Never returns an error; failures are
    /// reported in the outcome.
    pub async fn generate(&self, url: &str) -> GenerationOutcome {
        let target = match TargetSite::parse(url) {
            Ok(target) => target,
            Err(error) => {
                tracing::warn!("[generator] Rejected target '{}': {}", url, error);
                return GenerationOutcome::Failed {
                    stage: GenerationStage::Requested,
                    url: url.to_string(),
                    path: None,
                    error,
                };
            }
        };

        let lock = self.slug_locks.entry(target.slug.clone()).or_default().clone();
        let _guard = lock.lock().await;

        self.enter(&target, GenerationStage::Requested);
        match self.run(&target).await {
            Ok(plugin) => {
                self.enter(&target, GenerationStage::Activated);
                GenerationOutcome::Activated(plugin)
            }
            Err((stage, path, error)) => {
                tracing::warn!(
                    "[generator] {}: {} at stage {}: {}",
                    target.slug,
                    GenerationStage::Failed,
                    stage,
                    error
                );
                GenerationOutcome::Failed {
                    stage,
                    url: target.url.clone(),
                    path,
                    error,
                }
            }
        }
    }

    async fn run(&self, target: &TargetSite) -> StageResult<GeneratedPlugin> {
        self.enter(target, GenerationStage::Fetching);
        let page = self.fetch(target).await.map_err(|e| (GenerationStage::Fetching, None, e))?;

        self.enter(target, GenerationStage::Drafting);
        let draft = self
            .draft(target, &page)
            .await
            .map_err(|e| (GenerationStage::Drafting, None, e))?;

        self.enter(target, GenerationStage::Writing);
        let path = self
            .write(target, &draft)
            .await
            .map_err(|e| (GenerationStage::Writing, None, e))?;

        self.enter(target, GenerationStage::Validating);
        let descriptor = self.loader.load_one(&path).await.map_err(|failure| {
            (
                GenerationStage::Validating,
                Some(path.clone()),
                GenerationError::Invalid(failure),
            )
        })?;

        let smoke_test = self.smoke_test(&descriptor).await;
        Ok(GeneratedPlugin {
            plugin_name: descriptor.name.clone(),
            source_url: target.url.clone(),
            path,
            smoke_test,
        })
    }

    async fn fetch(&self, target: &TargetSite) -> Result<String, GenerationError> {
        let page = self.fetcher.fetch(&target.url).await?;
        if page.trim().is_empty() {
            return Err(FetchError::Empty.into());
        }
        Ok(page)
    }

    async fn draft(&self, target: &TargetSite, page: &str) -> Result<String, GenerationError> {
        let file_name = target.file_name();
        let system = prompts::generation_system_prompt(&DraftRequest {
            url: &target.url,
            plugin_name: &target.plugin_name,
            file_name: &file_name,
            page,
            max_page_chars: self.options.max_page_chars,
        });

        let response = self
            .provider
            .send_message(
                vec![Message::user(prompts::generation_user_message(&target.url))],
                Some(system),
                LlmRequestOptions::precise(),
            )
            .await?;
        if response.is_truncated() {
            tracing::warn!("[generator] {}: draft hit the token limit", target.slug);
        }

        let text = prompts::strip_code_fences(&response.into_text()?);
        Ok(pin_metadata(&text, target))
    }

    /// Write through a hidden temp file in the same directory, then rename.
    async fn write(&self, target: &TargetSite, draft: &str) -> Result<PathBuf, GenerationError> {
        let dir = self.loader.dir().to_path_buf();
        let path = dir.join(target.file_name());
        let contents = draft.to_string();

        let written = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            use std::io::Write;

            std::fs::create_dir_all(&dir)?;
            let mut temp = tempfile::Builder::new()
                .prefix(".generated-")
                .suffix(".tmp")
                .tempfile_in(&dir)?;
            temp.write_all(contents.as_bytes())?;
            temp.as_file().sync_all()?;
            temp.persist(&written).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))??;

        tracing::info!("[generator] {}: wrote {}", target.slug, path.display());
        Ok(path)
    }

    /// One bounded scrape of the freshly registered plugin. Never fatal.
    async fn smoke_test(&self, descriptor: &PluginDescriptor) -> SmokeTest {
        let timeout = self.options.smoke_test_timeout;
        let instance = descriptor.instance.clone();
        let task = tokio::spawn(async move { instance.scrape().await });

        let result = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(Ok(events))) => SmokeTest::Passed {
                events: events.len(),
            },
            Ok(Ok(Err(failure))) => SmokeTest::Failed {
                reason: failure.to_string(),
            },
            Ok(Err(join_error)) => SmokeTest::Failed {
                reason: format!("scrape panicked: {}", join_error),
            },
            Err(_) => SmokeTest::TimedOut {
                after_secs: timeout.as_secs(),
            },
        };

        match &result {
            SmokeTest::Passed { events } => {
                tracing::info!("[generator] {}: smoke test found {} events", descriptor.name, events)
            }
            other => tracing::warn!("[generator] {}: smoke test issue: {:?}", descriptor.name, other),
        }
        result
    }

    fn enter(&self, target: &TargetSite, stage: GenerationStage) {
        tracing::info!("[generator] {}: {}", target.slug, stage);
    }
}
