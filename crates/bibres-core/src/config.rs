use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Root resolver configuration, loaded from `~/.config/bibres/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub options: ResolveOptions,
    pub pipeline: PipelineConfig,
    pub validators: ValidatorsConfig,
}

/// Per-run switches. Turning any of them off degrades output, never fails it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveOptions {
    /// Run the configured validators.
    pub validate: bool,
    /// Try the scraping source for references the primary extractor missed.
    pub scrape: bool,
    /// Try the PDF source when scraping also found nothing.
    pub pdf: bool,
    /// Run the topic validator in addition to the regular ones.
    pub topic_validation: bool,
    /// Group references that share a DOI or PMID.
    pub dedupe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// References processed at the same time.
    pub concurrency: usize,
    /// Upper bound for a single collaborator call.
    pub call_timeout_secs: u64,
    /// Fetch metadata by DOI when a reference has no PMID/PMCID.
    pub doi_metadata_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorsConfig {
    /// Names of the built-in validators to enable (`format`).
    pub enabled: Vec<String>,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            options: ResolveOptions::default(),
            pipeline: PipelineConfig::default(),
            validators: ValidatorsConfig::default(),
        }
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            validate: true,
            scrape: false,
            pdf: false,
            topic_validation: false,
            dedupe: false,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            call_timeout_secs: 10,
            doi_metadata_fallback: true,
        }
    }
}

impl Default for ValidatorsConfig {
    fn default() -> Self {
        Self {
            enabled: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl ResolverConfig {
    /// Standard config file path: `~/.config/bibres/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("BIBRES_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("bibres")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = self.to_toml()?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline.concurrency == 0 {
            return Err(CoreError::ConfigError(
                "pipeline.concurrency must be at least 1".to_string(),
            ));
        }
        if self.pipeline.call_timeout_secs == 0 {
            return Err(CoreError::ConfigError(
                "pipeline.call_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
