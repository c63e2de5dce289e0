//! Configuration system for Sleuth.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides. The extracted
//! [`SleuthConfig`] is validated once and then treated as immutable.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SleuthConfig {
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
}

/// How deep the synthesized analysis should go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchDepth {
    /// A short overview.
    Quick,
    /// Balanced coverage of the main findings.
    #[default]
    Detailed,
    /// Exhaustive treatment including caveats and open questions.
    Comprehensive,
}

impl std::fmt::Display for ResearchDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResearchDepth::Quick => write!(f, "quick"),
            ResearchDepth::Detailed => write!(f, "detailed"),
            ResearchDepth::Comprehensive => write!(f, "comprehensive"),
        }
    }
}

/// Output format of the final report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// Concise summary with confidence footer.
    Summary,
    /// Full report with findings, verification and sources.
    #[default]
    Detailed,
    /// Annotated bibliography of the retained sources.
    Bibliography,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Summary => write!(f, "summary"),
            ReportFormat::Detailed => write!(f, "detailed"),
            ReportFormat::Bibliography => write!(f, "bibliography"),
        }
    }
}

/// Citation style used by the citation capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    #[default]
    Apa,
    Mla,
    Chicago,
    Ieee,
}

impl std::fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CitationStyle::Apa => write!(f, "apa"),
            CitationStyle::Mla => write!(f, "mla"),
            CitationStyle::Chicago => write!(f, "chicago"),
            CitationStyle::Ieee => write!(f, "ieee"),
        }
    }
}

/// Research pipeline behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Maximum number of ranked sources that are extracted and analyzed.
    pub max_sources: usize,
    /// Whether the cross-source verification stage runs.
    pub verification_enabled: bool,
    /// Ranked search results with a quality below this are dropped (0.0-1.0).
    pub result_quality_threshold: f64,
    /// Width of the per-source extraction+analysis fan-out (1 = sequential).
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Upper bound for any single capability invocation.
    #[serde(default = "default_capability_timeout")]
    pub capability_timeout_secs: u64,
    #[serde(default)]
    pub default_format: ReportFormat,
    #[serde(default)]
    pub citation_style: CitationStyle,
    #[serde(default)]
    pub depth: ResearchDepth,
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "default_tone")]
    pub tone: String,
}

fn default_parallelism() -> usize {
    1
}
fn default_capability_timeout() -> u64 {
    30
}
fn default_persona() -> String {
    "research analyst".to_string()
}
fn default_tone() -> String {
    "neutral".to_string()
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_sources: 10,
            verification_enabled: true,
            result_quality_threshold: 0.0,
            parallelism: default_parallelism(),
            capability_timeout_secs: default_capability_timeout(),
            default_format: ReportFormat::default(),
            citation_style: CitationStyle::default(),
            depth: ResearchDepth::default(),
            persona: default_persona(),
            tone: default_tone(),
        }
    }
}

/// Cache and result persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub cache_enabled: bool,
    /// Time-to-live of cache entries in seconds.
    pub cache_ttl: u64,
    /// Durable cache directory. Defaults to `<data dir>/cache`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// Where completed research results are written. Defaults to `<data dir>/results`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub persist_results: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_ttl: 3600,
            cache_dir: None,
            results_dir: None,
            persist_results: true,
        }
    }
}

impl StorageConfig {
    /// Resolved durable cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("cache"))
    }

    /// Resolved results directory.
    pub fn results_dir(&self) -> PathBuf {
        self.results_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("results"))
    }
}

/// LLM provider used for synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider identifier: "openai", "ollama", "openrouter", ...
    pub provider: String,
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: usize,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Plugin discovery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginsConfig {
    /// Directory holding `<name>.toml` capability manifests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl SleuthConfig {
    /// Check every documented range. Called by [`load_config`] and by the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.research.result_quality_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::OutOfRange {
                field: "research.result_quality_threshold",
                value: threshold.to_string(),
                range: "[0, 1]",
            });
        }
        if self.research.parallelism == 0 {
            return Err(ConfigError::OutOfRange {
                field: "research.parallelism",
                value: "0".into(),
                range: "[1, inf)",
            });
        }
        if self.research.capability_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange {
                field: "research.capability_timeout_secs",
                value: "0".into(),
                range: "[1, inf)",
            });
        }
        let temperature = self.llm.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::OutOfRange {
                field: "llm.temperature",
                value: temperature.to_string(),
                range: "[0, 2]",
            });
        }
        if self.llm.max_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                field: "llm.max_tokens",
                value: "0".into(),
                range: "[1, inf)",
            });
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::OutOfRange {
                field: "llm.timeout_secs",
                value: "0".into(),
                range: "[1, inf)",
            });
        }
        if self.llm.provider.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "llm.provider must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Per-user data directory (`~/.local/share/sleuth` on Linux).
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "sleuth", "sleuth")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".sleuth"))
}

/// Path of the user-level config file, if a home directory can be resolved.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "sleuth", "sleuth")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (`SLEUTH_RESEARCH__MAX_SOURCES`, `SLEUTH_LLM__MODEL`, ...)
/// 3. Workspace-local config (`.sleuth/config.toml`)
/// 4. User config (`~/.config/sleuth/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&SleuthConfig>,
) -> Result<SleuthConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(SleuthConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".sleuth").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("SLEUTH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    extract(figment)
}

/// Load configuration from defaults plus a single explicit TOML file.
pub fn load_config_file(path: &Path) -> Result<SleuthConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Load {
            message: format!("config file not found: {}", path.display()),
        });
    }
    let figment =
        Figment::from(Serialized::defaults(SleuthConfig::default())).merge(Toml::file(path));
    extract(figment)
}

fn extract(figment: Figment) -> Result<SleuthConfig, ConfigError> {
    let config: SleuthConfig = figment.extract().map_err(|e| ConfigError::Load {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = SleuthConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.research.max_sources, 10);
        assert!(config.research.verification_enabled);
        assert!(config.storage.cache_enabled);
        assert_eq!(config.storage.cache_ttl, 3600);
        assert_eq!(config.research.parallelism, 1);
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut config = SleuthConfig::default();
        config.llm.temperature = 2.5;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                field: "llm.temperature",
                ..
            }
        ));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = SleuthConfig::default();
        config.research.result_quality_threshold = -0.1;
        assert!(config.validate().is_err());
        config.research.result_quality_threshold = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let mut config = SleuthConfig::default();
        config.research.parallelism = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_file_partial_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[research]
max_sources = 4
verification_enabled = false
result_quality_threshold = 0.6

[llm]
provider = "ollama"
model = "llama3.1:8b"
api_key_env = "OLLAMA_API_KEY"
temperature = 0.2
max_tokens = 512
"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.research.max_sources, 4);
        assert!(!config.research.verification_enabled);
        assert!((config.research.result_quality_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.timeout_secs, 60);
        // Untouched sections keep their defaults.
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn test_load_config_file_rejects_invalid_range() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[llm]\nprovider = \"openai\"\nmodel = \"m\"\napi_key_env = \"K\"\ntemperature = 9.0\nmax_tokens = 10\n",
        )
        .unwrap();
        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_load_config_file_missing() {
        let err = load_config_file(Path::new("/nonexistent/sleuth.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn test_storage_dirs_respect_overrides() {
        let storage = StorageConfig {
            cache_dir: Some(PathBuf::from("/tmp/sleuth-cache")),
            ..Default::default()
        };
        assert_eq!(storage.cache_dir(), PathBuf::from("/tmp/sleuth-cache"));
        assert!(storage.results_dir().ends_with("results"));
    }

    #[test]
    fn test_enum_display() {
        assert_eq!(ReportFormat::Bibliography.to_string(), "bibliography");
        assert_eq!(CitationStyle::Chicago.to_string(), "chicago");
        assert_eq!(ResearchDepth::Quick.to_string(), "quick");
    }
}
