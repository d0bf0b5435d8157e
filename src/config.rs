use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::models::ComparisonOptions;

/// Optional config file looked up in the working directory.
pub const CONFIG_FILE: &str = "supplement-audit";
/// Environment prefix, e.g. `AUDIT__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "AUDIT";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Whole-pipeline deadline per comparison.
    pub timeout_ms: u64,
    /// Comparisons running at once.
    pub max_concurrent: usize,
    /// Options used when a request carries none.
    pub defaults: ComparisonOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_concurrent: 8,
            defaults: ComparisonOptions::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `supplement-audit.toml` if present, then `AUDIT__*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(CONFIG_FILE)
    }

    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config
            .analysis
            .defaults
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchingAlgorithm;

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load_from("does-not-exist/supplement-audit").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.analysis.timeout_ms, 30_000);
        assert_eq!(config.analysis.defaults, ComparisonOptions::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("supplement-audit-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("audit.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9100\n\n[analysis.defaults]\nmatching_algorithm = \"fuzzy\"\nfuzzy_threshold = 0.8\n",
        )
        .unwrap();

        let config = AppConfig::load_from(path.to_str().unwrap()).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.analysis.defaults.matching_algorithm, MatchingAlgorithm::Fuzzy);
        assert_eq!(config.analysis.defaults.fuzzy_threshold, 0.8);
        assert_eq!(config.analysis.defaults.calculation_precision, 2);
    }

    #[test]
    fn invalid_default_options_are_rejected() {
        let dir = std::env::temp_dir().join(format!("supplement-audit-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("audit.toml");
        std::fs::write(&path, "[analysis.defaults]\nfuzzy_threshold = 1.5\n").unwrap();

        let result = AppConfig::load_from(path.to_str().unwrap());
        std::fs::remove_dir_all(&dir).ok();
        assert!(result.is_err());
    }
}
