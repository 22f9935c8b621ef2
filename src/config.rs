use tracing_subscriber::EnvFilter;

use crate::pipeline_config::{ConfigError, PipelineConfig};

/// Application-level constants
pub const APP_NAME: &str = "menuscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Path to a JSON `PipelineConfig` file
pub const ENV_CONFIG_PATH: &str = "MENUSCAN_CONFIG";
/// Base URL of the Ollama server backing the secondary engine
pub const ENV_OLLAMA_URL: &str = "MENUSCAN_OLLAMA_URL";
/// Vision model used by the secondary engine
pub const ENV_OLLAMA_MODEL: &str = "MENUSCAN_OLLAMA_MODEL";

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Log filter used when `RUST_LOG` is unset
pub fn default_log_filter() -> &'static str {
    "menuscan=info"
}

/// Install the fmt subscriber. Binary only; safe to call twice.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the pipeline configuration from `MENUSCAN_CONFIG` (if set), then
/// apply `MENUSCAN_*` overrides.
pub fn load_pipeline_config() -> Result<PipelineConfig, ConfigError> {
    load_pipeline_config_with(|name| std::env::var(name).ok())
}

fn load_pipeline_config_with<F>(lookup: F) -> Result<PipelineConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match lookup(ENV_CONFIG_PATH) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
            tracing::debug!(path = %path, "Loaded pipeline config file");
            PipelineConfig::from_json(&json)?
        }
        None => PipelineConfig::default(),
    };
    base.with_overrides(lookup)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_menuscan() {
        assert_eq!(APP_NAME, "menuscan");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn default_filter_targets_crate() {
        assert!(EnvFilter::try_new(default_log_filter()).is_ok());
        assert!(default_log_filter().starts_with(APP_NAME));
    }

    #[test]
    fn defaults_without_environment() {
        let config = load_pipeline_config_with(|_| None).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn config_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("menuscan.json");
        std::fs::write(&path, r#"{"min_dish_count": 5, "max_price": 500.0}"#).unwrap();
        let path_str = path.to_string_lossy().to_string();

        let config = load_pipeline_config_with(|name| match name {
            ENV_CONFIG_PATH => Some(path_str.clone()),
            "MENUSCAN_MIN_DISHES" => Some("4".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.min_dish_count, 4, "env override wins over file");
        assert_eq!(config.max_price, 500.0);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_pipeline_config_with(|name| {
            (name == ENV_CONFIG_PATH).then(|| "/nonexistent/menuscan.json".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/menuscan.json"));
    }
}
