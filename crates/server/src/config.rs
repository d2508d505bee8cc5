use shared_types::{AppConfig, FeatureFlags, IssuanceSettings};
use std::sync::OnceLock;

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Path to the config file, relative to the project root.
const CONFIG_PATH: &str = "config.toml";

/// Parse config file contents. Unparseable input falls back to defaults.
pub fn parse_config(contents: &str) -> AppConfig {
    toml::from_str(contents).unwrap_or_else(|e| {
        tracing::warn!("Failed to parse {CONFIG_PATH}: {e}; using defaults");
        AppConfig::default()
    })
}

/// Read `config.toml` and store it in the global `OnceLock`. Safe to call
/// multiple times; only the first call has effect.
///
/// If the file is missing or unparseable, every setting takes its default.
pub fn load_app_config() -> &'static AppConfig {
    CONFIG.get_or_init(|| match std::fs::read_to_string(CONFIG_PATH) {
        Ok(contents) => {
            let config = parse_config(&contents);
            tracing::info!(
                "Loaded {CONFIG_PATH}: features={:?} issuance={:?}",
                config.features,
                config.issuance
            );
            config
        }
        Err(e) => {
            tracing::info!("{CONFIG_PATH} not found ({e}); using defaults");
            AppConfig::default()
        }
    })
}

/// Loaded feature flags, or all-false defaults before `load_app_config()`.
pub fn feature_flags() -> FeatureFlags {
    CONFIG
        .get()
        .map(|c| c.features.clone())
        .unwrap_or_default()
}

/// Loaded issuance settings, or defaults before `load_app_config()`.
pub fn issuance_settings() -> IssuanceSettings {
    CONFIG
        .get()
        .map(|c| c.issuance.clone())
        .unwrap_or_default()
}
