use serde::{Deserialize, Serialize};

/// Feature flags controlling which optional integrations are active.
///
/// Loaded from `config.toml` at startup. Every field defaults to `false`
/// so that a missing or incomplete config file disables all optional
/// integrations.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FeatureFlags {
    #[serde(default)]
    pub s3: bool,
    #[serde(default)]
    pub telemetry: bool,
}

/// Tunables for case-file assembly, rendering and signed-URL issuance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IssuanceSettings {
    /// Lifetime of signed URLs handed to the renderer for signatures/photos.
    pub signed_url_ttl_secs: u64,
    /// Blob-store prefix under which issued case files are written.
    pub case_file_prefix: String,
    /// Blob-store prefix for disposable preview renders.
    pub preview_prefix: String,
    /// Upper bound on renders running at the same time.
    pub max_concurrent_renders: usize,
    /// Locale used when a case carries none of its own.
    pub default_locale: String,
}

impl Default for IssuanceSettings {
    fn default() -> Self {
        Self {
            signed_url_ttl_secs: 300,
            case_file_prefix: "case-files".to_string(),
            preview_prefix: "previews".to_string(),
            max_concurrent_renders: 2,
            default_locale: "en-IN".to_string(),
        }
    }
}

/// Top-level config file structure matching `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub issuance: IssuanceSettings,
}
