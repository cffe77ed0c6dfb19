// config.rs

use crate::hashers::DEFAULT_CHUNK_SIZE;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Where call-time overrides are read from. The process environment unless a
/// caller swaps it out.
pub type EnvSource = Arc<dyn Fn() -> HashMap<String, String> + Send + Sync>;

/// Snapshot of the process environment. Variables whose name or value is
/// not valid UTF-8 are skipped.
pub fn env_snapshot() -> HashMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

pub fn process_env() -> EnvSource {
    Arc::new(env_snapshot)
}

//
// fileprint.toml
//

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub algorithm: String,
    pub chunk_size: usize,
    pub summarizer: SummarizerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            algorithm: "sha3-256".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            summarizer: SummarizerConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        SummarizerConfig {
            enabled: true,
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SummarizerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Re-apply credential and endpoint overrides from `env`. Called right
    /// before every summary request so a rotated key is picked up without a
    /// restart.
    pub fn refreshed_from(&self, env: &HashMap<String, String>) -> Self {
        let mut fresh = self.clone();
        fresh.apply_env(env);
        fresh
    }

    fn apply_env(&mut self, env: &HashMap<String, String>) {
        if let Some(key) = env.get("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key.trim().to_string());
        }
        if let Some(endpoint) = env.get("FILEPRINT_SUMMARY_ENDPOINT") {
            self.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(model) = env.get("FILEPRINT_SUMMARY_MODEL") {
            self.model = model.clone();
        }
        if let Some(secs) = env
            .get("FILEPRINT_SUMMARY_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
        {
            self.timeout_secs = secs;
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Settings::default(),
        };
        settings.apply_env(&env_snapshot());
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    fn apply_env(&mut self, env: &HashMap<String, String>) {
        if let Some(algo) = env.get("FILEPRINT_ALGORITHM") {
            self.algorithm = algo.clone();
        }
        if let Some(size) = env.get("FILEPRINT_CHUNK_SIZE").and_then(|s| s.parse().ok()) {
            self.chunk_size = size;
        }
        self.summarizer.apply_env(env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_sane() {
        let s = Settings::default();
        assert_eq!(s.algorithm, "sha3-256");
        assert_eq!(s.chunk_size, 1024 * 1024);
        assert!(s.summarizer.enabled);
        assert!(s.summarizer.api_key.is_none());
        assert_eq!(s.summarizer.timeout(), Duration::from_secs(15));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let s = Settings::from_toml(
            r#"
            chunk_size = 65536

            [summarizer]
            model = "gemini-pro"
            "#,
        )
        .unwrap();
        assert_eq!(s.chunk_size, 65536);
        assert_eq!(s.algorithm, "sha3-256");
        assert_eq!(s.summarizer.model, "gemini-pro");
        assert_eq!(s.summarizer.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(Settings::from_toml("chunk_size = \"big\"").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = Settings::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.toml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut s = Settings::default();
        s.apply_env(&env(&[
            ("FILEPRINT_ALGORITHM", "SHA3-256"),
            ("FILEPRINT_CHUNK_SIZE", "4096"),
            ("GEMINI_API_KEY", " secret "),
            ("FILEPRINT_SUMMARY_ENDPOINT", "http://127.0.0.1:9999/"),
            ("FILEPRINT_SUMMARY_TIMEOUT_SECS", "3"),
        ]));
        assert_eq!(s.algorithm, "SHA3-256");
        assert_eq!(s.chunk_size, 4096);
        assert_eq!(s.summarizer.api_key.as_deref(), Some("secret"));
        assert_eq!(s.summarizer.endpoint, "http://127.0.0.1:9999");
        assert_eq!(s.summarizer.timeout_secs, 3);
    }

    #[test]
    fn refresh_picks_up_rotated_key() {
        let mut file = Settings::from_toml(
            r#"
            [summarizer]
            api_key = "from-file"
            model = "file-model"
            "#,
        )
        .unwrap()
        .summarizer;
        file.endpoint = "http://file.example".to_string();

        let unchanged = file.refreshed_from(&HashMap::new());
        assert_eq!(unchanged.api_key.as_deref(), Some("from-file"));
        assert_eq!(unchanged.endpoint, "http://file.example");

        let rotated = file.refreshed_from(&env(&[
            ("GEMINI_API_KEY", "rotated"),
            ("FILEPRINT_SUMMARY_MODEL", "env-model"),
        ]));
        assert_eq!(rotated.api_key.as_deref(), Some("rotated"));
        assert_eq!(rotated.model, "env-model");
        assert_eq!(rotated.endpoint, "http://file.example");
        // the stored config is left alone
        assert_eq!(file.api_key.as_deref(), Some("from-file"));
    }

    #[cfg(unix)]
    #[test]
    fn env_snapshot_skips_non_utf8_values() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        std::env::set_var("FILEPRINT_TEST_NOT_UTF8", OsStr::from_bytes(&[0x66, 0xff, 0x6f]));
        let snapshot = env_snapshot();
        let fresh = SummarizerConfig::default().refreshed_from(&snapshot);
        std::env::remove_var("FILEPRINT_TEST_NOT_UTF8");

        assert!(!snapshot.contains_key("FILEPRINT_TEST_NOT_UTF8"));
        assert!(fresh.enabled);
    }

    #[test]
    fn unparsable_env_values_are_ignored() {
        let mut s = Settings::default();
        s.apply_env(&env(&[("FILEPRINT_CHUNK_SIZE", "lots"), ("GEMINI_API_KEY", "  ")]));
        assert_eq!(s.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(s.summarizer.api_key.is_none());
    }
}
