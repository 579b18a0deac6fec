use std::{path::PathBuf, time::Duration};

use crate::core::errors::{AppError, AppResult};

pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub const DEFAULT_MODEL_ID: &str = "eleven_turbo_v2";
pub const DEFAULT_FRAGMENT_DURATION_MS: i64 = 1000;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationConfig {
    pub default_voice_id: String,
    pub model_id: String,
    /// Stored for clips whose duration is unknown.
    pub default_duration_ms: i64,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            default_voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            default_duration_ms: DEFAULT_FRAGMENT_DURATION_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub debounce: Duration,
    pub retry_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            retry_delay: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub narration: NarrationConfig,
    pub sync: SyncConfig,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup("SLIDEVOICE_DATA_DIR") {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => crate::db::default_data_dir()?,
        };
        let bind_addr = lookup("SLIDEVOICE_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let mut narration = NarrationConfig::default();
        if let Some(voice) = lookup("ELEVENLABS_VOICE_ID").filter(|v| !v.trim().is_empty()) {
            narration.default_voice_id = voice;
        }
        if let Some(model) = lookup("ELEVENLABS_MODEL_ID").filter(|v| !v.trim().is_empty()) {
            narration.model_id = model;
        }
        if let Some(raw) = lookup("SLIDEVOICE_DEFAULT_DURATION_MS") {
            narration.default_duration_ms = parse_positive("SLIDEVOICE_DEFAULT_DURATION_MS", &raw)?;
        }

        let mut sync = SyncConfig::default();
        if let Some(raw) = lookup("SLIDEVOICE_SAVE_DEBOUNCE_MS") {
            sync.debounce = Duration::from_millis(parse_positive("SLIDEVOICE_SAVE_DEBOUNCE_MS", &raw)? as u64);
        }
        if let Some(raw) = lookup("SLIDEVOICE_SAVE_RETRY_MS") {
            sync.retry_delay = Duration::from_millis(parse_positive("SLIDEVOICE_SAVE_RETRY_MS", &raw)? as u64);
        }

        Ok(Self {
            data_dir,
            bind_addr,
            narration,
            sync,
        })
    }
}

fn parse_positive(key: &str, raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(AppError::InvalidInput(format!(
            "{key} must be a positive integer, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = AppConfig::from_lookup(lookup_from(&[("SLIDEVOICE_DATA_DIR", "/tmp/sv")]))
            .expect("config");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/sv"));
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.narration, NarrationConfig::default());
        assert_eq!(config.sync, SyncConfig::default());
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SLIDEVOICE_DATA_DIR", "/tmp/sv"),
            ("ELEVENLABS_VOICE_ID", "voice-x"),
            ("SLIDEVOICE_DEFAULT_DURATION_MS", "2500"),
            ("SLIDEVOICE_SAVE_DEBOUNCE_MS", "250"),
        ]))
        .expect("config");
        assert_eq!(config.narration.default_voice_id, "voice-x");
        assert_eq!(config.narration.default_duration_ms, 2500);
        assert_eq!(config.sync.debounce, Duration::from_millis(250));
    }

    #[test]
    fn rejects_non_positive_duration() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("SLIDEVOICE_DATA_DIR", "/tmp/sv"),
            ("SLIDEVOICE_DEFAULT_DURATION_MS", "0"),
        ]))
        .expect_err("zero duration");
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
