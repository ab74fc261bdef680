use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "covid_london.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub query_workers: usize,
    pub queue_capacity: usize,
    pub query_timeout_ms: Option<u64>,
    pub boundaries_path: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/covid_london.db".into(),
            query_workers: 4,
            queue_capacity: 64,
            query_timeout_ms: Some(30_000),
            boundaries_path: None,
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    database_url: Option<String>,
    query_workers: Option<usize>,
    queue_capacity: Option<usize>,
    query_timeout_ms: Option<u64>,
    boundaries_path: Option<PathBuf>,
    log_filter: Option<String>,
}

/// Defaults, overlaid with the config file, overlaid with the environment.
///
/// An explicitly requested config file must exist; the default one is
/// optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(config_path, |key| std::env::var(key).ok())
}

pub(crate) fn load_settings_with<F>(config_path: Option<&Path>, env: F) -> anyhow::Result<Settings>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();

    let (path, required) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
            apply_file(&mut settings, file_cfg);
        }
        Err(err) if required => {
            return Err(err).with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__QUERY_WORKERS") {
        settings.query_workers = parse_positive("APP__QUERY_WORKERS", &v)?;
    }
    if let Some(v) = env("APP__QUEUE_CAPACITY") {
        settings.queue_capacity = parse_positive("APP__QUEUE_CAPACITY", &v)?;
    }
    if let Some(v) = env("APP__QUERY_TIMEOUT_MS") {
        let millis = parse_positive("APP__QUERY_TIMEOUT_MS", &v)?;
        settings.query_timeout_ms = Some(millis as u64);
    }
    if let Some(v) = env("APP__BOUNDARIES_PATH") {
        settings.boundaries_path = Some(PathBuf::from(v));
    }
    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings.database_url = normalize_database_url(&settings.database_url);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.query_workers {
        settings.query_workers = v;
    }
    if let Some(v) = file_cfg.queue_capacity {
        settings.queue_capacity = v;
    }
    if let Some(v) = file_cfg.query_timeout_ms {
        settings.query_timeout_ms = Some(v);
    }
    if let Some(v) = file_cfg.boundaries_path {
        settings.boundaries_path = Some(v);
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

fn parse_positive(key: &str, raw: &str) -> anyhow::Result<usize> {
    let value = raw
        .trim()
        .parse::<usize>()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))?;
    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}

/// Plain file paths become `sqlite://` URLs; anything that already names a
/// scheme is kept as is.
pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.replace('\\', "/");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
