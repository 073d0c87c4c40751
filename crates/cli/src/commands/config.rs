use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use slideboard_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = match config_file_path.as_deref().map(load_config_file_doc) {
        Some(Ok(doc)) => Some(doc),
        Some(Err(error)) => return format!("config inspection failed: {error:#}"),
        None => None,
    };

    let fields: [(&str, String, &[&str]); 8] = [
        ("database.url", config.database.url.clone(), &["SLIDEBOARD_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["SLIDEBOARD_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["SLIDEBOARD_DATABASE_TIMEOUT_SECS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["SLIDEBOARD_LOGGING_LEVEL", "SLIDEBOARD_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["SLIDEBOARD_LOGGING_FORMAT", "SLIDEBOARD_LOG_FORMAT"],
        ),
        (
            "quotes.default_valid_days",
            config.quotes.default_valid_days.to_string(),
            &["SLIDEBOARD_QUOTES_DEFAULT_VALID_DAYS"],
        ),
        (
            "quotes.measure_tolerance_mm",
            config.quotes.measure_tolerance_mm.to_string(),
            &["SLIDEBOARD_QUOTES_MEASURE_TOLERANCE_MM"],
        ),
        (
            "quotes.price_change_threshold",
            config.quotes.price_change_threshold.to_string(),
            &["SLIDEBOARD_QUOTES_PRICE_CHANGE_THRESHOLD"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("slideboard.toml"), PathBuf::from("config/slideboard.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: &Path) -> anyhow::Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read `{}`", path.display()))?;
    raw.parse::<Value>().with_context(|| format!("failed to parse `{}`", path.display()))
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
