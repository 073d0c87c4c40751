use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::quoting::expiration::DEFAULT_VALID_DAYS;
use crate::quoting::reconcile::DEFAULT_TOLERANCE_MM;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub quotes: QuotesConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug)]
pub struct QuotesConfig {
    pub default_valid_days: u32,
    pub measure_tolerance_mm: i64,
    pub price_change_threshold: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Knobs the quote services read at call time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuoteEngineSettings {
    pub default_valid_days: u32,
    /// Width/height deviation (mm) still treated as the same measurement.
    pub measure_tolerance: Decimal,
    /// Catalog price movement that must be exceeded before an item is repriced.
    pub price_change_threshold: Decimal,
}

impl Default for QuoteEngineSettings {
    fn default() -> Self {
        Self {
            default_valid_days: DEFAULT_VALID_DAYS,
            measure_tolerance: Decimal::from(DEFAULT_TOLERANCE_MM),
            price_change_threshold: Decimal::new(1, 2),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub default_valid_days: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = QuoteEngineSettings::default();
        Self {
            database: DatabaseConfig {
                url: "sqlite://slideboard.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            quotes: QuotesConfig {
                default_valid_days: engine.default_valid_days,
                measure_tolerance_mm: DEFAULT_TOLERANCE_MM,
                price_change_threshold: engine.price_change_threshold,
            },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch, &path)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("slideboard.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn quote_engine_settings(&self) -> QuoteEngineSettings {
        QuoteEngineSettings {
            default_valid_days: self.quotes.default_valid_days,
            measure_tolerance: Decimal::from(self.quotes.measure_tolerance_mm),
            price_change_threshold: self.quotes.price_change_threshold,
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch, path: &Path) -> Result<(), ConfigError> {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(quotes) = patch.quotes {
            if let Some(default_valid_days) = quotes.default_valid_days {
                self.quotes.default_valid_days = default_valid_days;
            }
            if let Some(measure_tolerance_mm) = quotes.measure_tolerance_mm {
                self.quotes.measure_tolerance_mm = measure_tolerance_mm;
            }
            if let Some(threshold) = quotes.price_change_threshold {
                self.quotes.price_change_threshold =
                    threshold.trim().parse::<Decimal>().map_err(|_| {
                        ConfigError::Validation(format!(
                            "quotes.price_change_threshold in `{}` is not a decimal: `{threshold}`",
                            path.display()
                        ))
                    })?;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SLIDEBOARD_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SLIDEBOARD_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SLIDEBOARD_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SLIDEBOARD_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SLIDEBOARD_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("SLIDEBOARD_LOGGING_LEVEL").or_else(|| read_env("SLIDEBOARD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SLIDEBOARD_LOGGING_FORMAT").or_else(|| read_env("SLIDEBOARD_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("SLIDEBOARD_QUOTES_DEFAULT_VALID_DAYS") {
            self.quotes.default_valid_days =
                parse_u32("SLIDEBOARD_QUOTES_DEFAULT_VALID_DAYS", &value)?;
        }
        if let Some(value) = read_env("SLIDEBOARD_QUOTES_MEASURE_TOLERANCE_MM") {
            self.quotes.measure_tolerance_mm =
                parse_i64("SLIDEBOARD_QUOTES_MEASURE_TOLERANCE_MM", &value)?;
        }
        if let Some(value) = read_env("SLIDEBOARD_QUOTES_PRICE_CHANGE_THRESHOLD") {
            self.quotes.price_change_threshold =
                parse_decimal("SLIDEBOARD_QUOTES_PRICE_CHANGE_THRESHOLD", &value)?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(default_valid_days) = overrides.default_valid_days {
            self.quotes.default_valid_days = default_valid_days;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_logging(&self.logging)?;
        validate_quotes(&self.quotes)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("slideboard.toml"), PathBuf::from("config/slideboard.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_quotes(quotes: &QuotesConfig) -> Result<(), ConfigError> {
    if quotes.default_valid_days == 0 || quotes.default_valid_days > 365 {
        return Err(ConfigError::Validation(
            "quotes.default_valid_days must be in range 1..=365".to_string(),
        ));
    }

    if quotes.measure_tolerance_mm < 0 {
        return Err(ConfigError::Validation(
            "quotes.measure_tolerance_mm must not be negative".to_string(),
        ));
    }

    if quotes.price_change_threshold.is_sign_negative() {
        return Err(ConfigError::Validation(
            "quotes.price_change_threshold must not be negative".to_string(),
        ));
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
    quotes: Option<QuotesPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct QuotesPatch {
    default_valid_days: Option<u32>,
    measure_tolerance_mm: Option<i64>,
    price_change_threshold: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_match_quote_engine_constants() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;
        let settings = config.quote_engine_settings();

        ensure(settings.default_valid_days == 7, "refresh should extend by seven days")?;
        ensure(settings.measure_tolerance == Decimal::from(5), "tolerance should be 5mm")?;
        ensure(
            settings.price_change_threshold == Decimal::new(1, 2),
            "price threshold should be one cent",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SLIDEBOARD_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("slideboard.toml");
            fs::write(
                &path,
                r#"
[database]
url = "${TEST_SLIDEBOARD_DB}"

[quotes]
default_valid_days = 14
price_change_threshold = "0.05"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )?;
            ensure(config.quotes.default_valid_days == 14, "valid days should come from file")?;
            ensure(
                config.quotes.price_change_threshold == Decimal::new(5, 2),
                "threshold should be parsed as an exact decimal",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_SLIDEBOARD_DB"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SLIDEBOARD_LOG_LEVEL", "warn");
        env::set_var("SLIDEBOARD_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["SLIDEBOARD_LOG_LEVEL", "SLIDEBOARD_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SLIDEBOARD_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("SLIDEBOARD_QUOTES_MEASURE_TOLERANCE_MM", "8");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("slideboard.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[logging]
level = "warn"

[quotes]
measure_tolerance_mm = 3
default_valid_days = 10
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    default_valid_days: Some(30),
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.quotes.measure_tolerance_mm == 8, "env tolerance should beat the file")?;
            ensure(config.quotes.default_valid_days == 30, "override valid days should win")?;
            Ok(())
        })();

        clear_vars(&["SLIDEBOARD_DATABASE_URL", "SLIDEBOARD_QUOTES_MEASURE_TOLERANCE_MM"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SLIDEBOARD_DATABASE_URL", "postgres://elsewhere/db");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("database.url")
            );
            ensure(has_message, "validation failure should mention database.url")
        })();

        clear_vars(&["SLIDEBOARD_DATABASE_URL"]);
        result
    }

    #[test]
    fn malformed_threshold_env_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SLIDEBOARD_QUOTES_PRICE_CHANGE_THRESHOLD", "one cent");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected malformed threshold to be rejected".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(error, ConfigError::InvalidEnvOverride { ref key, .. }
                    if key == "SLIDEBOARD_QUOTES_PRICE_CHANGE_THRESHOLD"),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["SLIDEBOARD_QUOTES_PRICE_CHANGE_THRESHOLD"]);
        result
    }
}
