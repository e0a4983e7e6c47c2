use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::activity::ActivityType;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub broker: BrokerConfig,
    pub recommendations: RecommendationConfig,
    pub scheduler: SchedulerConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct BrokerConfig {
    /// Transport address. May embed credentials, so it is kept secret.
    pub url: SecretString,
    pub channel_capacity: usize,
}

/// Tunables for candidate selection, scoring and set lifetime.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendationConfig {
    pub max_recommendations: usize,
    pub expiry_days: u32,
    pub minimum_score: f64,
    pub activity_history_limit: usize,
    pub time_decay_factor: f64,
    pub trending_threshold: usize,
    pub activity_weights: ActivityWeights,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityWeights {
    pub purchase: f64,
    pub cart: f64,
    pub wishlist: f64,
    pub view: f64,
    pub search: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub batch_interval_secs: u64,
    pub batch_deadline_secs: u64,
    pub batch_concurrency: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// Zero disables product caching.
    pub product_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub max_recommendations: Option<usize>,
    pub scheduler_enabled: Option<bool>,
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

impl Default for ActivityWeights {
    fn default() -> Self {
        Self { purchase: 1.0, cart: 0.8, wishlist: 0.7, view: 0.5, search: 0.3 }
    }
}

impl ActivityWeights {
    pub fn weight(&self, activity_type: ActivityType) -> f64 {
        match activity_type {
            ActivityType::Purchase => self.purchase,
            ActivityType::Cart => self.cart,
            ActivityType::Wishlist => self.wishlist,
            ActivityType::View => self.view,
            ActivityType::Search => self.search,
        }
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 5,
            expiry_days: 7,
            minimum_score: 0.3,
            activity_history_limit: 50,
            time_decay_factor: 0.9,
            trending_threshold: 10,
            activity_weights: ActivityWeights::default(),
        }
    }
}

impl RecommendationConfig {
    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.expiry_days))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_interval_secs: 86_400,
            batch_deadline_secs: 900,
            batch_concurrency: 4,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.batch_interval_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.batch_deadline_secs)
    }
}

impl CacheConfig {
    pub fn product_ttl(&self) -> Duration {
        Duration::from_secs(self.product_ttl_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://curio.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            broker: BrokerConfig {
                url: secret_value("memory://local".to_string()),
                channel_capacity: 256,
            },
            recommendations: RecommendationConfig::default(),
            scheduler: SchedulerConfig::default(),
            cache: CacheConfig { product_ttl_secs: 300 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("curio.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
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

        if let Some(broker) = patch.broker {
            if let Some(url) = broker.url {
                self.broker.url = secret_value(url);
            }
            if let Some(channel_capacity) = broker.channel_capacity {
                self.broker.channel_capacity = channel_capacity;
            }
        }

        if let Some(recommendations) = patch.recommendations {
            let target = &mut self.recommendations;
            if let Some(value) = recommendations.max_recommendations {
                target.max_recommendations = value;
            }
            if let Some(value) = recommendations.expiry_days {
                target.expiry_days = value;
            }
            if let Some(value) = recommendations.minimum_score {
                target.minimum_score = value;
            }
            if let Some(value) = recommendations.activity_history_limit {
                target.activity_history_limit = value;
            }
            if let Some(value) = recommendations.time_decay_factor {
                target.time_decay_factor = value;
            }
            if let Some(value) = recommendations.trending_threshold {
                target.trending_threshold = value;
            }
            if let Some(weights) = recommendations.activity_weights {
                let current = &mut target.activity_weights;
                current.purchase = weights.purchase.unwrap_or(current.purchase);
                current.cart = weights.cart.unwrap_or(current.cart);
                current.wishlist = weights.wishlist.unwrap_or(current.wishlist);
                current.view = weights.view.unwrap_or(current.view);
                current.search = weights.search.unwrap_or(current.search);
            }
        }

        if let Some(scheduler) = patch.scheduler {
            if let Some(enabled) = scheduler.enabled {
                self.scheduler.enabled = enabled;
            }
            if let Some(value) = scheduler.batch_interval_secs {
                self.scheduler.batch_interval_secs = value;
            }
            if let Some(value) = scheduler.batch_deadline_secs {
                self.scheduler.batch_deadline_secs = value;
            }
            if let Some(value) = scheduler.batch_concurrency {
                self.scheduler.batch_concurrency = value;
            }
        }

        if let Some(cache) = patch.cache {
            if let Some(product_ttl_secs) = cache.product_ttl_secs {
                self.cache.product_ttl_secs = product_ttl_secs;
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
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CURIO_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CURIO_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("CURIO_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CURIO_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CURIO_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CURIO_BROKER_URL") {
            self.broker.url = secret_value(value);
        }
        if let Some(value) = read_env("CURIO_BROKER_CHANNEL_CAPACITY") {
            self.broker.channel_capacity = parse_usize("CURIO_BROKER_CHANNEL_CAPACITY", &value)?;
        }

        let recommendations = &mut self.recommendations;
        if let Some(value) = read_env("CURIO_RECOMMENDATIONS_MAX") {
            recommendations.max_recommendations = parse_usize("CURIO_RECOMMENDATIONS_MAX", &value)?;
        }
        if let Some(value) = read_env("CURIO_RECOMMENDATIONS_EXPIRY_DAYS") {
            recommendations.expiry_days = parse_u32("CURIO_RECOMMENDATIONS_EXPIRY_DAYS", &value)?;
        }
        if let Some(value) = read_env("CURIO_RECOMMENDATIONS_MINIMUM_SCORE") {
            recommendations.minimum_score =
                parse_f64("CURIO_RECOMMENDATIONS_MINIMUM_SCORE", &value)?;
        }
        if let Some(value) = read_env("CURIO_RECOMMENDATIONS_HISTORY_LIMIT") {
            recommendations.activity_history_limit =
                parse_usize("CURIO_RECOMMENDATIONS_HISTORY_LIMIT", &value)?;
        }
        if let Some(value) = read_env("CURIO_RECOMMENDATIONS_TIME_DECAY_FACTOR") {
            recommendations.time_decay_factor =
                parse_f64("CURIO_RECOMMENDATIONS_TIME_DECAY_FACTOR", &value)?;
        }
        if let Some(value) = read_env("CURIO_RECOMMENDATIONS_TRENDING_THRESHOLD") {
            recommendations.trending_threshold =
                parse_usize("CURIO_RECOMMENDATIONS_TRENDING_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("CURIO_SCHEDULER_ENABLED") {
            self.scheduler.enabled = parse_bool("CURIO_SCHEDULER_ENABLED", &value)?;
        }
        if let Some(value) = read_env("CURIO_SCHEDULER_BATCH_INTERVAL_SECS") {
            self.scheduler.batch_interval_secs =
                parse_u64("CURIO_SCHEDULER_BATCH_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("CURIO_SCHEDULER_BATCH_DEADLINE_SECS") {
            self.scheduler.batch_deadline_secs =
                parse_u64("CURIO_SCHEDULER_BATCH_DEADLINE_SECS", &value)?;
        }
        if let Some(value) = read_env("CURIO_SCHEDULER_BATCH_CONCURRENCY") {
            self.scheduler.batch_concurrency =
                parse_usize("CURIO_SCHEDULER_BATCH_CONCURRENCY", &value)?;
        }

        if let Some(value) = read_env("CURIO_CACHE_PRODUCT_TTL_SECS") {
            self.cache.product_ttl_secs = parse_u64("CURIO_CACHE_PRODUCT_TTL_SECS", &value)?;
        }

        let log_level = read_env("CURIO_LOGGING_LEVEL").or_else(|| read_env("CURIO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("CURIO_LOGGING_FORMAT").or_else(|| read_env("CURIO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
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
        if let Some(max_recommendations) = overrides.max_recommendations {
            self.recommendations.max_recommendations = max_recommendations;
        }
        if let Some(enabled) = overrides.scheduler_enabled {
            self.scheduler.enabled = enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_broker(&self.broker)?;
        validate_recommendations(&self.recommendations)?;
        validate_scheduler(&self.scheduler)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("curio.toml"), PathBuf::from("config/curio.toml")]
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

fn validate_broker(broker: &BrokerConfig) -> Result<(), ConfigError> {
    let url = broker.url.expose_secret();
    if url.trim().is_empty() {
        return Err(ConfigError::Validation("broker.url is required".to_string()));
    }
    if !url.contains("://") {
        return Err(ConfigError::Validation(
            "broker.url must include a scheme (for example `memory://local`)".to_string(),
        ));
    }
    if broker.channel_capacity == 0 {
        return Err(ConfigError::Validation(
            "broker.channel_capacity must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_recommendations(config: &RecommendationConfig) -> Result<(), ConfigError> {
    if config.max_recommendations == 0 {
        return Err(ConfigError::Validation(
            "recommendations.max_recommendations must be greater than zero".to_string(),
        ));
    }
    if config.expiry_days == 0 {
        return Err(ConfigError::Validation(
            "recommendations.expiry_days must be greater than zero".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.minimum_score) {
        return Err(ConfigError::Validation(
            "recommendations.minimum_score must be in range 0.0..=1.0".to_string(),
        ));
    }
    if config.activity_history_limit == 0 {
        return Err(ConfigError::Validation(
            "recommendations.activity_history_limit must be greater than zero".to_string(),
        ));
    }
    if !(config.time_decay_factor > 0.0 && config.time_decay_factor <= 1.0) {
        return Err(ConfigError::Validation(
            "recommendations.time_decay_factor must be in range (0.0, 1.0]".to_string(),
        ));
    }

    let weights = config.activity_weights;
    for activity_type in ActivityType::ALL {
        let weight = weights.weight(activity_type);
        if !weight.is_finite() || weight < 0.0 {
            return Err(ConfigError::Validation(format!(
                "recommendations.activity_weights.{activity_type} must be a non-negative number"
            )));
        }
    }

    Ok(())
}

fn validate_scheduler(scheduler: &SchedulerConfig) -> Result<(), ConfigError> {
    if scheduler.batch_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "scheduler.batch_interval_secs must be greater than zero".to_string(),
        ));
    }
    if scheduler.batch_deadline_secs == 0 {
        return Err(ConfigError::Validation(
            "scheduler.batch_deadline_secs must be greater than zero".to_string(),
        ));
    }
    if scheduler.batch_concurrency == 0 {
        return Err(ConfigError::Validation(
            "scheduler.batch_concurrency must be greater than zero".to_string(),
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

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    broker: Option<BrokerPatch>,
    recommendations: Option<RecommendationPatch>,
    scheduler: Option<SchedulerPatch>,
    cache: Option<CachePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BrokerPatch {
    url: Option<String>,
    channel_capacity: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendationPatch {
    max_recommendations: Option<usize>,
    expiry_days: Option<u32>,
    minimum_score: Option<f64>,
    activity_history_limit: Option<usize>,
    time_decay_factor: Option<f64>,
    trending_threshold: Option<usize>,
    activity_weights: Option<ActivityWeightsPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ActivityWeightsPatch {
    purchase: Option<f64>,
    cart: Option<f64>,
    wishlist: Option<f64>,
    view: Option<f64>,
    search: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerPatch {
    enabled: Option<bool>,
    batch_interval_secs: Option<u64>,
    batch_deadline_secs: Option<u64>,
    batch_concurrency: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    product_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
