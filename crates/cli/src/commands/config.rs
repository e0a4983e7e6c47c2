use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use curio_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field {
    key: &'static str,
    env: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source =
            field_source(&field, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }
    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let recommendations = &config.recommendations;
    let weights = &recommendations.activity_weights;

    vec![
        Field {
            key: "database.url",
            env: &["CURIO_DATABASE_URL"],
            value: config.database.url.clone(),
        },
        Field {
            key: "database.max_connections",
            env: &["CURIO_DATABASE_MAX_CONNECTIONS"],
            value: config.database.max_connections.to_string(),
        },
        Field {
            key: "database.timeout_secs",
            env: &["CURIO_DATABASE_TIMEOUT_SECS"],
            value: config.database.timeout_secs.to_string(),
        },
        Field {
            key: "broker.url",
            env: &["CURIO_BROKER_URL"],
            value: redact_url(config.broker.url.expose_secret()),
        },
        Field {
            key: "broker.channel_capacity",
            env: &["CURIO_BROKER_CHANNEL_CAPACITY"],
            value: config.broker.channel_capacity.to_string(),
        },
        Field {
            key: "recommendations.max_recommendations",
            env: &["CURIO_RECOMMENDATIONS_MAX"],
            value: recommendations.max_recommendations.to_string(),
        },
        Field {
            key: "recommendations.expiry_days",
            env: &["CURIO_RECOMMENDATIONS_EXPIRY_DAYS"],
            value: recommendations.expiry_days.to_string(),
        },
        Field {
            key: "recommendations.minimum_score",
            env: &["CURIO_RECOMMENDATIONS_MINIMUM_SCORE"],
            value: recommendations.minimum_score.to_string(),
        },
        Field {
            key: "recommendations.activity_history_limit",
            env: &["CURIO_RECOMMENDATIONS_HISTORY_LIMIT"],
            value: recommendations.activity_history_limit.to_string(),
        },
        Field {
            key: "recommendations.time_decay_factor",
            env: &["CURIO_RECOMMENDATIONS_TIME_DECAY_FACTOR"],
            value: recommendations.time_decay_factor.to_string(),
        },
        Field {
            key: "recommendations.trending_threshold",
            env: &["CURIO_RECOMMENDATIONS_TRENDING_THRESHOLD"],
            value: recommendations.trending_threshold.to_string(),
        },
        Field {
            key: "recommendations.activity_weights",
            env: &[],
            value: format!(
                "purchase={} cart={} wishlist={} view={} search={}",
                weights.purchase, weights.cart, weights.wishlist, weights.view, weights.search
            ),
        },
        Field {
            key: "scheduler.enabled",
            env: &["CURIO_SCHEDULER_ENABLED"],
            value: config.scheduler.enabled.to_string(),
        },
        Field {
            key: "scheduler.batch_interval_secs",
            env: &["CURIO_SCHEDULER_BATCH_INTERVAL_SECS"],
            value: config.scheduler.batch_interval_secs.to_string(),
        },
        Field {
            key: "scheduler.batch_deadline_secs",
            env: &["CURIO_SCHEDULER_BATCH_DEADLINE_SECS"],
            value: config.scheduler.batch_deadline_secs.to_string(),
        },
        Field {
            key: "scheduler.batch_concurrency",
            env: &["CURIO_SCHEDULER_BATCH_CONCURRENCY"],
            value: config.scheduler.batch_concurrency.to_string(),
        },
        Field {
            key: "cache.product_ttl_secs",
            env: &["CURIO_CACHE_PRODUCT_TTL_SECS"],
            value: config.cache.product_ttl_secs.to_string(),
        },
        Field {
            key: "logging.level",
            env: &["CURIO_LOGGING_LEVEL", "CURIO_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key: "logging.format",
            env: &["CURIO_LOGGING_FORMAT", "CURIO_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["curio.toml", "config/curio.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    field: &Field,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = field.env.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, field.key) {
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

/// Keep the scheme and host; drop credentials and anything after the host.
fn redact_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let Some((scheme, rest)) = trimmed.split_once("://") else {
        return "<redacted>".to_string();
    };
    let authority = rest.split('/').next().unwrap_or_default();
    match authority.rsplit_once('@') {
        Some((_, host)) => format!("{scheme}://***@{host}"),
        None => format!("{scheme}://{authority}"),
    }
}
