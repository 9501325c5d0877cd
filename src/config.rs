use chrono::{Duration, FixedOffset, Local};
use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use crate::models::StatusThresholds;

/// Backend de armazenamento das caronas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RideStoreKind {
    Json,
    Mongo,
}

impl FromStr for RideStoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "file" | "memory" => Ok(RideStoreKind::Json),
            "mongo" | "mongodb" => Ok(RideStoreKind::Mongo),
            other => Err(format!("unknown ride store '{}' (expected json or mongo)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusCheckerConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    pub thresholds: StatusThresholds,
}

#[derive(Debug, Clone)]
pub struct LimiterConfig {
    pub cooldown: Duration,
    pub max_requests: usize,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        LimiterConfig {
            cooldown: Duration::minutes(10),
            max_requests: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub data_dir: PathBuf,
    pub ride_store: RideStoreKind,
    pub database_url: Option<String>,
    pub persist_rides: bool,
    pub status_checker: StatusCheckerConfig,
    pub limiter: LimiterConfig,
    /// Fuso usado para interpretar `departureDate` + `departureTime`
    pub utc_offset: FixedOffset,
    pub cors_origins: Vec<String>,
    /// Monta o roteador `/debug` (nunca em produção)
    pub debug_routes: bool,
}

/// Intervalo mínimo do verificador de status
const MIN_INTERVAL_SECS: u64 = 5;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://localhost:5173,http://localhost:8081,http://localhost:19006";

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("⚠️  JWT_SECRET not set, using insecure default");
            "default-secret-change-me".to_string()
        });

        let utc_offset = env::var("RIDE_UTC_OFFSET_MINS")
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
            .and_then(|mins| FixedOffset::east_opt(mins * 60))
            .unwrap_or_else(|| *Local::now().offset());

        AppConfig {
            host: try_load("HOST", "0.0.0.0"),
            port: try_load("PORT", "5000"),
            environment: try_load("APP_ENV", "development"),
            jwt_secret,
            data_dir: PathBuf::from(try_load::<String>("DATA_DIR", "data")),
            ride_store: try_load("RIDE_STORE", "json"),
            database_url: env::var("DATABASE_URL").ok(),
            persist_rides: flag("PERSIST_RIDES", true),
            status_checker: StatusCheckerConfig {
                enabled: flag("RIDE_STATUS_CHECKER_ENABLED", true),
                interval_secs: try_load::<u64>("RIDE_STATUS_INTERVAL_SECS", "300")
                    .max(MIN_INTERVAL_SECS),
                thresholds: StatusThresholds {
                    completion: Duration::minutes(try_load("RIDE_COMPLETION_THRESHOLD_MINS", "60")),
                    delete: Duration::minutes(try_load("RIDE_DELETE_THRESHOLD_MINS", "180")),
                    hard_delete: Duration::minutes(try_load("RIDE_HARD_DELETE_THRESHOLD_MINS", "720")),
                    unmark_window: Duration::hours(1),
                },
            },
            limiter: LimiterConfig {
                cooldown: Duration::minutes(try_load("RIDE_COOLDOWN_MINS", "10")),
                max_requests: try_load("RIDE_MAX_REQUESTS", "3"),
            },
            utc_offset,
            cors_origins: try_load::<String>("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            debug_routes: flag("DEBUG_ROUTES_ENABLED", false),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_routes && !self.is_production()
    }

    pub fn rides_file(&self) -> PathBuf {
        self.data_dir.join("rides.json")
    }

    pub fn universities_file(&self) -> PathBuf {
        self.data_dir.join("us_universities.json")
    }

    pub fn cities_file(&self) -> PathBuf {
        self.data_dir.join("us_cities.json")
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        log::debug!("{} not set, using default: {}", key, default);
        default.to_string()
    });

    raw.parse().unwrap_or_else(|e| {
        log::warn!("⚠️  Invalid {} value '{}': {}, using default {}", key, raw, e, default);
        default
            .parse()
            .unwrap_or_else(|_| panic!("default for {} must parse", key))
    })
}

fn flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}
