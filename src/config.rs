//! Configuration for the engine and the HTTP server.
//!
//! Engine constants live in [`EngineConfig`] and are passed explicitly into
//! every engine call; nothing is compiled into the calculation paths.

use std::env;

use serde::{Deserialize, Serialize};

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 8000;

/// Default bound on cached usage profiles.
const DEFAULT_CACHE_MAX_ENTRIES: usize = 1024;

/// Default target service level for PAR calculations.
pub const DEFAULT_SERVICE_LEVEL: f64 = 0.95;

/// Tunable constants of the analysis and PAR model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How often stock is reviewed and reordered, in days.
    ///
    /// Drives `max_par` and the regular `next_review_date`.
    pub review_period_days: u32,

    /// Relative slope threshold for trend classification.
    ///
    /// A slope beyond `trend_epsilon * average_daily_usage` (per day) counts
    /// as increasing or decreasing.
    pub trend_epsilon: f64,

    /// Window length (days) from which seasonality is grouped by calendar
    /// month instead of by ISO week.
    pub monthly_grouping_min_days: u32,

    /// Month-of-year strength above which usage counts as seasonal.
    pub seasonal_strength_threshold: f64,

    /// Sample size (days) at which the confidence level stops being
    /// penalised for a short window.
    pub full_confidence_days: u32,

    /// Rounding granularity for stock quantities (1.0 = whole units).
    pub quantity_unit: f64,

    /// Longest analysis window accepted, in days.
    pub max_window_days: u32,

    /// Lead time for items without an explicit or per-item lead time.
    pub default_lead_time_days: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            review_period_days: 7,
            trend_epsilon: 0.01,
            monthly_grouping_min_days: 60,
            seasonal_strength_threshold: 0.2,
            full_confidence_days: 30,
            quantity_unit: 1.0,
            max_window_days: 3660,
            default_lead_time_days: 14,
        }
    }
}

/// Server configuration, loaded from `PARLOGIC_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub default_service_level: f64,
    pub cache_enabled: bool,
    pub cache_max_entries: usize,
    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            default_service_level: DEFAULT_SERVICE_LEVEL,
            cache_enabled: true,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the environment.
    ///
    /// Absent or unparsable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let engine = EngineConfig {
            review_period_days: env_or(
                "PARLOGIC_REVIEW_PERIOD_DAYS",
                defaults.engine.review_period_days,
            ),
            max_window_days: env_or(
                "PARLOGIC_MAX_WINDOW_DAYS",
                defaults.engine.max_window_days,
            ),
            default_lead_time_days: env_or(
                "PARLOGIC_DEFAULT_LEAD_TIME_DAYS",
                defaults.engine.default_lead_time_days,
            ),
            ..defaults.engine
        };

        Self {
            port: env_or("PARLOGIC_PORT", defaults.port),
            default_service_level: env_or(
                "PARLOGIC_DEFAULT_SERVICE_LEVEL",
                defaults.default_service_level,
            ),
            cache_enabled: env_or("PARLOGIC_CACHE_ENABLED", defaults.cache_enabled),
            cache_max_entries: env_or("PARLOGIC_CACHE_MAX_ENTRIES", defaults.cache_max_entries),
            engine,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
