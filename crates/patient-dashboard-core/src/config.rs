//! Runtime configuration.
//!
//! Configuration is resolved once when the dashboard is opened and then
//! handed to the services that need it. Nothing below the FFI facade reads
//! environment variables on its own.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::collection::{is_page_size_option, DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS};
use crate::sample_data::DEFAULT_BATCH_SIZE;

pub const DATABASE_PATH_VAR: &str = "PATIENT_DASHBOARD_DB";
pub const SAMPLE_SIZE_VAR: &str = "PATIENT_DASHBOARD_SAMPLE_SIZE";
pub const PAGE_SIZE_VAR: &str = "PATIENT_DASHBOARD_PAGE_SIZE";
pub const LOG_FILTER_VAR: &str = "RUST_LOG";

pub const DEFAULT_DATABASE_PATH: &str = "patient-dashboard.db";
pub const DEFAULT_LOG_FILTER: &str = "patient_dashboard_core=info";

/// Largest sample batch a single run may write.
pub const MAX_SAMPLE_BATCH_SIZE: usize = 100;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidInput(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Dashboard configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct DashboardConfig {
    database_path: PathBuf,
    sample_batch_size: usize,
    default_page_size: u32,
    log_filter: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            sample_batch_size: DEFAULT_BATCH_SIZE,
            default_page_size: DEFAULT_PAGE_SIZE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl DashboardConfig {
    /// Create a validated configuration.
    pub fn new(
        database_path: PathBuf,
        sample_batch_size: usize,
        default_page_size: u32,
        log_filter: String,
    ) -> ConfigResult<Self> {
        if database_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidInput(
                "database path cannot be empty".into(),
            ));
        }
        if !(1..=MAX_SAMPLE_BATCH_SIZE).contains(&sample_batch_size) {
            return Err(ConfigError::InvalidInput(format!(
                "sample batch size must be between 1 and {}, got {}",
                MAX_SAMPLE_BATCH_SIZE, sample_batch_size
            )));
        }
        if !is_page_size_option(default_page_size) {
            return Err(ConfigError::InvalidInput(format!(
                "page size must be one of {:?}, got {}",
                PAGE_SIZE_OPTIONS, default_page_size
            )));
        }

        Ok(Self {
            database_path,
            sample_batch_size,
            default_page_size,
            log_filter,
        })
    }

    /// Build from raw variable values. Missing or blank values fall back to
    /// the defaults.
    pub fn from_env_values(
        database_path: Option<String>,
        sample_batch_size: Option<String>,
        default_page_size: Option<String>,
        log_filter: Option<String>,
    ) -> ConfigResult<Self> {
        let defaults = Self::default();

        let database_path = non_blank(database_path)
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);
        let sample_batch_size = non_blank(sample_batch_size)
            .map(|v| parse_number(SAMPLE_SIZE_VAR, &v))
            .transpose()?
            .unwrap_or(defaults.sample_batch_size);
        let default_page_size = non_blank(default_page_size)
            .map(|v| parse_number(PAGE_SIZE_VAR, &v))
            .transpose()?
            .unwrap_or(defaults.default_page_size);
        let log_filter = non_blank(log_filter).unwrap_or(defaults.log_filter);

        Self::new(database_path, sample_batch_size, default_page_size, log_filter)
    }

    /// Read the process environment once.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_env_values(
            std::env::var(DATABASE_PATH_VAR).ok(),
            std::env::var(SAMPLE_SIZE_VAR).ok(),
            std::env::var(PAGE_SIZE_VAR).ok(),
            std::env::var(LOG_FILTER_VAR).ok(),
        )
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn sample_batch_size(&self) -> usize {
        self.sample_batch_size
    }

    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidInput(format!("{} is not a number: {}", name, value)))
}
