//! Pipeline configuration.
//!
//! Values are resolved in three layers: [`PipelineConfig::default`] (the
//! public MeaningfulData FMR and the `MD:LEI_VALIDATIONS(1.0)` script),
//! then `LEI_SDMX_*` environment variables (a `.env` file is honoured),
//! then CLI flags applied by the binary.
//!
//! | Variable                    | Field                          |
//! |-----------------------------|--------------------------------|
//! | `LEI_SDMX_INPUT`            | `input_path`                   |
//! | `LEI_SDMX_ROW_LIMIT`        | `row_limit`                    |
//! | `LEI_SDMX_ENDPOINT`         | `registry_endpoint`            |
//! | `LEI_SDMX_SCRIPT_ID`        | `script_query.id`              |
//! | `LEI_SDMX_SCRIPT_AGENCY`    | `script_query.agency`          |
//! | `LEI_SDMX_SCRIPT_VERSION`   | `script_query.version`         |
//! | `LEI_SDMX_SCRIPT_ENDPOINT`  | `script_query.api_endpoint`    |
//! | `LEI_SDMX_ENGINE`           | `script_query.engine_endpoint` |
//! | `LEI_SDMX_OUTPUT`           | `output_path`                  |
//! | `LEI_SDMX_LOGS`             | `logs_folder`                  |
//! | `LEI_SDMX_TIMEOUT_SECS`     | `request_timeout_secs`         |

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::{ScriptQuery, StructureRef};
use crate::parser::DEFAULT_ROW_LIMIT;
use crate::registry::{StatusPolling, DEFAULT_MAX_RETRIES};
use crate::transform::reshape::ReshapeOptions;

/// Public FMR instance of MeaningfulData.
pub const FMR_ENDPOINT: &str = "https://fmr.meaningfuldata.eu/sdmx/v2";

pub const DEFAULT_INPUT: &str = "lei_data/gleif-goldencopy-lei2-golden-copy.csv";
pub const DEFAULT_OUTPUT: &str = "output/lei_to_sdmx.csv";
pub const DEFAULT_LOGS: &str = "log";

/// Everything [`crate::transform::pipeline::run_pipeline`] needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub input_path: PathBuf,
    /// Maximum number of data rows read from the input
    pub row_limit: usize,
    /// SDMX REST endpoint of the registry
    pub registry_endpoint: String,
    /// Data structure the dataset is bound to
    pub dsd: StructureRef,
    pub script_query: ScriptQuery,
    /// Where the SDMX-CSV goes. `None` skips writing it.
    pub output_path: Option<PathBuf>,
    /// Where the validation logs go. `None` skips writing them.
    pub logs_folder: Option<PathBuf>,
    pub reshape: ReshapeOptions,
    /// Fetch the DSD to check the columns against it
    pub fetch_structure: bool,
    pub request_timeout_secs: u64,
    pub poll_max_retries: u32,
    pub poll_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT),
            row_limit: DEFAULT_ROW_LIMIT,
            registry_endpoint: FMR_ENDPOINT.to_string(),
            dsd: StructureRef::default(),
            script_query: ScriptQuery {
                id: "LEI_VALIDATIONS".to_string(),
                agency: "MD".to_string(),
                version: "1.0".to_string(),
                api_endpoint: FMR_ENDPOINT.to_string(),
                engine_endpoint: None,
            },
            output_path: Some(PathBuf::from(DEFAULT_OUTPUT)),
            logs_folder: Some(PathBuf::from(DEFAULT_LOGS)),
            reshape: ReshapeOptions::default(),
            fetch_structure: true,
            request_timeout_secs: 60,
            poll_max_retries: DEFAULT_MAX_RETRIES,
            poll_interval_ms: 500,
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `LEI_SDMX_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("LEI_SDMX_INPUT") {
            config.input_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("LEI_SDMX_ROW_LIMIT") {
            config.row_limit = parse_var("LEI_SDMX_ROW_LIMIT", &v)?;
        }
        if let Some(v) = lookup("LEI_SDMX_ENDPOINT") {
            config.script_query.api_endpoint = v.clone();
            config.registry_endpoint = v;
        }
        if let Some(v) = lookup("LEI_SDMX_SCRIPT_ID") {
            config.script_query.id = v;
        }
        if let Some(v) = lookup("LEI_SDMX_SCRIPT_AGENCY") {
            config.script_query.agency = v;
        }
        if let Some(v) = lookup("LEI_SDMX_SCRIPT_VERSION") {
            config.script_query.version = v;
        }
        if let Some(v) = lookup("LEI_SDMX_SCRIPT_ENDPOINT") {
            config.script_query.api_endpoint = v;
        }
        if let Some(v) = lookup("LEI_SDMX_ENGINE") {
            config.script_query.engine_endpoint = Some(v);
        }
        if let Some(v) = lookup("LEI_SDMX_OUTPUT") {
            config.output_path = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("LEI_SDMX_LOGS") {
            config.logs_folder = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("LEI_SDMX_TIMEOUT_SECS") {
            config.request_timeout_secs = parse_var("LEI_SDMX_TIMEOUT_SECS", &v)?;
        }

        Ok(config)
    }

    pub fn polling(&self) -> StatusPolling {
        StatusPolling {
            max_retries: self.poll_max_retries,
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// HTTP client shared by the registry and rule engine clients.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .user_agent(concat!("lei-sdmx/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

fn parse_var<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
    })
}
