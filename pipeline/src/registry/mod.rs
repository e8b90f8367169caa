//! Fusion Metadata Registry (FMR) client.
//!
//! Two families of calls:
//!
//! - SDMX REST v2 structure queries under the configured endpoint
//!   (`{endpoint}/structure/{type}/{agency}/{id}/{version}`)
//! - The FMR data-load service at the endpoint's origin
//!   (`/ws/public/data/load` then `/ws/public/data/loadStatus`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lei_sdmx::registry::RegistryClient;
//!
//! let client = RegistryClient::new("https://fmr.meaningfuldata.eu/sdmx/v2")?;
//! let report = client.validate_data(&sdmx_csv, CsvDelimiter::Comma).await?;
//! println!("valid: {}", report.is_valid());
//! ```

pub mod report;

use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

use crate::error::{RegistryError, RegistryResult};
use crate::logs::log_info_indent;
use crate::models::{Component, StructuralReport, StructureRef};
use crate::sdmx::{parse_data_structure, parse_transformation_scheme, TransformationScheme};

pub use report::parse_load_status;

/// Accept header for SDMX-JSON 2.0 structure messages
const STRUCTURE_JSON: &str = "application/vnd.sdmx.structure+json;version=2.0.0";

/// Load statuses meaning the registry is still working
pub const STATUS_IN_PROCESS: [&str; 4] = ["Initialising", "Analysing", "Validating", "Consolidating"];

/// Load statuses meaning the load failed
pub const STATUS_ERRORS: [&str; 4] = ["IncorrectDSD", "InvalidRef", "MissingDSD", "Error"];

pub const STATUS_COMPLETE: &str = "Complete";

/// Default number of status polls after the first one
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Default delay between status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Field delimiter announced in the `Data-Format` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvDelimiter {
    #[default]
    Comma,
    Semicolon,
    Tab,
    Space,
}

impl CsvDelimiter {
    pub fn as_str(&self) -> &'static str {
        match self {
            CsvDelimiter::Comma => "comma",
            CsvDelimiter::Semicolon => "semicolon",
            CsvDelimiter::Tab => "tab",
            CsvDelimiter::Space => "space",
        }
    }
}

/// How the load status is polled.
#[derive(Debug, Clone, Copy)]
pub struct StatusPolling {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for StatusPolling {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Registry client
#[derive(Clone)]
pub struct RegistryClient {
    endpoint: String,
    base_url: String,
    http: reqwest::Client,
    polling: StatusPolling,
}

impl RegistryClient {
    /// Create a client for an SDMX REST endpoint such as
    /// `https://fmr.meaningfuldata.eu/sdmx/v2`.
    pub fn new(endpoint: &str) -> RegistryResult<Self> {
        let url = Url::parse(endpoint).map_err(|_| RegistryError::InvalidEndpoint(endpoint.to_string()))?;
        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(RegistryError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            base_url: origin.ascii_serialization(),
            http: reqwest::Client::new(),
            polling: StatusPolling::default(),
        })
    }

    /// Use a preconfigured HTTP client (timeouts, proxies, ...)
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Set the load status polling policy
    pub fn with_polling(mut self, polling: StatusPolling) -> Self {
        self.polling = polling;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Origin of the endpoint, where the FMR web services live
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the components of a data structure definition
    pub async fn get_data_structure(&self, dsd: &StructureRef) -> RegistryResult<Vec<Component>> {
        let body = self.get_structure("datastructure", dsd).await?;
        parse_data_structure(&body, dsd)
    }

    /// Fetch a VTL transformation scheme
    pub async fn get_transformation_scheme(&self, scheme: &StructureRef) -> RegistryResult<TransformationScheme> {
        let body = self.get_structure("transformationscheme", scheme).await?;
        parse_transformation_scheme(&body, scheme)
    }

    async fn get_structure(&self, kind: &str, artefact: &StructureRef) -> RegistryResult<String> {
        let url = format!(
            "{}/structure/{}/{}/{}/{}",
            self.endpoint, kind, artefact.agency, artefact.id, artefact.version
        );

        let response = self
            .http
            .get(&url)
            .header("Accept", STRUCTURE_JSON)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(artefact.short_urn()));
        }
        if !status.is_success() {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Upload SDMX-CSV text and wait for the structural validation outcome.
    ///
    /// A dataset with validation errors is a normal `Ok` result; only
    /// transport problems and failed loads are errors.
    pub async fn validate_data(&self, sdmx_csv: &str, delimiter: CsvDelimiter) -> RegistryResult<StructuralReport> {
        let uid = self.upload(sdmx_csv, delimiter).await?;
        log_info_indent(format!("Load accepted (uid {})", uid), 1);
        self.wait_for_status(&uid).await
    }

    async fn upload(&self, sdmx_csv: &str, delimiter: CsvDelimiter) -> RegistryResult<String> {
        let url = format!("{}/ws/public/data/load", self.base_url);

        let part = reqwest::multipart::Part::text(sdmx_csv.to_string())
            .file_name("data.csv")
            .mime_str("text/csv")?;
        let form = reqwest::multipart::Form::new().part("uploadFile", part);

        let response = self
            .http
            .post(&url)
            .header("Data-Format", format!("csv;delimiter={}", delimiter.as_str()))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value =
            serde_json::from_str(&body).map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;
        match json.get("uid") {
            Some(Value::String(uid)) => Ok(uid.clone()),
            Some(Value::Number(uid)) => Ok(uid.to_string()),
            _ => Err(RegistryError::InvalidResponse(format!("no uid in load response: {}", body))),
        }
    }

    async fn wait_for_status(&self, uid: &str) -> RegistryResult<StructuralReport> {
        let status_url = Url::parse_with_params(
            &format!("{}/ws/public/data/loadStatus", self.base_url),
            &[("uid", uid)],
        )
        .map_err(|_| RegistryError::InvalidEndpoint(self.base_url.clone()))?;
        let mut last_status = String::new();

        for attempt in 0..=self.polling.max_retries {
            tokio::time::sleep(self.polling.interval).await;

            let response = self.http.get(status_url.clone()).send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(RegistryError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let json: Value =
                serde_json::from_str(&body).map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;
            match parse_load_status(&json)? {
                Some(report) => return Ok(report),
                None => {
                    last_status = json["Status"].as_str().unwrap_or_default().to_string();
                    log_info_indent(
                        format!("Status '{}' ({}/{})", last_status, attempt, self.polling.max_retries),
                        1,
                    );
                }
            }
        }

        Err(RegistryError::Timeout {
            status: last_status,
            retries: self.polling.max_retries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_origin() {
        let client = RegistryClient::new("https://fmr.meaningfuldata.eu/sdmx/v2/").unwrap();
        assert_eq!(client.base_url(), "https://fmr.meaningfuldata.eu");
        assert_eq!(client.endpoint(), "https://fmr.meaningfuldata.eu/sdmx/v2");

        let local = RegistryClient::new("http://127.0.0.1:8080/sdmx/v2").unwrap();
        assert_eq!(local.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(matches!(
            RegistryClient::new("not a url"),
            Err(RegistryError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            RegistryClient::new("data:text/plain,hello"),
            Err(RegistryError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_delimiter_names() {
        assert_eq!(CsvDelimiter::default().as_str(), "comma");
        assert_eq!(CsvDelimiter::Tab.as_str(), "tab");
    }
}
