//! HTTP client for the upstream invoice API and the public market API.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::time::Duration;

use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::{DocumentRetrievalError, FetchError, SessionError};
use crate::record::{CoinMarket, Invoice, Record, normalize_batch};
use crate::store::RecordSource;

/// An invoice PDF, passed through as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    pub invoice_id: String,
    pub bytes: Vec<u8>,
}

/// Successful answer from the upstream login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginGrant {
    pub token: String,
    /// Display name of the signed-in user.
    pub comment: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct LoginRejection {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_base: String,
    markets_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("fast-einvoice/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ApiClient {
            http,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            markets_url: config.markets_url.clone(),
        })
    }

    pub fn invoices_url(&self) -> String {
        format!("{}/api/getInvdata", self.api_base)
    }

    pub fn pdf_url(&self, invoice_id: &str) -> String {
        format!(
            "{}/api/getPdfInv?id={}",
            self.api_base,
            urlencoding::encode(invoice_id)
        )
    }

    pub fn login_url(&self) -> String {
        format!("{}/api/login", self.api_base)
    }

    async fn get_array(&self, url: &str) -> Result<Vec<Json>, FetchError> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<Json>>()
            .await
            .map_err(|e| FetchError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn fetch_invoices(&self) -> Result<Vec<Record>, FetchError> {
        let raw = self.get_array(&self.invoices_url()).await?;
        Ok(normalize_batch::<Invoice>(&raw))
    }

    pub async fn fetch_markets(&self) -> Result<Vec<Record>, FetchError> {
        let raw = self.get_array(&self.markets_url).await?;
        Ok(normalize_batch::<CoinMarket>(&raw))
    }

    pub async fn fetch(&self, dataset: Dataset) -> Result<Vec<Record>, FetchError> {
        match dataset {
            Dataset::Invoices => self.fetch_invoices().await,
            Dataset::Crypto => self.fetch_markets().await,
        }
    }

    pub async fn fetch_invoice_pdf(
        &self,
        invoice_id: &str,
    ) -> Result<PdfDocument, DocumentRetrievalError> {
        let url = self.pdf_url(invoice_id);
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DocumentRetrievalError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocumentRetrievalError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DocumentRetrievalError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Err(DocumentRetrievalError::Empty(invoice_id.to_string()));
        }

        Ok(PdfDocument {
            invoice_id: invoice_id.to_string(),
            bytes: bytes.to_vec(),
        })
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginGrant, SessionError> {
        let response = self
            .http
            .post(self.login_url())
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| SessionError::Unreachable(e.to_string()))?;

        if response.status().is_success() {
            let grant = response
                .json::<LoginGrant>()
                .await
                .map_err(|e| SessionError::Unreachable(e.to_string()))?;
            info!("upstream accepted login for {}", username);
            return Ok(grant);
        }

        let rejection = response.json::<LoginRejection>().await.unwrap_or_default();
        Err(SessionError::Rejected(
            rejection
                .message
                .unwrap_or_else(|| "Login failed".to_string()),
        ))
    }

    /// Record source for one dataset, for use with a store.
    pub fn source(&self, dataset: Dataset) -> DatasetSource<'_> {
        DatasetSource {
            client: self,
            dataset,
        }
    }
}

pub struct DatasetSource<'a> {
    client: &'a ApiClient,
    dataset: Dataset,
}

impl RecordSource for DatasetSource<'_> {
    async fn fetch(&self) -> Result<Vec<Record>, FetchError> {
        self.client.fetch(self.dataset).await
    }
}
