//! # Google Sheets Ledger Client
//!
//! Implements [`Ledger`] on top of the Sheets v4 REST API.
//!
//! ## Authentication
//!
//! - API key: appended as the `key` query parameter
//! - Service account: `Authorization: Bearer <token>` from
//!   [`ServiceAccountAuthenticator`]
//!
//! Writes use `valueInputOption=RAW` so values land exactly as sent.
//!
//! ## References
//!
//! - API Documentation: https://developers.google.com/sheets/api/reference/rest

use crate::domain::entities::cell::Cell;
use crate::domain::repositories::ledger::{
    Ledger, LedgerError, LedgerResult, SheetInfo, SpreadsheetMetadata,
};
use crate::infrastructure::service_account::{ServiceAccountAuthenticator, ServiceAccountKey};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;
use zeroize::Zeroizing;

/// Google Sheets v4 API base URL
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

const METADATA_FIELDS: &str = "properties.title,sheets.properties(sheetId,title)";

/// How requests to the Sheets API are authorized
pub enum SheetsAuth {
    ApiKey(Zeroizing<String>),
    ServiceAccount(ServiceAccountAuthenticator),
}

impl std::fmt::Debug for SheetsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetsAuth::ApiKey(_) => f.write_str("ApiKey(<REDACTED>)"),
            SheetsAuth::ServiceAccount(auth) => {
                write!(f, "ServiceAccount({})", auth.client_email())
            }
        }
    }
}

/// Google Sheets client configuration
#[derive(Debug, Clone)]
pub struct GoogleSheetsConfig {
    pub api_base: String,
    pub request_timeout: Duration,
}

impl Default for GoogleSheetsConfig {
    fn default() -> Self {
        Self {
            api_base: SHEETS_API_BASE.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeRequest<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<Vec<Cell>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    properties: Option<SpreadsheetProperties>,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
}

/// Google Sheets client
#[derive(Debug)]
pub struct GoogleSheetsClient {
    client: Client,
    config: GoogleSheetsConfig,
    auth: SheetsAuth,
    cancel: CancellationToken,
}

impl GoogleSheetsClient {
    fn build_http_client(config: &GoogleSheetsConfig) -> Result<Client, String> {
        Client::builder()
            .user_agent("TrackMyCoin/0.1.0")
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))
    }

    /// Create a client authorized with a plain API key
    pub fn new_with_api_key(api_key: &str, config: GoogleSheetsConfig) -> Result<Self, String> {
        if api_key.is_empty() {
            return Err("API key cannot be empty".to_string());
        }

        Ok(Self {
            client: Self::build_http_client(&config)?,
            config,
            auth: SheetsAuth::ApiKey(Zeroizing::new(api_key.to_string())),
            cancel: CancellationToken::new(),
        })
    }

    /// Create a client authorized through a service account
    pub fn new_with_service_account(
        key: ServiceAccountKey,
        config: GoogleSheetsConfig,
    ) -> Result<Self, String> {
        let client = Self::build_http_client(&config)?;
        let auth = SheetsAuth::ServiceAccount(ServiceAccountAuthenticator::new(client.clone(), key));

        Ok(Self {
            client,
            config,
            auth,
            cancel: CancellationToken::new(),
        })
    }

    /// Abort in-flight requests once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn auth(&self) -> &SheetsAuth {
        &self.auth
    }

    async fn cancellable<F: Future>(&self, future: F) -> LedgerResult<F::Output> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(LedgerError::Cancelled),
            output = future => Ok(output),
        }
    }

    /// `{base}/spreadsheets/{id}/...` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> LedgerResult<Url> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| LedgerError::Request(format!("Invalid API base: {}", e)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| LedgerError::Request("API base cannot be a base URL".to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn values_endpoint(&self, spreadsheet_id: &str, range: &str) -> LedgerResult<Url> {
        self.endpoint(&["spreadsheets", spreadsheet_id, "values", range])
    }

    async fn authorize(&self, request: RequestBuilder) -> LedgerResult<RequestBuilder> {
        match &self.auth {
            SheetsAuth::ApiKey(key) => Ok(request.query(&[("key", key.as_str())])),
            SheetsAuth::ServiceAccount(authenticator) => {
                let token = self.cancellable(authenticator.access_token()).await??;
                Ok(request.bearer_auth(token))
            }
        }
    }

    async fn send(&self, request: RequestBuilder) -> LedgerResult<Response> {
        let request = self.authorize(request).await?;
        let response = self
            .cancellable(request.send())
            .await?
            .map_err(|e| LedgerError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = self.cancellable(response.text()).await?.unwrap_or_default();
            return Err(LedgerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn decode<T: serde::de::DeserializeOwned>(&self, response: Response) -> LedgerResult<T> {
        self.cancellable(response.json::<T>())
            .await?
            .map_err(|e| LedgerError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Ledger for GoogleSheetsClient {
    fn name(&self) -> &str {
        "GoogleSheets"
    }

    async fn read_metadata(&self, spreadsheet_id: &str) -> LedgerResult<SpreadsheetMetadata> {
        let url = self.endpoint(&["spreadsheets", spreadsheet_id])?;
        let request = self.client.get(url).query(&[("fields", METADATA_FIELDS)]);

        let body: SpreadsheetResponse = self.decode(self.send(request).await?).await?;

        Ok(SpreadsheetMetadata {
            title: body.properties.map(|p| p.title).unwrap_or_default(),
            sheets: body
                .sheets
                .into_iter()
                .map(|sheet| SheetInfo {
                    title: sheet.properties.title,
                    id: sheet.properties.sheet_id,
                })
                .collect(),
        })
    }

    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> LedgerResult<Vec<Vec<Cell>>> {
        let url = self.values_endpoint(spreadsheet_id, range)?;
        let body: ValueRangeResponse = self.decode(self.send(self.client.get(url)).await?).await?;

        let rows: Vec<Vec<Cell>> = body
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(Cell::from).collect())
            .collect();

        debug!("Read {} rows from {}", rows.len(), range);
        Ok(rows)
    }

    async fn clear_range(&self, spreadsheet_id: &str, range: &str) -> LedgerResult<()> {
        let clear = format!("{}:clear", range);
        let url = self.endpoint(&["spreadsheets", spreadsheet_id, "values", &clear])?;
        let request = self.client.post(url).json(&serde_json::json!({}));

        self.send(request).await?;
        debug!("Cleared {}", range);
        Ok(())
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<Cell>>,
    ) -> LedgerResult<()> {
        let url = self.values_endpoint(spreadsheet_id, range)?;
        let rows = values.len();
        let body = ValueRangeRequest {
            range,
            major_dimension: "ROWS",
            values,
        };
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&body);

        self.send(request).await?;
        debug!("Wrote {} rows to {}", rows, range);
        Ok(())
    }
}
