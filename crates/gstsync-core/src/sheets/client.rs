//! Google Sheets v4 values client.

use std::path::Path;

use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::SheetsError;

use super::auth::{ServiceAccountKey, TokenProvider};
use super::{Result, UpdateValuesResponse, ValuesApi};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Values are parsed as if typed into the UI (numbers stay numbers).
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: [&'a [String]; 1],
}

/// Authenticated client for the Sheets values API.
///
/// Create one per run and share it across writes; the HTTP connection
/// pool and the access token are reused.
pub struct SheetsClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    api_base: String,
}

impl SheetsClient {
    pub fn new(key: ServiceAccountKey) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("gstsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            tokens: TokenProvider::new(key)?,
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Load the service account key and build a client.
    pub fn from_key_file(path: &Path) -> Result<Self> {
        Self::new(ServiceAccountKey::from_file(path)?)
    }

    /// Point the client at a different API root.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn client_email(&self) -> &str {
        self.tokens.client_email()
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| SheetsError::BaseUrl(format!("{}: {}", self.api_base, e)))?;

        url.path_segments_mut()
            .map_err(|_| SheetsError::BaseUrl(self.api_base.clone()))?
            .pop_if_empty()
            .extend(["spreadsheets", spreadsheet_id, "values", range]);

        url.query_pairs_mut()
            .append_pair("valueInputOption", VALUE_INPUT_OPTION);

        Ok(url)
    }
}

impl ValuesApi for SheetsClient {
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: &[String],
    ) -> Result<UpdateValuesResponse> {
        let url = self.values_url(spreadsheet_id, range)?;
        let token = self.tokens.access_token(&self.http).await?;

        let body = ValueRange {
            range,
            major_dimension: "ROWS",
            values: [values],
        };

        trace!("PUT {}", url);

        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let updated: UpdateValuesResponse = response.json().await?;
        debug!(
            "Updated {} ({} cells)",
            updated.updated_range.as_deref().unwrap_or(range),
            updated.updated_cells.unwrap_or_default()
        );

        Ok(updated)
    }
}
