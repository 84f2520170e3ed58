/*
* Copyright (C) 2019-2023 EverX. All Rights Reserved.
*
* Licensed under the SOFTWARE EVALUATION License (the "License"); you may not use
* this file except in compliance with the License.
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific EVERX DEV software governing permissions and
* limitations under the License.
*/

use std::future::Future;

use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::indexer::{ClientError, IndexerClient, TransactionRecord};

pub const TESTNET_ENDPOINT: &str = "https://testnet.toncenter.com/api/v2/";
pub const MAINNET_ENDPOINT: &str = "https://toncenter.com/api/v2/";

const API_KEY_HEADER: &str = "X-API-Key";

/// `{"ok": true, "result": ..}` or `{"ok": false, "error": .., "code": ..}`
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    error: Option<String>,
    code: Option<i64>,
}

/// Toncenter HTTP API v2 client
#[derive(Clone, Debug)]
pub struct ToncenterClient {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl ToncenterClient {
    pub fn new(endpoint: &str) -> Result<Self, ClientError> {
        let http = Client::builder().use_rustls_tls().build()?;
        Ok(Self { http, endpoint: Self::parse_endpoint(endpoint)?, api_key: None })
    }

    pub fn testnet() -> Result<Self, ClientError> {
        Self::new(TESTNET_ENDPOINT)
    }

    pub fn mainnet() -> Result<Self, ClientError> {
        Self::new(MAINNET_ENDPOINT)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Replaces the default client, e.g. to set timeouts, a proxy or a user agent
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    // methods are joined to the endpoint, so it has to end with a slash
    fn parse_endpoint(endpoint: &str) -> Result<Url, ClientError> {
        if endpoint.ends_with('/') {
            Ok(Url::parse(endpoint)?)
        } else {
            Ok(Url::parse(&format!("{}/", endpoint))?)
        }
    }

    pub async fn get_transactions(&self, address: &str, limit: u32) -> Result<Vec<TransactionRecord>, ClientError> {
        let url = self.endpoint.join("getTransactions")?;
        let limit = limit.to_string();
        let mut request = self.http
            .get(url)
            .query(&[("address", address), ("limit", limit.as_str())]);
        if let Some(api_key) = &self.api_key {
            request = request.header(API_KEY_HEADER, api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            log::warn!("getTransactions for {} answered {}", address, status);
            return Err(ClientError::Status { code: status.as_u16(), body })
        }

        let answer: ApiResponse<Vec<TransactionRecord>> = serde_json::from_str(&body)?;
        if !answer.ok {
            return Err(ClientError::Api {
                code: answer.code,
                message: answer.error.unwrap_or_default(),
            })
        }
        let records = answer.result.ok_or_else(|| ClientError::Api {
            code: answer.code,
            message: "missing result in successful response".to_string(),
        })?;
        log::trace!("getTransactions for {} returned {} records", address, records.len());
        Ok(records)
    }
}

impl IndexerClient for ToncenterClient {
    fn fetch_transactions(
        &self,
        address: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, ClientError>> + Send {
        self.get_transactions(address, limit)
    }
}

#[cfg(test)]
#[path = "tests/test_toncenter.rs"]
mod tests;
