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

use serde::{Deserialize, Serialize};

use crate::retry::Retryable;

const TOO_MANY_REQUESTS: u16 = 429;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionId {
    pub lt: Option<String>,
    pub hash: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InMessage {
    pub hash: Option<String>,
    pub body_hash: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub value: Option<String>,
}

/// One entry of a `getTransactions` answer. Only the fields used for
/// reconciliation are kept, anything else in the JSON is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionRecord {
    pub utime: Option<u64>,
    pub transaction_id: Option<TransactionId>,
    pub in_msg: Option<InMessage>,
    pub fee: Option<String>,
}

impl TransactionRecord {
    pub fn in_msg_hash(&self) -> Option<&str> {
        self.in_msg.as_ref()?.hash.as_deref()
    }

    pub fn transaction_hash(&self) -> Option<&str> {
        self.transaction_id.as_ref()?.hash.as_deref()
    }

    pub fn in_msg_body_hash(&self) -> Option<&str> {
        self.in_msg.as_ref()?.body_hash.as_deref()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("indexer answered with HTTP status {code}: {body}")]
    Status { code: u16, body: String },
    #[error("indexer error {code:?}: {message}")]
    Api { code: Option<i64>, message: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl Retryable for ClientError {
    fn is_rate_limited(&self) -> bool {
        match self {
            ClientError::Status { code, .. } => *code == TOO_MANY_REQUESTS,
            ClientError::Api { code, .. } => *code == Some(TOO_MANY_REQUESTS as i64),
            ClientError::Http(err) => err.status().map(|status| status.as_u16()) == Some(TOO_MANY_REQUESTS),
            ClientError::Json(_) | ClientError::Url(_) => false,
        }
    }
}

/// Source of recent transactions of an account, newest first
pub trait IndexerClient {
    fn fetch_transactions(
        &self,
        address: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, ClientError>> + Send;
}

impl<C: IndexerClient> IndexerClient for &C {
    fn fetch_transactions(
        &self,
        address: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, ClientError>> + Send {
        (**self).fetch_transactions(address, limit)
    }
}

#[cfg(test)]
#[path = "tests/test_indexer.rs"]
mod tests;
