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

use std::{fs, path::Path, str::FromStr, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    fail,
    locator::{TransactionLocator, DEFAULT_FETCH_LIMIT},
    retry::{RetryPolicy, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY},
    toncenter::{ToncenterClient, TESTNET_ENDPOINT},
    Error, Result,
};

/// Settings of a transaction locator talking to Toncenter, every field is optional in JSON
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub limit: u32,
    /// Pause before the first poll, transactions need time to reach the indexer
    pub initial_delay_ms: u64,
    pub poll_delay_ms: u64,
    pub max_polls: u32,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            endpoint: TESTNET_ENDPOINT.to_string(),
            api_key: None,
            limit: DEFAULT_FETCH_LIMIT,
            initial_delay_ms: 10_000,
            poll_delay_ms: 5_000,
            max_polls: 10,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
        }
    }
}

impl LocatorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("failed to parse locator config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            fail!("locator config has an empty endpoint")
        }
        if self.limit == 0 {
            fail!("locator config limit must be positive")
        }
        Ok(())
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_delay_ms))
    }

    pub fn build_client(&self) -> Result<ToncenterClient> {
        let client = ToncenterClient::new(&self.endpoint)?;
        Ok(match &self.api_key {
            Some(api_key) => client.with_api_key(api_key.clone()),
            None => client,
        })
    }

    pub fn build_locator(&self) -> Result<TransactionLocator<ToncenterClient>> {
        Ok(TransactionLocator::new(self.build_client()?)
            .with_retry_policy(self.retry_policy())
            .with_limit(self.limit)
            .with_initial_delay(self.initial_delay()))
    }
}

impl FromStr for LocatorConfig {
    type Err = Error;
    fn from_str(json: &str) -> Result<Self> {
        Self::from_json(json)
    }
}

#[cfg(test)]
#[path = "tests/test_config.rs"]
mod tests;
