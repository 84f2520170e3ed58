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

use std::time::Duration;

use crate::{
    indexer::{ClientError, IndexerClient, TransactionRecord},
    reconcile::HashReconciler,
    retry::{RetryError, RetryPolicy},
    UInt256,
};

pub const DEFAULT_FETCH_LIMIT: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found(TransactionRecord),
    NotFound,
}

impl Lookup {
    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }

    pub fn into_record(self) -> Option<TransactionRecord> {
        match self {
            Lookup::Found(record) => Some(record),
            Lookup::NotFound => None,
        }
    }
}

/// Polls an indexer for the transaction carrying a known message hash.
/// Transactions show up with a delay, so absence after a poll is not an error.
pub struct TransactionLocator<C> {
    client: C,
    retry: RetryPolicy,
    limit: u32,
    initial_delay: Duration,
}

impl<C: IndexerClient> TransactionLocator<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
            limit: DEFAULT_FETCH_LIMIT,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// One query of the latest transactions, retried on transport errors
    pub async fn find(
        &self,
        address: &str,
        target: &UInt256,
    ) -> Result<Option<TransactionRecord>, RetryError<ClientError>> {
        let records = self.retry
            .run(|| self.client.fetch_transactions(address, self.limit))
            .await?;
        log::debug!("checking {} transactions of {} for {:x}", records.len(), address, target);
        Ok(records.into_iter().find(|record| {
            match HashReconciler::matching_field(target, record) {
                Some(field) => {
                    log::info!("{:x} found in {} of transaction {:?}", target, field, record.transaction_hash());
                    true
                }
                None => false
            }
        }))
    }

    pub async fn locate(
        &self,
        address: &str,
        target: &UInt256,
        poll_delay: Duration,
        max_attempts: u32,
    ) -> Result<Lookup, RetryError<ClientError>> {
        if !self.initial_delay.is_zero() {
            log::debug!("waiting {:?} for {:x} to propagate", self.initial_delay, target);
            tokio::time::sleep(self.initial_delay).await;
        }
        for poll in 1..=max_attempts {
            if poll > 1 {
                tokio::time::sleep(poll_delay).await;
            }
            log::debug!("poll {} of {} for {:x}", poll, max_attempts, target);
            if let Some(record) = self.find(address, target).await? {
                return Ok(Lookup::Found(record))
            }
        }
        log::warn!("{:x} not found at {} after {} polls", target, address, max_attempts);
        Ok(Lookup::NotFound)
    }
}

#[cfg(test)]
#[path = "tests/test_locator.rs"]
mod tests;
