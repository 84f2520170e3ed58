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

use std::{fmt, future::Future, time::Duration};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Errors that can tell a rate limit rejection from other failures
pub trait Retryable {
    fn is_rate_limited(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error(transparent)]
    Operation(E),
    #[error("no attempt was made, retry budget is {attempts}")]
    Exhausted { attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn operation(&self) -> Option<&E> {
        match self {
            RetryError::Operation(err) => Some(err),
            RetryError::Exhausted { .. } => None,
        }
    }
}

/// What to do after a failed attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Retry { penalty: Duration },
    Fail,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts, base_delay }
    }

    /// The final attempt always fails. A rate limited attempt `n` is penalized with `n * base_delay`
    /// on top of the regular pause between attempts.
    pub fn classify<E: Retryable>(&self, attempt: u32, err: &E) -> Verdict {
        if attempt >= self.max_attempts {
            Verdict::Fail
        } else if err.is_rate_limited() {
            Verdict::Retry { penalty: self.base_delay.saturating_mul(attempt) }
        } else {
            Verdict::Retry { penalty: Duration::ZERO }
        }
    }

    /// Runs `operation` until it succeeds or the attempts are spent.
    /// Attempts are sequential and `base_delay` passes before each one but the first.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        if self.max_attempts == 0 {
            return Err(RetryError::Exhausted { attempts: 0 })
        }
        let mut attempt = 1;
        loop {
            if attempt > 1 {
                tokio::time::sleep(self.base_delay).await;
            }
            log::debug!("attempt {} of {}", attempt, self.max_attempts);
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            match self.classify(attempt, &err) {
                Verdict::Fail => {
                    log::error!("giving up after {} attempts: {}", attempt, err);
                    return Err(RetryError::Operation(err))
                }
                Verdict::Retry { penalty } if penalty.is_zero() => {
                    log::debug!("attempt {} failed: {}", attempt, err);
                }
                Verdict::Retry { penalty } => {
                    log::warn!("rate limited on attempt {}, backing off for {:?}: {}", attempt, penalty, err);
                    tokio::time::sleep(penalty).await;
                }
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
#[path = "tests/test_retry.rs"]
mod tests;
