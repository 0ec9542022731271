// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed-delay retry schedule for AI calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

/// Final failure of a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryError<E> {
    pub error: E,
    pub attempts: u32,
    /// False when the operation stopped on a non-retryable error.
    pub exhausted: bool,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `operation` until it succeeds, hits a non-retryable error, or runs out of attempts.
    ///
    /// `on_failure` sees every failed attempt with its 1-based number and whether
    /// another attempt will follow.
    pub async fn run<T, E, F, Fut, R, O>(
        &self,
        mut operation: F,
        is_retryable: R,
        mut on_failure: O,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        O: FnMut(u32, &E, bool),
    {
        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    debug!(attempt, "operation succeeded");
                    return Ok(value);
                }
                Err(error) => {
                    let retryable = is_retryable(&error);
                    let will_retry = retryable && attempt < self.max_attempts;
                    on_failure(attempt, &error, will_retry);
                    if !will_retry {
                        if retryable {
                            warn!(attempts = attempt, "retry budget exhausted");
                        }
                        return Err(RetryError {
                            error,
                            attempts: attempt,
                            exhausted: retryable,
                        });
                    }
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}
