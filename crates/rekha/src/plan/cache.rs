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

use crate::plan::PlanBatch;
use sha2::{Digest, Sha256};

/// Identity of a plan request: which data the model saw and how many charts were asked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanCacheKey {
    pub fingerprint: String,
    pub chart_count: usize,
}

impl PlanCacheKey {
    pub fn new(sample_csv: &str, chart_count: usize) -> Self {
        Self {
            fingerprint: hex::encode(Sha256::digest(sample_csv.as_bytes())),
            chart_count,
        }
    }
}

/// Single-entry plan cache; a lookup with a different key discards the entry.
#[derive(Debug, Default)]
pub struct PlanCache {
    entry: Option<(PlanCacheKey, PlanBatch)>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> Option<&PlanCacheKey> {
        self.entry.as_ref().map(|(key, _)| key)
    }

    pub fn get(&self, key: &PlanCacheKey) -> Option<&PlanBatch> {
        match &self.entry {
            Some((cached, batch)) if cached == key => Some(batch),
            _ => None,
        }
    }

    /// Batch for the current entry regardless of key.
    pub fn current(&self) -> Option<&PlanBatch> {
        self.entry.as_ref().map(|(_, batch)| batch)
    }

    pub fn current_mut(&mut self) -> Option<&mut PlanBatch> {
        self.entry.as_mut().map(|(_, batch)| batch)
    }

    pub fn insert(&mut self, key: PlanCacheKey, batch: PlanBatch) {
        tracing::debug!(fingerprint = %key.fingerprint, count = key.chart_count, "plan cache updated");
        self.entry = Some((key, batch));
    }

    /// Drops the entry unless it matches `key`; returns whether it survived.
    pub fn retain_if(&mut self, key: &PlanCacheKey) -> bool {
        let keep = self.key() == Some(key);
        if !keep && self.entry.is_some() {
            tracing::debug!("plan cache invalidated");
            self.entry = None;
        }
        keep
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
