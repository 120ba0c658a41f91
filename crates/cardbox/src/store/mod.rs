/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Relational store contract for card metadata.
//!
//! The contract uses only portable relational operations - insert with a
//! uniqueness constraint, filtered query, single-row status update - so
//! behavior is identical across embedded and client-server engines. The
//! embedded reference implementation lives in [`DieselRegistryStore`].

mod diesel_store;

pub use diesel_store::DieselRegistryStore;

use async_trait::async_trait;
use semver::Version;
use uuid::Uuid;

use crate::cards::{ArtifactType, Card, CardKey, CardStatus};
use crate::error::StoreError;

/// Filter for card queries. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub uid: Option<Uuid>,
    pub name: Option<String>,
    pub team: Option<String>,
    pub artifact_type: Option<ArtifactType>,
    pub version: Option<Version>,
    pub status: Option<CardStatus>,
    pub limit: Option<i64>,
}

impl CardFilter {
    pub fn by_uid(uid: Uuid) -> Self {
        Self {
            uid: Some(uid),
            ..Self::default()
        }
    }

    pub fn for_key(key: &CardKey) -> Self {
        Self {
            name: Some(key.name.clone()),
            team: Some(key.team.clone()),
            artifact_type: Some(key.artifact_type),
            ..Self::default()
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_status(mut self, status: CardStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a card matches this filter (used by in-memory stores).
    pub fn matches(&self, card: &Card) -> bool {
        if let Some(uid) = self.uid {
            if card.uid != uid {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if &card.name != name {
                return false;
            }
        }
        if let Some(team) = &self.team {
            if &card.team != team {
                return false;
            }
        }
        if let Some(artifact_type) = self.artifact_type {
            if card.artifact_type() != artifact_type {
                return false;
            }
        }
        if let Some(version) = &self.version {
            if card.version.as_ref() != Some(version) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if card.status != status {
                return false;
            }
        }
        true
    }
}

/// Contract for relational registry backends.
///
/// `query_cards` returns rows ordered by version descending (then creation
/// time descending); that ordering is part of the contract - "first row of
/// a key-filtered query" is how callers obtain the current maximum version.
#[async_trait]
pub trait SqlRegistryStore: Send + Sync {
    /// Inserts a fully-populated card row. Fails with
    /// [`StoreError::DuplicateVersion`] when the unique constraint on
    /// (name, team, artifact_type, version) is violated.
    async fn insert_card(&self, card: &Card) -> Result<(), StoreError>;

    /// Returns matching rows, version-descending.
    async fn query_cards(&self, filter: &CardFilter) -> Result<Vec<Card>, StoreError>;

    /// Single-row status update. Sets the deprecation timestamp when the
    /// new status is `Deprecated`.
    async fn update_status(&self, uid: Uuid, status: CardStatus) -> Result<(), StoreError>;
}
