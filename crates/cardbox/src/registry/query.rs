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

//! Read-only listing and loading API.
//!
//! Never invokes the version resolver or the lineage validator; queries go
//! straight to the relational store, and payload access goes through the
//! returned [`ArtifactHandle`].

use std::fmt;
use std::sync::Arc;

use semver::Version;
use tracing::debug;
use uuid::Uuid;

use crate::cards::{ArtifactType, Card, CardStatus, CardSummary};
use crate::error::RegistryError;
use crate::storage::ArtifactHandle;
use crate::store::{CardFilter, SqlRegistryStore};

/// Which version of a key to load.
#[derive(Debug, Clone)]
pub enum VersionSelector {
    /// The maximum registered version. Deprecated cards are excluded.
    Latest,
    /// An exact version, regardless of status.
    Exact(Version),
}

/// Addresses a single card: by uid, or by key and version.
#[derive(Debug, Clone)]
pub enum CardLocator {
    Uid(Uuid),
    Key {
        name: String,
        team: String,
        artifact_type: ArtifactType,
        version: VersionSelector,
    },
}

impl fmt::Display for CardLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardLocator::Uid(uid) => write!(f, "uid {}", uid),
            CardLocator::Key {
                name,
                team,
                artifact_type,
                version,
            } => {
                let version = match version {
                    VersionSelector::Latest => "latest".to_string(),
                    VersionSelector::Exact(v) => v.to_string(),
                };
                write!(f, "{}/{}/{}@{}", team, artifact_type, name, version)
            }
        }
    }
}

/// Read-only query API over the relational store.
#[derive(Clone)]
pub struct RegistryQuery {
    store: Arc<dyn SqlRegistryStore>,
}

impl RegistryQuery {
    pub fn new(store: Arc<dyn SqlRegistryStore>) -> Self {
        Self { store }
    }

    /// Lists card summaries matching the filter, version-descending.
    /// An empty result is not an error.
    pub async fn list(&self, filter: &CardFilter) -> Result<Vec<CardSummary>, RegistryError> {
        let rows = self
            .store
            .query_cards(filter)
            .await
            .map_err(RegistryError::store_read)?;

        debug!(matched = rows.len(), "listed cards");
        Ok(rows.iter().filter_map(CardSummary::from_card).collect())
    }

    /// Loads one card and a handle for fetching its payload.
    pub async fn load(
        &self,
        locator: &CardLocator,
    ) -> Result<(Card, ArtifactHandle), RegistryError> {
        let filter = match locator {
            CardLocator::Uid(uid) => CardFilter::by_uid(*uid),
            CardLocator::Key {
                name,
                team,
                artifact_type,
                version,
            } => {
                let mut filter = CardFilter {
                    name: Some(name.clone()),
                    team: Some(team.clone()),
                    artifact_type: Some(*artifact_type),
                    ..CardFilter::default()
                };
                match version {
                    // Latest resolves to the maximum registered version;
                    // the store's version-descending order makes that the
                    // first row.
                    VersionSelector::Latest => {
                        filter.status = Some(CardStatus::Registered);
                        filter.limit = Some(1);
                    }
                    VersionSelector::Exact(v) => {
                        filter.version = Some(v.clone());
                    }
                }
                filter
            }
        };

        let rows = self
            .store
            .query_cards(&filter)
            .await
            .map_err(RegistryError::store_read)?;

        let card = rows
            .into_iter()
            .next()
            .ok_or_else(|| RegistryError::NotFound {
                query: locator.to_string(),
            })?;

        // Registration writes the artifact before the row, so a persisted
        // card without a storage path cannot come from this engine.
        let path = card
            .storage_path
            .clone()
            .ok_or_else(|| {
                RegistryError::Internal(format!(
                    "card {} is {} but has no storage path",
                    card.uid, card.status
                ))
            })?;

        debug!(card = %card.uid, %locator, "loaded card");
        Ok((card, ArtifactHandle::new(path)))
    }
}
