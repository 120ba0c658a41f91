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

//! Registration orchestrator.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cards::{is_valid_identifier, Card, CardKey, CardStatus};
use crate::error::{RegistryError, StoreError};
use crate::lineage::LineageValidator;
use crate::storage::{ArtifactPath, ArtifactSource, StorageClient};
use crate::store::{CardFilter, SqlRegistryStore};
use crate::version::{VersionBump, VersionRequest, VersionResolver};

/// Tunables for the registration state machine.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Bump granularity used by [`CardRegistry::register`] when the caller
    /// does not request one explicitly.
    pub default_bump: VersionBump,
    /// How many times a registration that lost the version race is retried
    /// (after the initial attempt) before surfacing a conflict.
    pub max_version_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_bump: VersionBump::Minor,
            max_version_retries: 3,
        }
    }
}

/// Orchestrator for the registration state machine:
/// validate -> version -> persist artifact -> persist metadata.
///
/// Backends are injected; there is no ambient registry state, so a process
/// can hold any number of independent registries.
pub struct CardRegistry {
    store: Arc<dyn SqlRegistryStore>,
    storage: Arc<dyn StorageClient>,
    config: RegistryConfig,
}

impl CardRegistry {
    pub fn new(store: Arc<dyn SqlRegistryStore>, storage: Arc<dyn StorageClient>) -> Self {
        Self::with_config(store, storage, RegistryConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn SqlRegistryStore>,
        storage: Arc<dyn StorageClient>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            store,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Registers a draft card with the configured default version bump.
    pub async fn register(
        &self,
        card: Card,
        source: &dyn ArtifactSource,
    ) -> Result<Card, RegistryError> {
        let request = VersionRequest::Bump(self.config.default_bump);
        self.register_with(card, source, request).await
    }

    /// Registers a draft card, choosing its version per `request`.
    ///
    /// On success the returned card is `Registered`, carries its assigned
    /// version and its deterministic storage path, and is visible to
    /// queries. On any failure the card never becomes visible; an artifact
    /// written by a failed attempt stays orphaned at its never-reused path.
    pub async fn register_with(
        &self,
        mut card: Card,
        source: &dyn ArtifactSource,
        request: VersionRequest,
    ) -> Result<Card, RegistryError> {
        let key = card.key();

        // VALIDATING
        self.validate_schema(&card, &key).await?;
        if let VersionRequest::Explicit(version) = &request {
            Self::validate_explicit_version(version, &key)?;
        }
        LineageValidator::new(self.store.as_ref())
            .validate(&card)
            .await?;

        let resolver = VersionResolver::new(self.store.as_ref());
        let mut attempt: u32 = 0;

        loop {
            // VERSIONING. Advisory under concurrency; the insert below is
            // the authoritative check.
            let version = resolver.resolve(&key, &request).await?;
            let path = ArtifactPath::for_card(&key, &version);
            debug!(card = %card.uid, %key, %version, attempt, "resolved version");

            // PERSISTING_ARTIFACT. Failure here leaves no metadata, so the
            // card never becomes visible without its payload.
            let stream = source.open().await.map_err(|source| {
                RegistryError::StorageWrite {
                    key: key.clone(),
                    version: version.clone(),
                    source,
                }
            })?;
            self.storage
                .put(path.as_str(), stream)
                .await
                .map_err(|source| RegistryError::StorageWrite {
                    key: key.clone(),
                    version: version.clone(),
                    source,
                })?;

            // PERSISTING_METADATA.
            card.version = Some(version.clone());
            card.status = CardStatus::Registered;
            card.storage_path = Some(path.into_string());

            match self.store.insert_card(&card).await {
                Ok(()) => {
                    info!(card = %card.uid, %key, %version, "card registered");
                    return Ok(card);
                }
                Err(StoreError::DuplicateVersion { .. }) => {
                    // Lost the race. The artifact written above stays
                    // orphaned at its path; a retry resolves a fresh
                    // version and a fresh path.
                    if let VersionRequest::Explicit(requested) = &request {
                        // Re-resolving the same explicit version can only
                        // conflict again; surface immediately.
                        let current_max = resolver.current_max(&key).await.ok().flatten();
                        return Err(RegistryError::VersionConflict {
                            key,
                            requested: requested.clone(),
                            current_max,
                        });
                    }

                    attempt += 1;
                    if attempt > self.config.max_version_retries {
                        warn!(card = %card.uid, %key, %version, attempt, "version retries exhausted");
                        let current_max = resolver.current_max(&key).await.ok().flatten();
                        return Err(RegistryError::VersionConflict {
                            key,
                            requested: version,
                            current_max,
                        });
                    }

                    warn!(card = %card.uid, %key, %version, attempt, "lost version race, retrying");
                    card.version = None;
                    card.status = CardStatus::Draft;
                    card.storage_path = None;
                }
                Err(source) => {
                    return Err(RegistryError::store(key, Some(version), source));
                }
            }
        }
    }

    /// Soft-deletes a registered card: status becomes `Deprecated` with a
    /// deprecation timestamp. The row, storage path and artifact bytes are
    /// preserved; only "latest" resolution stops seeing the card.
    /// Idempotent for already-deprecated cards.
    pub async fn deprecate(&self, uid: Uuid) -> Result<(), RegistryError> {
        let rows = self
            .store
            .query_cards(&CardFilter::by_uid(uid))
            .await
            .map_err(RegistryError::store_read)?;

        let card = rows.first().ok_or_else(|| RegistryError::NotFound {
            query: format!("uid {}", uid),
        })?;
        let key = card.key();

        if card.status == CardStatus::Deprecated {
            return Ok(());
        }
        if card.status == CardStatus::Draft {
            return Err(RegistryError::Internal(format!(
                "draft card {} found in the store",
                uid
            )));
        }

        self.store
            .update_status(uid, CardStatus::Deprecated)
            .await
            .map_err(|e| match e {
                StoreError::RowNotFound { uid } => RegistryError::NotFound {
                    query: format!("uid {}", uid),
                },
                e => RegistryError::store(key.clone(), card.version.clone(), e),
            })?;

        info!(card = %uid, %key, "card deprecated");
        Ok(())
    }

    /// Explicit versions must be plain release versions whose numeric
    /// components fit the store's integer ordering columns; anything else
    /// would corrupt version-descending order (and with it max-version
    /// resolution). Bumped versions only ever increment an accepted value,
    /// so they need no such check.
    fn validate_explicit_version(
        version: &semver::Version,
        key: &CardKey,
    ) -> Result<(), RegistryError> {
        if !version.pre.is_empty() || !version.build.is_empty() {
            return Err(RegistryError::SchemaViolation {
                key: key.clone(),
                reason: format!(
                    "explicit version '{}' must not carry pre-release or build metadata",
                    version
                ),
            });
        }
        if [version.major, version.minor, version.patch]
            .iter()
            .any(|&component| component > i32::MAX as u64)
        {
            return Err(RegistryError::SchemaViolation {
                key: key.clone(),
                reason: format!(
                    "explicit version '{}' has a component exceeding the supported range",
                    version
                ),
            });
        }
        Ok(())
    }

    /// Schema checks on the declared fields for the card's artifact type.
    async fn validate_schema(&self, card: &Card, key: &CardKey) -> Result<(), RegistryError> {
        if !is_valid_identifier(&card.name) {
            return Err(RegistryError::SchemaViolation {
                key: key.clone(),
                reason: format!("invalid name '{}'", card.name),
            });
        }
        if !is_valid_identifier(&card.team) {
            return Err(RegistryError::SchemaViolation {
                key: key.clone(),
                reason: format!("invalid team '{}'", card.team),
            });
        }
        if card.status != CardStatus::Draft {
            return Err(RegistryError::SchemaViolation {
                key: key.clone(),
                reason: format!("only draft cards can be registered, status is {}", card.status),
            });
        }
        if card.storage_path.is_some() {
            return Err(RegistryError::SchemaViolation {
                key: key.clone(),
                reason: "draft cards must not carry a storage path".to_string(),
            });
        }

        for reference in &card.references {
            if !reference.kind.allowed_on(card.artifact_type()) {
                return Err(RegistryError::SchemaViolation {
                    key: key.clone(),
                    reason: format!(
                        "relation kind '{}' is not allowed on a {} card",
                        reference.kind,
                        card.artifact_type()
                    ),
                });
            }
        }

        // A uid is assigned at creation and registered at most once.
        let existing = self
            .store
            .query_cards(&CardFilter::by_uid(card.uid))
            .await
            .map_err(|e| RegistryError::store(key.clone(), None, e))?;
        if !existing.is_empty() {
            return Err(RegistryError::SchemaViolation {
                key: key.clone(),
                reason: format!("card uid {} is already registered", card.uid),
            });
        }

        Ok(())
    }
}
