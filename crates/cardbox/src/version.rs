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

//! Semantic version assignment for card registration.
//!
//! The resolver computes the version a registration should claim. Its
//! output is advisory: resolve-then-insert is check-then-act under
//! concurrency, and the relational uniqueness constraint on
//! (name, team, artifact_type, version) is the authoritative
//! serialization point. The orchestrator re-resolves on a lost race.

use semver::Version;

use crate::cards::CardKey;
use crate::error::RegistryError;
use crate::store::{CardFilter, SqlRegistryStore};

/// Which component an automatic bump increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionBump {
    Major,
    Minor,
    Patch,
}

/// How a registration wants its version chosen.
#[derive(Debug, Clone)]
pub enum VersionRequest {
    /// Bump the given component of the current maximum.
    Bump(VersionBump),
    /// Claim exactly this version; it must exceed every existing version
    /// for the key.
    Explicit(Version),
}

/// Increments one component, zeroing the lower ones.
pub fn bump(version: &Version, bump: VersionBump) -> Version {
    match bump {
        VersionBump::Major => Version::new(version.major + 1, 0, 0),
        VersionBump::Minor => Version::new(version.major, version.minor + 1, 0),
        VersionBump::Patch => Version::new(version.major, version.minor, version.patch + 1),
    }
}

/// Computes the version to assign for a registration under one key.
pub struct VersionResolver<'a> {
    store: &'a dyn SqlRegistryStore,
}

impl<'a> VersionResolver<'a> {
    pub fn new(store: &'a dyn SqlRegistryStore) -> Self {
        Self { store }
    }

    /// Resolves the version for `key` per `request`.
    ///
    /// With no existing versions the seed is 1.0.0 regardless of the bump
    /// kind. The maximum is taken over rows of every status: versions are
    /// never reused, even after deprecation.
    pub async fn resolve(
        &self,
        key: &CardKey,
        request: &VersionRequest,
    ) -> Result<Version, RegistryError> {
        let current_max = self.current_max(key).await?;

        match request {
            VersionRequest::Bump(kind) => Ok(match &current_max {
                None => Version::new(1, 0, 0),
                Some(max) => bump(max, *kind),
            }),
            VersionRequest::Explicit(requested) => {
                if let Some(max) = &current_max {
                    if requested <= max {
                        return Err(RegistryError::VersionConflict {
                            key: key.clone(),
                            requested: requested.clone(),
                            current_max,
                        });
                    }
                }
                Ok(requested.clone())
            }
        }
    }

    /// Current maximum version for the key across all statuses, if any.
    pub async fn current_max(&self, key: &CardKey) -> Result<Option<Version>, RegistryError> {
        let filter = CardFilter::for_key(key).with_limit(1);
        let rows = self
            .store
            .query_cards(&filter)
            .await
            .map_err(|e| RegistryError::store(key.clone(), None, e))?;
        Ok(rows.into_iter().next().and_then(|card| card.version))
    }
}
