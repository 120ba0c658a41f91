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

//! Error types for registry operations.
//!
//! Three layers: [`StorageError`] for the object-store contract,
//! [`StoreError`] for the relational contract, and [`RegistryError`] as the
//! public taxonomy the orchestrator surfaces. Write-path variants carry the
//! attempted (name, team, artifact type, version) so callers can decide to
//! retry with a new version or abort.

use semver::Version;
use thiserror::Error;
use uuid::Uuid;

use crate::cards::{ArtifactType, CardKey, LineageRef};

/// Errors from an object-storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend-specific failure (connectivity, permissions, timeouts).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// No artifact exists at the requested path.
    #[error("no artifact at path '{path}'")]
    NotFound { path: String },

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a relational registry store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The unique constraint on (name, team, artifact_type, version) was
    /// violated - another writer claimed this version first.
    #[error("version {version} already exists for {team}/{artifact_type}/{name}")]
    DuplicateVersion {
        name: String,
        team: String,
        artifact_type: ArtifactType,
        version: Version,
    },

    /// A single-row update matched no row.
    #[error("no card row for uid {uid}")]
    RowNotFound { uid: Uuid },

    /// Backend-specific failure (connection pool, SQL engine, mapping).
    #[error("relational store error: {0}")]
    Backend(String),
}

/// Errors surfaced by the registration and query APIs.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The card's declared fields are invalid for its artifact type.
    /// Input defect; never retried.
    #[error("schema violation for {key}: {reason}")]
    SchemaViolation { key: CardKey, reason: String },

    /// A lineage reference does not resolve to a registered card.
    #[error("dangling reference {reference} on {key}")]
    DanglingReference { key: CardKey, reference: LineageRef },

    /// A lineage reference targets a card of the wrong artifact type.
    #[error("reference {reference} on {key} targets a {found} card, which '{}' does not allow", .reference.kind)]
    TypeMismatch {
        key: CardKey,
        reference: LineageRef,
        found: ArtifactType,
    },

    /// The requested version does not exceed every existing version for the
    /// key, or the internal retry budget for lost version races ran out.
    #[error("version conflict for {key}: requested {requested}, current max {}", fmt_opt_version(.current_max))]
    VersionConflict {
        key: CardKey,
        requested: Version,
        current_max: Option<Version>,
    },

    /// The artifact write failed; no metadata row was written, so the card
    /// never becomes visible. Not retried: a retry needs a fresh version to
    /// avoid path-reuse ambiguity.
    #[error("artifact write failed for {key} at version {version}")]
    StorageWrite {
        key: CardKey,
        version: Version,
        #[source]
        source: StorageError,
    },

    /// Relational store failure. When this fires after the artifact was
    /// persisted, the artifact is left orphaned at its never-reused path.
    #[error("metadata store failure{}", fmt_store_ctx(.key, .version))]
    Store {
        key: Option<CardKey>,
        version: Option<Version>,
        #[source]
        source: StoreError,
    },

    /// Nothing matches on the read path.
    #[error("no card matches {query}")]
    NotFound { query: String },

    /// Metadata and artifact state disagree in a way registration can never
    /// produce (e.g. a registered row with no storage path).
    #[error("internal registry inconsistency: {0}")]
    Internal(String),
}

fn fmt_opt_version(version: &Option<Version>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}

fn fmt_store_ctx(key: &Option<CardKey>, version: &Option<Version>) -> String {
    match (key, version) {
        (Some(k), Some(v)) => format!(" for {} at version {}", k, v),
        (Some(k), None) => format!(" for {}", k),
        _ => String::new(),
    }
}

impl RegistryError {
    /// Wraps a store-level error with write-path context.
    pub(crate) fn store(key: CardKey, version: Option<Version>, source: StoreError) -> Self {
        RegistryError::Store {
            key: Some(key),
            version,
            source,
        }
    }

    /// Wraps a store-level error from a read path with no single key.
    pub(crate) fn store_read(source: StoreError) -> Self {
        RegistryError::Store {
            key: None,
            version: None,
            source,
        }
    }
}
