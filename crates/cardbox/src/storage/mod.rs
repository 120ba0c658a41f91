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

//! Object-storage contract for artifact payloads.
//!
//! Payloads are opaque byte streams stored outside the relational store at
//! deterministic paths derived from (team, artifact type, name, version).
//! Paths are collision-free and never reused, which is what makes the
//! "artifact before metadata" write ordering safe without a cross-store
//! transaction.
//!
//! The contract guarantees read-after-write consistency only for paths
//! written by the same process; cross-backend consistency models are the
//! backend's concern.

mod local;

pub use local::LocalStorageClient;

use async_trait::async_trait;
use semver::Version;
use std::fmt;
use std::path::PathBuf;
use tokio::io::AsyncRead;

use crate::cards::CardKey;
use crate::error::StorageError;

/// Streaming artifact payload. Payloads need not fit in memory.
pub type ArtifactStream = Box<dyn AsyncRead + Send + Unpin>;

/// Contract for object-storage backends.
///
/// Implementations are process-wide and thread-safe by their own contract;
/// the registry holds them behind `Arc<dyn StorageClient>`.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Writes a byte stream at `path`. Overwriting is never expected in
    /// normal operation since paths are never reused.
    async fn put(&self, path: &str, data: ArtifactStream) -> Result<(), StorageError>;

    /// Opens the byte stream stored at `path`.
    async fn get(&self, path: &str) -> Result<ArtifactStream, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Removes the object at `path`. Idempotent: deleting a missing path
    /// succeeds.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}

/// A payload that can be opened as a fresh stream for each write attempt.
///
/// A registration that loses a version race retries the full
/// artifact+metadata sequence at a fresh path, so the payload must be
/// re-readable rather than a one-shot stream.
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    async fn open(&self) -> Result<ArtifactStream, StorageError>;
}

/// In-memory payload source.
pub struct BytesSource(Vec<u8>);

impl BytesSource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }
}

impl From<Vec<u8>> for BytesSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

#[async_trait]
impl ArtifactSource for BytesSource {
    async fn open(&self) -> Result<ArtifactStream, StorageError> {
        Ok(Box::new(std::io::Cursor::new(self.0.clone())))
    }
}

/// File-backed payload source; streams without loading into memory.
pub struct FileSource(PathBuf);

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }
}

#[async_trait]
impl ArtifactSource for FileSource {
    async fn open(&self) -> Result<ArtifactStream, StorageError> {
        let file = tokio::fs::File::open(&self.0).await?;
        Ok(Box::new(file))
    }
}

/// Deterministic storage path for a card version:
/// `{team}/{ARTIFACT_TYPE}/{name}/v{major}.{minor}.{patch}/artifact`.
///
/// Computed solely from the key and version, so it is collision-free under
/// the version uniqueness constraint and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPath(String);

impl ArtifactPath {
    pub fn for_card(key: &CardKey, version: &Version) -> Self {
        Self(format!(
            "{}/{}/{}/v{}/artifact",
            key.team, key.artifact_type, key.name, version
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle returned by the query API for fetching a loaded card's payload.
#[derive(Debug, Clone)]
pub struct ArtifactHandle {
    path: String,
}

impl ArtifactHandle {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn storage_path(&self) -> &str {
        &self.path
    }

    /// Opens the payload stream against any storage client.
    pub async fn open(&self, storage: &dyn StorageClient) -> Result<ArtifactStream, StorageError> {
        storage.get(&self.path).await
    }
}
