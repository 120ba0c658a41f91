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

//! In-memory implementations of the backend contracts.
//!
//! Trivial test doubles for [`StorageClient`] and [`SqlRegistryStore`].
//! Both count their write calls so tests can assert that a failed
//! validation touched neither store. They honor the same contracts as the
//! reference backends, including duplicate-version rejection and
//! version-descending query order, so orchestrator behavior is identical
//! over either.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

use crate::cards::{Card, CardStatus};
use crate::error::{StorageError, StoreError};
use crate::storage::{ArtifactStream, StorageClient};
use crate::store::{CardFilter, SqlRegistryStore};

/// In-memory object store keyed by path.
#[derive(Debug, Default)]
pub struct MemoryStorageClient {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl MemoryStorageClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls observed.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Bytes currently stored at `path`, if any.
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.lock().expect("lock poisoned").get(path).cloned()
    }
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn put(&self, path: &str, mut data: ArtifactStream) -> Result<(), StorageError> {
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes).await?;
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .expect("lock poisoned")
            .insert(path.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<ArtifactStream, StorageError> {
        let bytes = self
            .objects
            .lock()
            .expect("lock poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                path: path.to_string(),
            })?;
        Ok(Box::new(std::io::Cursor::new(bytes)))
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.objects.lock().expect("lock poisoned").contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.objects.lock().expect("lock poisoned").remove(path);
        Ok(())
    }
}

/// In-memory relational store over a vector of cards.
#[derive(Debug, Default)]
pub struct MemoryRegistryStore {
    rows: Mutex<Vec<Card>>,
    inserts: AtomicUsize,
}

impl MemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `insert_card` calls observed (including rejected ones).
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of rows currently stored.
    pub fn row_count(&self) -> usize {
        self.rows.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl SqlRegistryStore for MemoryRegistryStore {
    async fn insert_card(&self, card: &Card) -> Result<(), StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);

        let version = card.version.clone().ok_or_else(|| {
            StoreError::Backend("cannot insert a card without a version".to_string())
        })?;

        let mut rows = self.rows.lock().expect("lock poisoned");

        if rows.iter().any(|existing| existing.uid == card.uid) {
            return Err(StoreError::Backend(format!(
                "uid {} already exists",
                card.uid
            )));
        }

        let duplicate = rows.iter().any(|existing| {
            existing.name == card.name
                && existing.team == card.team
                && existing.artifact_type() == card.artifact_type()
                && existing.version.as_ref() == Some(&version)
        });
        if duplicate {
            return Err(StoreError::DuplicateVersion {
                name: card.name.clone(),
                team: card.team.clone(),
                artifact_type: card.artifact_type(),
                version,
            });
        }

        rows.push(card.clone());
        Ok(())
    }

    async fn query_cards(&self, filter: &CardFilter) -> Result<Vec<Card>, StoreError> {
        let rows = self.rows.lock().expect("lock poisoned");
        let mut matched: Vec<Card> = rows.iter().filter(|c| filter.matches(c)).cloned().collect();

        matched.sort_by(|a, b| {
            let va = a.version.as_ref();
            let vb = b.version.as_ref();
            vb.cmp(&va).then_with(|| b.created_at.cmp(&a.created_at))
        });

        if let Some(limit) = filter.limit {
            matched.truncate(limit.max(0) as usize);
        }
        Ok(matched)
    }

    async fn update_status(&self, uid: Uuid, status: CardStatus) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().expect("lock poisoned");
        let card = rows
            .iter_mut()
            .find(|c| c.uid == uid)
            .ok_or(StoreError::RowNotFound { uid })?;

        card.status = status;
        card.deprecated_at = match status {
            CardStatus::Deprecated => Some(Utc::now()),
            _ => None,
        };
        Ok(())
    }
}
