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

//! # cardbox
//!
//! Versioning and storage-coordination engine for an ML artifact registry.
//!
//! Cards - data, model, run and project records - carry structured
//! metadata in a relational store and an opaque byte payload in an object
//! store. cardbox assigns monotonically increasing semantic versions per
//! (name, team, artifact type) key, orchestrates the two-step write so a
//! card is never visible without its payload, and validates lineage
//! references between cards, all without a transaction spanning the two
//! stores.
//!
//! ## Architecture
//!
//! - [`cards`]: the card domain model - a tagged union with a shared
//!   header and per-type payloads.
//! - [`storage`]: the [`StorageClient`] object-store contract, streaming
//!   payload sources, deterministic artifact paths, and a local
//!   filesystem backend.
//! - [`store`]: the [`SqlRegistryStore`] relational contract and the
//!   embedded Diesel/SQLite reference implementation.
//! - [`version`]: semantic version assignment (advisory; the store's
//!   uniqueness constraint is authoritative).
//! - [`lineage`]: read-only validation of references between cards.
//! - [`registry`]: the [`CardRegistry`] write-path orchestrator and the
//!   read-only [`RegistryQuery`].
//! - [`testing`]: in-memory backends implementing both contracts.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cardbox::{
//!     BytesSource, Card, CardKind, CardRegistry, DieselRegistryStore,
//!     LocalStorageClient, RegistryQuery,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(DieselRegistryStore::connect("cards.db").await?);
//! let storage = Arc::new(LocalStorageClient::new("/var/lib/cardbox/artifacts")?);
//!
//! let registry = CardRegistry::new(store.clone(), storage.clone());
//! let card = Card::new("sales", "growth", CardKind::Data { data_type: None });
//! let registered = registry
//!     .register(card, &BytesSource::new(b"payload".to_vec()))
//!     .await?;
//!
//! let query = RegistryQuery::new(store);
//! let summaries = query.list(&Default::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod cards;
pub mod database;
pub mod error;
pub mod lineage;
pub mod registry;
pub mod storage;
pub mod store;
pub mod testing;
pub mod version;

pub use cards::{
    ArtifactType, Card, CardKey, CardKind, CardStatus, CardSummary, LineageRef, RelationKind,
};
pub use database::Database;
pub use error::{RegistryError, StorageError, StoreError};
pub use lineage::LineageValidator;
pub use registry::{CardLocator, CardRegistry, RegistryConfig, RegistryQuery, VersionSelector};
pub use storage::{
    ArtifactHandle, ArtifactPath, ArtifactSource, ArtifactStream, BytesSource, FileSource,
    LocalStorageClient, StorageClient,
};
pub use store::{CardFilter, DieselRegistryStore, SqlRegistryStore};
pub use version::{VersionBump, VersionRequest, VersionResolver};
