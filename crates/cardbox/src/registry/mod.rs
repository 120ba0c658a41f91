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

//! # Card Registry
//!
//! Orchestration layer that makes cards visible: the write-path state
//! machine in [`CardRegistry`] and the read-only [`RegistryQuery`].
//!
//! ## Consistency model
//!
//! There is no transaction spanning the object store and the relational
//! store. The registration sequence - validate, resolve version, persist
//! artifact, insert metadata - relies on two mechanisms only:
//!
//! - ordering: the artifact is written before the metadata row, so a row
//!   never exists without its payload;
//! - the uniqueness constraint on (name, team, artifact_type, version),
//!   which serializes concurrent writers on the same key.
//!
//! A metadata insert that loses the version race is retried with a fresh
//! version (and therefore a fresh, never-reused artifact path) up to a
//! configurable bound. An artifact persisted by an attempt whose metadata
//! insert failed is left orphaned - accepted inconsistency, not
//! corruption, since nothing references it.

mod card_registry;
mod query;

pub use card_registry::{CardRegistry, RegistryConfig};
pub use query::{CardLocator, RegistryQuery, VersionSelector};
