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

//! Lineage reference validation.
//!
//! Runs before any write: a failed validation must leave both stores
//! untouched. For each reference on a card, the referenced uid must exist,
//! carry the artifact type its relation kind requires, and be registered.
//! A draft or deprecated target is not a valid lineage anchor and is
//! reported as dangling.

use tracing::debug;

use crate::cards::{Card, CardStatus};
use crate::error::RegistryError;
use crate::store::{CardFilter, SqlRegistryStore};

/// Read-only validator for a card's lineage references.
pub struct LineageValidator<'a> {
    store: &'a dyn SqlRegistryStore,
}

impl<'a> LineageValidator<'a> {
    pub fn new(store: &'a dyn SqlRegistryStore) -> Self {
        Self { store }
    }

    pub async fn validate(&self, card: &Card) -> Result<(), RegistryError> {
        let key = card.key();

        for reference in &card.references {
            let rows = self
                .store
                .query_cards(&CardFilter::by_uid(reference.uid))
                .await
                .map_err(|e| RegistryError::store(key.clone(), None, e))?;

            let target = match rows.first() {
                Some(target) => target,
                None => {
                    return Err(RegistryError::DanglingReference {
                        key,
                        reference: *reference,
                    })
                }
            };

            if !reference.kind.allows_target(target.artifact_type()) {
                return Err(RegistryError::TypeMismatch {
                    key,
                    reference: *reference,
                    found: target.artifact_type(),
                });
            }

            if target.status != CardStatus::Registered {
                return Err(RegistryError::DanglingReference {
                    key,
                    reference: *reference,
                });
            }
        }

        debug!(card = %card.uid, references = card.references.len(), "lineage validated");
        Ok(())
    }
}
