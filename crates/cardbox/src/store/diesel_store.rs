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

//! Diesel-backed registry store over the embedded SQLite database.
//!
//! Row mapping keeps Diesel-specific types isolated here: uids and
//! timestamps are TEXT, tags/references/payload are serde_json TEXT
//! columns, and the semantic version is stored both as its display string
//! and as three integer columns for portable descending order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use semver::Version;
use tracing::debug;
use uuid::Uuid;

use super::{CardFilter, SqlRegistryStore};
use crate::cards::{ArtifactType, Card, CardKind, CardStatus};
use crate::database::Database;
use crate::error::StoreError;

diesel::table! {
    cards (uid) {
        uid -> Text,
        name -> Text,
        team -> Text,
        version -> Text,
        major -> Integer,
        minor -> Integer,
        patch -> Integer,
        artifact_type -> Text,
        status -> Text,
        storage_path -> Nullable<Text>,
        created_at -> Text,
        deprecated_at -> Nullable<Text>,
        tags -> Text,
        refs -> Text,
        payload -> Text,
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = cards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct CardRow {
    uid: String,
    name: String,
    team: String,
    version: String,
    major: i32,
    minor: i32,
    patch: i32,
    artifact_type: String,
    status: String,
    storage_path: Option<String>,
    created_at: String,
    deprecated_at: Option<String>,
    tags: String,
    refs: String,
    payload: String,
}

impl CardRow {
    fn from_card(card: &Card) -> Result<Self, StoreError> {
        let version = card.version.as_ref().ok_or_else(|| {
            StoreError::Backend("cannot insert a card without a version".to_string())
        })?;

        Ok(Self {
            uid: card.uid.to_string(),
            name: card.name.clone(),
            team: card.team.clone(),
            version: version.to_string(),
            major: version_column(version.major)?,
            minor: version_column(version.minor)?,
            patch: version_column(version.patch)?,
            artifact_type: card.artifact_type().as_str().to_string(),
            status: card.status.as_str().to_string(),
            storage_path: card.storage_path.clone(),
            created_at: card.created_at.to_rfc3339(),
            deprecated_at: card.deprecated_at.map(|t| t.to_rfc3339()),
            tags: serde_json::to_string(&card.tags)
                .map_err(|e| StoreError::Backend(format!("tag serialization failed: {}", e)))?,
            refs: serde_json::to_string(&card.references).map_err(|e| {
                StoreError::Backend(format!("reference serialization failed: {}", e))
            })?,
            payload: serde_json::to_string(&card.kind)
                .map_err(|e| StoreError::Backend(format!("payload serialization failed: {}", e)))?,
        })
    }

    fn into_card(self) -> Result<Card, StoreError> {
        let kind: CardKind = serde_json::from_str(&self.payload)
            .map_err(|e| StoreError::Backend(format!("payload deserialization failed: {}", e)))?;

        let row_type = ArtifactType::from_str(&self.artifact_type)
            .ok_or_else(|| StoreError::Backend(format!("unknown artifact_type '{}'", self.artifact_type)))?;
        if kind.artifact_type() != row_type {
            return Err(StoreError::Backend(format!(
                "row artifact_type '{}' disagrees with payload '{}'",
                self.artifact_type,
                kind.artifact_type()
            )));
        }

        Ok(Card {
            uid: Uuid::parse_str(&self.uid)
                .map_err(|e| StoreError::Backend(format!("invalid uid '{}': {}", self.uid, e)))?,
            name: self.name,
            team: self.team,
            version: Some(Version::parse(&self.version).map_err(|e| {
                StoreError::Backend(format!("invalid version '{}': {}", self.version, e))
            })?),
            status: CardStatus::from_str(&self.status)
                .ok_or_else(|| StoreError::Backend(format!("unknown status '{}'", self.status)))?,
            storage_path: self.storage_path,
            created_at: parse_timestamp(&self.created_at)?,
            deprecated_at: self
                .deprecated_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            tags: serde_json::from_str(&self.tags)
                .map_err(|e| StoreError::Backend(format!("tag deserialization failed: {}", e)))?,
            references: serde_json::from_str(&self.refs).map_err(|e| {
                StoreError::Backend(format!("reference deserialization failed: {}", e))
            })?,
            kind,
        })
    }
}

/// A component that does not fit the integer ordering columns would wrap
/// and corrupt version-descending order, so it is rejected outright.
fn version_column(component: u64) -> Result<i32, StoreError> {
    i32::try_from(component).map_err(|_| {
        StoreError::Backend(format!(
            "version component {} exceeds the ordering column range",
            component
        ))
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Backend(format!("invalid timestamp '{}': {}", value, e)))
}

/// SQLite-backed [`SqlRegistryStore`].
#[derive(Debug, Clone)]
pub struct DieselRegistryStore {
    database: Database,
}

impl DieselRegistryStore {
    /// Wraps an initialized [`Database`].
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Convenience constructor: builds the pool and bootstraps the schema.
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let database = Database::new(connection_string)?;
        database.initialize_schema().await?;
        Ok(Self::new(database))
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    async fn conn(
        &self,
    ) -> Result<deadpool::managed::Object<deadpool_diesel::sqlite::Manager>, StoreError> {
        self.database
            .pool()
            .get()
            .await
            .map_err(|e| StoreError::Backend(format!("failed to get connection: {}", e)))
    }
}

#[async_trait]
impl SqlRegistryStore for DieselRegistryStore {
    async fn insert_card(&self, card: &Card) -> Result<(), StoreError> {
        let version = card.version.clone().ok_or_else(|| {
            StoreError::Backend("cannot insert a card without a version".to_string())
        })?;
        let row = CardRow::from_card(card)?;
        let conn = self.conn().await?;

        // Clones for the duplicate-version error after the row moves into
        // the closure.
        let name = row.name.clone();
        let team = row.team.clone();
        let artifact_type = card.artifact_type();

        conn.interact(move |conn| {
            diesel::insert_into(cards::table)
                .values(&row)
                .execute(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _info,
            ) => StoreError::DuplicateVersion {
                name,
                team,
                artifact_type,
                version,
            },
            _ => StoreError::Backend(format!("database error: {}", e)),
        })?;

        debug!(uid = %card.uid, "inserted card row");
        Ok(())
    }

    async fn query_cards(&self, filter: &CardFilter) -> Result<Vec<Card>, StoreError> {
        let conn = self.conn().await?;
        let filter = filter.clone();

        let rows: Vec<CardRow> = conn
            .interact(move |conn| {
                let mut query = cards::table.into_boxed();

                if let Some(uid) = filter.uid {
                    query = query.filter(cards::uid.eq(uid.to_string()));
                }
                if let Some(name) = filter.name {
                    query = query.filter(cards::name.eq(name));
                }
                if let Some(team) = filter.team {
                    query = query.filter(cards::team.eq(team));
                }
                if let Some(artifact_type) = filter.artifact_type {
                    query = query.filter(cards::artifact_type.eq(artifact_type.as_str()));
                }
                if let Some(version) = filter.version {
                    query = query.filter(cards::version.eq(version.to_string()));
                }
                if let Some(status) = filter.status {
                    query = query.filter(cards::status.eq(status.as_str()));
                }

                query = query.order((
                    cards::major.desc(),
                    cards::minor.desc(),
                    cards::patch.desc(),
                    cards::created_at.desc(),
                ));

                if let Some(limit) = filter.limit {
                    query = query.limit(limit);
                }

                query.load::<CardRow>(conn)
            })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .map_err(|e| StoreError::Backend(format!("database error: {}", e)))?;

        rows.into_iter().map(CardRow::into_card).collect()
    }

    async fn update_status(&self, uid: Uuid, status: CardStatus) -> Result<(), StoreError> {
        let conn = self.conn().await?;

        let uid_text = uid.to_string();
        let status_text = status.as_str();
        let deprecated_at = match status {
            CardStatus::Deprecated => Some(Utc::now().to_rfc3339()),
            _ => None,
        };

        let updated: usize = conn
            .interact(move |conn| {
                diesel::update(cards::table.filter(cards::uid.eq(&uid_text)))
                    .set((
                        cards::status.eq(status_text),
                        cards::deprecated_at.eq(deprecated_at),
                    ))
                    .execute(conn)
            })
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .map_err(|e| StoreError::Backend(format!("database error: {}", e)))?;

        if updated == 0 {
            return Err(StoreError::RowNotFound { uid });
        }

        debug!(uid = %uid, status = %status, "updated card status");
        Ok(())
    }
}
