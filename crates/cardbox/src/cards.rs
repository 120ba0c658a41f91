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

//! Domain model for artifact cards.
//!
//! A card is a versioned metadata record for one ML deliverable plus a
//! pointer to its persisted payload. All card types share a common header
//! (uid, name, team, version, status, lineage references); the per-type
//! payload lives in [`CardKind`], a tagged union so the orchestrator can
//! handle every variant exhaustively.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four artifact categories the registry tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactType {
    Data,
    Model,
    Run,
    Project,
}

impl ArtifactType {
    /// Canonical uppercase label, used in storage paths and the artifact_type column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactType::Data => "DATA",
            ArtifactType::Model => "MODEL",
            ArtifactType::Run => "RUN",
            ArtifactType::Project => "PROJECT",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "DATA" => Some(ArtifactType::Data),
            "MODEL" => Some(ArtifactType::Model),
            "RUN" => Some(ArtifactType::Run),
            "PROJECT" => Some(ArtifactType::Project),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a card.
///
/// A card is visible to queries only once it reaches `Registered`.
/// Deletion is soft: a `Deprecated` card keeps its row, storage path and
/// artifact bytes, it is merely excluded from "latest" resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardStatus {
    Draft,
    Registered,
    Deprecated,
}

impl CardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardStatus::Draft => "DRAFT",
            CardStatus::Registered => "REGISTERED",
            CardStatus::Deprecated => "DEPRECATED",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(CardStatus::Draft),
            "REGISTERED" => Some(CardStatus::Registered),
            "DEPRECATED" => Some(CardStatus::Deprecated),
            _ => None,
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of lineage relationship a reference records.
///
/// Legality is two-sided: a kind must be permitted on the owning card's
/// artifact type, and the referenced card must have one of the kind's
/// allowed target types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Model provenance: the data card a model was trained from.
    TrainedFrom,
    /// A data or model card consumed by a run.
    Input,
    /// A data or model card produced by a run.
    Output,
    /// Membership of any card in a project.
    Member,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::TrainedFrom => "trained_from",
            RelationKind::Input => "input",
            RelationKind::Output => "output",
            RelationKind::Member => "member",
        }
    }

    /// Whether a card of `owner` type may carry a reference of this kind.
    pub fn allowed_on(&self, owner: ArtifactType) -> bool {
        match self {
            RelationKind::TrainedFrom => owner == ArtifactType::Model,
            RelationKind::Input | RelationKind::Output => owner == ArtifactType::Run,
            RelationKind::Member => owner == ArtifactType::Project,
        }
    }

    /// Whether this kind may point at a card of `target` type.
    pub fn allows_target(&self, target: ArtifactType) -> bool {
        match self {
            RelationKind::TrainedFrom => target == ArtifactType::Data,
            RelationKind::Input | RelationKind::Output => {
                matches!(target, ArtifactType::Data | ArtifactType::Model)
            }
            RelationKind::Member => true,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed pointer from one card to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageRef {
    pub kind: RelationKind,
    pub uid: Uuid,
}

impl fmt::Display for LineageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.kind, self.uid)
    }
}

/// The versioning key: versions increase monotonically per (name, team,
/// artifact type) and are never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardKey {
    pub name: String,
    pub team: String,
    pub artifact_type: ArtifactType,
}

impl fmt::Display for CardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.team, self.artifact_type, self.name)
    }
}

/// Per-type card payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CardKind {
    Data {
        /// Logical format of the underlying data (e.g. "parquet", "arrow").
        data_type: Option<String>,
    },
    Model {
        /// Model family or interface name (e.g. "sklearn", "lightgbm").
        model_type: Option<String>,
    },
    Run {
        metrics: BTreeMap<String, f64>,
        params: BTreeMap<String, String>,
    },
    Project {
        description: Option<String>,
    },
}

impl CardKind {
    pub fn artifact_type(&self) -> ArtifactType {
        match self {
            CardKind::Data { .. } => ArtifactType::Data,
            CardKind::Model { .. } => ArtifactType::Model,
            CardKind::Run { .. } => ArtifactType::Run,
            CardKind::Project { .. } => ArtifactType::Project,
        }
    }
}

/// A card: shared header plus the per-type payload.
///
/// Constructed in `Draft` status with no version and no storage path; both
/// are assigned during registration. `storage_path` is non-null exactly
/// when the status is not `Draft`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub uid: Uuid,
    pub name: String,
    pub team: String,
    pub version: Option<Version>,
    pub status: CardStatus,
    pub storage_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deprecated_at: Option<DateTime<Utc>>,
    pub tags: BTreeMap<String, String>,
    pub references: Vec<LineageRef>,
    pub kind: CardKind,
}

impl Card {
    /// Creates a draft card. Name and team are lowercased; full validation
    /// happens at registration time.
    pub fn new(name: impl Into<String>, team: impl Into<String>, kind: CardKind) -> Self {
        Self {
            uid: Uuid::new_v4(),
            name: name.into().to_lowercase(),
            team: team.into().to_lowercase(),
            version: None,
            status: CardStatus::Draft,
            storage_path: None,
            created_at: Utc::now(),
            deprecated_at: None,
            tags: BTreeMap::new(),
            references: Vec::new(),
            kind,
        }
    }

    pub fn artifact_type(&self) -> ArtifactType {
        self.kind.artifact_type()
    }

    pub fn key(&self) -> CardKey {
        CardKey {
            name: self.name.clone(),
            team: self.team.clone(),
            artifact_type: self.artifact_type(),
        }
    }

    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn add_reference(&mut self, kind: RelationKind, uid: Uuid) {
        self.references.push(LineageRef { kind, uid });
    }

    /// Builder-style tag helper.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_tag(key, value);
        self
    }

    /// Builder-style reference helper.
    pub fn with_reference(mut self, kind: RelationKind, uid: Uuid) -> Self {
        self.add_reference(kind, uid);
        self
    }
}

/// Lightweight listing row returned by queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSummary {
    pub uid: Uuid,
    pub name: String,
    pub team: String,
    pub version: Version,
    pub artifact_type: ArtifactType,
    pub status: CardStatus,
    pub storage_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CardSummary {
    /// Summarizes a persisted card. Returns `None` for drafts, which have
    /// no version and are never listable anyway.
    pub fn from_card(card: &Card) -> Option<Self> {
        Some(Self {
            uid: card.uid,
            name: card.name.clone(),
            team: card.team.clone(),
            version: card.version.clone()?,
            artifact_type: card.artifact_type(),
            status: card.status,
            storage_path: card.storage_path.clone(),
            created_at: card.created_at,
        })
    }
}

/// Maximum length accepted for name and team identifiers.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Validates a name or team identifier: non-empty, bounded, lowercase
/// alphanumeric with `-` and `_`.
pub fn is_valid_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_IDENTIFIER_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}
