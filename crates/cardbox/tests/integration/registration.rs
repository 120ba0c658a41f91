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

//! Write-path behavior: version assignment, lineage gating, failure
//! semantics of the two-step write.

use std::sync::Arc;

use async_trait::async_trait;
use semver::Version;
use uuid::Uuid;

use cardbox::testing::{MemoryRegistryStore, MemoryStorageClient};
use cardbox::{
    ArtifactStream, BytesSource, Card, CardKind, CardRegistry, CardStatus, RegistryError,
    RelationKind, StorageClient, StorageError, VersionRequest,
};

use crate::fixtures::reference_fixture;

fn data_card(name: &str, team: &str) -> Card {
    Card::new(
        name,
        team,
        CardKind::Data {
            data_type: Some("parquet".into()),
        },
    )
}

#[tokio::test]
async fn test_first_registration_gets_1_0_0() {
    let fx = reference_fixture().await;

    let registered = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"rows".to_vec()))
        .await
        .expect("registration failed");

    assert_eq!(registered.version, Some(Version::new(1, 0, 0)));
    assert_eq!(registered.status, CardStatus::Registered);
    assert_eq!(
        registered.storage_path.as_deref(),
        Some("growth/DATA/sales/v1.0.0/artifact")
    );
    assert!(fx
        .storage
        .exists("growth/DATA/sales/v1.0.0/artifact")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_second_registration_bumps_minor() {
    let fx = reference_fixture().await;

    fx.registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v1".to_vec()))
        .await
        .unwrap();
    let second = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v2".to_vec()))
        .await
        .unwrap();

    assert_eq!(second.version, Some(Version::new(1, 1, 0)));
    assert_eq!(
        second.storage_path.as_deref(),
        Some("growth/DATA/sales/v1.1.0/artifact")
    );
}

#[tokio::test]
async fn test_versions_strictly_increase_across_sequence() {
    let fx = reference_fixture().await;

    let mut versions = Vec::new();
    for i in 0..5 {
        let payload = format!("payload {}", i).into_bytes();
        let card = fx
            .registry
            .register(data_card("sales", "growth"), &BytesSource::new(payload))
            .await
            .unwrap();
        versions.push(card.version.unwrap());
    }

    for pair in versions.windows(2) {
        assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
    }
}

#[tokio::test]
async fn test_explicit_version_rules() {
    let fx = reference_fixture().await;

    fx.registry
        .register_with(
            data_card("sales", "growth"),
            &BytesSource::new(b"v2".to_vec()),
            VersionRequest::Explicit(Version::new(2, 0, 0)),
        )
        .await
        .unwrap();

    // At or below the current max: conflict.
    for requested in [Version::new(2, 0, 0), Version::new(1, 9, 9)] {
        let err = fx
            .registry
            .register_with(
                data_card("sales", "growth"),
                &BytesSource::new(b"x".to_vec()),
                VersionRequest::Explicit(requested),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::VersionConflict { .. }));
    }

    // Above the current max: becomes the new max.
    let above = fx
        .registry
        .register_with(
            data_card("sales", "growth"),
            &BytesSource::new(b"v5".to_vec()),
            VersionRequest::Explicit(Version::new(5, 0, 0)),
        )
        .await
        .unwrap();
    assert_eq!(above.version, Some(Version::new(5, 0, 0)));

    let bumped = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v6".to_vec()))
        .await
        .unwrap();
    assert_eq!(bumped.version, Some(Version::new(5, 1, 0)));
}

#[tokio::test]
async fn test_explicit_version_beyond_column_range_is_rejected() {
    let fx = reference_fixture().await;

    // 4294967296.0.0 would wrap in the integer ordering columns; it must
    // never reach the store.
    let err = fx
        .registry
        .register_with(
            data_card("sales", "growth"),
            &BytesSource::new(b"x".to_vec()),
            VersionRequest::Explicit(Version::new(1u64 << 32, 0, 0)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::SchemaViolation { .. }));

    // Version assignment is unaffected: the key still seeds at 1.0.0 and
    // stays strictly increasing.
    let first = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v1".to_vec()))
        .await
        .unwrap();
    assert_eq!(first.version, Some(Version::new(1, 0, 0)));
    let second = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v2".to_vec()))
        .await
        .unwrap();
    assert_eq!(second.version, Some(Version::new(1, 1, 0)));
}

#[tokio::test]
async fn test_explicit_prerelease_or_build_version_is_rejected() {
    let fx = reference_fixture().await;

    for raw in ["1.2.0-alpha", "1.2.0+build.5"] {
        let version = Version::parse(raw).unwrap();
        let err = fx
            .registry
            .register_with(
                data_card("sales", "growth"),
                &BytesSource::new(b"x".to_vec()),
                VersionRequest::Explicit(version),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::SchemaViolation { .. }), "{}", raw);
    }

    // The plain release counterpart is fine.
    let registered = fx
        .registry
        .register_with(
            data_card("sales", "growth"),
            &BytesSource::new(b"x".to_vec()),
            VersionRequest::Explicit(Version::new(1, 2, 0)),
        )
        .await
        .unwrap();
    assert_eq!(registered.version, Some(Version::new(1, 2, 0)));
}

#[tokio::test]
async fn test_model_lineage_happy_path() {
    let fx = reference_fixture().await;

    let data = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"rows".to_vec()))
        .await
        .unwrap();

    let model = Card::new("churn", "growth", CardKind::Model { model_type: None })
        .with_reference(RelationKind::TrainedFrom, data.uid);
    let registered = fx
        .registry
        .register(model, &BytesSource::new(b"weights".to_vec()))
        .await
        .unwrap();
    assert_eq!(registered.references.len(), 1);
}

#[tokio::test]
async fn test_dangling_reference_touches_neither_store() {
    let store = Arc::new(MemoryRegistryStore::new());
    let storage = Arc::new(MemoryStorageClient::new());
    let registry = CardRegistry::new(store.clone(), storage.clone());

    let model = Card::new("churn", "growth", CardKind::Model { model_type: None })
        .with_reference(RelationKind::TrainedFrom, Uuid::new_v4());

    let err = registry
        .register(model, &BytesSource::new(b"weights".to_vec()))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::DanglingReference { .. }));
    assert_eq!(storage.put_count(), 0, "artifact store must not be touched");
    assert_eq!(store.insert_count(), 0, "metadata store must not be touched");
}

#[tokio::test]
async fn test_relation_kind_not_allowed_on_card_type() {
    let fx = reference_fixture().await;

    let data = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"rows".to_vec()))
        .await
        .unwrap();

    // trained_from is a model relation; a data card may not carry it.
    let bad = data_card("derived", "growth").with_reference(RelationKind::TrainedFrom, data.uid);
    let err = fx
        .registry
        .register(bad, &BytesSource::new(b"x".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::SchemaViolation { .. }));
}

#[tokio::test]
async fn test_invalid_name_is_schema_violation() {
    let fx = reference_fixture().await;

    let mut card = data_card("sales", "growth");
    card.name = "not a name".to_string();

    let err = fx
        .registry
        .register(card, &BytesSource::new(b"x".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::SchemaViolation { .. }));
}

#[tokio::test]
async fn test_same_card_cannot_register_twice() {
    let fx = reference_fixture().await;

    let card = data_card("sales", "growth");
    let registered = fx
        .registry
        .register(card, &BytesSource::new(b"rows".to_vec()))
        .await
        .unwrap();

    let err = fx
        .registry
        .register(registered, &BytesSource::new(b"rows".to_vec()))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::SchemaViolation { .. }));
}

/// Storage client whose writes always fail.
struct FailingStorageClient;

#[async_trait]
impl StorageClient for FailingStorageClient {
    async fn put(&self, _path: &str, _data: ArtifactStream) -> Result<(), StorageError> {
        Err(StorageError::Backend("disk on fire".to_string()))
    }

    async fn get(&self, path: &str) -> Result<ArtifactStream, StorageError> {
        Err(StorageError::NotFound {
            path: path.to_string(),
        })
    }

    async fn exists(&self, _path: &str) -> Result<bool, StorageError> {
        Ok(false)
    }

    async fn delete(&self, _path: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_artifact_write_failure_leaves_no_metadata() {
    let store = Arc::new(MemoryRegistryStore::new());
    let registry = CardRegistry::new(store.clone(), Arc::new(FailingStorageClient));

    let err = registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"x".to_vec()))
        .await
        .unwrap_err();

    assert!(matches!(err, RegistryError::StorageWrite { .. }));
    assert_eq!(store.row_count(), 0, "no row may exist without its payload");
}
