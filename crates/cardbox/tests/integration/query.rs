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

//! Read-path behavior: listing, loading, latest resolution, deprecation.

use semver::Version;
use uuid::Uuid;

use cardbox::{
    ArtifactType, BytesSource, Card, CardFilter, CardKind, CardLocator, CardStatus, RegistryError,
    StorageClient, VersionSelector,
};

use crate::fixtures::{read_all, reference_fixture};

fn data_card(name: &str, team: &str) -> Card {
    Card::new(name, team, CardKind::Data { data_type: None })
}

fn latest(name: &str, team: &str) -> CardLocator {
    CardLocator::Key {
        name: name.to_string(),
        team: team.to_string(),
        artifact_type: ArtifactType::Data,
        version: VersionSelector::Latest,
    }
}

fn exact(name: &str, team: &str, version: Version) -> CardLocator {
    CardLocator::Key {
        name: name.to_string(),
        team: team.to_string(),
        artifact_type: ArtifactType::Data,
        version: VersionSelector::Exact(version),
    }
}

#[tokio::test]
async fn test_round_trip_payload_is_byte_identical() {
    let fx = reference_fixture().await;

    let payload: Vec<u8> = (0u16..2048).map(|i| (i % 251) as u8).collect();
    let registered = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(payload.clone()))
        .await
        .unwrap();

    let (card, handle) = fx
        .query
        .load(&CardLocator::Uid(registered.uid))
        .await
        .unwrap();
    assert_eq!(card.uid, registered.uid);

    let stream = handle.open(fx.storage.as_ref()).await.unwrap();
    assert_eq!(read_all(stream).await, payload);
}

#[tokio::test]
async fn test_every_listed_card_is_fetchable() {
    let fx = reference_fixture().await;

    for i in 0..3 {
        fx.registry
            .register(
                data_card("sales", "growth"),
                &BytesSource::new(format!("payload {}", i).into_bytes()),
            )
            .await
            .unwrap();
    }

    let summaries = fx.query.list(&CardFilter::default()).await.unwrap();
    assert_eq!(summaries.len(), 3);
    for summary in summaries {
        let path = summary.storage_path.expect("listed card without path");
        assert!(fx.storage.exists(&path).await.unwrap(), "missing {}", path);
    }
}

#[tokio::test]
async fn test_latest_vs_exact() {
    let fx = reference_fixture().await;

    fx.registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v1".to_vec()))
        .await
        .unwrap();
    fx.registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v2".to_vec()))
        .await
        .unwrap();

    let (card, _) = fx.query.load(&latest("sales", "growth")).await.unwrap();
    assert_eq!(card.version, Some(Version::new(1, 1, 0)));

    let (card, handle) = fx
        .query
        .load(&exact("sales", "growth", Version::new(1, 0, 0)))
        .await
        .unwrap();
    assert_eq!(card.version, Some(Version::new(1, 0, 0)));
    let stream = handle.open(fx.storage.as_ref()).await.unwrap();
    assert_eq!(read_all(stream).await, b"v1");
}

#[tokio::test]
async fn test_load_not_found() {
    let fx = reference_fixture().await;

    let err = fx.query.load(&latest("nothing", "here")).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }));

    let err = fx
        .query
        .load(&CardLocator::Uid(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }));
}

#[tokio::test]
async fn test_list_filters_by_team_and_type() {
    let fx = reference_fixture().await;

    fx.registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"a".to_vec()))
        .await
        .unwrap();
    fx.registry
        .register(data_card("clicks", "web"), &BytesSource::new(b"b".to_vec()))
        .await
        .unwrap();
    fx.registry
        .register(
            Card::new("churn", "growth", CardKind::Model { model_type: None }),
            &BytesSource::new(b"w".to_vec()),
        )
        .await
        .unwrap();

    let growth = CardFilter {
        team: Some("growth".into()),
        ..CardFilter::default()
    };
    assert_eq!(fx.query.list(&growth).await.unwrap().len(), 2);

    let growth_models = CardFilter {
        team: Some("growth".into()),
        artifact_type: Some(ArtifactType::Model),
        ..CardFilter::default()
    };
    let listed = fx.query.list(&growth_models).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "churn");
}

#[tokio::test]
async fn test_deprecation_semantics() {
    let fx = reference_fixture().await;

    let v1 = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v1".to_vec()))
        .await
        .unwrap();
    fx.registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v2".to_vec()))
        .await
        .unwrap();

    // Deprecate the newer version; latest falls back to 1.0.0.
    let (newest, _) = fx.query.load(&latest("sales", "growth")).await.unwrap();
    assert_eq!(newest.version, Some(Version::new(1, 1, 0)));
    fx.registry.deprecate(newest.uid).await.unwrap();

    let (card, _) = fx.query.load(&latest("sales", "growth")).await.unwrap();
    assert_eq!(card.uid, v1.uid);

    // Exact-version lookup still returns the deprecated card, with its
    // path and bytes intact.
    let (card, handle) = fx
        .query
        .load(&exact("sales", "growth", Version::new(1, 1, 0)))
        .await
        .unwrap();
    assert_eq!(card.status, CardStatus::Deprecated);
    assert!(card.deprecated_at.is_some());
    assert_eq!(card.storage_path, newest.storage_path);
    let stream = handle.open(fx.storage.as_ref()).await.unwrap();
    assert_eq!(read_all(stream).await, b"v2");

    // Deprecation is idempotent; a missing uid is NotFound.
    fx.registry.deprecate(newest.uid).await.unwrap();
    let err = fx.registry.deprecate(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }));
}

#[tokio::test]
async fn test_deprecated_key_fully_deprecated_has_no_latest() {
    let fx = reference_fixture().await;

    let only = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v1".to_vec()))
        .await
        .unwrap();
    fx.registry.deprecate(only.uid).await.unwrap();

    let err = fx.query.load(&latest("sales", "growth")).await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound { .. }));

    // A later registration does not reuse the deprecated version.
    let next = fx
        .registry
        .register(data_card("sales", "growth"), &BytesSource::new(b"v2".to_vec()))
        .await
        .unwrap();
    assert_eq!(next.version, Some(Version::new(1, 1, 0)));
}
