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

//! Shared fixtures for the integration suite.

use std::sync::{Arc, Once};

use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use cardbox::{
    ArtifactStream, CardRegistry, DieselRegistryStore, LocalStorageClient, RegistryQuery,
};

static INIT: Once = Once::new();

/// Initializes tracing once for the whole suite; respects `RUST_LOG`.
fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A registry over the reference backends: an SQLite file and a local
/// filesystem artifact root, both inside a temp directory whose lifetime
/// the test controls.
pub struct ReferenceFixture {
    pub registry: CardRegistry,
    pub query: RegistryQuery,
    pub store: Arc<DieselRegistryStore>,
    pub storage: Arc<LocalStorageClient>,
    _dir: TempDir,
}

pub async fn reference_fixture() -> ReferenceFixture {
    init_tracing();
    let dir = TempDir::new().expect("failed to create temp directory");
    let db_path = dir.path().join("cards.db");

    let store = Arc::new(
        DieselRegistryStore::connect(db_path.to_str().expect("non-utf8 temp path"))
            .await
            .expect("failed to create registry store"),
    );
    let storage = Arc::new(
        LocalStorageClient::new(dir.path().join("artifacts"))
            .expect("failed to create storage client"),
    );

    ReferenceFixture {
        registry: CardRegistry::new(store.clone(), storage.clone()),
        query: RegistryQuery::new(store.clone()),
        store,
        storage,
        _dir: dir,
    }
}

pub async fn read_all(mut stream: ArtifactStream) -> Vec<u8> {
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .await
        .expect("failed to read stream");
    buf
}
