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

//! Database connection management for the embedded SQLite backend.
//!
//! Provides an async connection pool via `deadpool-diesel`. The pool is
//! `Clone` and thread-safe; each clone references the same underlying
//! connections. Schema bootstrap is a plain `CREATE TABLE IF NOT EXISTS`,
//! so the same statement works on a fresh file, an existing file, or
//! `:memory:`.

use deadpool_diesel::sqlite::{Manager, Pool, Runtime};
use diesel::prelude::*;
use tracing::info;

use crate::error::StoreError;

/// SQL for the discriminated single-table card schema.
///
/// major/minor/patch are stored as integers alongside the version string so
/// "order by version descending" is numeric, not lexicographic. The unique
/// constraint on (name, team, artifact_type, version) is the authoritative
/// serialization point for version assignment.
const CREATE_CARDS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS cards (
    uid TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    team TEXT NOT NULL,
    version TEXT NOT NULL,
    major INTEGER NOT NULL,
    minor INTEGER NOT NULL,
    patch INTEGER NOT NULL,
    artifact_type TEXT NOT NULL,
    status TEXT NOT NULL,
    storage_path TEXT,
    created_at TEXT NOT NULL,
    deprecated_at TEXT,
    tags TEXT NOT NULL,
    refs TEXT NOT NULL,
    payload TEXT NOT NULL,
    UNIQUE (name, team, artifact_type, version)
)
"#;

/// A pool of SQLite connections.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Database(sqlite)")
    }
}

impl Database {
    /// Creates a connection pool for the given path, `:memory:`, or
    /// `sqlite://` URL.
    ///
    /// SQLite has limited concurrent write support even with WAL mode;
    /// a single connection avoids "database is locked" errors, and writer
    /// serialization is exactly what the version uniqueness constraint
    /// relies on.
    pub fn new(connection_string: &str) -> Result<Self, StoreError> {
        let url = Self::build_sqlite_url(connection_string);
        let manager = Manager::new(url, Runtime::Tokio1);
        let pool = Pool::builder(manager)
            .max_size(1)
            .build()
            .map_err(|e| StoreError::Backend(format!("failed to create pool: {}", e)))?;

        info!("SQLite connection pool initialized (size: 1)");
        Ok(Self { pool })
    }

    /// Returns the connection pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Sets pragmas and creates the cards table if missing.
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Backend(format!("failed to get connection: {}", e)))?;

        conn.interact(|conn| {
            // WAL mode allows concurrent reads during writes; busy_timeout
            // makes SQLite wait instead of immediately failing on locks.
            diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
            diesel::sql_query("PRAGMA busy_timeout=30000;").execute(conn)?;
            diesel::sql_query(CREATE_CARDS_TABLE).execute(conn)?;
            Ok::<_, diesel::result::Error>(())
        })
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?
        .map_err(|e| StoreError::Backend(format!("schema initialization failed: {}", e)))?;

        Ok(())
    }

    /// Strips an optional `sqlite://` prefix.
    fn build_sqlite_url(connection_string: &str) -> String {
        if let Some(path) = connection_string.strip_prefix("sqlite://") {
            path.to_string()
        } else {
            connection_string.to_string()
        }
    }
}
