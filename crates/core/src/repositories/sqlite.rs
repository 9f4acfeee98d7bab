//! SQLite-backed implementation of every repository contract.
//!
//! ## Layout
//!
//! ```text
//! discovery_request   (id, transaction_id, consent_manager_user_id, timestamp)
//! consent             (consent_artefact_id PK, patient_id, status, created_at)
//! data_flow_request   (transaction_id PK, request JSON, created_at)
//! health_information  (link_id PK, token, data, created_at)
//! ```
//!
//! Timestamps are stored as RFC 3339 text in UTC.
//!
//! ## Execution
//!
//! A single `rusqlite::Connection` sits behind a mutex. Every repository call moves its work
//! onto `tokio::task::spawn_blocking` so async callers never block a runtime worker on disk
//! I/O. Writes run inside an explicit transaction and are committed before the call returns.

use crate::consent::{Consent, ConsentStatus};
use crate::constants::{
    CONSENT_TABLE, DATA_FLOW_REQUEST_TABLE, DISCOVERY_REQUEST_TABLE, HEALTH_INFORMATION_TABLE,
};
use crate::data_flow::HealthInformationRequest;
use crate::discovery::DiscoveryRequest;
use crate::error::{StoreError, StoreResult};
use crate::health_information::HealthInformation;
use crate::repositories::{
    ConsentRepository, DataFlowRepository, DiscoveryRequestRepository,
    HealthInformationRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hip_types::{NonEmptyText, SecretText};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

#[derive(Clone, Debug)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Sqlite` if the file cannot be opened or the schema cannot be
    /// created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = wal;")?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory database. Contents vanish when the store is dropped.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        create_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_connection<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            f(&mut *guard)
        })
        .await?
    }
}

fn create_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {DISCOVERY_REQUEST_TABLE} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            transaction_id TEXT NOT NULL,
            consent_manager_user_id TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{DISCOVERY_REQUEST_TABLE}_lookup
            ON {DISCOVERY_REQUEST_TABLE} (transaction_id, consent_manager_user_id);
        CREATE TABLE IF NOT EXISTS {CONSENT_TABLE} (
            consent_artefact_id TEXT PRIMARY KEY,
            patient_id TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS {DATA_FLOW_REQUEST_TABLE} (
            transaction_id TEXT PRIMARY KEY,
            request TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS {HEALTH_INFORMATION_TABLE} (
            link_id TEXT PRIMARY KEY,
            token TEXT NOT NULL,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL
        );"
    ))?;
    Ok(())
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{raw}': {e}")))
}

fn non_empty(column: &str, raw: String) -> StoreResult<NonEmptyText> {
    NonEmptyText::new(raw).map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

#[async_trait]
impl DiscoveryRequestRepository for SqliteStore {
    async fn add(&self, request: DiscoveryRequest) -> StoreResult<()> {
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO {DISCOVERY_REQUEST_TABLE}
                        (transaction_id, consent_manager_user_id, timestamp)
                     VALUES (?1, ?2, ?3)"
                ),
                params![
                    request.transaction_id.as_str(),
                    request.consent_manager_user_id.as_str(),
                    request.timestamp.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete(
        &self,
        transaction_id: &NonEmptyText,
        consent_manager_user_id: &NonEmptyText,
    ) -> StoreResult<()> {
        let transaction_id = transaction_id.clone();
        let consent_manager_user_id = consent_manager_user_id.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let id: Option<i64> = tx
                .query_row(
                    &format!(
                        "SELECT id FROM {DISCOVERY_REQUEST_TABLE}
                         WHERE transaction_id = ?1 AND consent_manager_user_id = ?2
                         ORDER BY id LIMIT 1"
                    ),
                    params![transaction_id.as_str(), consent_manager_user_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let id = id.ok_or_else(|| {
                StoreError::NotFound(format!(
                    "discovery request (transaction_id={}, consent_manager_user_id={})",
                    transaction_id, consent_manager_user_id
                ))
            })?;

            tx.execute(
                &format!("DELETE FROM {DISCOVERY_REQUEST_TABLE} WHERE id = ?1"),
                params![id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn exists(
        &self,
        transaction_id: &NonEmptyText,
        consent_manager_user_id: &NonEmptyText,
    ) -> StoreResult<bool> {
        let transaction_id = transaction_id.clone();
        let consent_manager_user_id = consent_manager_user_id.clone();
        self.with_connection(move |conn| {
            let count: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {DISCOVERY_REQUEST_TABLE}
                     WHERE transaction_id = ?1 AND consent_manager_user_id = ?2"
                ),
                params![transaction_id.as_str(), consent_manager_user_id.as_str()],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }
}

#[async_trait]
impl ConsentRepository for SqliteStore {
    async fn get_for(&self, consent_artefact_id: &str) -> StoreResult<Option<Consent>> {
        let consent_artefact_id = consent_artefact_id.to_owned();
        self.with_connection(move |conn| {
            let row: Option<(String, String, String, String)> = conn
                .query_row(
                    &format!(
                        "SELECT consent_artefact_id, patient_id, status, created_at
                         FROM {CONSENT_TABLE} WHERE consent_artefact_id = ?1"
                    ),
                    params![consent_artefact_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()?;

            row.map(|(id, patient_id, status, created_at)| -> StoreResult<Consent> {
                Ok(Consent {
                    consent_artefact_id: non_empty("consent_artefact_id", id)?,
                    patient_id: non_empty("patient_id", patient_id)?,
                    status: status.parse::<ConsentStatus>()?,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .transpose()
        })
        .await
    }

    async fn add(&self, consent: Consent) -> StoreResult<()> {
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT OR REPLACE INTO {CONSENT_TABLE}
                        (consent_artefact_id, patient_id, status, created_at)
                     VALUES (?1, ?2, ?3, ?4)"
                ),
                params![
                    consent.consent_artefact_id.as_str(),
                    consent.patient_id.as_str(),
                    consent.status.as_str(),
                    consent.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl DataFlowRepository for SqliteStore {
    async fn save_request(
        &self,
        transaction_id: &NonEmptyText,
        request: &HealthInformationRequest,
    ) -> StoreResult<()> {
        let transaction_id = transaction_id.clone();
        let document = serde_json::to_string(request).map_err(StoreError::Serialization)?;
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO {DATA_FLOW_REQUEST_TABLE} (transaction_id, request, created_at)
                     VALUES (?1, ?2, ?3)"
                ),
                params![transaction_id.as_str(), document, Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn remove_request(&self, transaction_id: &NonEmptyText) -> StoreResult<()> {
        let transaction_id = transaction_id.clone();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                &format!("DELETE FROM {DATA_FLOW_REQUEST_TABLE} WHERE transaction_id = ?1"),
                params![transaction_id.as_str()],
            )?;
            if removed == 0 {
                return Err(StoreError::NotFound(format!(
                    "data flow request (transaction_id={})",
                    transaction_id
                )));
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl HealthInformationRepository for SqliteStore {
    async fn get(&self, link_id: &str) -> StoreResult<Option<HealthInformation>> {
        let link_id = link_id.to_owned();
        self.with_connection(move |conn| {
            let row: Option<(String, String, String, String)> = conn
                .query_row(
                    &format!(
                        "SELECT link_id, token, data, created_at
                         FROM {HEALTH_INFORMATION_TABLE} WHERE link_id = ?1"
                    ),
                    params![link_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                )
                .optional()?;

            row.map(|(link_id, token, data, created_at)| -> StoreResult<HealthInformation> {
                Ok(HealthInformation {
                    link_id: non_empty("link_id", link_id)?,
                    token: SecretText::new(token)
                        .map_err(|e| StoreError::Corrupt(format!("token: {e}")))?,
                    data,
                    created_at: parse_timestamp(&created_at)?,
                })
            })
            .transpose()
        })
        .await
    }

    async fn add(&self, information: HealthInformation) -> StoreResult<()> {
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO {HEALTH_INFORMATION_TABLE} (link_id, token, data, created_at)
                     VALUES (?1, ?2, ?3, ?4)"
                ),
                params![
                    information.link_id.as_str(),
                    information.token.expose(),
                    information.data,
                    information.created_at.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_flow::tests::sample_request;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    fn text(value: &str) -> NonEmptyText {
        NonEmptyText::new(value).unwrap()
    }

    async fn discovery_count(store: &SqliteStore) -> i64 {
        store
            .with_connection(|conn| {
                Ok(conn.query_row(
                    &format!("SELECT COUNT(*) FROM {DISCOVERY_REQUEST_TABLE}"),
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .expect("count should succeed")
    }

    #[tokio::test]
    async fn test_add_then_delete_discovery_request() {
        let store = SqliteStore::open_in_memory().expect("open store");
        let request = DiscoveryRequest::new(text("tx-1"), text("cm-user@ncg"));

        DiscoveryRequestRepository::add(&store, request)
            .await
            .expect("add should succeed");
        assert!(store.exists(&text("tx-1"), &text("cm-user@ncg")).await.unwrap());

        store
            .delete(&text("tx-1"), &text("cm-user@ncg"))
            .await
            .expect("delete should succeed");

        assert!(!store.exists(&text("tx-1"), &text("cm-user@ncg")).await.unwrap());
        assert_eq!(discovery_count(&store).await, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_discovery_request_is_not_found() {
        let store = SqliteStore::open_in_memory().expect("open store");
        DiscoveryRequestRepository::add(&store, DiscoveryRequest::new(text("tx-1"), text("a")))
            .await
            .unwrap();

        let err = store
            .delete(&text("tx-1"), &text("someone-else"))
            .await
            .expect_err("delete should fail for a mismatched user");

        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(discovery_count(&store).await, 1, "nothing should be removed");
    }

    #[tokio::test]
    async fn test_delete_removes_only_first_duplicate() {
        let store = SqliteStore::open_in_memory().expect("open store");
        for _ in 0..2 {
            DiscoveryRequestRepository::add(&store, DiscoveryRequest::new(text("tx"), text("u")))
                .await
                .unwrap();
        }

        store.delete(&text("tx"), &text("u")).await.unwrap();

        assert_eq!(discovery_count(&store).await, 1);
    }

    #[tokio::test]
    async fn test_discovery_requests_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("hip.sqlite3");

        {
            let store = SqliteStore::open(&path).expect("open store");
            DiscoveryRequestRepository::add(&store, DiscoveryRequest::new(text("tx"), text("u")))
                .await
                .unwrap();
        }

        let reopened = SqliteStore::open(&path).expect("reopen store");
        assert!(reopened.exists(&text("tx"), &text("u")).await.unwrap());
    }

    #[tokio::test]
    async fn test_consent_round_trip() {
        let store = SqliteStore::open_in_memory().expect("open store");
        let consent = Consent {
            consent_artefact_id: text("consent-1"),
            patient_id: text("patient@ncg"),
            status: ConsentStatus::Granted,
            created_at: Utc::now(),
        };

        ConsentRepository::add(&store, consent.clone()).await.unwrap();
        let found = store.get_for("consent-1").await.unwrap().expect("consent should exist");

        assert_eq!(found.consent_artefact_id, consent.consent_artefact_id);
        assert_eq!(found.status, ConsentStatus::Granted);
        assert!(store.get_for("consent-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_consent_add_replaces_status() {
        let store = SqliteStore::open_in_memory().expect("open store");
        let mut consent = Consent {
            consent_artefact_id: text("consent-1"),
            patient_id: text("patient@ncg"),
            status: ConsentStatus::Granted,
            created_at: Utc::now(),
        };
        ConsentRepository::add(&store, consent.clone()).await.unwrap();

        consent.status = ConsentStatus::Revoked;
        ConsentRepository::add(&store, consent).await.unwrap();

        let found = store.get_for("consent-1").await.unwrap().unwrap();
        assert_eq!(found.status, ConsentStatus::Revoked);
    }

    #[tokio::test]
    async fn test_save_request_rejects_reused_transaction_id() {
        let store = SqliteStore::open_in_memory().expect("open store");
        let request = sample_request("tx-1", "consent-1");

        store
            .save_request(&request.transaction_id, &request)
            .await
            .expect("first save should succeed");
        let err = store
            .save_request(&request.transaction_id, &request)
            .await
            .expect_err("second save should fail");

        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[tokio::test]
    async fn test_removed_request_frees_transaction_id() {
        let store = SqliteStore::open_in_memory().expect("open store");
        let request = sample_request("tx-1", "consent-1");
        store.save_request(&request.transaction_id, &request).await.unwrap();

        store
            .remove_request(&request.transaction_id)
            .await
            .expect("remove should succeed");

        store
            .save_request(&request.transaction_id, &request)
            .await
            .expect("transaction id should be reusable after removal");
    }

    #[tokio::test]
    async fn test_remove_missing_request_is_not_found() {
        let store = SqliteStore::open_in_memory().expect("open store");

        let err = store
            .remove_request(&text("tx-missing"))
            .await
            .expect_err("nothing to remove");

        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_saved_request_is_stored_as_json() {
        let store = SqliteStore::open_in_memory().expect("open store");
        let request = sample_request("tx-json", "consent-1");
        store.save_request(&request.transaction_id, &request).await.unwrap();

        let document: String = store
            .with_connection(|conn| {
                Ok(conn.query_row(
                    &format!(
                        "SELECT request FROM {DATA_FLOW_REQUEST_TABLE} WHERE transaction_id = ?1"
                    ),
                    params!["tx-json"],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();

        let parsed: HealthInformationRequest = serde_json::from_str(&document).unwrap();
        assert_eq!(parsed, request);
    }

    #[tokio::test]
    async fn test_health_information_round_trip() {
        let store = SqliteStore::open_in_memory().expect("open store");
        let created_at = Utc::now() - ChronoDuration::minutes(3);
        let information = HealthInformation {
            link_id: text("link-1"),
            token: SecretText::new("token-1").unwrap(),
            data: "{\"entries\":[]}".into(),
            created_at,
        };

        HealthInformationRepository::add(&store, information.clone())
            .await
            .unwrap();

        let found = store.get("link-1").await.unwrap().expect("should exist");
        assert_eq!(found.data, information.data);
        assert!(found.token.matches("token-1"));
        assert_eq!(found.created_at.timestamp(), created_at.timestamp());
        assert!(store.get("link-2").await.unwrap().is_none());
    }
}
