mod path;
mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

pub use path::{json_path, merge_json, DocumentPath};

use crate::error::StoreError;
use crate::models::{CredentialRecord, TaskListRecord, ACCESS_TOKEN_FIELD};
use crate::store::{CredentialStore, DocumentRef, TaskStore};

/// SQLite-backed JSON document store.
///
/// Each row is one document addressed by its slash path. The owning user id
/// is derived from the path on write so discovery can return it without
/// re-parsing.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "momentum")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Self::open(dirs.data_dir().join("momentum.db"))
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let mut conn = self.lock()?;
        let ran = schema::run_migrations(&mut conn)?;
        if ran > 0 {
            tracing::debug!(ran, "Schema migrated");
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ============================================================
    // Raw document operations
    // ============================================================

    pub fn get_document(&self, path: &str) -> Result<Option<Value>, StoreError> {
        DocumentPath::parse(path)?;
        let conn = self.lock()?;
        read_document(&conn, path)
    }

    /// Write a document. With `merge`, nested objects are merged into the
    /// existing document instead of replacing it.
    pub fn set_document(&self, path: &str, value: Value, merge: bool) -> Result<(), StoreError> {
        let doc_path = DocumentPath::parse(path)?;
        if !value.is_object() {
            return Err(StoreError::MalformedRecord {
                path: path.to_string(),
                reason: "document must be a JSON object".to_string(),
            });
        }

        let conn = self.lock()?;
        let data = match (merge, read_document(&conn, path)?) {
            (true, Some(mut existing)) => {
                merge_json(&mut existing, value);
                existing
            }
            _ => value,
        };

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO documents (path, owner_uid, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(path) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            (path, doc_path.owner(), data.to_string(), &now),
        )?;

        tracing::debug!(path, merge, "document written");
        Ok(())
    }

    pub fn delete_document(&self, path: &str) -> Result<bool, StoreError> {
        DocumentPath::parse(path)?;
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM documents WHERE path = ?", [path])?;
        Ok(rows > 0)
    }

    /// Every document whose `field` (dotted path) holds a non-empty string.
    pub fn find_non_empty(&self, field: &str) -> Result<Vec<DocumentRef>, StoreError> {
        let json_path = json_path(field)?;
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT path, owner_uid FROM documents
             WHERE json_valid(data)
               AND json_type(data, ?1) = 'text'
               AND json_extract(data, ?1) > ''
             ORDER BY path",
        )?;

        let refs = stmt
            .query_map([json_path], |row| {
                Ok(DocumentRef {
                    path: row.get(0)?,
                    owner: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(refs)
    }

    // ============================================================
    // Typed access
    // ============================================================

    fn get_typed<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, StoreError> {
        let Some(value) = self.get_document(path)? else {
            return Ok(None);
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::MalformedRecord {
                path: path.to_string(),
                reason: e.to_string(),
            })
    }

    fn set_typed<T: Serialize>(&self, path: &str, record: &T, merge: bool) -> Result<(), StoreError> {
        let value = serde_json::to_value(record).map_err(|e| StoreError::MalformedRecord {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        self.set_document(path, value, merge)
    }
}

impl CredentialStore for Database {
    fn get_credentials(&self, path: &str) -> Result<Option<CredentialRecord>, StoreError> {
        self.get_typed(path)
    }

    fn set_credentials(
        &self,
        path: &str,
        record: &CredentialRecord,
        merge: bool,
    ) -> Result<(), StoreError> {
        self.set_typed(path, record, merge)
    }

    fn find_with_access_token(&self) -> Result<Vec<DocumentRef>, StoreError> {
        self.find_non_empty(ACCESS_TOKEN_FIELD)
    }
}

impl TaskStore for Database {
    fn get_task_list(&self, path: &str) -> Result<Option<TaskListRecord>, StoreError> {
        self.get_typed(path)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn read_document(conn: &Connection, path: &str) -> Result<Option<Value>, StoreError> {
    let data: Option<String> = conn
        .query_row("SELECT data FROM documents WHERE path = ?", [path], |row| {
            row.get(0)
        })
        .optional()?;

    data.map(|text| {
        serde_json::from_str(&text).map_err(|e| StoreError::MalformedRecord {
            path: path.to_string(),
            reason: e.to_string(),
        })
    })
    .transpose()
}
