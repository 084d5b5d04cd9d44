use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Identity;
use crate::store::AppState;

/// Key under which the whole serialized app state lives.
const STATE_KEY: &str = "app_state";

/// On-device persistence for the local state store: the entire [`AppState`]
/// is serialized as one JSON value under a single key, rewritten on every
/// mutation and read back once at startup.
pub struct SnapshotDb {
    conn: Connection,
}

impl SnapshotDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open state database: {}", path.display()))?;
        let db = SnapshotDb { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = SnapshotDb { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS snapshots (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Read the persisted state, if any. A missing key means first run.
    pub fn load(&self) -> Result<Option<AppState>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM snapshots WHERE key = ?1",
                params![STATE_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(json) => {
                let state = serde_json::from_str(&json).context("Corrupt state snapshot")?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    pub fn save(&self, state: &AppState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO snapshots (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![STATE_KEY, json, now],
        )?;
        Ok(())
    }
}

/// A stored remote document: opaque JSON body keyed by collection and id,
/// tagged with its owner.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub owner: String,
    pub body: serde_json::Value,
}

/// Server-side storage for the sync backend: one flat document table plus
/// the identity gate's user records.
pub struct DocumentDb {
    conn: Connection,
}

impl DocumentDb {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open document database: {}", path.display()))?;
        let db = DocumentDb { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = DocumentDb { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS documents (
                    collection TEXT NOT NULL,
                    id TEXT NOT NULL,
                    owner TEXT NOT NULL,
                    body TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (collection, id)
                );
                CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(collection, owner);

                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY NOT NULL,
                    email TEXT NOT NULL UNIQUE,
                    password_sha256 TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Documents ---

    pub fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, body FROM documents WHERE collection = ?1 ORDER BY id",
        )?;
        let docs = stmt
            .query_map(params![collection], |row| {
                let id: String = row.get(0)?;
                let owner: String = row.get(1)?;
                let body: String = row.get(2)?;
                Ok((id, owner, body))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        docs.into_iter()
            .map(|(id, owner, body)| {
                let body = serde_json::from_str(&body)
                    .with_context(|| format!("Corrupt document {collection}/{id}"))?;
                Ok(Document { id, owner, body })
            })
            .collect()
    }

    pub fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT owner, body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((owner, body)) => Ok(Some(Document {
                id: id.to_string(),
                owner,
                body: serde_json::from_str(&body)
                    .with_context(|| format!("Corrupt document {collection}/{id}"))?,
            })),
            None => Ok(None),
        }
    }

    pub fn put_document(
        &self,
        collection: &str,
        id: &str,
        owner: &str,
        body: &serde_json::Value,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO documents (collection, id, owner, body, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![collection, id, owner, body.to_string(), now],
        )?;
        Ok(())
    }

    /// Idempotent: deleting a missing document returns false.
    pub fn delete_document(&self, collection: &str, id: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(rows > 0)
    }

    // --- Identity gate ---

    pub fn create_user(&self, email: &str, password: &str) -> Result<Identity> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            bail!("Invalid email address");
        }
        if password.len() < 8 {
            bail!("Password must be at least 8 characters");
        }

        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM users WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            bail!("An account with that email already exists");
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO users (id, email, password_sha256, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, email, hash_password(password), now],
        )?;
        Ok(Identity { id, email })
    }

    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<Identity>> {
        let email = email.trim().to_lowercase();
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT id, password_sha256 FROM users WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((id, digest)) if digest == hash_password(password) => {
                Ok(Some(Identity { id, email }))
            }
            _ => Ok(None),
        }
    }
}

fn hash_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}
