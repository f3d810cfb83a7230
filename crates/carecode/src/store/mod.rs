//! Storage layer for carecode.
//!
//! This module provides `SQLite`-based persistence for access grants, the
//! three origin document collections, and the identity directory.
//!
//! Grants are append-only: issuance inserts, extension moves `expires_at`,
//! revocation clears `active`. Nothing ever deletes a grant row or touches
//! its snapshot after issuance.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::document::ShareableDocument;
use crate::error::{Error, Result};
use crate::grant::{AccessGrant, AccessScope};
use crate::identity::PermanentIdentity;

/// A raw row from the structured directive collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveRecord {
    /// Identifier, unique within this collection.
    pub id: String,
    /// Owning identity; legacy rows may lack one.
    pub owner_id: Option<String>,
    /// Optional title.
    pub title: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Structured directive content as JSON text.
    pub content_json: String,
    /// Visibility flag; absent on older rows.
    pub is_private: Option<bool>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp, when recorded.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A raw row from the generic PDF collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfRecord {
    /// Identifier, unique within this collection.
    pub id: String,
    /// Owning identity; legacy rows may lack one.
    pub owner_id: Option<String>,
    /// Original file name.
    pub file_name: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// MIME type, when recorded at upload time.
    pub content_type: Option<String>,
    /// Reference to the stored bytes.
    pub storage_ref: String,
    /// Visibility flag; absent on older rows.
    pub is_private: Option<bool>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp, when recorded.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A raw row from the medical-file collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicalFileRecord {
    /// Identifier, unique within this collection.
    pub id: String,
    /// Owning identity; legacy rows may lack one.
    pub owner_id: Option<String>,
    /// Original file name.
    pub file_name: Option<String>,
    /// Free-form category (lab result, imaging, ...).
    pub category: Option<String>,
    /// Reference to the stored bytes.
    pub storage_ref: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Storage engine for grants, documents, and identities.
#[derive(Debug)]
pub struct Store {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Store {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// Every store call runs under a bounded busy timeout: a lock held past
    /// it surfaces as a database error rather than an indefinite wait, and
    /// the failed operation leaves no partial state behind.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // Enable WAL mode for better concurrent read performance, and bound
        // how long a call may wait on a locked database.
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA busy_timeout=5000;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Grants ===

    /// Insert a new grant (insert-only; issuance path).
    ///
    /// Returns the assigned row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation or snapshot serialization fails.
    pub fn put_grant(&self, grant: &AccessGrant) -> Result<i64> {
        let snapshot_json = serde_json::to_string(&grant.snapshot)?;

        self.conn.execute(
            r"
            INSERT INTO grants (code, owner_id, snapshot_json, access_scope, issued_at, expires_at, active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                grant.code,
                grant.owner_id,
                snapshot_json,
                grant.access_scope.to_string(),
                grant.issued_at.to_rfc3339(),
                grant.expires_at.to_rfc3339(),
                i32::from(grant.active),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!("Inserted grant with id {}", id);
        Ok(id)
    }

    /// Get the most recently issued grant for a code.
    ///
    /// Code values may be reused once a grant is inactive, so lookups
    /// resolve to the newest row for that code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_grant(&self, code: &str) -> Result<Option<AccessGrant>> {
        let result = self
            .conn
            .query_row(
                r"
                SELECT id, code, owner_id, snapshot_json, access_scope, issued_at, expires_at, active
                FROM grants WHERE code = ?1
                ORDER BY id DESC LIMIT 1
                ",
                [code],
                Self::row_to_grant,
            )
            .optional()?;
        Ok(result)
    }

    /// Check whether a code value is held by any currently active,
    /// unexpired grant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn code_in_active_use(&self, code: &str, now: DateTime<Utc>) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM grants WHERE code = ?1 AND active = 1 AND expires_at > ?2",
            params![code, now.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Push a grant's expiry forward by the given number of days.
    ///
    /// The new expiry never exceeds `issued_at + max_expiry_days`, so
    /// repeated extensions cannot push a grant past the lifetime that
    /// issuance enforces.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GrantNotFound`] if no grant exists for the code and
    /// [`Error::GrantInactive`] if the grant is revoked or already expired.
    pub fn extend_grant(
        &self,
        code: &str,
        additional_days: i64,
        max_expiry_days: i64,
    ) -> Result<DateTime<Utc>> {
        let grant = self
            .get_grant(code)?
            .ok_or_else(|| Error::grant_not_found(code))?;

        if !grant.is_redeemable_at(Utc::now()) {
            return Err(Error::grant_inactive(code));
        }

        let cap = grant.issued_at + Duration::days(max_expiry_days);
        let mut new_expiry = grant.expires_at + Duration::days(additional_days);
        if new_expiry > cap {
            warn!(
                "Extension for {} exceeds the expiry cap; clamping to {}",
                code, cap
            );
            new_expiry = cap;
        }

        self.conn.execute(
            "UPDATE grants SET expires_at = ?1 WHERE id = ?2",
            params![new_expiry.to_rfc3339(), grant.id],
        )?;

        debug!("Extended grant {} to {}", code, new_expiry);
        Ok(new_expiry)
    }

    /// Revoke a grant, keeping the record for audit.
    ///
    /// Idempotent: revoking an already-revoked or already-expired grant
    /// succeeds without error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GrantNotFound`] if no grant was ever issued for the
    /// code, or an error if the database operation fails.
    pub fn revoke_grant(&self, code: &str) -> Result<()> {
        let grant = self
            .get_grant(code)?
            .ok_or_else(|| Error::grant_not_found(code))?;

        if grant.active {
            self.conn.execute(
                "UPDATE grants SET active = 0 WHERE id = ?1",
                params![grant.id],
            )?;
            info!("Revoked grant {}", code);
        }
        Ok(())
    }

    /// List all grants issued by an owner, newest first.
    ///
    /// Includes inactive grants: the history is the audit trail.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_grants(&self, owner_id: &str) -> Result<Vec<AccessGrant>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, code, owner_id, snapshot_json, access_scope, issued_at, expires_at, active
            FROM grants WHERE owner_id = ?1
            ORDER BY id DESC
            ",
        )?;

        let grants = stmt
            .query_map([owner_id], Self::row_to_grant)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(grants)
    }

    /// Force a grant's expiry into the past (test fixture).
    #[cfg(test)]
    pub(crate) fn force_expire(&self, code: &str) -> Result<()> {
        let past = (Utc::now() - Duration::seconds(1)).to_rfc3339();
        self.conn.execute(
            "UPDATE grants SET expires_at = ?1 WHERE code = ?2",
            params![past, code],
        )?;
        Ok(())
    }

    // === Origin collections ===

    /// Insert a directive record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_directive(&self, record: &DirectiveRecord) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO directives (id, owner_id, title, description, content_json, is_private, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                record.id,
                record.owner_id,
                record.title,
                record.description,
                record.content_json,
                record.is_private.map(i32::from),
                record.created_at.to_rfc3339(),
                record.updated_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// List directive records for an owner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aggregation`] naming this collection on failure.
    pub fn list_directives(&self, owner_id: &str) -> Result<Vec<DirectiveRecord>> {
        let run = || -> std::result::Result<Vec<DirectiveRecord>, rusqlite::Error> {
            let mut stmt = self.conn.prepare(
                r"
                SELECT id, owner_id, title, description, content_json, is_private, created_at, updated_at
                FROM directives WHERE owner_id = ?1
                ",
            )?;
            let rows = stmt
                .query_map([owner_id], Self::row_to_directive)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        };
        run().map_err(|e| Error::aggregation("directives", e))
    }

    /// Insert a PDF record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_pdf_document(&self, record: &PdfRecord) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO pdf_documents (id, owner_id, file_name, description, content_type, storage_ref, is_private, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ",
            params![
                record.id,
                record.owner_id,
                record.file_name,
                record.description,
                record.content_type,
                record.storage_ref,
                record.is_private.map(i32::from),
                record.created_at.to_rfc3339(),
                record.updated_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// List PDF records for an owner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aggregation`] naming this collection on failure.
    pub fn list_pdf_documents(&self, owner_id: &str) -> Result<Vec<PdfRecord>> {
        let run = || -> std::result::Result<Vec<PdfRecord>, rusqlite::Error> {
            let mut stmt = self.conn.prepare(
                r"
                SELECT id, owner_id, file_name, description, content_type, storage_ref, is_private, created_at, updated_at
                FROM pdf_documents WHERE owner_id = ?1
                ",
            )?;
            let rows = stmt
                .query_map([owner_id], Self::row_to_pdf)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        };
        run().map_err(|e| Error::aggregation("pdf_documents", e))
    }

    /// Insert a medical-file record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn insert_medical_file(&self, record: &MedicalFileRecord) -> Result<()> {
        self.conn.execute(
            r"
            INSERT INTO medical_files (id, owner_id, file_name, category, storage_ref, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                record.id,
                record.owner_id,
                record.file_name,
                record.category,
                record.storage_ref,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List medical-file records for an owner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Aggregation`] naming this collection on failure.
    pub fn list_medical_files(&self, owner_id: &str) -> Result<Vec<MedicalFileRecord>> {
        let run = || -> std::result::Result<Vec<MedicalFileRecord>, rusqlite::Error> {
            let mut stmt = self.conn.prepare(
                r"
                SELECT id, owner_id, file_name, category, storage_ref, created_at
                FROM medical_files WHERE owner_id = ?1
                ",
            )?;
            let rows = stmt
                .query_map([owner_id], Self::row_to_medical_file)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        };
        run().map_err(|e| Error::aggregation("medical_files", e))
    }

    // === Identities ===

    /// Insert or replace an identity record.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn put_identity(&self, identity: &PermanentIdentity) -> Result<()> {
        self.conn.execute(
            r"
            INSERT OR REPLACE INTO identities (owner_id, first_name, last_name, birth_date)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                identity.owner_id,
                identity.first_name,
                identity.last_name,
                identity.birth_date.to_string(),
            ],
        )?;
        Ok(())
    }

    /// Get the identity record for an owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_identity(&self, owner_id: &str) -> Result<Option<PermanentIdentity>> {
        let result = self
            .conn
            .query_row(
                "SELECT owner_id, first_name, last_name, birth_date FROM identities WHERE owner_id = ?1",
                [owner_id],
                Self::row_to_identity,
            )
            .optional()?;
        Ok(result)
    }

    /// Find identity candidates by case-insensitive name match.
    ///
    /// Multiple people can share a name; the caller filters further.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_identities_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> Result<Vec<PermanentIdentity>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT owner_id, first_name, last_name, birth_date
            FROM identities
            WHERE first_name = ?1 COLLATE NOCASE AND last_name = ?2 COLLATE NOCASE
            ",
        )?;

        let identities = stmt
            .query_map(
                params![first_name.trim(), last_name.trim()],
                Self::row_to_identity,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(identities)
    }

    // === Row mappers ===

    /// Convert a database row to an `AccessGrant`.
    fn row_to_grant(row: &rusqlite::Row) -> rusqlite::Result<AccessGrant> {
        let id: i64 = row.get(0)?;
        let code: String = row.get(1)?;
        let owner_id: String = row.get(2)?;
        let snapshot_json: String = row.get(3)?;
        let scope_str: String = row.get(4)?;
        let issued_at_str: String = row.get(5)?;
        let expires_at_str: String = row.get(6)?;
        let active: i32 = row.get(7)?;

        let snapshot: Vec<ShareableDocument> =
            serde_json::from_str(&snapshot_json).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        let access_scope = AccessScope::parse(&scope_str).unwrap_or_else(|| {
            warn!("Unknown access scope: {}, defaulting to personal", scope_str);
            // Fail toward the scope with the strictest corroboration policy.
            AccessScope::Personal
        });

        let issued_at = Self::parse_timestamp(&issued_at_str);
        // A malformed expiry parses as "now", which reads as already expired.
        let expires_at = Self::parse_timestamp(&expires_at_str);

        Ok(AccessGrant {
            id: Some(id),
            code,
            owner_id,
            snapshot,
            access_scope,
            issued_at,
            expires_at,
            active: active != 0,
        })
    }

    /// Convert a database row to a `DirectiveRecord`.
    fn row_to_directive(row: &rusqlite::Row) -> rusqlite::Result<DirectiveRecord> {
        let created_at_str: String = row.get(6)?;
        let updated_at_str: Option<String> = row.get(7)?;
        let is_private: Option<i32> = row.get(5)?;

        Ok(DirectiveRecord {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            content_json: row.get(4)?,
            is_private: is_private.map(|v| v != 0),
            created_at: Self::parse_timestamp(&created_at_str),
            updated_at: updated_at_str.as_deref().map(Self::parse_timestamp),
        })
    }

    /// Convert a database row to a `PdfRecord`.
    fn row_to_pdf(row: &rusqlite::Row) -> rusqlite::Result<PdfRecord> {
        let created_at_str: String = row.get(7)?;
        let updated_at_str: Option<String> = row.get(8)?;
        let is_private: Option<i32> = row.get(6)?;

        Ok(PdfRecord {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            file_name: row.get(2)?,
            description: row.get(3)?,
            content_type: row.get(4)?,
            storage_ref: row.get(5)?,
            is_private: is_private.map(|v| v != 0),
            created_at: Self::parse_timestamp(&created_at_str),
            updated_at: updated_at_str.as_deref().map(Self::parse_timestamp),
        })
    }

    /// Convert a database row to a `MedicalFileRecord`.
    fn row_to_medical_file(row: &rusqlite::Row) -> rusqlite::Result<MedicalFileRecord> {
        let created_at_str: String = row.get(5)?;

        Ok(MedicalFileRecord {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            file_name: row.get(2)?,
            category: row.get(3)?,
            storage_ref: row.get(4)?,
            created_at: Self::parse_timestamp(&created_at_str),
        })
    }

    /// Convert a database row to a `PermanentIdentity`.
    fn row_to_identity(row: &rusqlite::Row) -> rusqlite::Result<PermanentIdentity> {
        let birth_date_str: String = row.get(3)?;
        let birth_date = NaiveDate::parse_from_str(&birth_date_str, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(PermanentIdentity {
            owner_id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            birth_date,
        })
    }

    /// Parse an RFC 3339 timestamp, defaulting to now on malformed input.
    fn parse_timestamp(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentKind, DocumentPayload};

    fn create_test_store() -> Store {
        Store::open_in_memory().expect("failed to create test store")
    }

    fn sample_document(id: &str) -> ShareableDocument {
        let created = Utc::now();
        ShareableDocument {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            kind: DocumentKind::Pdf,
            display_name: "scan.pdf".to_string(),
            description: None,
            content_type: "application/pdf".to_string(),
            payload: DocumentPayload::StorageRef(format!("blob/{id}")),
            created_at: created,
            updated_at: created,
            is_private: false,
        }
    }

    fn sample_grant(code: &str, expires_in_days: i64) -> AccessGrant {
        AccessGrant::new(
            code.to_string(),
            "owner-1".to_string(),
            vec![sample_document("p1")],
            AccessScope::Global,
            expires_in_days,
        )
    }

    fn sample_identity(owner_id: &str, first: &str, last: &str, birth: &str) -> PermanentIdentity {
        PermanentIdentity {
            owner_id: owner_id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            birth_date: NaiveDate::parse_from_str(birth, "%Y-%m-%d").unwrap(),
        }
    }

    #[test]
    fn test_open_in_memory() {
        let store = Store::open_in_memory();
        assert!(store.is_ok());
    }

    #[test]
    fn test_put_and_get_grant() {
        let store = create_test_store();
        let grant = sample_grant("ABCD2346", 30);

        store.put_grant(&grant).unwrap();

        let retrieved = store.get_grant("ABCD2346").unwrap().unwrap();
        assert_eq!(retrieved.code, "ABCD2346");
        assert_eq!(retrieved.owner_id, "owner-1");
        assert_eq!(retrieved.snapshot, grant.snapshot);
        assert!(retrieved.active);
    }

    #[test]
    fn test_get_grant_nonexistent() {
        let store = create_test_store();
        assert!(store.get_grant("NOPE2346").unwrap().is_none());
    }

    #[test]
    fn test_get_grant_resolves_newest_row() {
        let store = create_test_store();

        // An old inactive grant and a fresh one sharing the code value.
        let mut old = sample_grant("ABCD2346", 30);
        old.active = false;
        store.put_grant(&old).unwrap();
        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();

        let retrieved = store.get_grant("ABCD2346").unwrap().unwrap();
        assert!(retrieved.active);
    }

    #[test]
    fn test_code_in_active_use() {
        let store = create_test_store();
        let now = Utc::now();

        assert!(!store.code_in_active_use("ABCD2346", now).unwrap());

        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();
        assert!(store.code_in_active_use("ABCD2346", now).unwrap());
    }

    #[test]
    fn test_expired_code_not_in_active_use() {
        let store = create_test_store();
        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();
        store.force_expire("ABCD2346").unwrap();

        assert!(!store.code_in_active_use("ABCD2346", Utc::now()).unwrap());
    }

    #[test]
    fn test_revoked_code_not_in_active_use() {
        let store = create_test_store();
        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();
        store.revoke_grant("ABCD2346").unwrap();

        assert!(!store.code_in_active_use("ABCD2346", Utc::now()).unwrap());
    }

    #[test]
    fn test_extend_grant() {
        let store = create_test_store();
        let grant = sample_grant("ABCD2346", 30);
        store.put_grant(&grant).unwrap();

        let new_expiry = store.extend_grant("ABCD2346", 10, 365).unwrap();
        assert_eq!(new_expiry, grant.expires_at + Duration::days(10));

        let retrieved = store.get_grant("ABCD2346").unwrap().unwrap();
        assert_eq!(retrieved.expires_at, new_expiry);
    }

    #[test]
    fn test_extend_grant_not_found() {
        let store = create_test_store();
        let result = store.extend_grant("NOPE2346", 10, 365);
        assert!(matches!(result, Err(Error::GrantNotFound { .. })));
    }

    #[test]
    fn test_extend_revoked_grant_fails() {
        let store = create_test_store();
        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();
        store.revoke_grant("ABCD2346").unwrap();

        let result = store.extend_grant("ABCD2346", 10, 365);
        assert!(matches!(result, Err(Error::GrantInactive { .. })));
    }

    #[test]
    fn test_extend_expired_grant_fails() {
        let store = create_test_store();
        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();
        store.force_expire("ABCD2346").unwrap();

        let result = store.extend_grant("ABCD2346", 10, 365);
        assert!(matches!(result, Err(Error::GrantInactive { .. })));
    }

    #[test]
    fn test_extend_clamped_to_cap() {
        let store = create_test_store();
        let grant = sample_grant("ABCD2346", 30);
        store.put_grant(&grant).unwrap();

        let new_expiry = store.extend_grant("ABCD2346", 100_000, 365).unwrap();
        assert_eq!(new_expiry, grant.issued_at + Duration::days(365));
    }

    #[test]
    fn test_repeated_extensions_respect_cap() {
        let store = create_test_store();
        let grant = sample_grant("ABCD2346", 30);
        store.put_grant(&grant).unwrap();

        // Each extension alone fits under the cap; stacked they don't.
        let cap = grant.issued_at + Duration::days(365);
        for _ in 0..3 {
            let new_expiry = store.extend_grant("ABCD2346", 300, 365).unwrap();
            assert!(new_expiry <= cap);
        }

        let retrieved = store.get_grant("ABCD2346").unwrap().unwrap();
        assert_eq!(retrieved.expires_at, cap);
    }

    #[test]
    fn test_revoke_grant() {
        let store = create_test_store();
        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();

        store.revoke_grant("ABCD2346").unwrap();

        let retrieved = store.get_grant("ABCD2346").unwrap().unwrap();
        assert!(!retrieved.active);
        // Record kept for audit, snapshot intact.
        assert_eq!(retrieved.snapshot.len(), 1);
    }

    #[test]
    fn test_revoke_is_idempotent() {
        let store = create_test_store();
        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();

        store.revoke_grant("ABCD2346").unwrap();
        store.revoke_grant("ABCD2346").unwrap();

        assert!(!store.get_grant("ABCD2346").unwrap().unwrap().active);
    }

    #[test]
    fn test_revoke_expired_grant_succeeds() {
        let store = create_test_store();
        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();
        store.force_expire("ABCD2346").unwrap();

        assert!(store.revoke_grant("ABCD2346").is_ok());
    }

    #[test]
    fn test_revoke_unknown_code_fails() {
        let store = create_test_store();
        let result = store.revoke_grant("NOPE2346");
        assert!(matches!(result, Err(Error::GrantNotFound { .. })));
    }

    #[test]
    fn test_list_grants_includes_inactive() {
        let store = create_test_store();
        store.put_grant(&sample_grant("AAAA2346", 30)).unwrap();
        store.put_grant(&sample_grant("BBBB2346", 30)).unwrap();
        store.revoke_grant("AAAA2346").unwrap();

        let grants = store.list_grants("owner-1").unwrap();
        assert_eq!(grants.len(), 2);
        assert!(grants.iter().any(|g| !g.active));
    }

    #[test]
    fn test_multiple_active_grants_per_owner() {
        let store = create_test_store();
        store.put_grant(&sample_grant("AAAA2346", 30)).unwrap();
        store.put_grant(&sample_grant("BBBB2346", 30)).unwrap();

        let grants = store.list_grants("owner-1").unwrap();
        assert_eq!(grants.iter().filter(|g| g.active).count(), 2);
    }

    #[test]
    fn test_directive_round_trip() {
        let store = create_test_store();
        let record = DirectiveRecord {
            id: "d1".to_string(),
            owner_id: Some("owner-1".to_string()),
            title: Some("Living will".to_string()),
            description: None,
            content_json: r#"{"dnr":true}"#.to_string(),
            is_private: Some(false),
            created_at: Utc::now(),
            updated_at: None,
        };
        store.insert_directive(&record).unwrap();

        let rows = store.list_directives("owner-1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "d1");
        assert_eq!(rows[0].title.as_deref(), Some("Living will"));
        assert!(rows[0].updated_at.is_none());
    }

    #[test]
    fn test_pdf_round_trip() {
        let store = create_test_store();
        let record = PdfRecord {
            id: "p1".to_string(),
            owner_id: Some("owner-1".to_string()),
            file_name: Some("scan.pdf".to_string()),
            description: None,
            content_type: None,
            storage_ref: "blob/p1".to_string(),
            is_private: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        store.insert_pdf_document(&record).unwrap();

        let rows = store.list_pdf_documents("owner-1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file_name.as_deref(), Some("scan.pdf"));
        assert!(rows[0].content_type.is_none());
    }

    #[test]
    fn test_medical_file_round_trip() {
        let store = create_test_store();
        let record = MedicalFileRecord {
            id: "m1".to_string(),
            owner_id: Some("owner-1".to_string()),
            file_name: Some("labs.pdf".to_string()),
            category: Some("lab".to_string()),
            storage_ref: "blob/m1".to_string(),
            created_at: Utc::now(),
        };
        store.insert_medical_file(&record).unwrap();

        let rows = store.list_medical_files("owner-1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category.as_deref(), Some("lab"));
    }

    #[test]
    fn test_origin_collections_filter_by_owner() {
        let store = create_test_store();
        let mut record = DirectiveRecord {
            id: "d1".to_string(),
            owner_id: Some("owner-1".to_string()),
            title: None,
            description: None,
            content_json: "{}".to_string(),
            is_private: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        store.insert_directive(&record).unwrap();
        record.id = "d2".to_string();
        record.owner_id = Some("owner-2".to_string());
        store.insert_directive(&record).unwrap();

        assert_eq!(store.list_directives("owner-1").unwrap().len(), 1);
        assert_eq!(store.list_directives("owner-2").unwrap().len(), 1);
        assert_eq!(store.list_directives("owner-3").unwrap().len(), 0);
    }

    #[test]
    fn test_identity_round_trip() {
        let store = create_test_store();
        let identity = sample_identity("owner-1", "Maria", "Keller", "1958-06-02");
        store.put_identity(&identity).unwrap();

        let retrieved = store.get_identity("owner-1").unwrap().unwrap();
        assert_eq!(retrieved, identity);
    }

    #[test]
    fn test_find_identities_case_insensitive() {
        let store = create_test_store();
        store
            .put_identity(&sample_identity("owner-1", "Maria", "Keller", "1958-06-02"))
            .unwrap();

        let found = store.find_identities_by_name("maria", "KELLER").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].owner_id, "owner-1");
    }

    #[test]
    fn test_find_identities_shared_name() {
        let store = create_test_store();
        store
            .put_identity(&sample_identity("owner-1", "Maria", "Keller", "1958-06-02"))
            .unwrap();
        store
            .put_identity(&sample_identity("owner-2", "Maria", "Keller", "1971-11-20"))
            .unwrap();

        let found = store.find_identities_by_name("Maria", "Keller").unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_find_identities_no_match() {
        let store = create_test_store();
        let found = store.find_identities_by_name("Nobody", "Here").unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_open_file_based() {
        let temp_dir = std::env::temp_dir();
        let db_path = temp_dir.join(format!("carecode_test_{}.db", std::process::id()));

        let store = Store::open(&db_path).unwrap();
        store.put_grant(&sample_grant("ABCD2346", 30)).unwrap();
        assert!(store.get_grant("ABCD2346").unwrap().is_some());
        assert_eq!(store.path(), db_path);

        // Lock waits are bounded, not indefinite.
        let timeout_ms: i64 = store
            .conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout_ms, 5000);

        drop(store);
        let _ = std::fs::remove_file(&db_path);
        let _ = std::fs::remove_file(db_path.with_extension("db-wal"));
        let _ = std::fs::remove_file(db_path.with_extension("db-shm"));
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let temp_dir = std::env::temp_dir();
        let nested_path = temp_dir.join(format!(
            "carecode_test_{}/nested/db.sqlite",
            std::process::id()
        ));

        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }

        let store = Store::open(&nested_path).unwrap();
        assert!(nested_path.exists());

        drop(store);
        if let Some(parent) = nested_path.parent() {
            let _ = std::fs::remove_dir_all(parent.parent().unwrap());
        }
    }

    #[test]
    fn test_grant_scope_round_trip() {
        let store = create_test_store();
        let mut grant = sample_grant("ABCD2346", 30);
        grant.access_scope = AccessScope::Institution;
        store.put_grant(&grant).unwrap();

        let retrieved = store.get_grant("ABCD2346").unwrap().unwrap();
        assert_eq!(retrieved.access_scope, AccessScope::Institution);
    }
}
