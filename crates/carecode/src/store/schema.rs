//! `SQLite` schema definitions for carecode.
//!
//! One grants table (append-only per issued code), the three origin
//! document collections, the identity directory, and a metadata table for
//! schema versioning.

/// SQL statement to create the grants table.
///
/// `code` is deliberately not unique: uniqueness is enforced only among
/// active grants, and an expired or revoked code's value may be reused.
pub const CREATE_GRANTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS grants (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    snapshot_json TEXT NOT NULL,
    access_scope TEXT NOT NULL,
    issued_at TEXT NOT NULL,
    expires_at TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
)
";

/// Index on `code` for redemption lookups.
pub const CREATE_GRANTS_CODE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_grants_code ON grants(code)
";

/// Index on `owner_id` for the owner's grant listing.
pub const CREATE_GRANTS_OWNER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_grants_owner ON grants(owner_id)
";

/// SQL statement to create the structured directive collection.
pub const CREATE_DIRECTIVES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS directives (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    title TEXT,
    description TEXT,
    content_json TEXT NOT NULL,
    is_private INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT
)
";

/// Index on directive ownership.
pub const CREATE_DIRECTIVES_OWNER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_directives_owner ON directives(owner_id)
";

/// SQL statement to create the generic PDF collection.
pub const CREATE_PDF_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS pdf_documents (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    file_name TEXT,
    description TEXT,
    content_type TEXT,
    storage_ref TEXT NOT NULL,
    is_private INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT
)
";

/// Index on PDF ownership.
pub const CREATE_PDF_DOCUMENTS_OWNER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_pdf_documents_owner ON pdf_documents(owner_id)
";

/// SQL statement to create the medical-file collection.
///
/// The leanest of the three origin schemas: no description, no update
/// timestamp, no visibility flag.
pub const CREATE_MEDICAL_FILES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS medical_files (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    file_name TEXT,
    category TEXT,
    storage_ref TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// Index on medical-file ownership.
pub const CREATE_MEDICAL_FILES_OWNER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_medical_files_owner ON medical_files(owner_id)
";

/// SQL statement to create the identity directory.
pub const CREATE_IDENTITIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS identities (
    owner_id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    birth_date TEXT NOT NULL
)
";

/// Index for case-insensitive name lookups on the permanent path.
pub const CREATE_IDENTITIES_NAME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_identities_name
ON identities(last_name COLLATE NOCASE, first_name COLLATE NOCASE)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_GRANTS_TABLE,
    CREATE_GRANTS_CODE_INDEX,
    CREATE_GRANTS_OWNER_INDEX,
    CREATE_DIRECTIVES_TABLE,
    CREATE_DIRECTIVES_OWNER_INDEX,
    CREATE_PDF_DOCUMENTS_TABLE,
    CREATE_PDF_DOCUMENTS_OWNER_INDEX,
    CREATE_MEDICAL_FILES_TABLE,
    CREATE_MEDICAL_FILES_OWNER_INDEX,
    CREATE_IDENTITIES_TABLE,
    CREATE_IDENTITIES_NAME_INDEX,
    CREATE_METADATA_TABLE,
];
