//! Document aggregation and normalization.
//!
//! The aggregator reads a user's documents from the three origin
//! collections and normalizes them into one uniform [`ShareableDocument`]
//! set. Each origin kind is handled by an adapter implementing
//! [`DocumentSource`]; the aggregator walks a fixed, closed list of
//! adapters rather than branching per call site.
//!
//! Aggregation is a pure read with no side effects, and it fails closed: an
//! error from any one collection fails the whole call, since a partial
//! bundle could understate what a recipient believes is "everything".
//!
//! Bundle order is unspecified. Documents come back in adapter order today,
//! but callers must not depend on it.

use tracing::debug;

use crate::document::{DocumentKind, DocumentPayload, ShareableDocument};
use crate::error::Result;
use crate::store::{DirectiveRecord, MedicalFileRecord, PdfRecord, Store};

/// A single origin collection viewed as a source of normalized documents.
pub trait DocumentSource: std::fmt::Debug {
    /// The kind this source produces.
    fn kind(&self) -> DocumentKind;

    /// List and normalize the owner's documents from this collection.
    ///
    /// # Errors
    ///
    /// Returns an aggregation error naming the collection on read failure.
    fn list(&self, store: &Store, owner_id: &str) -> Result<Vec<ShareableDocument>>;
}

/// Adapter for the structured directive collection.
#[derive(Debug)]
struct DirectiveSource;

/// Adapter for the generic PDF collection.
#[derive(Debug)]
struct PdfSource;

/// Adapter for the medical-file collection.
#[derive(Debug)]
struct MedicalFileSource;

impl DocumentSource for DirectiveSource {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Directive
    }

    fn list(&self, store: &Store, owner_id: &str) -> Result<Vec<ShareableDocument>> {
        let records = store.list_directives(owner_id)?;
        Ok(records
            .into_iter()
            .map(|r| normalize_directive(r, owner_id))
            .collect())
    }
}

impl DocumentSource for PdfSource {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    fn list(&self, store: &Store, owner_id: &str) -> Result<Vec<ShareableDocument>> {
        let records = store.list_pdf_documents(owner_id)?;
        Ok(records
            .into_iter()
            .map(|r| normalize_pdf(r, owner_id))
            .collect())
    }
}

impl DocumentSource for MedicalFileSource {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Medical
    }

    fn list(&self, store: &Store, owner_id: &str) -> Result<Vec<ShareableDocument>> {
        let records = store.list_medical_files(owner_id)?;
        Ok(records
            .into_iter()
            .map(|r| normalize_medical_file(r, owner_id))
            .collect())
    }
}

/// Normalize a directive record.
///
/// Directive content is carried inline; malformed stored JSON degrades to a
/// JSON string of the raw text rather than failing the bundle.
fn normalize_directive(record: DirectiveRecord, owner_id: &str) -> ShareableDocument {
    let kind = DocumentKind::Directive;
    let content = serde_json::from_str(&record.content_json)
        .unwrap_or(serde_json::Value::String(record.content_json));

    ShareableDocument {
        id: record.id,
        owner_id: owner_id.to_string(),
        kind,
        display_name: record
            .title
            .unwrap_or_else(|| kind.default_display_name(record.created_at)),
        description: record.description,
        content_type: kind.default_content_type().to_string(),
        payload: DocumentPayload::Inline(content),
        created_at: record.created_at,
        updated_at: record.updated_at.unwrap_or(record.created_at),
        is_private: record.is_private.unwrap_or(false),
    }
}

/// Normalize a generic PDF record.
fn normalize_pdf(record: PdfRecord, owner_id: &str) -> ShareableDocument {
    let kind = DocumentKind::Pdf;

    ShareableDocument {
        id: record.id,
        owner_id: owner_id.to_string(),
        kind,
        display_name: record
            .file_name
            .unwrap_or_else(|| kind.default_display_name(record.created_at)),
        description: record.description,
        content_type: record
            .content_type
            .unwrap_or_else(|| kind.default_content_type().to_string()),
        payload: DocumentPayload::StorageRef(record.storage_ref),
        created_at: record.created_at,
        updated_at: record.updated_at.unwrap_or(record.created_at),
        is_private: record.is_private.unwrap_or(false),
    }
}

/// Normalize a medical-file record.
///
/// The leanest origin schema: the category doubles as the description, and
/// there is no update timestamp or visibility flag to carry over.
fn normalize_medical_file(record: MedicalFileRecord, owner_id: &str) -> ShareableDocument {
    let kind = DocumentKind::Medical;

    ShareableDocument {
        id: record.id,
        owner_id: owner_id.to_string(),
        kind,
        display_name: record
            .file_name
            .unwrap_or_else(|| kind.default_display_name(record.created_at)),
        description: record.category,
        content_type: kind.default_content_type().to_string(),
        payload: DocumentPayload::StorageRef(record.storage_ref),
        created_at: record.created_at,
        updated_at: record.created_at,
        is_private: false,
    }
}

/// Aggregates the three origin collections into one normalized bundle.
#[derive(Debug)]
pub struct Aggregator {
    sources: Vec<Box<dyn DocumentSource>>,
}

impl Aggregator {
    /// Create an aggregator over the fixed set of origin adapters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: vec![
                Box::new(DirectiveSource),
                Box::new(PdfSource),
                Box::new(MedicalFileSource),
            ],
        }
    }

    /// Aggregate all of an owner's documents into one normalized set.
    ///
    /// # Errors
    ///
    /// Fails closed: a read error on any origin collection fails the whole
    /// aggregation.
    pub fn aggregate(&self, store: &Store, owner_id: &str) -> Result<Vec<ShareableDocument>> {
        let mut documents = Vec::new();
        for source in &self.sources {
            let mut batch = source.list(store, owner_id)?;
            debug!(
                kind = %source.kind(),
                count = batch.len(),
                "Aggregated origin collection"
            );
            documents.append(&mut batch);
        }
        Ok(documents)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
