//! Normalized document model for carecode.
//!
//! This module defines [`ShareableDocument`], the uniform representation of
//! a user's documents regardless of which origin collection they came from,
//! together with the closed [`DocumentKind`] set and its per-kind defaults.
//!
//! A `ShareableDocument` is a view, not a stored entity: it is created fresh
//! on every aggregation and is only ever persisted as part of a grant
//! snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The origin collection a document was normalized from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// A structured advance-directive record (inline JSON content).
    Directive,
    /// A generic uploaded PDF record (content stored externally).
    Pdf,
    /// A medical-file record (content stored externally).
    Medical,
}

impl DocumentKind {
    /// The content type assumed when the origin record omits one.
    #[must_use]
    pub fn default_content_type(self) -> &'static str {
        match self {
            Self::Directive => "application/json",
            Self::Pdf | Self::Medical => "application/pdf",
        }
    }

    /// Human-readable label used when synthesizing a display name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Directive => "Advance directive",
            Self::Pdf => "Uploaded document",
            Self::Medical => "Medical file",
        }
    }

    /// Synthesize a display name from the kind and creation date.
    #[must_use]
    pub fn default_display_name(self, created_at: DateTime<Utc>) -> String {
        format!("{} ({})", self.label(), created_at.format("%Y-%m-%d"))
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directive => write!(f, "directive"),
            Self::Pdf => write!(f, "pdf"),
            Self::Medical => write!(f, "medical"),
        }
    }
}

/// The content carried by a normalized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentPayload {
    /// Structured content carried inline (directive kind).
    Inline(serde_json::Value),
    /// A reference to externally stored bytes (pdf/medical kind).
    StorageRef(String),
}

/// The normalized unit of sharing.
///
/// Every field that an origin record may omit is filled with a kind-specific
/// default during normalization, so a bundle recipient always sees a
/// complete document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareableDocument {
    /// Opaque identifier, unique within its origin collection only.
    pub id: String,

    /// Identity of the document's owner.
    ///
    /// Always the owner of the request that produced this document, even
    /// when the origin record lacks one.
    pub owner_id: String,

    /// Which origin collection this document came from.
    pub kind: DocumentKind,

    /// Presentation name; synthesized from kind + creation date when absent.
    pub display_name: String,

    /// Optional free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// MIME content type; defaults per kind.
    pub content_type: String,

    /// Inline content or a storage reference, depending on kind.
    pub payload: DocumentPayload,

    /// When the origin record was created.
    pub created_at: DateTime<Utc>,

    /// When the origin record was last updated; defaults to `created_at`.
    pub updated_at: DateTime<Utc>,

    /// Visibility flag; defaults to false.
    pub is_private: bool,
}

impl ShareableDocument {
    /// A stable key identifying this document within a bundle.
    ///
    /// Ids are only unique per origin collection, so the kind is part of
    /// the key.
    #[must_use]
    pub fn bundle_key(&self) -> (DocumentKind, &str) {
        (self.kind, self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_doc(kind: DocumentKind) -> ShareableDocument {
        let created = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        ShareableDocument {
            id: "d1".to_string(),
            owner_id: "owner-1".to_string(),
            kind,
            display_name: kind.default_display_name(created),
            description: None,
            content_type: kind.default_content_type().to_string(),
            payload: DocumentPayload::StorageRef("blob/abc".to_string()),
            created_at: created,
            updated_at: created,
            is_private: false,
        }
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(DocumentKind::Directive.to_string(), "directive");
        assert_eq!(DocumentKind::Pdf.to_string(), "pdf");
        assert_eq!(DocumentKind::Medical.to_string(), "medical");
    }

    #[test]
    fn test_default_content_types() {
        assert_eq!(
            DocumentKind::Directive.default_content_type(),
            "application/json"
        );
        assert_eq!(DocumentKind::Pdf.default_content_type(), "application/pdf");
        assert_eq!(
            DocumentKind::Medical.default_content_type(),
            "application/pdf"
        );
    }

    #[test]
    fn test_default_display_name_contains_date() {
        let created = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let name = DocumentKind::Directive.default_display_name(created);
        assert!(name.contains("Advance directive"));
        assert!(name.contains("2024-03-15"));
    }

    #[test]
    fn test_bundle_key_includes_kind() {
        let directive = sample_doc(DocumentKind::Directive);
        let pdf = sample_doc(DocumentKind::Pdf);
        // Same id in different collections must not collide.
        assert_ne!(directive.bundle_key(), pdf.bundle_key());
    }

    #[test]
    fn test_document_serialization_round_trip() {
        let doc = sample_doc(DocumentKind::Medical);
        let json = serde_json::to_string(&doc).unwrap();
        let back: ShareableDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn test_inline_payload_serialization() {
        let payload = DocumentPayload::Inline(serde_json::json!({"dnr": true}));
        let json = serde_json::to_string(&payload).unwrap();
        let back: DocumentPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }

    #[test]
    fn test_kind_serde_snake_case() {
        let json = serde_json::to_string(&DocumentKind::Directive).unwrap();
        assert_eq!(json, "\"directive\"");
    }
}
