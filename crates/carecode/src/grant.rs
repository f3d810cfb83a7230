//! Temporary access grants.
//!
//! An [`AccessGrant`] binds a short code to a point-in-time snapshot of the
//! owner's normalized documents. The snapshot is captured at issuance and
//! never changes afterwards: redeeming a grant never re-aggregates live
//! data, so later edits or deletions do not retroactively change what a
//! previously issued code reveals.
//!
//! Grant lifecycle: issued (active) → expired (time predicate, no write) or
//! revoked (explicit, terminal, record kept for audit). Extension pushes
//! `expires_at` forward without a state change. Multiple active grants per
//! owner may coexist.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::document::ShareableDocument;

/// Informational classification of a grant's intended audience.
///
/// Does not itself gate validation beyond the corroboration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessScope {
    /// Anyone holding the code.
    #[default]
    Global,
    /// A specific institution (hospital, clinic).
    Institution,
    /// A specific named person.
    Personal,
}

impl std::fmt::Display for AccessScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Institution => write!(f, "institution"),
            Self::Personal => write!(f, "personal"),
        }
    }
}

impl AccessScope {
    /// Parse a scope from its stored string form.
    ///
    /// Returns `None` for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "global" => Some(Self::Global),
            "institution" => Some(Self::Institution),
            "personal" => Some(Self::Personal),
            _ => None,
        }
    }
}

/// A persisted temporary capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessGrant {
    /// Row id assigned by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Short opaque code, unique among active grants at creation time.
    pub code: String,

    /// The identity that authorized the share.
    pub owner_id: String,

    /// Point-in-time copy of the normalized document set at issuance.
    pub snapshot: Vec<ShareableDocument>,

    /// Intended audience classification.
    pub access_scope: AccessScope,

    /// When the grant was issued.
    pub issued_at: DateTime<Utc>,

    /// When the grant stops being redeemable.
    pub expires_at: DateTime<Utc>,

    /// False once revoked; revocation never deletes the record.
    pub active: bool,
}

impl AccessGrant {
    /// Create a new active grant expiring after the given number of days.
    #[must_use]
    pub fn new(
        code: String,
        owner_id: String,
        snapshot: Vec<ShareableDocument>,
        access_scope: AccessScope,
        expires_in_days: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            code,
            owner_id,
            snapshot,
            access_scope,
            issued_at: now,
            expires_at: now + Duration::days(expires_in_days),
            active: true,
        }
    }

    /// Check whether the grant is expired at the given instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check whether the grant can be redeemed at the given instant.
    #[must_use]
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired_at(now)
    }
}
