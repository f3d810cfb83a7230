//! The validation read path: redeem a presented code.
//!
//! One validator, one ordered strategy list: the temporary-grant path is
//! tried first, the deterministic-permanent path second, and everything
//! else collapses into a single opaque failure. The fallback order is a
//! declared policy here, not something each call site improvises.
//!
//! The caller never learns why validation failed. Internally the real
//! cause (not found, expired, revoked, corroboration mismatch, rate
//! limited) is logged at debug level for audit.
//!
//! Validation never mutates the grant store. The "expired" state is a
//! predicate evaluated against the presented instant, not a write.

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use crate::aggregate::Aggregator;
use crate::code::{deterministic_code, normalize_presented, MAX_CODE_LENGTH, PERMANENT_CODE_LENGTH};
use crate::config::ValidationConfig;
use crate::document::ShareableDocument;
use crate::error::{Error, Result};
use crate::identity::PersonalInfo;
use crate::ratelimit::AttemptLimiter;
use crate::store::Store;

/// Build the shape pattern for a normalized code: the temporary alphabet
/// plus the permanent code's hex-derived letters. No real code is shorter
/// than the permanent code or longer than the configurable maximum.
fn code_shape_pattern() -> String {
    format!("^[A-Z2346789]{{{PERMANENT_CODE_LENGTH},{MAX_CODE_LENGTH}}}$")
}

/// Resolves presented codes to document bundles.
#[derive(Debug)]
pub struct Validator {
    config: ValidationConfig,
    aggregator: Aggregator,
    limiter: AttemptLimiter,
    code_shape: Regex,
}

impl Validator {
    /// Create a validator with the given policy and attempt limiter.
    ///
    /// The limiter is constructed by the caller and handed in; the
    /// validator owns it for its lifetime but never shares it.
    ///
    /// # Panics
    ///
    /// Never panics in practice; the code-shape pattern is a constant.
    #[must_use]
    pub fn new(config: ValidationConfig, limiter: AttemptLimiter) -> Self {
        Self {
            config,
            aggregator: Aggregator::new(),
            limiter,
            code_shape: Regex::new(&code_shape_pattern()).expect("invalid code shape pattern"),
        }
    }

    /// Validate a presented code, optionally corroborated by personal info.
    ///
    /// `caller_key` identifies the caller for attempt limiting (e.g., a
    /// remote address or session id).
    ///
    /// # Errors
    ///
    /// Returns the opaque [`Error::InvalidOrExpired`] for every
    /// caller-attributable failure. Storage and aggregation errors are
    /// system problems and propagate as themselves.
    pub fn validate(
        &mut self,
        store: &Store,
        presented: &str,
        personal: Option<&PersonalInfo>,
        caller_key: &str,
    ) -> Result<Vec<ShareableDocument>> {
        let now = Utc::now();

        if self.limiter.is_limited(caller_key, now) {
            debug!(caller = %caller_key, cause = "rate_limited", "Validation refused");
            return Err(Error::InvalidOrExpired);
        }

        let code = normalize_presented(presented);
        match self.try_strategies(store, &code, personal, now) {
            Ok(Some(documents)) => {
                self.limiter.clear(caller_key);
                Ok(documents)
            }
            Ok(None) => {
                self.limiter.record_failure(caller_key, now);
                Err(Error::InvalidOrExpired)
            }
            Err(e) => Err(e),
        }
    }

    /// Run the ordered strategy list; first success wins.
    fn try_strategies(
        &self,
        store: &Store,
        code: &str,
        personal: Option<&PersonalInfo>,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<ShareableDocument>>> {
        if !self.code_shape.is_match(code) {
            debug!(cause = "malformed_code", "Validation failed");
            return Ok(None);
        }

        if let Some(documents) = self.try_temporary(store, code, personal, now)? {
            return Ok(Some(documents));
        }

        if let Some(info) = personal {
            if let Some(documents) = self.try_permanent(store, code, info)? {
                return Ok(Some(documents));
            }
        }

        Ok(None)
    }

    /// Temporary path: look the code up in the grant store and release the
    /// issuance-time snapshot.
    fn try_temporary(
        &self,
        store: &Store,
        code: &str,
        personal: Option<&PersonalInfo>,
        now: DateTime<Utc>,
    ) -> Result<Option<Vec<ShareableDocument>>> {
        let Some(grant) = store.get_grant(code)? else {
            debug!(cause = "grant_not_found", "Temporary path failed");
            return Ok(None);
        };

        if !grant.active {
            debug!(cause = "revoked", "Temporary path failed");
            return Ok(None);
        }

        if grant.is_expired_at(now) {
            debug!(cause = "expired", "Temporary path failed");
            return Ok(None);
        }

        if self.config.corroboration_required(grant.access_scope) {
            let Some(info) = personal else {
                debug!(cause = "corroboration_missing", "Temporary path failed");
                return Ok(None);
            };
            let Some(identity) = store.get_identity(&grant.owner_id)? else {
                debug!(cause = "identity_unknown", "Temporary path failed");
                return Ok(None);
            };
            if !identity.corroborates(info) {
                debug!(cause = "corroboration_mismatch", "Temporary path failed");
                return Ok(None);
            }
        }

        debug!(owner_id = %grant.owner_id, "Temporary code redeemed");
        Ok(Some(grant.snapshot))
    }

    /// Permanent path: resolve identity candidates by name, filter by birth
    /// date, and compare the recomputed deterministic code. Succeeds with a
    /// live aggregation, since no snapshot exists for permanent codes.
    fn try_permanent(
        &self,
        store: &Store,
        code: &str,
        info: &PersonalInfo,
    ) -> Result<Option<Vec<ShareableDocument>>> {
        if info.first_name.trim().is_empty() || info.last_name.trim().is_empty() {
            return Ok(None);
        }

        let candidates = store.find_identities_by_name(&info.first_name, &info.last_name)?;
        for candidate in candidates {
            // A non-matching birth date skips the candidate, not the whole
            // attempt: several people can share a name.
            if !candidate.birth_date_compatible(info) {
                continue;
            }
            if deterministic_code(&candidate.owner_id) == code {
                debug!(owner_id = %candidate.owner_id, "Permanent code redeemed");
                return Ok(Some(self.aggregator.aggregate(store, &candidate.owner_id)?));
            }
        }

        debug!(cause = "no_identity_match", "Permanent path failed");
        Ok(None)
    }
}
