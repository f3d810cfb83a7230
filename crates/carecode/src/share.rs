//! The sharing write path: issue, extend, revoke.
//!
//! Issuance captures the owner's normalized document set as an immutable
//! snapshot, generates a random code that is unique among currently active
//! grants, and persists the grant. Write-path errors are specific: the
//! caller here is the authenticated owner, not an untrusted third party.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::aggregate::Aggregator;
use crate::code::random_code;
use crate::config::SharingConfig;
use crate::error::{Error, Result};
use crate::grant::{AccessGrant, AccessScope};
use crate::store::Store;

/// Options for issuing a temporary code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueOptions {
    /// Days until expiry; the configured default applies when absent.
    ///
    /// Zero is allowed and produces an immediately expired grant, which is
    /// occasionally useful for dry runs.
    pub expires_in_days: Option<u32>,
    /// Intended audience classification.
    pub access_scope: AccessScope,
}

/// Issue/extend/revoke operations over the grant store.
#[derive(Debug)]
pub struct SharingService {
    config: SharingConfig,
    aggregator: Aggregator,
}

impl SharingService {
    /// Create a sharing service with the given configuration.
    #[must_use]
    pub fn new(config: SharingConfig) -> Self {
        Self {
            config,
            aggregator: Aggregator::new(),
        }
    }

    /// Issue a temporary code for an owner.
    ///
    /// Aggregates the owner's documents, rejects empty bundles, generates a
    /// code unique among active grants (bounded retry), and persists the
    /// grant. Other active grants for the same owner are untouched;
    /// multiple simultaneous codes per owner are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyBundle`] when the owner has nothing to share,
    /// [`Error::CollisionExhausted`] when no unique code was found within
    /// the retry bound, or a storage error.
    pub fn issue(
        &self,
        store: &Store,
        owner_id: &str,
        options: &IssueOptions,
    ) -> Result<AccessGrant> {
        let snapshot = self.aggregator.aggregate(store, owner_id)?;
        if snapshot.is_empty() {
            // Nothing to share is a user error, not a silent empty grant.
            return Err(Error::EmptyBundle);
        }

        let expires_in_days = self.expiry_days(options.expires_in_days);
        let now = Utc::now();
        let mut rng = rand::thread_rng();

        for attempt in 1..=self.config.max_code_attempts {
            let code = random_code(&mut rng, self.config.code_length);
            if store.code_in_active_use(&code, now)? {
                debug!(attempt, "Generated code collided with an active grant");
                continue;
            }

            let mut grant = AccessGrant::new(
                code,
                owner_id.to_string(),
                snapshot,
                options.access_scope,
                expires_in_days,
            );
            grant.id = Some(store.put_grant(&grant)?);

            info!(
                owner_id = %owner_id,
                scope = %grant.access_scope,
                expires_at = %grant.expires_at,
                documents = grant.snapshot.len(),
                "Issued temporary access code"
            );
            return Ok(grant);
        }

        Err(Error::CollisionExhausted {
            attempts: self.config.max_code_attempts,
        })
    }

    /// Push a grant's expiry forward, capped at `issued_at` plus the
    /// configured maximum expiry.
    ///
    /// # Errors
    ///
    /// Returns an error when the grant is missing or no longer active.
    pub fn extend(
        &self,
        store: &Store,
        code: &str,
        additional_days: u32,
    ) -> Result<DateTime<Utc>> {
        let code = crate::code::normalize_presented(code);
        let new_expiry = store.extend_grant(
            &code,
            i64::from(additional_days),
            self.config.max_expiry_days,
        )?;
        info!(code = %code, new_expiry = %new_expiry, "Extended access grant");
        Ok(new_expiry)
    }

    /// Revoke a grant. Idempotent for already-inactive grants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GrantNotFound`] when no grant was ever issued for
    /// the code.
    pub fn revoke(&self, store: &Store, code: &str) -> Result<()> {
        let code = crate::code::normalize_presented(code);
        store.revoke_grant(&code)
    }

    /// Resolve the requested expiry against the configured default and cap.
    fn expiry_days(&self, requested: Option<u32>) -> i64 {
        match requested {
            None => self.config.default_expiry_days,
            Some(days) => {
                let days = i64::from(days);
                if days > self.config.max_expiry_days {
                    warn!(
                        requested = days,
                        cap = self.config.max_expiry_days,
                        "Requested expiry exceeds the cap; clamping"
                    );
                    self.config.max_expiry_days
                } else {
                    days
                }
            }
        }
    }
}
