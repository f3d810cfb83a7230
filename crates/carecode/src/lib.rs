//! `carecode` - Access-code issuance and document sharing for advance directives
//!
//! This library aggregates a person's directive documents from heterogeneous
//! collections into one normalized bundle and controls access to that bundle
//! through two kinds of short human-typable codes: a deterministic permanent
//! code derived from the owner's identity, and random temporary codes with an
//! expiry, a scope, and an issuance-time snapshot.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod cli;
pub mod code;
pub mod config;
pub mod document;
pub mod error;
pub mod grant;
pub mod identity;
pub mod logging;
pub mod ratelimit;
pub mod share;
pub mod store;
pub mod validate;

pub use aggregate::{Aggregator, DocumentSource};
pub use config::Config;
pub use document::{DocumentKind, DocumentPayload, ShareableDocument};
pub use error::{Error, Result};
pub use grant::{AccessGrant, AccessScope};
pub use identity::{PermanentIdentity, PersonalInfo};
pub use logging::init_logging;
pub use share::{IssueOptions, SharingService};
pub use store::Store;
pub use validate::Validator;
