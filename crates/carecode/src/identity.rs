//! Owner identities and personal-info corroboration.
//!
//! A [`PermanentIdentity`] is the {first name, last name, birth date} tuple
//! behind the deterministic permanent code. The code itself is never stored;
//! it is recomputed from `owner_id` on every validation attempt.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A verified owner identity stored in the identity directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermanentIdentity {
    /// The owner identifier the deterministic code is derived from.
    pub owner_id: String,
    /// Legal first name.
    pub first_name: String,
    /// Legal last name.
    pub last_name: String,
    /// Date of birth.
    pub birth_date: NaiveDate,
}

/// Personal data presented by a third party alongside a code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalInfo {
    /// First name of the document owner, as stated by the caller.
    pub first_name: String,
    /// Last name of the document owner, as stated by the caller.
    pub last_name: String,
    /// Date of birth, when the caller knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

impl PermanentIdentity {
    /// Case-insensitive name match against presented personal info.
    #[must_use]
    pub fn name_matches(&self, info: &PersonalInfo) -> bool {
        self.first_name.eq_ignore_ascii_case(info.first_name.trim())
            && self.last_name.eq_ignore_ascii_case(info.last_name.trim())
    }

    /// Full corroboration: names match and the birth date, when presented,
    /// matches exactly. A missing birth date does not corroborate.
    #[must_use]
    pub fn corroborates(&self, info: &PersonalInfo) -> bool {
        self.name_matches(info) && info.birth_date == Some(self.birth_date)
    }

    /// Whether this identity survives the permanent-path birth-date filter.
    ///
    /// A supplied birth date must match exactly; candidates with a
    /// non-matching date are skipped, not rejected outright, since multiple
    /// people can share a name. An absent date filters nothing.
    #[must_use]
    pub fn birth_date_compatible(&self, info: &PersonalInfo) -> bool {
        match info.birth_date {
            Some(date) => date == self.birth_date,
            None => true,
        }
    }
}
