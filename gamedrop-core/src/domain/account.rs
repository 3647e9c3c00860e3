//! Account domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Permission tier of an account.
///
/// Tiers are totally ordered; the stored representation is the integer
/// discriminant (0, 1, 2) so existing databases keep their values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Pending = 0,
    Approved = 1,
    Administrator = 2,
}

impl Tier {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Tier::Pending),
            1 => Some(Tier::Approved),
            2 => Some(Tier::Administrator),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Pending => "pending",
            Tier::Approved => "approved",
            Tier::Administrator => "administrator",
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Pending
    }
}

/// A registered account with its download history
///
/// Values are snapshots read from the store. Mutations go through the
/// repository and produce a fresh snapshot; an `Account` is never edited in
/// place and written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    /// Login name, unique and case-sensitive
    pub identity: String,
    pub contact_email: String,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub credential_hash: String,
    pub display_name: String,
    pub tier: Tier,
    /// Artifact ids, ordered by first download
    pub downloads: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn has_downloaded(&self, artifact_id: &str) -> bool {
        self.downloads.iter().any(|d| d == artifact_id)
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            identity: self.identity.clone(),
            display_name: self.display_name.clone(),
            contact_email: self.contact_email.clone(),
            tier: self.tier,
            permissions: self.tier.as_i32(),
            downloads: self.downloads.clone(),
        }
    }
}

/// Registration input
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    pub identity: String,
    pub credential: String,
    pub display_name: String,
    pub contact_email: String,
}

impl NewAccount {
    pub fn new(
        identity: impl Into<String>,
        credential: impl Into<String>,
        display_name: impl Into<String>,
        contact_email: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            credential: credential.into(),
            display_name: display_name.into(),
            contact_email: contact_email.into(),
        }
    }

    /// All four fields are required
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.identity.trim().is_empty()
            || self.credential.is_empty()
            || self.display_name.trim().is_empty()
            || self.contact_email.trim().is_empty()
        {
            return Err("Identity, credential, display name, and email required");
        }
        Ok(())
    }
}

/// Partial profile update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub contact_email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.contact_email.is_none()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.is_empty() {
            return Err("Nothing to update");
        }
        if matches!(&self.display_name, Some(name) if name.trim().is_empty()) {
            return Err("Display name cannot be empty");
        }
        if matches!(&self.contact_email, Some(email) if email.trim().is_empty()) {
            return Err("Email cannot be empty");
        }
        Ok(())
    }
}

/// Account view returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: i64,
    pub identity: String,
    pub display_name: String,
    pub contact_email: String,
    pub tier: Tier,
    /// Numeric tier, kept for clients of the legacy API
    pub permissions: i32,
    pub downloads: Vec<String>,
}

/// Pending registration as listed for administrators
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub id: i64,
    pub identity: String,
    pub display_name: String,
    pub contact_email: String,
}

impl From<&Account> for PendingRequest {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            identity: account.identity.clone(),
            display_name: account.display_name.clone(),
            contact_email: account.contact_email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Pending < Tier::Approved);
        assert!(Tier::Approved < Tier::Administrator);
    }

    #[test]
    fn test_tier_round_trips_stored_integer() {
        for tier in [Tier::Pending, Tier::Approved, Tier::Administrator] {
            assert_eq!(Tier::from_i32(tier.as_i32()), Some(tier));
        }
        assert_eq!(Tier::from_i32(7), None);
    }

    #[test]
    fn test_new_account_requires_all_fields() {
        assert!(NewAccount::new("ada", "pw", "Ada", "ada@example.com").validate().is_ok());
        assert!(NewAccount::new("", "pw", "Ada", "ada@example.com").validate().is_err());
        assert!(NewAccount::new("ada", "", "Ada", "ada@example.com").validate().is_err());
        assert!(NewAccount::new("ada", "pw", "  ", "ada@example.com").validate().is_err());
        assert!(NewAccount::new("ada", "pw", "Ada", "").validate().is_err());
    }

    #[test]
    fn test_profile_update_validation() {
        assert!(ProfileUpdate::default().validate().is_err());
        let update = ProfileUpdate {
            display_name: Some("".into()),
            contact_email: None,
        };
        assert!(update.validate().is_err());
        let update = ProfileUpdate {
            display_name: Some("Ada L.".into()),
            contact_email: None,
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_summary_hides_credential_hash() {
        let account = Account {
            id: 4,
            identity: "ada".into(),
            contact_email: "ada@example.com".into(),
            credential_hash: "$argon2id$secret".into(),
            display_name: "Ada".into(),
            tier: Tier::Approved,
            downloads: vec!["g1".into()],
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&account.summary()).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"permissions\":1"));
        assert!(json.contains("\"downloads\":[\"g1\"]"));
    }
}
