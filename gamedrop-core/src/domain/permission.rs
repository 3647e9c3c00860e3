//! Permission state machine
//!
//! ```text
//!   register ──▶ Pending ──approve──▶ Approved
//!                   │
//!                   └──decline──▶ (deleted)
//! ```
//!
//! Approved and Administrator accounts have no outward transitions. These
//! functions are pure; the conditional updates that apply a transition live in
//! the repository so that check and write happen under one lock.

use super::account::{Account, Tier};

/// A tier transition requested by an administrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Approve,
    Decline,
}

impl Transition {
    /// Tier the target must currently hold for the transition to apply
    pub fn required_tier(self) -> Tier {
        Tier::Pending
    }

    /// Resulting tier, `None` when the account is removed
    pub fn target_tier(self) -> Option<Tier> {
        match self {
            Transition::Approve => Some(Tier::Approved),
            Transition::Decline => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Decline => "decline",
        }
    }
}

pub fn can_download(account: &Account) -> bool {
    account.tier >= Tier::Approved
}

pub fn can_administer(account: &Account) -> bool {
    account.tier == Tier::Administrator
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account_with(tier: Tier) -> Account {
        Account {
            id: 1,
            identity: "someone".into(),
            contact_email: "someone@example.com".into(),
            credential_hash: String::new(),
            display_name: "Someone".into(),
            tier,
            downloads: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_download_requires_approval() {
        assert!(!can_download(&account_with(Tier::Pending)));
        assert!(can_download(&account_with(Tier::Approved)));
        assert!(can_download(&account_with(Tier::Administrator)));
    }

    #[test]
    fn test_only_administrators_administer() {
        assert!(!can_administer(&account_with(Tier::Pending)));
        assert!(!can_administer(&account_with(Tier::Approved)));
        assert!(can_administer(&account_with(Tier::Administrator)));
    }

    #[test]
    fn test_transitions_only_leave_pending() {
        for transition in [Transition::Approve, Transition::Decline] {
            assert_eq!(transition.required_tier(), Tier::Pending);
        }
        assert_eq!(Transition::Approve.target_tier(), Some(Tier::Approved));
        assert_eq!(Transition::Decline.target_tier(), None);
    }
}
