//! Account service - registration, login, profile and approval workflow

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::adapters::duckdb::DuckDbRepository;
use crate::config::SeedAccount;
use crate::domain::permission::{self, Transition};
use crate::domain::result::{Error, Result};
use crate::domain::{Account, NewAccount, PendingRequest, ProfileUpdate, Tier};
use crate::services::activity::{events, ActivityEvent, ActivityLog};
use crate::services::CredentialHasher;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

pub struct AccountService {
    repository: Arc<DuckDbRepository>,
    hasher: CredentialHasher,
    activity: Arc<ActivityLog>,
}

impl AccountService {
    pub fn new(repository: Arc<DuckDbRepository>, hasher: CredentialHasher, activity: Arc<ActivityLog>) -> Self {
        Self {
            repository,
            hasher,
            activity,
        }
    }

    /// Create a Pending account
    pub fn register(&self, new_account: &NewAccount) -> Result<Account> {
        new_account.validate().map_err(Error::validation)?;

        let hash = self.hasher.hash(&new_account.credential)?;
        let account = self.repository.create_account(
            new_account.identity.trim(),
            new_account.contact_email.trim(),
            new_account.display_name.trim(),
            &hash,
            Tier::Pending,
        )?;

        info!(account_id = account.id, "account registered");
        self.activity
            .record(ActivityEvent::new(events::ACCOUNT_REGISTERED).with_account(account.id));
        Ok(account)
    }

    /// Verify a login by identity, falling back to email
    ///
    /// Unknown accounts and wrong credentials fail identically.
    pub fn authenticate(&self, login: &str, credential: &str) -> Result<Account> {
        let login = login.trim();
        if login.is_empty() || credential.is_empty() {
            return Err(Error::validation("Username/email and password required"));
        }

        let account = match self.repository.get_account_by_identity(login)? {
            Some(account) => Some(account),
            None => self.repository.get_account_by_email(login)?,
        };

        match account {
            Some(account) if self.hasher.verify(credential, &account.credential_hash) => {
                debug!(account_id = account.id, "login succeeded");
                self.activity
                    .record(ActivityEvent::new(events::LOGIN_SUCCEEDED).with_account(account.id));
                Ok(account)
            }
            Some(account) => {
                warn!(account_id = account.id, "login rejected");
                self.activity.record(
                    ActivityEvent::new(events::LOGIN_FAILED)
                        .with_account(account.id)
                        .with_error(INVALID_CREDENTIALS),
                );
                Err(Error::Authentication(INVALID_CREDENTIALS.to_string()))
            }
            None => {
                self.activity
                    .record(ActivityEvent::new(events::LOGIN_FAILED).with_error("unknown account"));
                Err(Error::Authentication(INVALID_CREDENTIALS.to_string()))
            }
        }
    }

    /// Fresh snapshot of an account
    pub fn current(&self, account_id: i64) -> Result<Account> {
        self.repository
            .get_account_by_id(account_id)?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    pub fn update_profile(&self, account_id: i64, update: &ProfileUpdate) -> Result<Account> {
        update.validate().map_err(Error::validation)?;

        let account = self.repository.update_profile(
            account_id,
            update.display_name.as_deref().map(str::trim),
            update.contact_email.as_deref().map(str::trim),
        )?;

        self.activity
            .record(ActivityEvent::new(events::PROFILE_UPDATED).with_account(account_id));
        Ok(account)
    }

    /// Pending registrations, for administrators only
    pub fn pending_requests(&self, admin_id: i64) -> Result<Vec<PendingRequest>> {
        self.require_admin(admin_id)?;
        let pending = self.repository.list_accounts_by_tier(Tier::Pending)?;
        Ok(pending.iter().map(PendingRequest::from).collect())
    }

    pub fn approve(&self, admin_id: i64, target_id: i64) -> Result<()> {
        self.transition(admin_id, target_id, Transition::Approve)
    }

    pub fn decline(&self, admin_id: i64, target_id: i64) -> Result<()> {
        self.transition(admin_id, target_id, Transition::Decline)
    }

    fn transition(&self, admin_id: i64, target_id: i64, transition: Transition) -> Result<()> {
        self.require_admin(admin_id)?;
        self.apply_transition(target_id, transition)?;
        info!(admin_id, target_id, action = transition.as_str(), "pending account processed");
        Ok(())
    }

    /// Approve or decline a pending account without an acting administrator
    ///
    /// Used by the local command line, which already has direct access to
    /// the data directory.
    pub fn apply_transition(&self, target_id: i64, transition: Transition) -> Result<()> {
        if !self.repository.apply_transition(target_id, transition)? {
            let message = match transition {
                Transition::Approve => "User not found or already approved",
                Transition::Decline => "User not found or already processed",
            };
            return Err(Error::not_found(message));
        }

        let event = match transition {
            Transition::Approve => events::ACCOUNT_APPROVED,
            Transition::Decline => events::ACCOUNT_DECLINED,
        };
        self.activity.record(ActivityEvent::new(event).with_account(target_id));
        Ok(())
    }

    fn require_admin(&self, admin_id: i64) -> Result<Account> {
        let admin = self
            .repository
            .get_account_by_id(admin_id)?
            .ok_or_else(|| Error::forbidden("Forbidden"))?;
        if !permission::can_administer(&admin) {
            return Err(Error::forbidden("Forbidden"));
        }
        Ok(admin)
    }

    /// Create configured accounts whose identity does not exist yet
    ///
    /// Returns how many were created.
    pub fn seed(&self, seeds: &[SeedAccount]) -> Result<usize> {
        let mut created = 0;
        for seed in seeds {
            NewAccount::new(&seed.identity, &seed.credential, &seed.display_name, &seed.contact_email)
                .validate()
                .map_err(|e| Error::validation(format!("seed account '{}': {}", seed.identity, e)))?;

            if self.repository.get_account_by_identity(&seed.identity)?.is_some() {
                continue;
            }

            let hash = self.hasher.hash(&seed.credential)?;
            let inserted = self.repository.seed_account(
                &seed.identity,
                &seed.contact_email,
                &seed.display_name,
                &hash,
                seed.tier,
            )?;
            if inserted {
                created += 1;
                info!(identity = %seed.identity, tier = seed.tier.as_str(), "seeded account");
                if let Some(account) = self.repository.get_account_by_identity(&seed.identity)? {
                    self.activity
                        .record(ActivityEvent::new(events::ACCOUNT_SEEDED).with_account(account.id));
                }
            }
        }
        Ok(created)
    }
}
