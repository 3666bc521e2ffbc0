//! Authorization policy for concert programs
//!
//! Every mutating request is a capability check:
//! `authorize(action, resource, credential) -> bool`.
//!
//! # Credentials
//!
//! - **Admin token**: the `admin_token` cookie, compared against the
//!   configured admin secret
//! - **Passcode**: the per-concert passcode supplied in a request body
//!
//! # Pure Functions
//!
//! This module has no HTTP framework dependencies. The server extracts the
//! credential from cookies and bodies and calls into the policy.

use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Length of generated admin secrets in hex characters
const GENERATED_SECRET_LEN: usize = 32;

// ========================================
// Actions, Resources, Credentials
// ========================================

/// Operations subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read a concert and its performances
    ViewProgram,
    /// Create a new concert
    CreateConcert,
    /// Change a concert's date or passcode
    EditConcert,
    /// Delete a concert and its performances
    DeleteConcert,
    /// Freeze or unfreeze a concert
    FreezeConcert,
    /// Create, update, delete, move or rebalance performances
    EditPerformances,
    /// See a concert's passcode in listings
    ViewPasscode,
}

/// What an action targets
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// The site as a whole (concert creation, listings)
    Site,
    /// One concert
    Concert { passcode: &'a str, frozen: bool },
}

/// Credentials presented with a request
#[derive(Debug, Clone, Default)]
pub struct Credential {
    /// Value of the admin cookie, if present
    pub admin_token: Option<String>,
    /// Concert passcode, if supplied
    pub passcode: Option<String>,
}

impl Credential {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_passcode(mut self, passcode: Option<String>) -> Self {
        self.passcode = passcode;
        self
    }
}

// ========================================
// Policy
// ========================================

/// Capability check for salon actions
///
/// Implementations must be cheap and side-effect free; handlers call them on
/// every mutating request.
pub trait Policy: Send + Sync {
    fn authorize(&self, action: Action, resource: &Resource<'_>, credential: &Credential) -> bool;

    /// True when the credential carries admin rights
    fn is_admin(&self, credential: &Credential) -> bool;

    /// Like [`Policy::authorize`] but explains a refusal
    ///
    /// A frozen concert refuses performance edits with [`Error::Frozen`] when
    /// the passcode was otherwise correct.
    fn require(
        &self,
        action: Action,
        resource: &Resource<'_>,
        credential: &Credential,
        concert_id: &str,
    ) -> Result<()> {
        if self.authorize(action, resource, credential) {
            return Ok(());
        }

        if let Resource::Concert {
            passcode,
            frozen: true,
        } = resource
        {
            let unfrozen = Resource::Concert {
                passcode: *passcode,
                frozen: false,
            };
            if self.authorize(action, &unfrozen, credential) {
                return Err(Error::Frozen(concert_id.to_string()));
            }
        }

        Err(Error::Forbidden(match credential.passcode {
            Some(_) => "Invalid passcode".to_string(),
            None => "Passcode required".to_string(),
        }))
    }
}

/// Policy backed by a shared admin secret and per-concert passcodes
#[derive(Clone)]
pub struct SharedSecretPolicy {
    admin_digest: [u8; 32],
}

impl SharedSecretPolicy {
    pub fn new(admin_secret: &str) -> Self {
        Self {
            admin_digest: digest(admin_secret),
        }
    }
}

impl std::fmt::Debug for SharedSecretPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretPolicy").finish_non_exhaustive()
    }
}

impl Policy for SharedSecretPolicy {
    fn authorize(&self, action: Action, resource: &Resource<'_>, credential: &Credential) -> bool {
        if action == Action::ViewProgram {
            return true;
        }

        if self.is_admin(credential) {
            return true;
        }

        let Resource::Concert { passcode, frozen } = resource else {
            return false;
        };

        let passcode_ok = credential
            .passcode
            .as_deref()
            .is_some_and(|supplied| secrets_match(supplied, passcode));

        match action {
            Action::EditConcert | Action::DeleteConcert => passcode_ok,
            Action::EditPerformances => passcode_ok && !frozen,
            Action::ViewProgram => true,
            Action::CreateConcert | Action::FreezeConcert | Action::ViewPasscode => false,
        }
    }

    fn is_admin(&self, credential: &Credential) -> bool {
        credential
            .admin_token
            .as_deref()
            .is_some_and(|token| digest(token) == self.admin_digest)
    }
}

// ========================================
// Secret helpers
// ========================================

/// Compare two secrets through their SHA-256 digests
///
/// Empty passcodes never match.
pub fn secrets_match(supplied: &str, expected: &str) -> bool {
    !expected.is_empty() && digest(supplied) == digest(expected)
}

/// Generate a random admin secret (hex)
pub fn generate_admin_secret() -> String {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    (0..GENERATED_SECRET_LEN / 2)
        .map(|_| format!("{:02x}", rng.gen::<u8>()))
        .collect()
}

/// Settings key under which a generated admin secret is persisted
pub const ADMIN_SECRET_SETTING: &str = "admin_secret";

/// Load the persisted admin secret, generating and storing one if absent
///
/// Used when no secret is configured, so restarts keep the same admin cookie
/// valid without a well-known default.
#[cfg(feature = "sqlx")]
pub async fn load_admin_secret(db: &sqlx::SqlitePool) -> Result<String> {
    if let Some(secret) = crate::db::get_setting(db, ADMIN_SECRET_SETTING).await? {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    let secret = generate_admin_secret();
    crate::db::set_setting(db, ADMIN_SECRET_SETTING, &secret).await?;
    Ok(secret)
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "backstage";

    fn admin() -> Credential {
        Credential {
            admin_token: Some(SECRET.to_string()),
            passcode: None,
        }
    }

    fn with_passcode(p: &str) -> Credential {
        Credential::anonymous().with_passcode(Some(p.to_string()))
    }

    #[test]
    fn test_anyone_can_view() {
        let policy = SharedSecretPolicy::new(SECRET);
        assert!(policy.authorize(Action::ViewProgram, &Resource::Site, &Credential::anonymous()));
    }

    #[test]
    fn test_admin_can_do_everything() {
        let policy = SharedSecretPolicy::new(SECRET);
        let frozen = Resource::Concert {
            passcode: "1234",
            frozen: true,
        };
        for action in [
            Action::CreateConcert,
            Action::EditConcert,
            Action::DeleteConcert,
            Action::FreezeConcert,
            Action::EditPerformances,
            Action::ViewPasscode,
        ] {
            assert!(policy.authorize(action, &frozen, &admin()), "{:?}", action);
        }
        assert!(policy.authorize(Action::CreateConcert, &Resource::Site, &admin()));
    }

    #[test]
    fn test_passcode_grants_concert_edits() {
        let policy = SharedSecretPolicy::new(SECRET);
        let concert = Resource::Concert {
            passcode: "1234",
            frozen: false,
        };
        assert!(policy.authorize(Action::EditPerformances, &concert, &with_passcode("1234")));
        assert!(policy.authorize(Action::DeleteConcert, &concert, &with_passcode("1234")));
        assert!(!policy.authorize(Action::EditPerformances, &concert, &with_passcode("4321")));
        assert!(!policy.authorize(Action::EditPerformances, &concert, &Credential::anonymous()));
        assert!(!policy.authorize(Action::FreezeConcert, &concert, &with_passcode("1234")));
        assert!(!policy.authorize(Action::ViewPasscode, &concert, &with_passcode("1234")));
        assert!(!policy.authorize(Action::CreateConcert, &Resource::Site, &with_passcode("1234")));
    }

    #[test]
    fn test_frozen_concert_blocks_passcode_edits() {
        let policy = SharedSecretPolicy::new(SECRET);
        let concert = Resource::Concert {
            passcode: "1234",
            frozen: true,
        };
        let err = policy
            .require(Action::EditPerformances, &concert, &with_passcode("1234"), "c1")
            .unwrap_err();
        assert!(matches!(err, Error::Frozen(_)));

        let err = policy
            .require(Action::EditPerformances, &concert, &with_passcode("nope"), "c1")
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[test]
    fn test_wrong_admin_token_is_not_admin() {
        let policy = SharedSecretPolicy::new(SECRET);
        let cred = Credential {
            admin_token: Some("guess".to_string()),
            passcode: None,
        };
        assert!(!policy.is_admin(&cred));
        assert!(policy.is_admin(&admin()));
    }

    #[test]
    fn test_empty_passcode_never_matches() {
        assert!(!secrets_match("", ""));
        assert!(secrets_match("abc", "abc"));
    }

    #[test]
    fn test_generated_secret_shape() {
        let a = generate_admin_secret();
        let b = generate_admin_secret();
        assert_eq!(a.len(), GENERATED_SECRET_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }
}
