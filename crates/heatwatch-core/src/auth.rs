//! Role model and capability checks.
//!
//! All authority decisions go through the single [`Role::is_authority`]
//! predicate -- nothing else in the crate matches on role names. Deployments
//! that gate authority registration behind a shared secret plug in a
//! [`CredentialCheck`]; the per-request guard never re-checks credentials.

use serde::{Deserialize, Serialize};

/// Capability tag attached to every registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Subordinate worker: cycles through work/rest, acts only on self.
    Trainer,
    /// Authority: monitors, acts on others, controls system-wide state.
    SafetyOfficer,
    /// Authority: monitors, acts on others, controls system-wide state.
    Supervisor,
}

impl Role {
    pub fn is_authority(self) -> bool {
        matches!(self, Role::SafetyOfficer | Role::Supervisor)
    }
}

/// One-time credential check invoked when an authority role registers.
pub trait CredentialCheck: Send + Sync {
    fn verify(&self, username: &str, secret: Option<&str>) -> bool;
}

/// Accepts every registration (the default).
pub struct AllowAll;

impl CredentialCheck for AllowAll {
    fn verify(&self, _username: &str, _secret: Option<&str>) -> bool {
        true
    }
}

/// Requires a shared secret to register as an authority role.
pub struct SharedSecret {
    secret: String,
}

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl CredentialCheck for SharedSecret {
    fn verify(&self, _username: &str, secret: Option<&str>) -> bool {
        secret == Some(self.secret.as_str())
    }
}

/// Per-request capability guard.
pub struct AuthorizationGuard {
    credential: Box<dyn CredentialCheck>,
}

impl AuthorizationGuard {
    pub fn new() -> Self {
        Self {
            credential: Box::new(AllowAll),
        }
    }

    pub fn with_credential_check(credential: Box<dyn CredentialCheck>) -> Self {
        Self { credential }
    }

    /// Self-service is always allowed; acting on others requires authority.
    pub fn can_act(&self, actor_role: Role, actor: &str, target: &str) -> bool {
        actor == target || actor_role.is_authority()
    }

    pub fn can_toggle_cutoff(&self, role: Role) -> bool {
        role.is_authority()
    }

    pub fn can_reset(&self, role: Role) -> bool {
        role.is_authority()
    }

    /// Credential check applied once, at registration time. Subordinate
    /// roles never need one.
    pub fn verify_registration(&self, username: &str, role: Role, secret: Option<&str>) -> bool {
        !role.is_authority() || self.credential.verify(username, secret)
    }
}

impl Default for AuthorizationGuard {
    fn default() -> Self {
        Self::new()
    }
}
