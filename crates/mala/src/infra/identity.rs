//! External identity collaborator yielding the authenticated user.

/// Environment variable holding the authenticated user identifier.
pub const USER_ID_ENV: &str = "MALA_USER_ID";

/// Identity boundary consulted before any remote store operation.
///
/// The engine never manages sessions itself; it only asks who, if anyone,
/// is currently signed in.
#[cfg_attr(test, mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// Returns the current authenticated user identifier, when signed in.
    fn current_user(&self) -> Option<String>;
}

/// Identity provider resolving the user from the environment.
pub struct EnvIdentityProvider {
    user_id: Option<String>,
}

impl EnvIdentityProvider {
    /// Reads `MALA_USER_ID` once at construction.
    pub fn from_env() -> Self {
        Self {
            user_id: std::env::var(USER_ID_ENV).ok().filter(|id| !id.is_empty()),
        }
    }
}

impl IdentityProvider for EnvIdentityProvider {
    fn current_user(&self) -> Option<String> {
        self.user_id.clone()
    }
}

/// Fixed identity used by tests and single-user setups.
pub struct StaticIdentityProvider {
    user_id: Option<String>,
}

impl StaticIdentityProvider {
    /// Creates a provider that always reports `user_id`.
    pub fn new(user_id: Option<String>) -> Self {
        Self { user_id }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current_user(&self) -> Option<String> {
        self.user_id.clone()
    }
}
