use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tower_sessions::Session;

use crate::{session::USER_EMAIL, AppError};

/// Decides who may moderate. Injected through `AppState`.
pub trait PrivilegePolicy: Send + Sync {
    fn is_privileged(&self, email: Option<&str>) -> bool;
}

pub type Policy = Arc<dyn PrivilegePolicy>;

/// Exactly one configured address is the administrator.
#[derive(Debug, Clone)]
pub struct AdminEmail(Option<String>);

impl AdminEmail {
    pub fn new(email: Option<String>) -> Self {
        Self(email)
    }
}

impl PrivilegePolicy for AdminEmail {
    fn is_privileged(&self, email: Option<&str>) -> bool {
        match (&self.0, email) {
            (Some(admin), Some(email)) => admin == email,
            _ => false,
        }
    }
}

/// Who is acting on this request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor {
    pub email: Option<String>,
    pub privileged: bool,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn resolve(email: Option<String>, policy: &dyn PrivilegePolicy) -> Self {
        let privileged = policy.is_privileged(email.as_deref());
        Self { email, privileged }
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    Policy: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::from(msg))?;

        let email = session.get::<String>(USER_EMAIL).await?;
        let policy = Policy::from_ref(state);
        Ok(Actor::resolve(email, policy.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_email_matches_exactly() {
        let policy = AdminEmail::new(Some("owner@example.com".to_owned()));
        assert!(policy.is_privileged(Some("owner@example.com")));
        assert!(!policy.is_privileged(Some("Owner@example.com")));
        assert!(!policy.is_privileged(Some("someone@example.com")));
        assert!(!policy.is_privileged(None));
    }

    #[test]
    fn test_unconfigured_policy_trusts_nobody() {
        let policy = AdminEmail::new(None);
        assert!(!policy.is_privileged(Some("owner@example.com")));
    }

    #[test]
    fn test_resolve_uses_injected_policy() {
        struct Everyone;
        impl PrivilegePolicy for Everyone {
            fn is_privileged(&self, _email: Option<&str>) -> bool {
                true
            }
        }

        let actor = Actor::resolve(None, &Everyone);
        assert!(actor.privileged);

        let actor = Actor::resolve(Some("a@b.c".to_owned()), &AdminEmail::new(None));
        assert_eq!(actor, Actor { email: Some("a@b.c".to_owned()), privileged: false });
    }
}
