//! Authorization predicates (no IO).
//!
//! Route guards call [`authorize_roles`]; handlers that mutate an owned
//! resource call [`authorize_owner`] after the resource has been loaded and
//! before the change is applied.

use thiserror::Error;

use devcamper_core::{Collection, UserId};

use crate::{Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("User role {0} is not authorized to access this route")]
    RoleNotAllowed(Role),

    #[error("User {user} is not authorized to {action} this {resource}")]
    NotOwner {
        user: UserId,
        action: &'static str,
        resource: &'static str,
    },
}

/// Allow only principals holding one of `allowed`.
pub fn authorize_roles(principal: &Principal, allowed: &[Role]) -> Result<(), AuthzError> {
    if allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthzError::RoleNotAllowed(principal.role))
    }
}

/// Allow the owner of a resource, or any admin.
pub fn authorize_owner(
    principal: &Principal,
    owner: Option<UserId>,
    action: &'static str,
    collection: Collection,
) -> Result<(), AuthzError> {
    if principal.is_admin() || owner == Some(principal.user_id) {
        return Ok(());
    }
    Err(AuthzError::NotOwner {
        user: principal.user_id,
        action,
        resource: singular(collection),
    })
}

fn singular(collection: Collection) -> &'static str {
    match collection {
        Collection::Bootcamps => "bootcamp",
        Collection::Courses => "course",
        Collection::Reviews => "review",
        Collection::Users => "user",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_guard() {
        let p = Principal::new(UserId::new(), Role::User);
        assert_eq!(
            authorize_roles(&p, &[Role::Publisher, Role::Admin]),
            Err(AuthzError::RoleNotAllowed(Role::User))
        );
        assert!(authorize_roles(&p, &[Role::User, Role::Admin]).is_ok());
    }

    #[test]
    fn owner_or_admin() {
        let owner = UserId::new();
        let p = Principal::new(owner, Role::Publisher);
        assert!(authorize_owner(&p, Some(owner), "update", Collection::Bootcamps).is_ok());

        let stranger = Principal::new(UserId::new(), Role::Publisher);
        let err = authorize_owner(&stranger, Some(owner), "delete", Collection::Bootcamps).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("User {} is not authorized to delete this bootcamp", stranger.user_id)
        );

        let admin = Principal::new(UserId::new(), Role::Admin);
        assert!(authorize_owner(&admin, Some(owner), "delete", Collection::Courses).is_ok());
    }

    #[test]
    fn missing_owner_only_admits_admins() {
        let p = Principal::new(UserId::new(), Role::Publisher);
        assert!(authorize_owner(&p, None, "update", Collection::Reviews).is_err());
    }
}
