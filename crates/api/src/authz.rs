//! API-side authorization guards.
//!
//! Role checks run before a handler touches the store; ownership checks run
//! after the target document has been loaded and before it is changed.

use devcamper_auth::{Role, authorize_owner, authorize_roles};
use devcamper_core::{Collection, Document, Ownership, UserId};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::Session;

pub const PUBLISHERS: &[Role] = &[Role::Publisher, Role::Admin];
pub const REVIEWERS: &[Role] = &[Role::User, Role::Admin];
pub const ADMINS: &[Role] = &[Role::Admin];

pub fn require_roles(session: &Session, allowed: &[Role]) -> Result<(), ApiError> {
    Ok(authorize_roles(&session.principal, allowed)?)
}

/// Resolve who owns `doc` according to its collection's ownership rule.
pub async fn owner_of(
    services: &AppServices,
    collection: Collection,
    doc: &Document,
) -> Result<Option<UserId>, ApiError> {
    match collection.ownership() {
        Ownership::OwnField => Ok(doc.owner()),
        Ownership::ViaParent => {
            let Some(parent) = collection.parent() else {
                return Ok(None);
            };
            let Some(parent_id) = doc.reference(parent.field) else {
                return Ok(None);
            };
            Ok(services
                .store
                .get(parent.collection, parent_id)
                .await?
                .and_then(|p| p.owner()))
        }
        Ownership::AdminOnly => Ok(None),
    }
}

/// Allow the owner of `doc` (or an admin) to `action` it.
pub async fn authorize_change(
    services: &AppServices,
    session: &Session,
    collection: Collection,
    doc: &Document,
    action: &'static str,
) -> Result<(), ApiError> {
    let owner = owner_of(services, collection, doc).await?;
    if let Err(e) = authorize_owner(&session.principal, owner, action, collection) {
        tracing::info!(user = %session.user_id(), %collection, id = %doc.id(), action, "ownership check failed");
        return Err(e.into());
    }
    Ok(())
}
