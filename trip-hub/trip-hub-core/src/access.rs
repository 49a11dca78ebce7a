//! Admin-list authorization.
//!
//! The check is cooperative: the principal id comes from the chat transport
//! and is trusted as-is. An empty admin list means the trip is open and every
//! principal may edit it.

use tracing::info;

use crate::document::{PrincipalId, TripDocument};
use crate::error::{Result, StoreError};

pub fn is_authorized(principal: PrincipalId, doc: &TripDocument) -> bool {
    doc.admins.is_empty() || doc.admins.contains(principal)
}

pub fn ensure_authorized(principal: PrincipalId, doc: &TripDocument) -> Result<()> {
    if is_authorized(principal, doc) {
        Ok(())
    } else {
        Err(StoreError::Authorization(principal))
    }
}

/// Add `new_admin` to the admin set on behalf of `requester`. The caller is
/// responsible for persisting the returned document.
pub fn add_admin(
    requester: PrincipalId,
    new_admin: PrincipalId,
    mut doc: TripDocument,
) -> Result<TripDocument> {
    ensure_authorized(requester, &doc)?;
    if doc.admins.insert(new_admin) {
        info!(%requester, %new_admin, "admin added");
    }
    Ok(doc)
}
