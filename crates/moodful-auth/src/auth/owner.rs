//! Owner-match authorization

use super::authenticator::{AuthenticationVerdict, Identity};
use super::claims::Principal;

/// The subject must equal `claimed_owner_id` exactly (case-sensitive, no
/// trimming). An empty owner id never matches.
pub fn authorize(principal: &Principal, claimed_owner_id: &str) -> AuthenticationVerdict {
    if !claimed_owner_id.is_empty() && principal.subject() == claimed_owner_id {
        return AuthenticationVerdict::Authenticated;
    }

    tracing::warn!(
        subject = principal.subject(),
        owner = claimed_owner_id,
        "Token subject does not own the requested resource"
    );
    AuthenticationVerdict::Unauthenticated
}

/// Debug bypass identities are authorized for every owner.
pub fn authorize_identity(identity: &Identity, claimed_owner_id: &str) -> AuthenticationVerdict {
    match identity {
        Identity::Principal(principal) => authorize(principal, claimed_owner_id),
        Identity::DebugBypass => AuthenticationVerdict::Authenticated,
    }
}
