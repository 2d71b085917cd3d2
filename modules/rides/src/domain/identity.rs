use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::contract::model::SecurityContext;
use crate::domain::error::DomainError;
use crate::domain::repo::ProfilesRepository;

/// Turns an authenticated caller id into a `SecurityContext`.
///
/// Role and account status always come from the stored profile, never from
/// the request.
#[derive(Clone)]
pub struct IdentityService {
    profiles: Arc<dyn ProfilesRepository>,
}

impl IdentityService {
    pub fn new(profiles: Arc<dyn ProfilesRepository>) -> Self {
        Self { profiles }
    }

    /// `ProfileNotFound` for unknown callers, `Forbidden` for suspended or
    /// banned accounts.
    #[instrument(name = "rides.identity.resolve", skip(self))]
    pub async fn resolve(&self, caller_id: Uuid) -> Result<SecurityContext, DomainError> {
        let profile = self
            .profiles
            .find_by_id(caller_id)
            .await
            .map_err(|e| DomainError::database(e.to_string()))?
            .ok_or_else(|| DomainError::profile_not_found(caller_id))?;

        if !profile.account_status.may_act() {
            debug!(status = %profile.account_status, "Rejecting caller");
            return Err(DomainError::forbidden(format!(
                "account is {}",
                profile.account_status
            )));
        }
        Ok(profile.security_context())
    }
}
