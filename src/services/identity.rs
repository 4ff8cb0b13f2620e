//! Resolution of externally-authenticated principals to internal users.
//!
//! Provisioning is lazy: the first authenticated contact creates the user row
//! through an upsert keyed on the external identity, so concurrent first
//! contacts for the same identity converge on one row.

use crate::domain::models::{Principal, User};
use crate::error::{is_unique_violation, ServiceError, ServiceResult};
use crate::repository::UserRepository;
use sqlx::PgPool;
use tracing::info;

#[derive(Clone)]
pub struct IdentityResolver {
    users: UserRepository,
}

impl IdentityResolver {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Resolve a principal to its user row, provisioning on first sight.
    /// An absent principal is a valid anonymous state, not an error.
    pub async fn resolve(&self, principal: Option<&Principal>) -> ServiceResult<Option<User>> {
        let Some(principal) = principal else {
            return Ok(None);
        };

        if let Some(user) = self.users.find_by_external_id(&principal.external_id).await? {
            return Ok(Some(user));
        }

        let user = self.provision(principal).await?;
        Ok(Some(user))
    }

    /// Resolve a principal, escalating absence to an error. Write paths use
    /// this; read paths use `resolve` and treat None as anonymous.
    pub async fn require(&self, principal: Option<&Principal>) -> ServiceResult<User> {
        self.resolve(principal)
            .await?
            .ok_or(ServiceError::IdentityUnresolved)
    }

    async fn provision(&self, principal: &Principal) -> ServiceResult<User> {
        let display_name = display_name(principal);
        let handle = derive_handle(principal);

        match self
            .users
            .upsert_from_identity(
                &principal.external_id,
                &display_name,
                &handle,
                principal.avatar_url.as_deref(),
            )
            .await
        {
            Ok(user) => {
                info!(user_id = %user.id, handle = %user.handle, "provisioned user");
                Ok(user)
            }
            // The derived handle belongs to a different user. Retry once with
            // a suffix tied to the external id; the external_id upsert itself
            // can never conflict.
            Err(e) if is_unique_violation(&e) => {
                let fallback = disambiguated_handle(&handle, &principal.external_id);
                let user = self
                    .users
                    .upsert_from_identity(
                        &principal.external_id,
                        &display_name,
                        &fallback,
                        principal.avatar_url.as_deref(),
                    )
                    .await
                    .map_err(|e| {
                        if is_unique_violation(&e) {
                            ServiceError::Conflict(format!("Handle {} is taken", fallback))
                        } else {
                            e.into()
                        }
                    })?;
                info!(user_id = %user.id, handle = %user.handle, "provisioned user with fallback handle");
                Ok(user)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Display name from the provider's name parts; falls back to the handle
/// source when both parts are missing
fn display_name(principal: &Principal) -> String {
    let name = format!(
        "{} {}",
        principal.first_name.as_deref().unwrap_or(""),
        principal.last_name.as_deref().unwrap_or("")
    );
    let name = name.trim().to_string();
    if name.is_empty() {
        derive_handle(principal)
    } else {
        name
    }
}

/// Default handle: provider username, else the local part of the contact
/// address
fn derive_handle(principal: &Principal) -> String {
    if let Some(username) = principal
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    {
        return username.to_string();
    }
    principal
        .email
        .split('@')
        .next()
        .unwrap_or(&principal.email)
        .to_string()
}

/// Deterministic per-identity suffix for handle collisions
fn disambiguated_handle(handle: &str, external_id: &str) -> String {
    let suffix = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, external_id.as_bytes());
    format!("{}-{}", handle, &suffix.simple().to_string()[..8])
}
