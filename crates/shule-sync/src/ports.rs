//! Collaborator ports
//!
//! Seams the engine depends on but does not implement: where portal
//! credentials come from is the caller's concern (env, vault, per-tenant
//! store). The lookup port lives in `shule_portal` and is re-exported here
//! so reconciliation callers need only one crate.

use async_trait::async_trait;

use shule_core::config::PortalConfig;
use shule_core::error::{PortalError, PortalResult};

pub use shule_portal::lookup::{JsonLookupClient, LearnerLookup};

/// Source of portal credentials for a named institution identity.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Resolve the `(username, password)` pair for `identity`.
    async fn resolve(&self, identity: &str) -> PortalResult<(String, String)>;
}

/// Fixed in-memory credentials, for tests and single-tenant deployments.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentials {
    async fn resolve(&self, _identity: &str) -> PortalResult<(String, String)> {
        if self.username.is_empty() {
            return Err(PortalError::invalid_configuration(
                "static credential source holds an empty username",
            ));
        }
        Ok((self.username.clone(), self.password.clone()))
    }
}

/// Rebuild a config with credentials resolved from `source`.
///
/// The identity handed to the source is the institution code already on the
/// config.
pub async fn config_with_credentials(
    base: &PortalConfig,
    source: &dyn CredentialSource,
) -> PortalResult<PortalConfig> {
    let (username, password) = source.resolve(&base.institution_code).await?;
    let config = base.clone().with_credentials(username, password);
    config.validate()?;
    Ok(config)
}
