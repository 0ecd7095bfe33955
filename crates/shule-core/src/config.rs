//! Portal client configuration
//!
//! Explicit configuration passed to each `SessionClient` at construction.
//! There are no process-wide defaults: two clients may point at different
//! portals with different credentials in the same process.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PortalError, PortalResult};

/// Institution level as the portal classifies it.
///
/// Ordering matters for reconciliation: a learner "owned" at a lower level
/// than ours is still directly capturable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionLevel {
    EarlyYears,
    Primary,
    Secondary,
}

impl InstitutionLevel {
    /// Parse the portal's rendering of a level.
    pub fn parse_portal(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_uppercase();
        if v.contains("ECDE") || v.contains("EARLY") || v.contains("PRE-PRIMARY") {
            Some(InstitutionLevel::EarlyYears)
        } else if v.contains("PRIMARY") {
            Some(InstitutionLevel::Primary)
        } else if v.contains("SECONDARY") || v.contains("HIGH SCHOOL") {
            Some(InstitutionLevel::Secondary)
        } else {
            None
        }
    }
}

/// Connection timeouts for one portal client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Connection timeout in seconds.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Read timeout in seconds. Legacy portal pages can take a while to
    /// render server-side; this bounds each individual request.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_read_timeout() -> u64 {
    120
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: default_connection_timeout(),
            read_timeout_secs: default_read_timeout(),
        }
    }
}

/// Configuration for one portal conversation.
#[derive(Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Base URL of the portal (e.g., "https://portal.example.go.ke").
    pub base_url: String,

    /// Portal login username (institution account).
    pub username: String,

    /// Portal login password.
    pub password: String,

    /// Our own institution code, as known to the portal.
    pub institution_code: String,

    /// Our own institution level.
    pub institution_level: InstitutionLevel,

    /// Connection settings.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Listing page size to request when paginating.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page_size() -> u32 {
    1000
}

impl PortalConfig {
    /// Create a configuration with defaults for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: String::new(),
            password: String::new(),
            institution_code: String::new(),
            institution_level: InstitutionLevel::Primary,
            connection: ConnectionSettings::default(),
            page_size: default_page_size(),
        }
    }

    /// Set the login credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the institution code and level.
    pub fn with_institution(
        mut self,
        code: impl Into<String>,
        level: InstitutionLevel,
    ) -> Self {
        self.institution_code = code.into();
        self.institution_level = level;
        self
    }

    /// Set connection timeouts.
    pub fn with_timeouts(mut self, connect_secs: u64, read_secs: u64) -> Self {
        self.connection.connection_timeout_secs = connect_secs;
        self.connection.read_timeout_secs = read_secs;
        self
    }

    /// Set the listing page size.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> PortalResult<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            PortalError::invalid_configuration(format!("invalid base_url: {e}"))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(PortalError::invalid_configuration(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        if self.username.is_empty() {
            return Err(PortalError::invalid_configuration("username is required"));
        }
        if self.password.is_empty() {
            return Err(PortalError::invalid_configuration("password is required"));
        }
        if self.institution_code.is_empty() {
            return Err(PortalError::invalid_configuration(
                "institution_code is required",
            ));
        }
        if self.page_size == 0 {
            return Err(PortalError::invalid_configuration("page_size must be > 0"));
        }
        Ok(())
    }

    /// Join a portal path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Create a redacted copy for logging/display.
    pub fn redacted(&self) -> Self {
        Self {
            password: "<redacted>".to_string(),
            ..self.clone()
        }
    }
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("institution_code", &self.institution_code)
            .field("institution_level", &self.institution_level)
            .field("page_size", &self.page_size)
            .finish()
    }
}
