//! Read-only lookup API
//!
//! The portal also exposes a narrow JSON endpoint for single-learner
//! lookups, the one place it behaves like an API. It is a cheaper
//! reconciliation data source than scraping full listing pages, and is
//! treated as a black box returning one loosely-typed record per learner
//! identifier.

use async_trait::async_trait;
use tracing::debug;

use shule_core::config::PortalConfig;
use shule_core::error::{PortalError, PortalResult};
use shule_core::record::FieldMap;

/// Port for the single-learner lookup source.
#[async_trait]
pub trait LearnerLookup: Send + Sync {
    /// Fetch the remote record for a UPI, if one exists.
    async fn find_by_upi(&self, upi: &str) -> PortalResult<Option<FieldMap>>;

    /// Fetch the remote record keyed by birth certificate number, if one
    /// exists. This is how collisions with other institutions surface.
    async fn find_by_birth_certificate(&self, cert_no: &str) -> PortalResult<Option<FieldMap>>;
}

/// Lookup client against the portal's JSON endpoint.
pub struct JsonLookupClient {
    config: PortalConfig,
    http: reqwest::Client,
}

impl JsonLookupClient {
    /// Create a lookup client sharing the portal configuration.
    pub fn new(config: PortalConfig) -> PortalResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(
                config.connection.connection_timeout_secs,
            ))
            .timeout(std::time::Duration::from_secs(
                config.connection.read_timeout_secs,
            ))
            .build()
            .map_err(|e| {
                PortalError::invalid_configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self { config, http })
    }

    async fn fetch(&self, path: &str) -> PortalResult<Option<FieldMap>> {
        let url = self.config.url_for(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PortalError::transport(path, e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PortalError::transport(
                path,
                std::io::Error::other(format!("HTTP {}", response.status())),
            ));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PortalError::transport(path, e))?;
        debug!(path, "lookup record fetched");
        Ok(json_to_field_map(&value))
    }
}

#[async_trait]
impl LearnerLookup for JsonLookupClient {
    async fn find_by_upi(&self, upi: &str) -> PortalResult<Option<FieldMap>> {
        self.fetch(&format!("api/Learner/{upi}")).await
    }

    async fn find_by_birth_certificate(&self, cert_no: &str) -> PortalResult<Option<FieldMap>> {
        self.fetch(&format!("api/Learner/BirthCert/{cert_no}")).await
    }
}

/// Flatten a JSON object (or first element of a JSON array) into raw-text
/// fields. Nested structures are not expected from this endpoint; anything
/// non-scalar is carried as its JSON rendering.
fn json_to_field_map(value: &serde_json::Value) -> Option<FieldMap> {
    let object = match value {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Array(items) => items.first()?.as_object()?,
        _ => return None,
    };
    if object.is_empty() {
        return None;
    }
    let mut record = FieldMap::new();
    for (key, val) in object {
        let text = match val {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        record.insert(key.to_ascii_lowercase(), text);
    }
    Some(record)
}
