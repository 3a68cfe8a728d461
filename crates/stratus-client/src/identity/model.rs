//! Decoded identity payloads and the persisted identity state

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use stratus_core::Url;

/// The `access.token` object of a token response
///
/// `id` is the token itself, so `Debug` redacts it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDetails {
    pub id: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub expires: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Tenant>,
    /// Fields this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl std::fmt::Debug for TokenDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenDetails")
            .field("id", &"<redacted>")
            .field("expires", &self.expires)
            .field("tenant", &self.tenant)
            .field("extra", &self.extra)
            .finish()
    }
}

/// A tenant (project) as reported by the identity service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One service in the catalog
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogEntry {
    /// Endpoints in `region`, or all of them when `region` is `None`
    pub fn endpoints_in<'a>(
        &'a self,
        region: Option<&'a str>,
    ) -> impl Iterator<Item = &'a CatalogEndpoint> + 'a {
        self.endpoints
            .iter()
            .filter(move |e| region.is_none() || e.region.as_deref() == region)
    }
}

/// A regional endpoint of a catalog entry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(rename = "publicURL", default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
    #[serde(rename = "internalURL", default, skip_serializing_if = "Option::is_none")]
    pub internal_url: Option<String>,
    #[serde(rename = "adminURL", default, skip_serializing_if = "Option::is_none")]
    pub admin_url: Option<String>,
    #[serde(rename = "tenantId", default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(rename = "versionId", default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `access` object of a successful token response
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Access {
    pub token: TokenDetails,
    #[serde(rename = "serviceCatalog", default)]
    pub service_catalog: Vec<CatalogEntry>,
    #[serde(default)]
    pub user: Option<Value>,
}

/// Everything an identity service knows, minus its transport
///
/// Restoring from a snapshot performs no I/O; the caller supplies a fresh
/// client.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub endpoint: Url,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
    /// Tenant id the current token was requested for
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Tenant name the current token was requested for
    #[serde(default)]
    pub tenant_name: Option<String>,
    #[serde(default)]
    pub token_details: Option<TokenDetails>,
    #[serde(default)]
    pub service_catalog: Vec<CatalogEntry>,
    #[serde(default)]
    pub user: Option<Value>,
}

impl IdentitySnapshot {
    /// State of a service that has never authenticated
    pub fn unauthenticated(endpoint: Url) -> Self {
        Self {
            endpoint,
            token: None,
            expires: None,
            tenant_id: None,
            tenant_name: None,
            token_details: None,
            service_catalog: Vec::new(),
            user: None,
        }
    }
}

impl std::fmt::Debug for IdentitySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentitySnapshot")
            .field("endpoint", &self.endpoint.without_credentials().to_string())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("expires", &self.expires)
            .field("tenant_id", &self.tenant_id)
            .field("tenant_name", &self.tenant_name)
            .field("token_details", &self.token_details)
            .field("services", &self.service_catalog.len())
            .finish_non_exhaustive()
    }
}

/// Accept RFC 3339 timestamps as well as the offset-less form some
/// identity servers emit (taken as UTC)
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{raw}': {e}")))
}
