//! Identity service: token lifecycle, service catalog, and rescoping
//!
//! ```text
//! Unauthenticated ──authenticate──▶ Authenticated ──rescope──┐
//!        ▲                               │  ▲                │
//!        └──────── expiry (is_expired) ──┘  └────────────────┘
//! ```
//!
//! An expired service keeps its stale token, catalog and user until the next
//! successful authentication.

mod credentials;
mod model;

pub use credentials::{Credentials, Scope};
pub use model::{CatalogEndpoint, CatalogEntry, IdentitySnapshot, Tenant, TokenDetails};

use crate::client::{RequestOptions, TransportClient};
use chrono::{DateTime, Utc};
use model::Access;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use stratus_core::{Error, ErrorKind, Method, Result, Url, AUTH_TOKEN_HEADER};
use tracing::{debug, info, instrument};

/// Client for an identity (token) endpoint
///
/// Mutating calls take `&mut self`; share an instance across tasks behind a
/// lock.
pub struct IdentityService {
    client: Arc<TransportClient>,
    state: IdentitySnapshot,
}

#[derive(Deserialize)]
struct TenantList {
    #[serde(default)]
    tenants: Vec<Tenant>,
}

impl IdentityService {
    /// Create an unauthenticated service for `endpoint` (e.g. `https://host/v2.0`)
    pub fn new(endpoint: Url, client: Arc<TransportClient>) -> Self {
        Self {
            client,
            state: IdentitySnapshot::unauthenticated(endpoint),
        }
    }

    /// Rebuild a service from a snapshot without touching the network
    pub fn from_snapshot(snapshot: IdentitySnapshot, client: Arc<TransportClient>) -> Self {
        Self {
            client,
            state: snapshot,
        }
    }

    /// Capture the current state
    pub fn to_snapshot(&self) -> IdentitySnapshot {
        self.state.clone()
    }

    /// Identity endpoint
    pub fn endpoint(&self) -> &Url {
        &self.state.endpoint
    }

    /// Transport client used for identity calls
    pub fn client(&self) -> &Arc<TransportClient> {
        &self.client
    }

    /// Request a token with a raw `auth` payload
    ///
    /// Returns the new token. HTTP failures propagate as mapped errors; a
    /// success response without a usable token is an
    /// `Error::AuthenticationFailure`.
    #[instrument(
        skip(self, auth),
        fields(endpoint = %self.state.endpoint.without_credentials())
    )]
    pub async fn authenticate(&mut self, auth: Value) -> Result<String> {
        let url = self.state.endpoint.join_path("tokens");
        let body = serde_json::to_vec(&json!({ "auth": &auth }))?;
        let options = RequestOptions::new()
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        let request = self
            .client
            .create_request(Method::Post, url, Some(body.into()), &options)?;

        let response = self.client.send_checked(&request).await?;
        let access = parse_access(response.json().map_err(|e| {
            Error::authentication(format!("unreadable token response: {e}"))
        })?)?;

        let (tenant_id, tenant_name) = match &access.token.tenant {
            Some(tenant) => (Some(tenant.id.clone()), Some(tenant.name.clone())),
            None => (
                auth.get("tenantId").and_then(Value::as_str).map(str::to_string),
                auth.get("tenantName").and_then(Value::as_str).map(str::to_string),
            ),
        };

        let token = access.token.id.clone();
        info!(
            expires = %access.token.expires,
            tenant_id = tenant_id.as_deref().unwrap_or("-"),
            services = access.service_catalog.len(),
            "authenticated"
        );

        self.state.token = Some(token.clone());
        self.state.expires = Some(access.token.expires);
        self.state.tenant_id = tenant_id.filter(|s| !s.is_empty());
        self.state.tenant_name = tenant_name.filter(|s| !s.is_empty());
        self.state.token_details = Some(access.token);
        self.state.service_catalog = access.service_catalog;
        self.state.user = access.user;

        Ok(token)
    }

    /// Request a token for typed credentials and scope
    pub async fn authenticate_with(
        &mut self,
        credentials: &Credentials,
        scope: &Scope,
    ) -> Result<String> {
        self.authenticate(credentials.to_auth(scope)).await
    }

    /// Authenticate with a username and password
    ///
    /// At most one of `tenant_id` / `tenant_name` should be given; if both
    /// are, the id is used. A rejected login is an
    /// `Error::AuthenticationFailure`.
    pub async fn authenticate_as_user(
        &mut self,
        username: &str,
        password: &str,
        tenant_id: Option<&str>,
        tenant_name: Option<&str>,
    ) -> Result<String> {
        let scope = Scope::from_parts(tenant_id, tenant_name);
        self.authenticate_with(&Credentials::password(username, password), &scope)
            .await
            .map_err(|e| rejected_login(e, "invalid username or password"))
    }

    /// Authenticate with an API access key pair
    pub async fn authenticate_as_account(
        &mut self,
        access_key: &str,
        secret_key: &str,
        tenant_id: Option<&str>,
        tenant_name: Option<&str>,
    ) -> Result<String> {
        let scope = Scope::from_parts(tenant_id, tenant_name);
        self.authenticate_with(&Credentials::access_key(access_key, secret_key), &scope)
            .await
            .map_err(|e| rejected_login(e, "invalid access key"))
    }

    /// Trade the current token for one scoped to `tenant_id`
    ///
    /// An empty id requests an unscoped token.
    pub async fn rescope_using_tenant_id(&mut self, tenant_id: &str) -> Result<String> {
        let scope = Scope::from_parts(Some(tenant_id), None);
        self.rescope(scope).await
    }

    /// Trade the current token for one scoped to `tenant_name`
    ///
    /// An empty name requests an unscoped token.
    pub async fn rescope_using_tenant_name(&mut self, tenant_name: &str) -> Result<String> {
        let scope = Scope::from_parts(None, Some(tenant_name));
        self.rescope(scope).await
    }

    async fn rescope(&mut self, scope: Scope) -> Result<String> {
        let token = self
            .state
            .token
            .clone()
            .ok_or_else(|| Error::authentication("no token to rescope; authenticate first"))?;
        debug!(?scope, "rescoping token");
        self.authenticate_with(&Credentials::token(token), &scope).await
    }

    /// Current token, possibly expired
    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    /// Expiry of the current token
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.state.expires
    }

    /// Check whether a fresh token is needed; true if never authenticated
    pub fn is_expired(&self) -> bool {
        match (&self.state.token, self.state.expires) {
            (Some(_), Some(expires)) => Utc::now() >= expires,
            _ => true,
        }
    }

    /// Cached catalog, optionally limited to one service type
    pub fn service_catalog(&self, service_type: Option<&str>) -> Vec<&CatalogEntry> {
        self.state
            .service_catalog
            .iter()
            .filter(|entry| service_type.map_or(true, |t| entry.service_type == t))
            .collect()
    }

    /// Public URL of the first `service_type` endpoint in `region`
    pub fn public_url(&self, service_type: &str, region: Option<&str>) -> Result<Url> {
        self.service_catalog(Some(service_type))
            .into_iter()
            .flat_map(|entry| entry.endpoints_in(region))
            .find_map(|endpoint| endpoint.public_url.as_deref())
            .ok_or_else(|| {
                Error::Config(format!(
                    "no '{service_type}' endpoint{} in the service catalog",
                    region.map(|r| format!(" in region '{r}'")).unwrap_or_default()
                ))
            })?
            .parse()
    }

    /// Tenant id of the current token; `None` when unscoped
    pub fn tenant_id(&self) -> Option<&str> {
        self.current_tenant().map(|t| t.id.as_str())
    }

    /// Tenant name of the current token; `None` when unscoped
    pub fn tenant_name(&self) -> Option<&str> {
        self.current_tenant().map(|t| t.name.as_str())
    }

    fn current_tenant(&self) -> Option<&Tenant> {
        self.state.token_details.as_ref()?.tenant.as_ref()
    }

    /// Scope the current token was requested for
    pub fn scope(&self) -> Scope {
        match (&self.state.tenant_id, &self.state.tenant_name) {
            (Some(id), _) => Scope::TenantId(id.clone()),
            (None, Some(name)) => Scope::TenantName(name.clone()),
            (None, None) => Scope::Unscoped,
        }
    }

    /// Decoded token details from the last authentication
    pub fn token_details(&self) -> Option<&TokenDetails> {
        self.state.token_details.as_ref()
    }

    /// User descriptor from the last authentication
    pub fn user(&self) -> Option<&Value> {
        self.state.user.as_ref()
    }

    /// Tenants available to `token`, or to the current token
    ///
    /// Does not change the service's state.
    #[instrument(skip(self, token), fields(endpoint = %self.state.endpoint))]
    pub async fn tenants(&self, token: Option<&str>) -> Result<Vec<Tenant>> {
        let token = token
            .or(self.state.token.as_deref())
            .ok_or_else(|| Error::authentication("no token to list tenants with"))?;

        let options = RequestOptions::new()
            .header(AUTH_TOKEN_HEADER, token)
            .header("Accept", "application/json");
        let request = self.client.create_request(
            Method::Get,
            self.state.endpoint.join_path("tenants"),
            None,
            &options,
        )?;
        let response = self.client.send_checked(&request).await?;
        let list: TenantList = response.json_as()?;
        debug!(count = list.tenants.len(), "listed tenants");
        Ok(list.tenants)
    }
}

impl std::fmt::Debug for IdentityService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityService")
            .field("endpoint", &self.state.endpoint.without_credentials().to_string())
            .field("token", &self.state.token.as_ref().map(|_| "<redacted>"))
            .field("expires", &self.state.expires)
            .field("tenant_id", &self.tenant_id())
            .field("services", &self.state.service_catalog.len())
            .finish()
    }
}

fn parse_access(body: &Value) -> Result<Access> {
    let access = body
        .get("access")
        .ok_or_else(|| Error::authentication("token response has no 'access' object"))?;
    Access::deserialize(access)
        .map_err(|e| Error::authentication(format!("token response is missing token fields: {e}")))
}

pub(crate) fn rejected_login(err: Error, message: &str) -> Error {
    match err {
        Error::Request(source) if source.kind() == ErrorKind::Unauthorized => {
            Error::AuthenticationFailure {
                message: message.to_string(),
                source: Some(Box::new(source)),
            }
        }
        other => other,
    }
}
