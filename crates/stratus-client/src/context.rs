//! Application-owned context tying configuration, transport and identity together

use crate::client::TransportClient;
use crate::config::Config;
use crate::identity::{rejected_login, IdentityService, IdentitySnapshot};
use crate::object_storage::ObjectStorage;
use crate::transport::TransportRegistry;
use std::sync::Arc;
use stratus_core::{Error, Result, Url};
use tracing::{debug, info};

/// Owns the transport client and a lazily authenticated identity service
///
/// Create one per application (or per set of credentials) and pass it to
/// whatever needs service clients.
#[derive(Debug)]
pub struct Context {
    config: Config,
    client: Arc<TransportClient>,
    identity: Option<IdentityService>,
}

impl Context {
    /// Build a context using the built-in transport backends
    pub fn new(config: Config) -> Result<Self> {
        Self::with_registry(config, &TransportRegistry::with_builtin())
    }

    /// Build a context, resolving the transport through `registry`
    pub fn with_registry(config: Config, registry: &TransportRegistry) -> Result<Self> {
        let transport = registry.create(&config.transport, &config.transport_options)?;
        let client = TransportClient::with_options(transport, config.transport_options.clone())?;
        client.set_default_header("User-Agent", &config.user_agent)?;
        debug!(transport = client.transport_name(), "context created");
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Build a context around an existing client
    pub fn with_client(config: Config, client: Arc<TransportClient>) -> Self {
        Self {
            config,
            client,
            identity: None,
        }
    }

    /// Configuration this context was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared transport client
    pub fn client(&self) -> &Arc<TransportClient> {
        &self.client
    }

    /// Identity service with a valid token, authenticating on first use or
    /// when the current token has expired
    ///
    /// The first login uses the configured tenant. Later logins keep the
    /// scope of the token being replaced, so a rescoped (or restored)
    /// identity stays in its tenant.
    pub async fn identity(&mut self) -> Result<&mut IdentityService> {
        let identity = match self.identity.take() {
            Some(identity) => identity,
            None => IdentityService::new(self.identity_endpoint()?, Arc::clone(&self.client)),
        };
        let identity = self.identity.insert(identity);

        if identity.is_expired() {
            let credentials = self.config.credentials()?;
            let scope = match identity.token() {
                Some(_) => identity.scope(),
                None => self.config.scope(),
            };
            info!(
                endpoint = %identity.endpoint().without_credentials(),
                ?scope,
                "requesting identity token"
            );
            identity
                .authenticate_with(&credentials, &scope)
                .await
                .map_err(|e| rejected_login(e, "configured credentials were rejected"))?;
        }
        Ok(identity)
    }

    /// Replace the identity state with a snapshot (no network I/O)
    pub fn restore_identity(&mut self, snapshot: IdentitySnapshot) {
        self.identity = Some(IdentityService::from_snapshot(snapshot, Arc::clone(&self.client)));
    }

    /// Snapshot of the identity state, if any
    pub fn identity_snapshot(&self) -> Option<IdentitySnapshot> {
        self.identity.as_ref().map(IdentityService::to_snapshot)
    }

    /// Object-storage client for the configured region
    pub async fn object_storage(&mut self) -> Result<ObjectStorage> {
        let region = self.config.region.clone();
        let identity = self.identity().await?;
        ObjectStorage::from_identity(identity, region.as_deref())
    }

    fn identity_endpoint(&self) -> Result<Url> {
        self.config
            .endpoint
            .parse()
            .map_err(|e| {
                Error::Config(format!(
                    "invalid identity endpoint '{}': {e}",
                    self.config.endpoint
                ))
            })
    }
}
