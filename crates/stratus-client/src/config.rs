//! Client configuration

use crate::identity::{Credentials, Scope};
use crate::transport::{TransportOption, TransportOptions};
use serde::{Deserialize, Serialize};
use stratus_core::{Error, Result};

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "STRATUS_";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "transport",
    "transport.timeout",
    "transport.ssl_verify",
    "transport.debug",
    "transport.proxy",
    "username",
    "password",
    "tenantid",
    "tenantname",
    "endpoint",
    "accesskey",
    "secretkey",
    "region",
];

/// Client configuration
///
/// Built explicitly by the application and handed to a
/// [`Context`](crate::Context); nothing is read from global state.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Identity endpoint URL
    pub endpoint: String,
    /// Username for password authentication
    pub username: Option<String>,
    /// Password for password authentication
    pub password: Option<String>,
    /// Tenant id to scope tokens to
    pub tenant_id: Option<String>,
    /// Tenant name to scope tokens to
    pub tenant_name: Option<String>,
    /// Access key for key-pair authentication
    pub access_key: Option<String>,
    /// Secret key for key-pair authentication
    pub secret_key: Option<String>,
    /// Region used for catalog lookups
    pub region: Option<String>,
    /// Name of the transport backend
    pub transport: String,
    /// Transport options
    pub transport_options: TransportOptions,
    /// User agent string
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000/v2.0".to_string(),
            username: None,
            password: None,
            tenant_id: None,
            tenant_name: None,
            access_key: None,
            secret_key: None,
            region: None,
            transport: "default".to_string(),
            transport_options: TransportOptions::default(),
            user_agent: stratus_core::USER_AGENT.to_string(),
        }
    }
}

impl Config {
    /// Create a new config with the given identity endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set username and password
    pub fn with_user(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set an access key pair
    pub fn with_access_key(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Scope tokens to a tenant id
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Scope tokens to a tenant name
    pub fn with_tenant_name(mut self, tenant_name: impl Into<String>) -> Self {
        self.tenant_name = Some(tenant_name.into());
        self
    }

    /// Set the catalog region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Select a transport backend by name
    pub fn with_transport(mut self, name: impl Into<String>) -> Self {
        self.transport = name.into();
        self
    }

    /// Set one transport option
    pub fn with_transport_option(mut self, option: TransportOption) -> Self {
        self.transport_options.apply(option);
        self
    }

    /// Set one value by its configuration key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let key = key.trim().to_ascii_lowercase();
        let owned = || Some(value.to_string()).filter(|v| !v.is_empty());

        match key.as_str() {
            "transport" => self.transport = value.trim().to_string(),
            k if k.starts_with("transport.") => {
                self.transport_options.apply(TransportOption::parse(k, value)?)
            }
            "endpoint" => self.endpoint = value.trim().to_string(),
            "username" => self.username = owned(),
            "password" => self.password = owned(),
            "tenantid" => self.tenant_id = owned(),
            "tenantname" => self.tenant_name = owned(),
            "accesskey" => self.access_key = owned(),
            "secretkey" => self.secret_key = owned(),
            "region" => self.region = owned(),
            other => {
                return Err(Error::Config(format!(
                    "unknown configuration key '{other}' (expected one of: {})",
                    CONFIG_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }

    /// Build a config from key/value pairs on top of the defaults
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            config.set(key.as_ref(), value.as_ref())?;
        }
        Ok(config)
    }

    /// Build a config from `STRATUS_*` environment variables
    ///
    /// `transport.timeout` is read from `STRATUS_TRANSPORT_TIMEOUT`, and so on.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|name| std::env::var(name).ok())
    }

    /// Like [`Config::from_env`], reading variables through `lookup`
    pub fn from_env_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pairs = CONFIG_KEYS.iter().filter_map(|key| {
            let var = format!("{ENV_PREFIX}{}", key.replace('.', "_").to_ascii_uppercase());
            lookup(&var).map(|value| (*key, value))
        });
        Self::from_pairs(pairs)
    }

    /// Credentials to authenticate with; a password wins over an access key
    pub fn credentials(&self) -> Result<Credentials> {
        match (&self.username, &self.password, &self.access_key, &self.secret_key) {
            (Some(user), Some(pass), _, _) => Ok(Credentials::password(user, pass)),
            (_, _, Some(key), Some(secret)) => Ok(Credentials::access_key(key, secret)),
            _ => Err(Error::Config(
                "no credentials configured: set username and password, or accesskey and secretkey"
                    .to_string(),
            )),
        }
    }

    /// Tenant scope to request
    pub fn scope(&self) -> Scope {
        Scope::from_parts(self.tenant_id.as_deref(), self.tenant_name.as_deref())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("tenant_id", &self.tenant_id)
            .field("tenant_name", &self.tenant_name)
            .field("access_key", &self.access_key)
            .field("secret_key", &redacted(&self.secret_key))
            .field("region", &self.region)
            .field("transport", &self.transport)
            .field("transport_options", &self.transport_options)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
