//! Command-line arguments

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use stratus_client::{Config, Result};

#[derive(Parser, Debug)]
#[command(name = "stratus")]
#[command(about = "Command-line client for Stratus cloud services")]
#[command(version)]
pub struct Cli {
    /// Identity endpoint URL
    #[arg(short, long, env = "STRATUS_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Username
    #[arg(short, long, env = "STRATUS_USERNAME")]
    pub username: Option<String>,

    /// Password
    #[arg(long, env = "STRATUS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Access key (instead of username and password)
    #[arg(long, env = "STRATUS_ACCESSKEY")]
    pub access_key: Option<String>,

    /// Secret key
    #[arg(long, env = "STRATUS_SECRETKEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Tenant id to scope the token to
    #[arg(long, env = "STRATUS_TENANTID")]
    pub tenant_id: Option<String>,

    /// Tenant name to scope the token to
    #[arg(long, env = "STRATUS_TENANTNAME")]
    pub tenant_name: Option<String>,

    /// Region for service endpoints
    #[arg(long, env = "STRATUS_REGION")]
    pub region: Option<String>,

    /// Transport backend
    #[arg(long, env = "STRATUS_TRANSPORT")]
    pub transport: Option<String>,

    /// Request timeout in seconds (0 disables it)
    #[arg(long, env = "STRATUS_TRANSPORT_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Proxy URL
    #[arg(long, env = "STRATUS_TRANSPORT_PROXY")]
    pub proxy: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,

    /// File to keep the identity session in between runs
    #[arg(long, env = "STRATUS_SESSION")]
    pub session: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "STRATUS_DEBUG")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the current token and its expiry
    Token,
    /// Print the service catalog as JSON
    Catalog {
        /// Only show services of this type
        #[arg(long = "type")]
        service_type: Option<String>,
    },
    /// List tenants available to the token
    Tenants,
    /// Exchange the token for one with a different scope
    Rescope(RescopeTarget),
    /// List object-storage containers
    Containers,
    /// List objects in a container
    Objects {
        /// Container name
        container: String,
        /// Only list names with this prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Maximum number of objects
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct RescopeTarget {
    /// Scope to this tenant id
    #[arg(long)]
    pub tenant_id: Option<String>,
    /// Scope to this tenant name
    #[arg(long)]
    pub tenant_name: Option<String>,
    /// Drop the tenant scope
    #[arg(long)]
    pub unscope: bool,
}

impl Cli {
    /// Client configuration from the flags given
    pub fn config(&self) -> Result<Config> {
        let mut pairs: Vec<(&str, String)> = [
            ("endpoint", &self.endpoint),
            ("username", &self.username),
            ("password", &self.password),
            ("accesskey", &self.access_key),
            ("secretkey", &self.secret_key),
            ("tenantid", &self.tenant_id),
            ("tenantname", &self.tenant_name),
            ("region", &self.region),
            ("transport", &self.transport),
            ("transport.proxy", &self.proxy),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect();

        if let Some(timeout) = self.timeout {
            pairs.push(("transport.timeout", timeout.to_string()));
        }
        if self.insecure {
            pairs.push(("transport.ssl_verify", "false".to_string()));
        }
        if self.debug {
            pairs.push(("transport.debug", "true".to_string()));
        }

        Config::from_pairs(pairs)
    }
}
