//! Token rescoping example
//!
//! Authenticates without a tenant, lists the tenants the user can reach,
//! rescopes into each one using only the token, then drops the scope again.
//!
//! Run with: cargo run --example rescope -- <endpoint> <username> <password>

use std::sync::Arc;
use stratus_client::{IdentityService, TransportClient, TransportOptions, TransportRegistry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(endpoint), Some(username), Some(password)) = (args.next(), args.next(), args.next())
    else {
        anyhow::bail!("usage: rescope <endpoint> <username> <password>");
    };

    let options = TransportOptions::default();
    let transport = TransportRegistry::with_builtin().create("default", &options)?;
    let client = Arc::new(TransportClient::with_options(transport, options)?);
    let mut identity = IdentityService::new(endpoint.parse()?, client);

    identity
        .authenticate_as_user(&username, &password, None, None)
        .await?;
    println!("Unscoped token; tenant = {:?}", identity.tenant_id());

    for tenant in identity.tenants(None).await? {
        identity.rescope_using_tenant_id(&tenant.id).await?;
        println!(
            "Rescoped to {} ({}): {} services in catalog",
            tenant.name,
            tenant.id,
            identity.service_catalog(None).len()
        );
    }

    identity.rescope_using_tenant_id("").await?;
    println!("Back to unscoped; tenant = {:?}", identity.tenant_id());

    Ok(())
}
