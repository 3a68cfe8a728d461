//! Subcommand execution

use crate::args::{Cli, Command, RescopeTarget};
use crate::session;
use std::fmt::Write as _;
use std::path::Path;
use stratus_client::{Context, ListObjectsOptions, Url};
use tracing::{info, warn};

/// Run the parsed command line and return what should be printed
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let mut ctx = Context::new(cli.config()?)?;
    run_with_context(&mut ctx, &cli.command, cli.session.as_deref()).await
}

/// Run `command` against `ctx`, restoring and saving the session file if given
pub async fn run_with_context(
    ctx: &mut Context,
    command: &Command,
    session_path: Option<&Path>,
) -> anyhow::Result<String> {
    if let Some(path) = session_path {
        restore_session(ctx, path)?;
    }

    let output = execute(ctx, command).await?;

    if let Some(path) = session_path {
        if let Some(snapshot) = ctx.identity_snapshot() {
            session::save(path, &snapshot)?;
        }
    }
    Ok(output)
}

fn restore_session(ctx: &mut Context, path: &Path) -> anyhow::Result<()> {
    let Some(snapshot) = session::load(path)? else {
        return Ok(());
    };

    let endpoint: Option<Url> = ctx.config().endpoint.parse().ok();
    if endpoint.as_ref() == Some(&snapshot.endpoint) {
        ctx.restore_identity(snapshot);
    } else {
        warn!(
            saved = %snapshot.endpoint,
            configured = %ctx.config().endpoint,
            "session belongs to another endpoint; ignoring it"
        );
    }
    Ok(())
}

/// Execute a single subcommand
pub async fn execute(ctx: &mut Context, command: &Command) -> anyhow::Result<String> {
    let mut out = String::new();

    match command {
        Command::Token => {
            let identity = ctx.identity().await?;
            writeln!(out, "token:   {}", identity.token().unwrap_or_default())?;
            if let Some(expires) = identity.expires() {
                writeln!(out, "expires: {}", expires.to_rfc3339())?;
            }
            writeln!(out, "tenant:  {}", identity.tenant_name().unwrap_or("(unscoped)"))?;
        }
        Command::Catalog { service_type } => {
            let identity = ctx.identity().await?;
            let catalog = identity.service_catalog(service_type.as_deref());
            writeln!(out, "{}", serde_json::to_string_pretty(&catalog)?)?;
        }
        Command::Tenants => {
            let identity = ctx.identity().await?;
            for tenant in identity.tenants(None).await? {
                writeln!(out, "{}\t{}", tenant.id, tenant.name)?;
            }
        }
        Command::Rescope(target) => {
            let identity = ctx.identity().await?;
            let token = match target {
                RescopeTarget {
                    tenant_id: Some(id),
                    ..
                } => identity.rescope_using_tenant_id(id).await?,
                RescopeTarget {
                    tenant_name: Some(name),
                    ..
                } => identity.rescope_using_tenant_name(name).await?,
                _ => identity.rescope_using_tenant_id("").await?,
            };
            info!(tenant = identity.tenant_id().unwrap_or("-"), "rescoped");
            writeln!(out, "token:   {token}")?;
            writeln!(out, "tenant:  {}", identity.tenant_name().unwrap_or("(unscoped)"))?;
        }
        Command::Containers => {
            let storage = ctx.object_storage().await?;
            for container in storage.containers().await? {
                writeln!(out, "{}\t{}\t{}", container.name, container.count, container.bytes)?;
            }
        }
        Command::Objects {
            container,
            prefix,
            limit,
        } => {
            let storage = ctx.object_storage().await?;
            let options = ListObjectsOptions {
                prefix: prefix.clone(),
                limit: *limit,
                ..Default::default()
            };
            let listing = storage.objects(container, &options).await?;
            for object in &listing.objects {
                writeln!(out, "{}\t{}", object.name, object.bytes)?;
            }
        }
    }

    Ok(out)
}
