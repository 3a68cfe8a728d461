//! Basic usage example for the Stratus SDK
//!
//! This example demonstrates:
//! - Loading configuration from `STRATUS_*` environment variables
//! - Authenticating and inspecting the service catalog
//! - Creating a container and uploading, listing and downloading objects
//!
//! Run with: STRATUS_ENDPOINT=... STRATUS_USERNAME=... STRATUS_PASSWORD=... \
//!           cargo run --example basic_usage

use bytes::Bytes;
use stratus_client::{Config, Context, ListObjectsOptions, ObjectMetadata};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    println!("Stratus SDK - Basic Usage Example\n");

    let config = Config::from_env()?;
    println!("Identity endpoint: {}", config.endpoint);
    let mut ctx = Context::new(config)?;

    // ==================== Identity ====================

    let identity = ctx.identity().await?;
    println!("Authenticated; token expires at {:?}", identity.expires());
    println!("Tenant: {}", identity.tenant_name().unwrap_or("(unscoped)"));

    println!("\nService catalog:");
    for entry in identity.service_catalog(None) {
        let url = entry
            .endpoints
            .first()
            .and_then(|e| e.public_url.as_deref())
            .unwrap_or("-");
        println!("   - {:<16} {:<12} {}", entry.service_type, entry.name, url);
    }

    // ==================== Object Storage ====================

    let storage = ctx.object_storage().await?;

    println!("\nCreating container 'stratus-demo'...");
    storage.create_container("stratus-demo").await?;

    let metadata = ObjectMetadata::new()
        .with_content_type("text/plain")
        .with_metadata("Origin", "basic_usage");
    let etag = storage
        .save_object(
            "stratus-demo",
            "hello.txt",
            Bytes::from_static(b"Hello from Stratus!"),
            Some(&metadata),
        )
        .await?;
    println!("Uploaded 'hello.txt' (ETag {etag})");

    let listing = storage
        .objects("stratus-demo", &ListObjectsOptions::new())
        .await?;
    for object in &listing.objects {
        println!("   - {} ({} bytes)", object.name, object.bytes);
    }

    let object = storage.object("stratus-demo", "hello.txt").await?;
    println!("Downloaded: {}", String::from_utf8_lossy(&object.data));

    println!("\nCleaning up...");
    storage.delete_object("stratus-demo", "hello.txt").await?;
    storage.delete_container("stratus-demo").await?;

    // A snapshot can be stored and restored later without logging in again
    if let Some(snapshot) = ctx.identity_snapshot() {
        println!("\nSession snapshot:\n{}", serde_json::to_string_pretty(&snapshot)?);
    }

    Ok(())
}
