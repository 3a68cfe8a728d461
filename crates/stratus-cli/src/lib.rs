//! # Stratus CLI
//!
//! A thin command-line front end over `stratus-client`: authenticate, inspect
//! the token and service catalog, rescope, and browse object storage.
//!
//! A `--session` file keeps the identity snapshot between runs, so repeated
//! invocations reuse a valid token instead of authenticating again.

pub mod args;
pub mod commands;
pub mod session;

pub use args::{Cli, Command, RescopeTarget};
pub use commands::{execute, run, run_with_context};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the log subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("stratus_cli={level},stratus_client={level},stratus_core={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
