//! # Policy Table Dump
//!
//! Builds the restricted-administration registry exactly as a host would at
//! startup and prints it as JSON. A catalog/table mismatch fails the build
//! with `UnknownOperation` and a non-zero exit code, which makes the tool
//! usable as a pre-deployment check.
//!
//! ## Configuration
//!
//! - `RUST_LOG` - Log level (default: info)

use admingate_authz::default_registry;
use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("admingate policy-table v{}", admingate_authz::VERSION);

    let registry = default_registry().context("failed to build the policy registry")?;
    let table = serde_json::to_string_pretty(&registry.snapshot())?;
    println!("{}", table);

    Ok(())
}
