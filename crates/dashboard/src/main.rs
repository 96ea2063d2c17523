// crates/dashboard/src/main.rs
//! `bbdash`: operator tooling around the dashboard core.
//!
//! Prints bucket indexes and catalog contents, validates the environment
//! configuration, and runs one reconciliation request read from stdin.

use std::io::Read;

use anyhow::{bail, Context, Result};
use bbdash_core::bucket::{duration_buckets, integer_buckets, Closed};
use bbdash_core::metrics::{format_thousands, seconds_to_human_readable};
use bbdash_core::{reconcile, DashboardConfig, FilterState, ReconciliationSnapshot, Trigger};
use bbdash_dashboard::catalog;
use chrono::TimeDelta;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bbdash", version, about = "Backbone data dashboard tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the configuration from the environment and print a redacted summary
    CheckConfig,
    /// Print the bucket index a distribution chart would use
    Buckets {
        #[command(subcommand)]
        kind: BucketKind,
    },
    /// Reconcile a `{trigger, snapshot}` request read from stdin
    Reconcile {
        /// Default toggle state when the request does not carry one
        #[arg(long)]
        hide_default: bool,
    },
    /// List pages and their charts
    Pages,
}

#[derive(Subcommand)]
enum BucketKind {
    /// Log-scaled integer buckets up to MAX
    Int {
        max: u64,
        /// Label the zero bucket "Unlimited"
        #[arg(long)]
        unlimited_zero: bool,
    },
    /// Calendar duration buckets up to SECS seconds
    Duration { secs: i64 },
}

#[derive(Serialize)]
struct BucketView {
    lo: i64,
    hi: i64,
    label: String,
}

#[derive(Serialize)]
struct BucketListing {
    max: String,
    closed: Closed,
    buckets: Vec<BucketView>,
}

#[derive(Deserialize)]
struct ReconcileRequest {
    trigger: Trigger,
    snapshot: ReconciliationSnapshot,
    #[serde(default)]
    hide_default: Option<bool>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn,bbdash=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::CheckConfig => check_config(),
        Command::Buckets { kind } => print_buckets(kind),
        Command::Reconcile { hide_default } => run_reconcile(hide_default),
        Command::Pages => print_json(catalog::pages()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{out}");
    Ok(())
}

fn check_config() -> Result<()> {
    let config = DashboardConfig::from_env().context("invalid dashboard configuration")?;
    let db = &config.database;
    println!("dashboard:        {}:{}", config.hostname, config.port);
    println!("database:         {}:{}/{}", db.hostname, db.port, db.database);
    println!("database user:    {} (password ***)", db.user);
    println!(
        "encrypt / trust:  {} / {}",
        db.target_encrypt_connection, db.trust_server_certificate
    );
    println!("hide test clients by default: {}", config.hide_test_clients_default);
    tracing::info!("Configuration is valid");
    Ok(())
}

fn print_buckets(kind: BucketKind) -> Result<()> {
    let listing = match kind {
        BucketKind::Int { max, unlimited_zero } => {
            let mut index = integer_buckets(max);
            if unlimited_zero {
                index = index.with_unlimited_zero();
            }
            let buckets = index
                .buckets()
                .iter()
                .map(|b| -> Result<BucketView> {
                    Ok(BucketView {
                        lo: i64::try_from(b.lo).context("bucket bound exceeds i64")?,
                        hi: i64::try_from(b.hi).context("bucket bound exceeds i64")?,
                        label: b.label.clone(),
                    })
                })
                .collect::<Result<_>>()?;
            BucketListing {
                max: format_thousands(max),
                closed: index.closed(),
                buckets,
            }
        }
        BucketKind::Duration { secs } => {
            if secs < 0 {
                bail!("duration maximum must not be negative, got {secs}");
            }
            let max = TimeDelta::try_seconds(secs).context("duration out of range")?;
            let index = duration_buckets(max);
            BucketListing {
                max: seconds_to_human_readable(secs.unsigned_abs()),
                closed: index.closed(),
                buckets: index
                    .buckets()
                    .iter()
                    .map(|b| BucketView {
                        lo: b.lo.num_seconds(),
                        hi: b.hi.num_seconds(),
                        label: b.label.clone(),
                    })
                    .collect(),
            }
        }
    };
    print_json(&listing)
}

fn run_reconcile(hide_default: bool) -> Result<()> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("reading request from stdin")?;
    let request: ReconcileRequest = serde_json::from_str(&input).context("parsing reconcile request")?;

    let snapshot = &request.snapshot;
    if snapshot.checked.len() != snapshot.rendered.len() {
        bail!(
            "snapshot has {} checkbox values but {} rendered flags",
            snapshot.checked.len(),
            snapshot.rendered.len()
        );
    }
    if request.trigger == Trigger::Toggle
        && snapshot.toggle == FilterState::Mixed
        && snapshot.rendered.iter().any(|r| *r)
    {
        bail!("a toggle trigger needs a concrete toggle state (hide or show)");
    }

    let patch = reconcile(
        &request.trigger,
        snapshot,
        request.hide_default.unwrap_or(hide_default),
    );
    print_json(&patch)
}
