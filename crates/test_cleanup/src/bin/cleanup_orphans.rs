//! Cleanup orphaned E2E test resources.
//!
//! This binary deletes resource groups and AAD apps that carry the test
//! prefix and are older than a specified age. It's designed to be run from a
//! scheduled pipeline or manually for maintenance.
//!
//! Usage:
//!   cleanup-orphans [--max-age-hours <hours>] [--prefix <prefix>]
//!                   [--skip-aad-apps] [--skip-resource-groups]
//!
//! Environment variables required: see `CleanupConfig::from_env`.

use anyhow::Result;
use clap::Parser;
use test_cleanup::{CleanupConfig, CleanupContext, CleanupReport};

#[derive(Parser, Debug)]
#[command(name = "cleanup-orphans")]
#[command(about = "Delete E2E test resources left behind by interrupted runs", long_about = None)]
struct Args {
    /// Only resources older than this are deleted
    #[arg(long, env = "CLEANUP_MAX_AGE_HOURS", default_value_t = 24)]
    max_age_hours: u32,

    /// Name prefix identifying test resources
    #[arg(long, default_value = test_utils::APP_NAME_PREFIX)]
    prefix: String,

    #[arg(long)]
    skip_aad_apps: bool,

    #[arg(long)]
    skip_resource_groups: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    test_cleanup::init_logging();
    let args = Args::parse();

    println!("🧹 TeamsFx E2E Orphan Cleanup");
    println!("=============================");
    println!();

    let config = CleanupConfig::from_env()?;

    println!("📋 Configuration:");
    println!("   Subscription: {}", config.subscription_id);
    println!("   M365 tenant: {}", config.m365_tenant_id);
    println!("   Prefix: {}", args.prefix);
    println!("   Max age: {} hours", args.max_age_hours);
    println!();

    let sweeper = CleanupContext::from_config(&config)
        .orphan_sweeper()
        .with_prefix(args.prefix.clone());
    let max_age = chrono::Duration::hours(i64::from(args.max_age_hours));

    let mut report = CleanupReport::default();
    if !args.skip_resource_groups {
        println!("🔍 Searching for orphaned resource groups...");
        report.merge(sweeper.sweep_resource_groups(max_age).await?);
    }
    if !args.skip_aad_apps {
        println!("🔍 Searching for orphaned AAD apps...");
        report.merge(sweeper.sweep_aad_apps(max_age).await?);
    }

    println!();
    println!("✅ Cleanup completed!");
    println!("   Deleted {} resources", report.succeeded.len());
    for name in &report.succeeded {
        println!("   - {}", name);
    }

    if !report.failed.is_empty() {
        println!();
        println!("⚠️  {} deletions failed:", report.failed.len());
        for (name, error) in &report.failed {
            println!("   - {}: {}", name, error);
        }
    }

    Ok(())
}
