//! Herald replay binary
//!
//! Replays a join scenario against in-memory invite tables and reports the
//! attribution of every join.
//!
//! Usage: `herald-replay <scenario.json>`

use herald_tracker::scenario::JoinResult;
use herald_tracker::{replay, Scenario, TrackerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald_replay=info,herald_tracker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: herald-replay <scenario.json>")?;

    let config = TrackerConfig::from_env()?;
    tracing::info!(
        "Replaying {} (refresh: {}, dispatch: {}, timeout: {:?})",
        path,
        config.refresh_mode,
        config.dispatch_mode,
        config.retrieval_timeout
    );

    let scenario = Scenario::load(&path)?;
    let report = replay(&scenario, config).await?;

    println!("Joins");
    println!("=====");
    for join in &report.joins {
        let outcome = match &join.result {
            JoinResult::Attributed { attribution } => format!("{:?}", attribution),
            JoinResult::Untracked => "untracked guild".to_string(),
            JoinResult::Failed { error } => format!("failed: {}", error),
        };
        println!("  guild {} | {} | {}", join.guild, join.member, outcome);
    }

    println!();
    println!("Grants");
    println!("======");
    for grant in &report.grants {
        println!("  guild {} | {} -> {} (invite {})", grant.guild, grant.member, grant.role, grant.code);
    }

    for (guild, error) in &report.failed_activations {
        println!("  activation of guild {} failed: {}", guild, error);
    }

    println!();
    println!(
        "{} joins: {} confident, {} ambiguous, {} unattributed, {} failed",
        report.joins.len(),
        report.confident(),
        report.ambiguous(),
        report.unattributed(),
        report.failed()
    );

    Ok(())
}
