//! Settle every expired active bet for one wallet.
//!
//! Usage:
//!
//! ```sh
//! cargo run --example settle_due_bets -- <wallet-address> [database-url]
//! ```

use database::Database;
use settlement::{BetStatus, SettlementError, SettlementService, SqliteStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let wallet = args.next().ok_or("usage: settle_due_bets <wallet-address> [database-url]")?;
    let url = args
        .next()
        .unwrap_or_else(|| "sqlite:habitstake.db?mode=rwc".to_string());

    let db = Database::connect(&url).await?;
    db.migrate().await?;

    let service = SettlementService::with_defaults(SqliteStore::new(db));

    let active = service.list_bets(&wallet, Some(BetStatus::Active)).await?;
    println!("{} active bet(s) for {}", active.len(), wallet);

    for bet in active {
        match service.resolve_bet(&bet.id, &wallet, None).await {
            Ok(resolution) => {
                println!(
                    "settled {} as {}: {} (payout {}, rake {}, {} points)",
                    resolution.bet_id,
                    resolution.outcome,
                    resolution.reason,
                    resolution.user_payout,
                    resolution.platform_rake,
                    resolution.points_awarded,
                );
            }
            Err(SettlementError::TooEarly { end_date }) => {
                println!("skipping {}: runs until {}", bet.id, end_date);
            }
            Err(err) => {
                eprintln!("failed to settle {}: {}", bet.id, err);
            }
        }
    }

    Ok(())
}
