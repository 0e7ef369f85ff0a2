//! Schema maintenance for the ledger database.
//!
//! `migration [up [N]|down [N]|fresh|refresh|reset|status]`, against
//! `DATABASE_URL` (default: `./gsla.db`).

use sea_orm::Database;
use sea_orm_migration::prelude::*;

const USAGE: &str = "usage: migration [up [N]|down [N]|fresh|refresh|reset|status]";

fn steps(raw: Option<String>) -> Result<Option<u32>, Box<dyn std::error::Error + Send + Sync>> {
    match raw {
        None => Ok(None),
        Some(raw) => Ok(Some(raw.parse().map_err(|_| format!("invalid step count: {raw}"))?)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut args = std::env::args().skip(1);
    let cmd = args.next().unwrap_or_else(|| "up".to_string());
    let count = steps(args.next())?;

    let db_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:./gsla.db?mode=rwc".to_string());
    let db = Database::connect(&db_url).await?;

    match cmd.as_str() {
        "up" => migration::Migrator::up(&db, count).await?,
        // Without a count, roll back the latest migration only.
        "down" => migration::Migrator::down(&db, Some(count.unwrap_or(1))).await?,
        "fresh" => migration::Migrator::fresh(&db).await?,
        "refresh" => migration::Migrator::refresh(&db).await?,
        "reset" => migration::Migrator::reset(&db).await?,
        "status" => {
            migration::Migrator::status(&db).await?;
            let pending = migration::Migrator::get_pending_migrations(&db).await?;
            println!("{} pending migration(s)", pending.len());
        }
        other => return Err(format!("unknown command {other:?}\n{USAGE}").into()),
    }

    Ok(())
}
