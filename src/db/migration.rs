use sqlx::SqlitePool;
use tracing::info;

use super::Collection;

/// Indexed JSON fields per collection
const INDEXES: &[(Collection, &str)] = &[
    (Collection::Transactions, "hash"),
    (Collection::Transactions, "from"),
    (Collection::Transactions, "to"),
    (Collection::Transactions, "timestamp"),
    (Collection::Blocks, "number"),
    (Collection::Contracts, "address"),
    (Collection::Tokens, "address"),
    (Collection::Operations, "contract"),
    (Collection::Operations, "transactionHash"),
    (Collection::Operations, "timestamp"),
    (Collection::Balances, "address"),
    (Collection::Balances, "contract"),
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    for collection in Collection::ALL {
        let table = collection.table_name();
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc TEXT NOT NULL
            )",
            table
        ))
        .execute(pool)
        .await?;
    }

    // Expression indexes on the fields the query layer filters and sorts on
    for (collection, field) in INDEXES {
        let table = collection.table_name();
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}(json_extract(doc, '$.{}'))",
            table,
            field.to_lowercase(),
            table,
            field
        ))
        .execute(pool)
        .await?;
    }

    info!("Database migrations completed successfully");
    Ok(())
}
