// Load a JSON array of documents into a collection of the document store.
//
//   import <collection> <file.json>

use explorer_query_service::db::{Collection, DataSource, Filter, SqliteStore};
use serde_json::Value;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let mut args = std::env::args().skip(1);
    let (Some(collection), Some(path)) = (args.next(), args.next()) else {
        eprintln!("usage: import <collection> <file.json>");
        std::process::exit(2);
    };
    let collection: Collection = collection.parse()?;

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:data.db".to_string());
    println!("Opening document store at {}...", database_url);
    let store = SqliteStore::connect(&database_url).await?;
    println!("✅ Document store ready!");

    let raw = tokio::fs::read_to_string(&path).await?;
    let docs = match serde_json::from_str::<Value>(&raw)? {
        Value::Array(docs) => docs,
        doc @ Value::Object(_) => vec![doc],
        other => return Err(format!("expected a JSON array or object, got {}", other).into()),
    };

    println!("Importing {} documents into {}...", docs.len(), collection.table_name());
    store.insert(collection, &docs).await?;

    let count = store.count(collection, &Filter::All).await?;
    println!("✅ {} now holds {} documents", collection.table_name(), count);
    Ok(())
}
