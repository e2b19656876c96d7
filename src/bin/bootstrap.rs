//! Creates the `authors` and `books` tables. Run once when provisioning.

use book_store::{BookRepository, Database, Settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("book_store=info")))
        .init();

    let db = Database::connect(&settings.database).await?;
    let result = BookRepository::new(db.clone()).create_table().await;
    db.stop().await;
    result?;
    tracing::info!("tables added");
    Ok(())
}
