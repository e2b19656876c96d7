//! Seeds the database with random books using several concurrent workers.

use book_store::sql::{delete_all, BOOKS_TABLE};
use book_store::{BookRepository, Database, NewBook, Settings};
use chrono::{TimeZone, Utc};
use clap::Parser;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Fill the books table with random data")]
struct Args {
    /// Number of books to insert.
    #[arg(long, default_value_t = 100_000)]
    count: usize,
    /// Concurrent workers.
    #[arg(long, default_value_t = 7)]
    parallel: usize,
    /// Size of the author name pool; random in 1..=1000 when omitted.
    #[arg(long)]
    authors: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let settings = Settings::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("book_store=info")))
        .init();

    let db = Database::connect(&settings.database).await?;
    let result = fill(BookRepository::new(db.clone()), &args).await;
    db.stop().await;
    result?;
    tracing::info!("random data filled");
    Ok(())
}

async fn fill(repo: BookRepository, args: &Args) -> Result<(), book_store::AppError> {
    let wipe = delete_all(BOOKS_TABLE);
    let removed = repo.database().execute(&wipe.sql, &wipe.params).await?;
    tracing::info!(removed = removed.affected_rows, "existing books removed");

    let author_count = args
        .authors
        .unwrap_or_else(|| rand::thread_rng().gen_range(1..=1000))
        .max(1);
    let authors: Arc<Vec<String>> = Arc::new((0..author_count).map(|i| format!("Author name #{}", i)).collect());
    let next = Arc::new(AtomicUsize::new(0));
    let total = args.count;

    let mut workers = JoinSet::new();
    for _ in 0..args.parallel.max(1) {
        let repo = repo.clone();
        let authors = Arc::clone(&authors);
        let next = Arc::clone(&next);
        workers.spawn(async move {
            loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                if i >= total {
                    return Ok::<(), book_store::AppError>(());
                }
                repo.create(random_book(&authors)).await?;
                if (i + 1) % 100 == 0 {
                    tracing::info!(inserted = i + 1, "progress");
                }
            }
        });
    }

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(result) => result?,
            Err(e) => tracing::error!(error = %e, "worker panicked"),
        }
    }
    Ok(())
}

fn random_book(authors: &[String]) -> NewBook {
    let mut rng = rand::thread_rng();
    let author = authors[rng.gen_range(0..authors.len())].clone();
    let now = Utc::now().timestamp();
    let date = Utc
        .timestamp_opt(rng.gen_range(0..now), 0)
        .single()
        .unwrap_or_else(Utc::now);
    NewBook {
        title: format!("book title{}", rng.gen::<f64>()),
        author,
        description: format!("book description: {}", rng.gen::<f64>()),
        image: format!("book::/image.link/{}", rng.gen::<f64>()),
        date,
    }
}
