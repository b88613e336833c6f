use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::sync::{Arc, Mutex};

use clap::Parser;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use tally_feed::{
    Amount, Direction, SqliteTransactionService, Timestamp, Transaction, TransactionService,
};

const MERCHANTS: [&str; 8] = [
    "Countdown",
    "New World",
    "Z Energy",
    "Mercury",
    "Spark",
    "Kmart",
    "The Coffee Club",
    "Uber",
];

/// A utility for creating a database of generated transactions to browse with the feed.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The number of transactions to generate.
    #[arg(long, short, default_value_t = 500)]
    count: u32,

    /// The number of accounts to spread transactions over.
    #[arg(long, default_value_t = 3)]
    accounts: i64,

    /// Seed for the generated amounts and times.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Create and populate a database for manual testing.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let connection = Connection::open(output_path)?;
    let service = SqliteTransactionService::new(Arc::new(Mutex::new(connection)))?;

    println!("Creating {} transactions...", args.count);

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut occurred_at = OffsetDateTime::now_utc();

    for _ in 0..args.count {
        occurred_at -= Duration::minutes(rng.gen_range(30..30 + 12 * 60));

        let (direction, units) = if rng.gen_ratio(1, 8) {
            (Direction::Incoming, rng.gen_range(200..3_200))
        } else {
            (Direction::Outgoing, rng.gen_range(1..251))
        };
        let nanos = rng.gen_range(0..100) * 10_000_000;
        let merchant = MERCHANTS[rng.gen_range(0..MERCHANTS.len())];

        let builder = Transaction::build(
            rng.gen_range(1..=args.accounts.max(1)),
            Timestamp::from(occurred_at),
            direction,
            Amount::new("NZD", units, nanos)?,
        )
        .merchant(Some(merchant))
        .description(Some(&format!("{merchant} purchase")))
        .category_id(Some(rng.gen_range(1..=6)));

        service.create(builder).await?;
    }

    println!("Success! The database has {} transactions.", service.count()?);

    Ok(())
}
