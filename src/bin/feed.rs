use std::{
    error::Error,
    path::PathBuf,
    process::exit,
    sync::{Arc, Mutex},
};

use clap::{Parser, ValueEnum};
use rusqlite::Connection;

use tally_feed::{
    AccountId, Calendar, Direction, FeedConfig, LoadOutcome, LocalZone, SqliteTransactionService,
    TransactionList, TransactionQuery, setup_logging,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DirectionArg {
    Incoming,
    Outgoing,
}

impl From<DirectionArg> for Direction {
    fn from(direction: DirectionArg) -> Self {
        match direction {
            DirectionArg::Incoming => Direction::Incoming,
            DirectionArg::Outgoing => Direction::Outgoing,
        }
    }
}

/// Load every page of a transaction feed and print it grouped by day.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database.
    #[arg(long)]
    db_path: PathBuf,

    /// The IANA timezone used to group transactions into days, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// The number of transactions to fetch per page.
    #[arg(long, default_value_t = FeedConfig::default().page_size)]
    page_size: u32,

    /// Only show transactions whose description or merchant contains this text.
    #[arg(long)]
    search: Option<String>,

    /// Only show transactions for this account.
    #[arg(long)]
    account: Option<AccountId>,

    /// Only show incoming or outgoing transactions.
    #[arg(long, value_enum)]
    direction: Option<DirectionArg>,

    /// Print the day groups as JSON instead of HTML.
    #[arg(long)]
    json: bool,

    /// Also write debug logs to this file.
    #[arg(long)]
    debug_log: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    setup_logging(args.debug_log.as_deref())?;

    if !args.db_path.is_file() {
        eprintln!("No database found at {:#?}", args.db_path);
        exit(1);
    }

    let zone = LocalZone::from_name(&args.timezone)?;
    let connection = Connection::open(&args.db_path)?;
    let service = SqliteTransactionService::new(Arc::new(Mutex::new(connection)))?;

    let mut query = TransactionQuery::default();
    if let Some(search) = &args.search {
        query = query.search(search);
    }
    if let Some(account_id) = args.account {
        query = query.account(account_id);
    }
    if let Some(direction) = args.direction {
        query = query.direction(direction.into());
    }

    let config = FeedConfig::default().with_page_size(args.page_size);
    let (list, _requests) =
        TransactionList::new(Arc::new(service), query, Calendar::now(zone), config);

    let mut pages = 0;
    while list.load_more().await? == LoadOutcome::Loaded {
        pages += 1;
    }

    let view = list.view();
    tracing::info!("Loaded {} transactions in {pages} pages", view.items.len());

    if args.json {
        let groups = list.day_groups(&view);
        println!("{}", serde_json::to_string_pretty(&groups)?);
    } else {
        println!("{}", list.render().into_string());
    }

    Ok(())
}
