use clap::Parser;
use miette::{IntoDiagnostic, Result};
use pledge_engine::application::service::TransactionService;
use pledge_engine::config::Config;
use pledge_engine::domain::campaign::Campaign;
use pledge_engine::domain::ports::{CampaignLedger, CampaignLedgerBox, TransactionStoreBox};
use pledge_engine::domain::user::User;
use pledge_engine::domain::{CampaignId, UserId};
use pledge_engine::infrastructure::gateway::StaticCheckoutGateway;
use pledge_engine::infrastructure::in_memory::{InMemoryCampaignLedger, InMemoryTransactionStore};
use pledge_engine::interfaces::csv::event_reader::{Event, EventReader};
use pledge_engine::interfaces::csv::report_writer::ReportWriter;
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input events CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Also print each campaign's transactions.
    #[arg(long)]
    transactions: bool,

    #[command(flatten)]
    config: Config,
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Storage handles. `ledger` shares state with `campaigns` and stays with
/// the driver for seeding and reporting.
struct Stores {
    transactions: TransactionStoreBox,
    campaigns: CampaignLedgerBox,
    ledger: CampaignLedgerBox,
}

fn in_memory_stores() -> Stores {
    let ledger = InMemoryCampaignLedger::new();
    Stores {
        transactions: Box::new(InMemoryTransactionStore::new()),
        campaigns: Box::new(ledger.clone()),
        ledger: Box::new(ledger),
    }
}

#[cfg(feature = "storage-rocksdb")]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    use pledge_engine::infrastructure::rocksdb::RocksDBStore;

    match db_path {
        Some(path) => {
            let store = RocksDBStore::open(path).into_diagnostic()?;
            Ok(Stores {
                transactions: Box::new(store.clone()),
                campaigns: Box::new(store.clone()),
                ledger: Box::new(store),
            })
        }
        None => Ok(in_memory_stores()),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_stores(db_path: Option<PathBuf>) -> Result<Stores> {
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }
    Ok(in_memory_stores())
}

/// Registers a campaign unless the ledger already knows it.
async fn open_campaign(
    ledger: &dyn CampaignLedger,
    campaign_id: CampaignId,
    owner_id: UserId,
) -> pledge_engine::error::Result<()> {
    if ledger.find_by_id(campaign_id).await?.is_none() {
        ledger.update(Campaign::new(campaign_id, owner_id)).await?;
        info!(campaign_id, owner_id, "campaign registered");
    }
    Ok(())
}

fn user(id: UserId) -> User {
    User::new(id, format!("user-{id}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.config);

    let Stores {
        transactions,
        campaigns,
        ledger,
    } = open_stores(cli.db_path)?;

    let gateway = StaticCheckoutGateway::new(cli.config.checkout_url.clone()).into_diagnostic()?;
    let service =
        TransactionService::with_config(transactions, campaigns, Box::new(gateway), &cli.config);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    let mut touched = BTreeSet::new();

    for event in reader.events() {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                error!("Error reading event: {}", e);
                continue;
            }
        };

        let outcome = match event {
            Event::Campaign {
                campaign_id,
                owner_id,
            } => {
                touched.insert(campaign_id);
                open_campaign(ledger.as_ref(), campaign_id, owner_id).await
            }
            Event::Pledge {
                campaign_id,
                user_id,
                amount,
            } => {
                touched.insert(campaign_id);
                service
                    .create_transaction(campaign_id, &user(user_id), amount)
                    .await
                    .map(|_| ())
            }
            Event::Notification(notification) => service
                .process_notification(notification)
                .await
                .map(|tx| {
                    touched.insert(tx.campaign_id);
                }),
        };

        if let Err(e) = outcome {
            error!("Error processing event: {}", e);
        }
    }

    let mut campaigns = Vec::new();
    for campaign_id in touched {
        if let Some(campaign) = ledger.find_by_id(campaign_id).await.into_diagnostic()? {
            campaigns.push(campaign);
        }
    }

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock());
    writer.write_campaigns(campaigns.clone()).into_diagnostic()?;

    if cli.transactions {
        let mut listed = Vec::new();
        for campaign in &campaigns {
            let owner = user(campaign.owner_id);
            listed.extend(
                service
                    .list_by_campaign(campaign.id, &owner)
                    .await
                    .into_diagnostic()?,
            );
        }
        writer.write_transactions(&listed).into_diagnostic()?;
    }

    Ok(())
}
