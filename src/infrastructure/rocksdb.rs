use crate::domain::campaign::{Campaign, Credit};
use crate::domain::ports::{CampaignLedger, TransactionStore};
use crate::domain::transaction::{Amount, NewTransaction, Transaction, TransactionStatus};
use crate::domain::{CampaignId, TransactionId, UserId};
use crate::error::{PledgeError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing transactions.
pub const CF_TRANSACTIONS: &str = "transactions";
/// Column Family for storing campaign funding state.
pub const CF_CAMPAIGNS: &str = "campaigns";
/// Column Family for counters and credit markers.
pub const CF_META: &str = "meta";

const LAST_TRANSACTION_ID: &[u8] = b"last_transaction_id";
const CREDITED_PREFIX: &[u8] = b"credited/";

fn credit_marker(transaction_id: TransactionId) -> Vec<u8> {
    [CREDITED_PREFIX, &transaction_id.to_be_bytes()[..]].concat()
}

/// A persistent store implementation using RocksDB.
///
/// Implements both [`TransactionStore`] and [`CampaignLedger`] on separate
/// Column Families. Read-modify-write operations (id allocation, updates,
/// status compare-and-set, campaign credit) are serialized through a single
/// writer lock, which makes them atomic with respect to each other.
///
/// A campaign credit commits the new totals, a per-transaction credit marker
/// and the transaction's `campaign_credited` flag in one `WriteBatch`.
///
/// `Clone` shares the underlying `Arc<DB>` and the writer lock.
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    writer: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_TRANSACTIONS, CF_CAMPAIGNS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            writer: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PledgeError::store(format!("{name} column family not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, family: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(family)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, family: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(family)?;
        self.db.put_cf(cf, key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan_transactions(&self, keep: impl Fn(&Transaction) -> bool) -> Result<Vec<Transaction>> {
        let cf = self.cf(CF_TRANSACTIONS)?;
        let mut transactions = Vec::new();
        // Keys are big-endian ids, so iteration is already in id order.
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let tx: Transaction = serde_json::from_slice(&value)?;
            if keep(&tx) {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    fn next_transaction_id(&self) -> Result<TransactionId> {
        let last: TransactionId = self
            .get_json(CF_META, LAST_TRANSACTION_ID)?
            .unwrap_or_default();
        let next = last + 1;
        self.put_json(CF_META, LAST_TRANSACTION_ID, &next)?;
        Ok(next)
    }
}

#[async_trait]
impl TransactionStore for RocksDBStore {
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>> {
        self.get_json(CF_TRANSACTIONS, &id.to_be_bytes())
    }

    async fn find_by_campaign_id(&self, campaign_id: CampaignId) -> Result<Vec<Transaction>> {
        self.scan_transactions(|tx| tx.campaign_id == campaign_id)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        self.scan_transactions(|tx| tx.user_id == user_id)
    }

    async fn save(&self, tx: NewTransaction) -> Result<Transaction> {
        let _writer = self.writer.lock().await;
        let id = self.next_transaction_id()?;
        let saved = Transaction::from_new(id, tx, Utc::now());
        self.put_json(CF_TRANSACTIONS, &id.to_be_bytes(), &saved)?;
        Ok(saved)
    }

    async fn update(&self, tx: Transaction) -> Result<Transaction> {
        let _writer = self.writer.lock().await;
        let key = tx.id.to_be_bytes();
        let mut stored: Transaction = self
            .get_json(CF_TRANSACTIONS, &key)?
            .ok_or_else(|| PledgeError::not_found("transaction", tx.id))?;
        stored.merge_mutable(tx, Utc::now());
        self.put_json(CF_TRANSACTIONS, &key, &stored)?;
        Ok(stored)
    }

    async fn transition_status(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<Option<Transaction>> {
        let _writer = self.writer.lock().await;
        let key = id.to_be_bytes();
        let mut stored: Transaction = self
            .get_json(CF_TRANSACTIONS, &key)?
            .ok_or_else(|| PledgeError::not_found("transaction", id))?;
        if stored.status != from {
            return Ok(None);
        }
        stored.status = to;
        stored.updated_at = Utc::now();
        self.put_json(CF_TRANSACTIONS, &key, &stored)?;
        Ok(Some(stored))
    }
}

#[async_trait]
impl CampaignLedger for RocksDBStore {
    async fn find_by_id(&self, id: CampaignId) -> Result<Option<Campaign>> {
        self.get_json(CF_CAMPAIGNS, &id.to_be_bytes())
    }

    async fn update(&self, campaign: Campaign) -> Result<Campaign> {
        let _writer = self.writer.lock().await;
        self.put_json(CF_CAMPAIGNS, &campaign.id.to_be_bytes(), &campaign)?;
        Ok(campaign)
    }

    async fn credit(
        &self,
        campaign_id: CampaignId,
        transaction_id: TransactionId,
        amount: Amount,
    ) -> Result<Credit> {
        let _writer = self.writer.lock().await;
        let campaign_key = campaign_id.to_be_bytes();
        let mut campaign: Campaign = self
            .get_json(CF_CAMPAIGNS, &campaign_key)?
            .ok_or_else(|| PledgeError::not_found("campaign", campaign_id))?;

        let meta = self.cf(CF_META)?;
        let marker = credit_marker(transaction_id);
        if self.db.get_pinned_cf(meta, &marker)?.is_some() {
            return Ok(Credit::AlreadyApplied(campaign));
        }

        campaign.credit(amount)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_CAMPAIGNS)?, campaign_key, serde_json::to_vec(&campaign)?);
        batch.put_cf(meta, &marker, b"");

        let tx_key = transaction_id.to_be_bytes();
        if let Some(mut tx) = self.get_json::<Transaction>(CF_TRANSACTIONS, &tx_key)? {
            tx.campaign_credited = true;
            tx.updated_at = Utc::now();
            batch.put_cf(self.cf(CF_TRANSACTIONS)?, tx_key, serde_json::to_vec(&tx)?);
        }

        self.db.write(batch)?;
        Ok(Credit::Applied(campaign))
    }
}
