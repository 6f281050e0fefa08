use crate::domain::campaign::{Campaign, Credit};
use crate::domain::ports::{CampaignLedger, TransactionStore};
use crate::domain::transaction::{Amount, NewTransaction, Transaction, TransactionStatus};
use crate::domain::{CampaignId, TransactionId, UserId};
use crate::error::{PledgeError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct TransactionTable {
    last_id: TransactionId,
    rows: HashMap<TransactionId, Transaction>,
}

/// A thread-safe in-memory store for transactions.
///
/// Uses `Arc<RwLock<..>>` so clones share the same table. Ids are assigned
/// sequentially starting at 1.
#[derive(Default, Clone)]
pub struct InMemoryTransactionStore {
    table: Arc<RwLock<TransactionTable>>,
}

impl InMemoryTransactionStore {
    /// Creates a new, empty in-memory transaction store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
    transactions.sort_by_key(|tx| tx.id);
    transactions
}

#[async_trait]
impl TransactionStore for InMemoryTransactionStore {
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_campaign_id(&self, campaign_id: CampaignId) -> Result<Vec<Transaction>> {
        let table = self.table.read().await;
        Ok(sorted(
            table
                .rows
                .values()
                .filter(|tx| tx.campaign_id == campaign_id)
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        let table = self.table.read().await;
        Ok(sorted(
            table
                .rows
                .values()
                .filter(|tx| tx.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn save(&self, tx: NewTransaction) -> Result<Transaction> {
        let mut table = self.table.write().await;
        table.last_id += 1;
        let saved = Transaction::from_new(table.last_id, tx, Utc::now());
        table.rows.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn update(&self, tx: Transaction) -> Result<Transaction> {
        let mut table = self.table.write().await;
        let stored = table
            .rows
            .get_mut(&tx.id)
            .ok_or_else(|| PledgeError::not_found("transaction", tx.id))?;
        stored.merge_mutable(tx, Utc::now());
        Ok(stored.clone())
    }

    async fn transition_status(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<Option<Transaction>> {
        let mut table = self.table.write().await;
        let stored = table
            .rows
            .get_mut(&id)
            .ok_or_else(|| PledgeError::not_found("transaction", id))?;
        if stored.status != from {
            return Ok(None);
        }
        stored.status = to;
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }
}

#[derive(Default)]
struct LedgerTable {
    campaigns: HashMap<CampaignId, Campaign>,
    credited: HashSet<TransactionId>,
}

/// A thread-safe in-memory campaign ledger.
///
/// Remembers which transactions it has credited, under the same lock as the
/// totals, so a repeated credit for one transaction is a no-op.
#[derive(Default, Clone)]
pub struct InMemoryCampaignLedger {
    table: Arc<RwLock<LedgerTable>>,
}

impl InMemoryCampaignLedger {
    /// Creates a new, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a ledger seeded with `campaigns`.
    pub fn with_campaigns(campaigns: impl IntoIterator<Item = Campaign>) -> Self {
        let table = LedgerTable {
            campaigns: campaigns.into_iter().map(|c| (c.id, c)).collect(),
            credited: HashSet::new(),
        };
        Self {
            table: Arc::new(RwLock::new(table)),
        }
    }
}

#[async_trait]
impl CampaignLedger for InMemoryCampaignLedger {
    async fn find_by_id(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let table = self.table.read().await;
        Ok(table.campaigns.get(&id).cloned())
    }

    async fn update(&self, campaign: Campaign) -> Result<Campaign> {
        let mut table = self.table.write().await;
        table.campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn credit(
        &self,
        campaign_id: CampaignId,
        transaction_id: TransactionId,
        amount: Amount,
    ) -> Result<Credit> {
        let mut table = self.table.write().await;
        let LedgerTable { campaigns, credited } = &mut *table;
        let campaign = campaigns
            .get_mut(&campaign_id)
            .ok_or_else(|| PledgeError::not_found("campaign", campaign_id))?;
        if credited.contains(&transaction_id) {
            return Ok(Credit::AlreadyApplied(campaign.clone()));
        }

        campaign.credit(amount)?;
        credited.insert(transaction_id);
        Ok(Credit::Applied(campaign.clone()))
    }
}
