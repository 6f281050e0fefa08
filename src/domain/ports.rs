use super::campaign::{Campaign, Credit};
use super::transaction::{Amount, NewTransaction, Transaction, TransactionStatus};
use super::user::User;
use super::{CampaignId, TransactionId, UserId};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>>;
    async fn find_by_campaign_id(&self, campaign_id: CampaignId) -> Result<Vec<Transaction>>;
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Transaction>>;
    /// Inserts a pending transaction, assigning its id and timestamps.
    async fn save(&self, tx: NewTransaction) -> Result<Transaction>;
    /// Persists every mutable field of an existing transaction.
    async fn update(&self, tx: Transaction) -> Result<Transaction>;
    /// Sets `to` only if the stored status is still `from`.
    ///
    /// Returns `None` when the stored status no longer matches.
    async fn transition_status(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<Option<Transaction>>;
}

#[async_trait]
pub trait CampaignLedger: Send + Sync {
    async fn find_by_id(&self, id: CampaignId) -> Result<Option<Campaign>>;
    async fn update(&self, campaign: Campaign) -> Result<Campaign>;
    /// Atomically adds `amount` to the raised total and one backer on behalf
    /// of `transaction_id`.
    ///
    /// Idempotent per transaction: once a transaction has been credited, later
    /// calls return [`Credit::AlreadyApplied`] and leave the totals alone.
    async fn credit(
        &self,
        campaign_id: CampaignId,
        transaction_id: TransactionId,
        amount: Amount,
    ) -> Result<Credit>;
}

/// What the gateway needs to open a checkout for a pledge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub order_id: String,
    pub amount: Amount,
}

impl From<&Transaction> for PaymentRequest {
    fn from(tx: &Transaction) -> Self {
        Self {
            order_id: tx.order_id(),
            amount: tx.amount,
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn payment_url(&self, request: &PaymentRequest, payer: &User) -> Result<String>;
}

pub type TransactionStoreBox = Box<dyn TransactionStore>;
pub type CampaignLedgerBox = Box<dyn CampaignLedger>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
