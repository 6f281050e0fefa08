#![allow(dead_code)]

use async_trait::async_trait;
use pledge_engine::application::service::TransactionService;
use pledge_engine::config::Config;
use pledge_engine::domain::campaign::{Campaign, Credit};
use pledge_engine::domain::ports::{
    CampaignLedger, PaymentGateway, PaymentRequest, TransactionStore,
};
use pledge_engine::domain::transaction::{Amount, NewTransaction, Transaction, TransactionStatus};
use pledge_engine::domain::user::User;
use pledge_engine::domain::{CampaignId, TransactionId, UserId};
use pledge_engine::error::{PledgeError, Result};
use pledge_engine::infrastructure::in_memory::{InMemoryCampaignLedger, InMemoryTransactionStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const OWNER: UserId = 10;
pub const BACKER: UserId = 20;
pub const CAMPAIGN: CampaignId = 1;

pub fn owner() -> User {
    User::new(OWNER, "Owner")
}

pub fn backer() -> User {
    User::new(BACKER, "Backer").with_email("backer@example.com")
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Succeed,
    Fail,
    Hang,
}

/// Gateway double that records calls and can fail or hang on demand.
#[derive(Clone)]
pub struct ScriptedGateway {
    calls: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
    hanging: Arc<AtomicBool>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            failing: Arc::new(AtomicBool::new(false)),
            hanging: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_mode(&self, mode: GatewayMode) {
        self.failing.store(mode == GatewayMode::Fail, Ordering::SeqCst);
        self.hanging.store(mode == GatewayMode::Hang, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn payment_url(&self, request: &PaymentRequest, payer: &User) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hanging.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PledgeError::GatewayError("503 Service Unavailable".to_string()));
        }
        Ok(format!(
            "https://gateway.test/snap/{}?amount={}&payer={}",
            request.order_id, request.amount, payer.id
        ))
    }
}

/// Transaction store whose writes can be made to fail.
#[derive(Clone, Default)]
pub struct FlakyTransactionStore {
    inner: InMemoryTransactionStore,
    fail_save: Arc<AtomicBool>,
    fail_update: Arc<AtomicBool>,
}

impl FlakyTransactionStore {
    pub fn fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransactionStore for FlakyTransactionStore {
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_campaign_id(&self, campaign_id: CampaignId) -> Result<Vec<Transaction>> {
        self.inner.find_by_campaign_id(campaign_id).await
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        self.inner.find_by_user_id(user_id).await
    }

    async fn save(&self, tx: NewTransaction) -> Result<Transaction> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(PledgeError::store("connection reset"));
        }
        self.inner.save(tx).await
    }

    async fn update(&self, tx: Transaction) -> Result<Transaction> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(PledgeError::store("connection reset"));
        }
        self.inner.update(tx).await
    }

    async fn transition_status(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
    ) -> Result<Option<Transaction>> {
        self.inner.transition_status(id, from, to).await
    }
}

/// Campaign ledger whose credit can be made to fail.
#[derive(Clone, Default)]
pub struct FlakyLedger {
    inner: InMemoryCampaignLedger,
    fail_credit: Arc<AtomicBool>,
    credits: Arc<AtomicUsize>,
}

impl FlakyLedger {
    pub fn fail_credit(&self, fail: bool) {
        self.fail_credit.store(fail, Ordering::SeqCst);
    }

    /// Number of credits that moved the campaign totals.
    pub fn credits(&self) -> usize {
        self.credits.load(Ordering::SeqCst)
    }

    pub async fn campaign(&self, id: CampaignId) -> Campaign {
        self.inner.find_by_id(id).await.unwrap().unwrap()
    }
}

#[async_trait]
impl CampaignLedger for FlakyLedger {
    async fn find_by_id(&self, id: CampaignId) -> Result<Option<Campaign>> {
        self.inner.find_by_id(id).await
    }

    async fn update(&self, campaign: Campaign) -> Result<Campaign> {
        self.inner.update(campaign).await
    }

    async fn credit(
        &self,
        campaign_id: CampaignId,
        transaction_id: TransactionId,
        amount: Amount,
    ) -> Result<Credit> {
        if self.fail_credit.load(Ordering::SeqCst) {
            return Err(PledgeError::store("ledger unavailable"));
        }
        let credit = self.inner.credit(campaign_id, transaction_id, amount).await?;
        if credit.is_applied() {
            self.credits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(credit)
    }
}

/// A service wired to doubles, with handles kept for assertions.
pub struct Fixture {
    pub service: Arc<TransactionService>,
    pub store: FlakyTransactionStore,
    pub ledger: FlakyLedger,
    pub gateway: ScriptedGateway,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = FlakyTransactionStore::default();
        let ledger = FlakyLedger::default();
        let gateway = ScriptedGateway::new();
        ledger.update(Campaign::new(CAMPAIGN, OWNER)).await.unwrap();

        let service = TransactionService::with_config(
            Box::new(store.clone()),
            Box::new(ledger.clone()),
            Box::new(gateway.clone()),
            &config,
        );

        Self {
            service: Arc::new(service),
            store,
            ledger,
            gateway,
        }
    }

    pub async fn pledge(&self, amount: u64) -> Transaction {
        self.service
            .create_transaction(CAMPAIGN, &backer(), amount)
            .await
            .unwrap()
    }
}
