use super::keyed_lock::KeyedLock;
use crate::config::Config;
use crate::domain::notification::{Notification, PaymentNotification};
use crate::domain::ports::{
    CampaignLedgerBox, PaymentGatewayBox, PaymentRequest, TransactionStoreBox,
};
use crate::domain::transaction::{Amount, NewTransaction, Transaction};
use crate::domain::user::User;
use crate::domain::{CampaignId, TransactionId, UserId};
use crate::error::{PledgeError, Result};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Orchestrates the pledge lifecycle.
///
/// `TransactionService` creates pledges, asks the payment gateway for a
/// checkout URL, and folds gateway notifications into transaction status and
/// campaign totals.
///
/// All work that reads a transaction, decides, and writes it back runs under a
/// per-transaction lock. Status changes additionally go through the store's
/// compare-and-set, and campaign totals only move through the ledger's atomic
/// credit, which the ledger applies at most once per transaction.
pub struct TransactionService {
    transactions: TransactionStoreBox,
    campaigns: CampaignLedgerBox,
    gateway: PaymentGatewayBox,
    gateway_timeout: Duration,
    locks: KeyedLock<TransactionId>,
}

impl TransactionService {
    /// Creates a service with the default [`Config`].
    pub fn new(
        transactions: TransactionStoreBox,
        campaigns: CampaignLedgerBox,
        gateway: PaymentGatewayBox,
    ) -> Self {
        Self::with_config(transactions, campaigns, gateway, &Config::default())
    }

    pub fn with_config(
        transactions: TransactionStoreBox,
        campaigns: CampaignLedgerBox,
        gateway: PaymentGatewayBox,
        config: &Config,
    ) -> Self {
        Self {
            transactions,
            campaigns,
            gateway,
            gateway_timeout: config.gateway_timeout(),
            locks: KeyedLock::new(),
        }
    }

    /// Lists a campaign's transactions. Only the campaign owner may do this.
    pub async fn list_by_campaign(
        &self,
        campaign_id: CampaignId,
        requester: &User,
    ) -> Result<Vec<Transaction>> {
        let campaign = self
            .campaigns
            .find_by_id(campaign_id)
            .await?
            .ok_or_else(|| PledgeError::not_found("campaign", campaign_id))?;

        if !campaign.is_owned_by(requester.id) {
            return Err(PledgeError::Unauthorized(format!(
                "user {} is not the owner of campaign {}",
                requester.id, campaign_id
            )));
        }

        self.transactions.find_by_campaign_id(campaign_id).await
    }

    /// Lists every transaction of a user.
    ///
    /// The caller is trusted to be `user_id`; this must sit behind an
    /// authorization layer.
    pub async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>> {
        self.transactions.find_by_user_id(user_id).await
    }

    /// Records a pending pledge and attaches a payment URL to it.
    ///
    /// The gateway is only called once the pledge is durably stored. If the
    /// gateway fails, the error is returned and the pledge stays pending
    /// without a URL; [`TransactionService::resume_payment`] picks it up.
    pub async fn create_transaction(
        &self,
        campaign_id: CampaignId,
        user: &User,
        amount: u64,
    ) -> Result<Transaction> {
        let amount = Amount::new(amount)?;
        if self.campaigns.find_by_id(campaign_id).await?.is_none() {
            return Err(PledgeError::not_found("campaign", campaign_id));
        }

        let tx = self
            .transactions
            .save(NewTransaction {
                campaign_id,
                user_id: user.id,
                amount,
            })
            .await?;
        info!(
            transaction_id = tx.id,
            campaign_id,
            user_id = user.id,
            %amount,
            "pledge recorded"
        );

        let url = self.request_payment_url(&tx, user).await?;
        self.attach_payment_url(tx.id, url).await
    }

    /// Requests a payment URL for a pending pledge that does not have one yet.
    pub async fn resume_payment(
        &self,
        transaction_id: TransactionId,
        user: &User,
    ) -> Result<Transaction> {
        let tx = self.find_transaction(transaction_id).await?;
        if tx.user_id != user.id {
            return Err(PledgeError::Unauthorized(format!(
                "user {} is not the payer of transaction {}",
                user.id, transaction_id
            )));
        }
        if tx.payment_url.is_some() {
            return Ok(tx);
        }
        if tx.status.is_terminal() {
            return Err(PledgeError::ValidationError(format!(
                "transaction {} is already {}",
                transaction_id, tx.status
            )));
        }

        let url = self.request_payment_url(&tx, user).await?;
        self.attach_payment_url(tx.id, url).await
    }

    /// Applies a gateway notification to its transaction.
    ///
    /// A transition into `paid` credits the campaign once. Redelivered or
    /// concurrent notifications for the same transaction are no-ops.
    pub async fn process_notification(&self, raw: PaymentNotification) -> Result<Transaction> {
        let notification = Notification::try_from(&raw)?;
        let id = notification.transaction_id;

        let _guard = self.locks.acquire(id).await;
        let mut tx = self.find_transaction(id).await?;

        match notification.target_status() {
            Some(target) if tx.status.can_transition_to(target) => {
                let changed = self
                    .transactions
                    .transition_status(id, tx.status, target)
                    .await?;
                tx = match changed {
                    Some(updated) => {
                        info!(transaction_id = id, status = %target, "transaction status changed");
                        updated
                    }
                    None => {
                        warn!(transaction_id = id, "status changed concurrently, reloading");
                        self.find_transaction(id).await?
                    }
                };
            }
            Some(target) if target == tx.status => {
                debug!(transaction_id = id, status = %target, "duplicate notification");
            }
            Some(target) => {
                warn!(
                    transaction_id = id,
                    current = %tx.status,
                    requested = %target,
                    "ignoring transition out of terminal status"
                );
            }
            None => {
                debug!(
                    transaction_id = id,
                    gateway_status = %raw.transaction_status,
                    "notification carries no status change"
                );
            }
        }

        if tx.needs_campaign_credit() {
            tx = self.credit_campaign(tx).await?;
        }
        Ok(tx)
    }

    /// Re-runs the campaign credit for a paid transaction whose credit failed.
    pub async fn retry_campaign_credit(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Transaction> {
        let _guard = self.locks.acquire(transaction_id).await;
        let tx = self.find_transaction(transaction_id).await?;
        if tx.needs_campaign_credit() {
            self.credit_campaign(tx).await
        } else {
            Ok(tx)
        }
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.transactions
            .find_by_id(id)
            .await?
            .ok_or_else(|| PledgeError::not_found("transaction", id))
    }

    async fn request_payment_url(&self, tx: &Transaction, payer: &User) -> Result<String> {
        let request = PaymentRequest::from(tx);
        let url = match tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.payment_url(&request, payer),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PledgeError::GatewayError(format!(
                "timed out after {}ms",
                self.gateway_timeout.as_millis()
            ))),
        }
        .inspect_err(|err| {
            warn!(
                transaction_id = tx.id,
                error = %err,
                "payment URL request failed, pledge left pending"
            );
        })?;

        if url.trim().is_empty() {
            return Err(PledgeError::GatewayError(
                "gateway returned an empty payment URL".to_string(),
            ));
        }
        Ok(url)
    }

    async fn attach_payment_url(&self, id: TransactionId, url: String) -> Result<Transaction> {
        let _guard = self.locks.acquire(id).await;
        // Reload so a status written by a notification in the meantime survives.
        let mut tx = self.find_transaction(id).await?;
        if tx.payment_url.is_some() {
            warn!(
                transaction_id = id,
                "payment URL already attached, keeping the stored one"
            );
            return Ok(tx);
        }

        tx.attach_payment_url(url)?;
        self.transactions.update(tx).await.inspect_err(|err| {
            error!(
                transaction_id = id,
                error = %err,
                "payment URL issued but not recorded"
            );
        })
    }

    // Caller holds the transaction's lock. The ledger ignores a second credit
    // for the same transaction, so a lost marker write is repaired on retry.
    async fn credit_campaign(&self, mut tx: Transaction) -> Result<Transaction> {
        let credit = self
            .campaigns
            .credit(tx.campaign_id, tx.id, tx.amount)
            .await
            .inspect_err(|err| {
                warn!(
                    transaction_id = tx.id,
                    campaign_id = tx.campaign_id,
                    error = %err,
                    "campaign credit failed, transaction stays paid and uncredited"
                );
            })?;
        let campaign = credit.campaign();
        if credit.is_applied() {
            info!(
                transaction_id = tx.id,
                campaign_id = campaign.id,
                raised_amount = campaign.raised_amount,
                backer_count = campaign.backer_count,
                "campaign credited"
            );
        } else {
            debug!(
                transaction_id = tx.id,
                campaign_id = campaign.id,
                "campaign already credited, recording marker"
            );
        }

        let id = tx.id;
        tx.campaign_credited = true;
        self.transactions.update(tx).await.inspect_err(|err| {
            warn!(
                transaction_id = id,
                error = %err,
                "credit marker not recorded, next delivery will record it"
            );
        })
    }
}
