use super::{CampaignId, TransactionId, UserId};
use crate::error::PledgeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A positive pledge amount in currency minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    pub fn new(value: u64) -> Result<Self, PledgeError> {
        if value > 0 {
            Ok(Self(value))
        } else {
            Err(PledgeError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Amount {
    type Error = PledgeError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a pledge.
///
/// `Pending` is the only non-terminal state. The legal transitions are
/// `Pending -> Paid` and `Pending -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (TransactionStatus::Pending, TransactionStatus::Paid)
                | (TransactionStatus::Pending, TransactionStatus::Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pledge that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub amount: Amount,
}

/// A single contribution attempt by a payer toward a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub campaign_id: CampaignId,
    pub user_id: UserId,
    pub amount: Amount,
    pub status: TransactionStatus,
    /// Order code the gateway correlates notifications with.
    pub code: Option<String>,
    pub payment_url: Option<String>,
    /// Set once the campaign ledger has been credited with this pledge.
    #[serde(default)]
    pub campaign_credited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Materializes a freshly saved pledge. Only stores call this.
    pub fn from_new(id: TransactionId, new: NewTransaction, now: DateTime<Utc>) -> Self {
        Self {
            id,
            campaign_id: new.campaign_id,
            user_id: new.user_id,
            amount: new.amount,
            status: TransactionStatus::Pending,
            code: None,
            payment_url: None,
            campaign_credited: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// The order id sent to the gateway.
    pub fn order_id(&self) -> String {
        self.code.clone().unwrap_or_else(|| self.id.to_string())
    }

    /// Attaches the payment-initiation URL. A URL can only be set once.
    pub fn attach_payment_url(&mut self, url: String) -> Result<(), PledgeError> {
        if self.payment_url.is_some() {
            return Err(PledgeError::ValidationError(format!(
                "transaction {} already has a payment URL",
                self.id
            )));
        }
        self.code = Some(self.order_id());
        self.payment_url = Some(url);
        Ok(())
    }

    pub fn awaiting_payment_url(&self) -> bool {
        self.status == TransactionStatus::Pending && self.payment_url.is_none()
    }

    pub fn needs_campaign_credit(&self) -> bool {
        self.status == TransactionStatus::Paid && !self.campaign_credited
    }

    /// Copies every mutable field of `other` onto `self`.
    ///
    /// Identity, payer, campaign, amount and `created_at` are left untouched.
    pub fn merge_mutable(&mut self, other: Transaction, now: DateTime<Utc>) {
        self.status = other.status;
        self.code = other.code;
        self.payment_url = other.payment_url;
        self.campaign_credited = other.campaign_credited;
        self.updated_at = now;
    }
}
