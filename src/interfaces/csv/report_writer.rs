use crate::domain::campaign::Campaign;
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::domain::{CampaignId, TransactionId, UserId};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct TransactionRow<'a> {
    id: TransactionId,
    campaign_id: CampaignId,
    user_id: UserId,
    amount: u64,
    status: TransactionStatus,
    credited: bool,
    payment_url: &'a str,
}

impl<'a> From<&'a Transaction> for TransactionRow<'a> {
    fn from(tx: &'a Transaction) -> Self {
        Self {
            id: tx.id,
            campaign_id: tx.campaign_id,
            user_id: tx.user_id,
            amount: tx.amount.value(),
            status: tx.status,
            credited: tx.campaign_credited,
            payment_url: tx.payment_url.as_deref().unwrap_or_default(),
        }
    }
}

const CAMPAIGN_HEADER: [&str; 4] = ["id", "owner_id", "raised_amount", "backer_count"];
const TRANSACTION_HEADER: [&str; 7] = [
    "id",
    "campaign_id",
    "user_id",
    "amount",
    "status",
    "credited",
    "payment_url",
];

/// Writes campaign totals and transactions as CSV.
///
/// Each table starts with its header row, even when it has no rows.
pub struct ReportWriter<W: Write> {
    sink: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// Writes one header row followed by one row per campaign.
    pub fn write_campaigns(&mut self, campaigns: impl IntoIterator<Item = Campaign>) -> Result<()> {
        let mut writer = self.table(&CAMPAIGN_HEADER)?;
        for campaign in campaigns {
            writer.serialize(campaign)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes one header row followed by one row per transaction.
    pub fn write_transactions<'a>(
        &mut self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> Result<()> {
        let mut writer = self.table(&TRANSACTION_HEADER)?;
        for tx in transactions {
            writer.serialize(TransactionRow::from(tx))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn table(&mut self, header: &[&str]) -> Result<csv::Writer<&mut W>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut self.sink);
        writer.write_record(header)?;
        Ok(writer)
    }
}
