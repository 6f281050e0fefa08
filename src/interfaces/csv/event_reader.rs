use crate::domain::notification::PaymentNotification;
use crate::domain::{CampaignId, UserId};
use crate::error::{PledgeError, Result};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Campaign,
    Pledge,
    Notification,
}

/// One raw row of an event file.
#[derive(Debug, Deserialize)]
pub struct EventRecord {
    pub r#type: EventType,
    #[serde(default)]
    pub campaign: Option<CampaignId>,
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub fraud: Option<String>,
}

/// A validated event ready to be applied to the service.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Campaign {
        campaign_id: CampaignId,
        owner_id: UserId,
    },
    Pledge {
        campaign_id: CampaignId,
        user_id: UserId,
        amount: u64,
    },
    Notification(PaymentNotification),
}

fn required<T>(value: Option<T>, kind: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| PledgeError::ValidationError(format!("{kind} row is missing `{field}`")))
}

impl TryFrom<EventRecord> for Event {
    type Error = PledgeError;

    fn try_from(record: EventRecord) -> Result<Self> {
        match record.r#type {
            EventType::Campaign => Ok(Event::Campaign {
                campaign_id: required(record.campaign, "campaign", "campaign")?,
                owner_id: required(record.user, "campaign", "user")?,
            }),
            EventType::Pledge => Ok(Event::Pledge {
                campaign_id: required(record.campaign, "pledge", "campaign")?,
                user_id: required(record.user, "pledge", "user")?,
                amount: required(record.amount, "pledge", "amount")?,
            }),
            EventType::Notification => Ok(Event::Notification(PaymentNotification {
                order_id: required(record.order, "notification", "order")?,
                payment_type: record.payment_type.unwrap_or_default(),
                transaction_status: required(record.status, "notification", "status")?,
                fraud_status: record.fraud.unwrap_or_default(),
            })),
        }
    }
}

/// Reads events from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Event>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    /// Creates a new `EventReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates events.
    pub fn events(self) -> impl Iterator<Item = Result<Event>> {
        self.reader.into_deserialize::<EventRecord>().map(|result| {
            result
                .map_err(PledgeError::from)
                .and_then(Event::try_from)
        })
    }
}
