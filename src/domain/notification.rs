//! Inbound payment-gateway notifications.
//!
//! The gateway reports outcomes as loosely typed strings. They are translated
//! once, at the boundary, into closed enums so the reconciliation rule can be
//! matched exhaustively.

use super::TransactionId;
use super::transaction::TransactionStatus;
use crate::error::PledgeError;
use serde::Deserialize;

/// Notification payload as delivered by the gateway webhook.
///
/// Authenticity (signature) verification is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentNotification {
    pub order_id: String,
    #[serde(default)]
    pub payment_type: String,
    pub transaction_status: String,
    #[serde(default)]
    pub fraud_status: String,
}

impl PaymentNotification {
    pub fn new(
        order_id: impl Into<String>,
        payment_type: impl Into<String>,
        transaction_status: impl Into<String>,
        fraud_status: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            payment_type: payment_type.into(),
            transaction_status: transaction_status.into(),
            fraud_status: fraud_status.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    CreditCard,
    Other,
}

impl From<&str> for PaymentMethod {
    fn from(value: &str) -> Self {
        match value.trim() {
            "credit_card" => PaymentMethod::CreditCard,
            _ => PaymentMethod::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    Capture,
    Settlement,
    Pending,
    Deny,
    Expire,
    Cancel,
    Unrecognized,
}

impl From<&str> for GatewayStatus {
    fn from(value: &str) -> Self {
        match value.trim() {
            "capture" => GatewayStatus::Capture,
            "settlement" => GatewayStatus::Settlement,
            "pending" => GatewayStatus::Pending,
            "deny" => GatewayStatus::Deny,
            "expire" => GatewayStatus::Expire,
            "cancel" => GatewayStatus::Cancel,
            _ => GatewayStatus::Unrecognized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FraudStatus {
    Accept,
    Challenge,
    Deny,
    Absent,
}

impl From<&str> for FraudStatus {
    fn from(value: &str) -> Self {
        match value.trim() {
            "accept" => FraudStatus::Accept,
            "challenge" => FraudStatus::Challenge,
            "deny" => FraudStatus::Deny,
            _ => FraudStatus::Absent,
        }
    }
}

/// A validated notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub transaction_id: TransactionId,
    pub method: PaymentMethod,
    pub status: GatewayStatus,
    pub fraud: FraudStatus,
}

impl Notification {
    /// The status the notification drives the transaction to, if any.
    ///
    /// Rules are evaluated in order: accepted card capture, settlement,
    /// then the cancelling statuses. Anything else leaves the status alone.
    pub fn target_status(&self) -> Option<TransactionStatus> {
        match (self.method, self.status, self.fraud) {
            (PaymentMethod::CreditCard, GatewayStatus::Capture, FraudStatus::Accept) => {
                Some(TransactionStatus::Paid)
            }
            (_, GatewayStatus::Settlement, _) => Some(TransactionStatus::Paid),
            (_, GatewayStatus::Deny | GatewayStatus::Expire | GatewayStatus::Cancel, _) => {
                Some(TransactionStatus::Cancelled)
            }
            _ => None,
        }
    }
}

impl TryFrom<&PaymentNotification> for Notification {
    type Error = PledgeError;

    fn try_from(raw: &PaymentNotification) -> Result<Self, Self::Error> {
        let order_id = raw.order_id.trim();
        let transaction_id = order_id.parse::<TransactionId>().map_err(|_| {
            PledgeError::InvalidNotification(format!("unparseable order id {:?}", raw.order_id))
        })?;

        Ok(Self {
            transaction_id,
            method: raw.payment_type.as_str().into(),
            status: raw.transaction_status.as_str().into(),
            fraud: raw.fraud_status.as_str().into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decide(method: &str, status: &str, fraud: &str) -> Option<TransactionStatus> {
        let raw = PaymentNotification::new("1", method, status, fraud);
        Notification::try_from(&raw).unwrap().target_status()
    }

    #[test]
    fn test_accepted_card_capture_is_paid() {
        assert_eq!(
            decide("credit_card", "capture", "accept"),
            Some(TransactionStatus::Paid)
        );
    }

    #[test]
    fn test_capture_needs_card_and_accept() {
        assert_eq!(decide("credit_card", "capture", "challenge"), None);
        assert_eq!(decide("bank_transfer", "capture", "accept"), None);
    }

    #[test]
    fn test_settlement_is_paid_for_any_method() {
        assert_eq!(
            decide("bank_transfer", "settlement", ""),
            Some(TransactionStatus::Paid)
        );
        assert_eq!(
            decide("credit_card", "settlement", "deny"),
            Some(TransactionStatus::Paid)
        );
    }

    #[test]
    fn test_failure_statuses_cancel() {
        for status in ["deny", "expire", "cancel"] {
            assert_eq!(
                decide("gopay", status, ""),
                Some(TransactionStatus::Cancelled),
                "status {status}"
            );
        }
    }

    #[test]
    fn test_other_statuses_leave_transaction_alone() {
        assert_eq!(decide("gopay", "pending", ""), None);
        assert_eq!(decide("gopay", "refund", ""), None);
        assert_eq!(decide("", "", ""), None);
    }

    #[test]
    fn test_order_id_must_be_numeric() {
        for order_id in ["", "abc", "-1", "12x"] {
            let raw = PaymentNotification::new(order_id, "credit_card", "capture", "accept");
            assert!(matches!(
                Notification::try_from(&raw),
                Err(PledgeError::InvalidNotification(_))
            ));
        }
    }

    #[test]
    fn test_webhook_payload_deserialization() {
        let body = r#"{"order_id":"42","payment_type":"credit_card","transaction_status":"capture","fraud_status":"accept","gross_amount":"50000.00"}"#;
        let raw: PaymentNotification = serde_json::from_str(body).unwrap();
        let notification = Notification::try_from(&raw).unwrap();
        assert_eq!(notification.transaction_id, 42);
        assert_eq!(notification.method, PaymentMethod::CreditCard);
        assert_eq!(notification.fraud, FraudStatus::Accept);
    }
}
