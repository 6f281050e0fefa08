use crate::domain::ports::{PaymentGateway, PaymentRequest};
use crate::domain::user::User;
use crate::error::{PledgeError, Result};
use async_trait::async_trait;

/// Offline payment gateway that points payers at a hosted checkout page.
///
/// The URL is derived from the order id and amount; no network call is made.
/// The batch driver uses it so that pledges can be replayed without a real
/// gateway account.
#[derive(Debug, Clone)]
pub struct StaticCheckoutGateway {
    base_url: String,
}

impl StaticCheckoutGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(PledgeError::ValidationError(format!(
                "checkout URL must be http(s), got {base_url:?}"
            )));
        }
        Ok(Self { base_url })
    }
}

#[async_trait]
impl PaymentGateway for StaticCheckoutGateway {
    async fn payment_url(&self, request: &PaymentRequest, _payer: &User) -> Result<String> {
        Ok(format!(
            "{}/checkout/{}?amount={}",
            self.base_url, request.order_id, request.amount
        ))
    }
}
