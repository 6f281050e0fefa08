use super::transaction::Amount;
use super::{CampaignId, UserId};
use crate::error::{PledgeError, Result};
use serde::{Deserialize, Serialize};

/// Funding state of a campaign.
///
/// Campaigns are owned by an external service; this crate only reads them
/// and credits them when a pledge is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub owner_id: UserId,
    pub raised_amount: u64,
    pub backer_count: u64,
}

impl Campaign {
    pub fn new(id: CampaignId, owner_id: UserId) -> Self {
        Self {
            id,
            owner_id,
            raised_amount: 0,
            backer_count: 0,
        }
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    /// Records one more backer contributing `amount`.
    ///
    /// # Errors
    /// Returns `ValidationError` if either total would overflow. The campaign
    /// is left unchanged in that case.
    pub fn credit(&mut self, amount: Amount) -> Result<()> {
        let raised_amount = self.raised_amount.checked_add(amount.value()).ok_or_else(|| {
            PledgeError::ValidationError(format!(
                "crediting {} would overflow the raised amount of campaign {}",
                amount, self.id
            ))
        })?;
        let backer_count = self.backer_count.checked_add(1).ok_or_else(|| {
            PledgeError::ValidationError(format!("backer count of campaign {} overflows", self.id))
        })?;

        self.raised_amount = raised_amount;
        self.backer_count = backer_count;
        Ok(())
    }
}

/// Result of crediting a campaign for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credit {
    /// The totals moved.
    Applied(Campaign),
    /// The transaction had already been credited; totals are unchanged.
    AlreadyApplied(Campaign),
}

impl Credit {
    pub fn campaign(&self) -> &Campaign {
        match self {
            Credit::Applied(campaign) | Credit::AlreadyApplied(campaign) => campaign,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Credit::Applied(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_counts_backer_and_amount() {
        let mut campaign = Campaign::new(1, 10);
        campaign.credit(Amount::new(50_000).unwrap()).unwrap();
        campaign.credit(Amount::new(25).unwrap()).unwrap();
        assert_eq!(campaign.raised_amount, 50_025);
        assert_eq!(campaign.backer_count, 2);
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let mut campaign = Campaign::new(1, 10);
        campaign.credit(Amount::new(u64::MAX).unwrap()).unwrap();

        let result = campaign.credit(Amount::new(1).unwrap());
        assert!(matches!(result, Err(PledgeError::ValidationError(_))));
        assert_eq!(campaign.raised_amount, u64::MAX);
        assert_eq!(campaign.backer_count, 1);
    }

    #[test]
    fn test_ownership() {
        let campaign = Campaign::new(1, 10);
        assert!(campaign.is_owned_by(10));
        assert!(!campaign.is_owned_by(11));
    }
}
