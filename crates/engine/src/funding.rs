//! Funding plans.
//!
//! A donation contributes to a campaign's `current_amount` only while it is
//! cash and references that campaign. Given the contribution before and after
//! a write, [`plan`] returns the counter adjustments that keep every campaign
//! equal to the sum of its cash donations:
//!
//! | before → after                  | adjustments              |
//! |---------------------------------|--------------------------|
//! | none → none                     | –                        |
//! | none → C                        | `C += new`               |
//! | C → none                        | `C -= old`               |
//! | C → C (same amount)             | –                        |
//! | C → C (amount changed)          | `C += new - old`         |
//! | C1 → C2                         | `C1 -= old`, `C2 += new` |
//!
//! Type changes fold into the same table: cash → goods is `C → none`, goods →
//! cash is `none → C`. Creating a donation is `none → after`, deleting it is
//! `before → none`.

use uuid::Uuid;

use crate::{DonationType, Money};

/// The contribution of one donation to one campaign.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FundingLink {
    pub campaign_id: Uuid,
    pub amount: Money,
}

impl FundingLink {
    /// Only cash donations linked to a campaign fund it.
    pub fn of(
        donation_type: DonationType,
        amount: Money,
        campaign_id: Option<Uuid>,
    ) -> Option<Self> {
        match (donation_type, campaign_id) {
            (DonationType::Cash, Some(campaign_id)) => Some(Self {
                campaign_id,
                amount,
            }),
            _ => None,
        }
    }
}

/// A signed change to apply to one campaign's `current_amount`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FundingAdjustment {
    pub campaign_id: Uuid,
    pub delta: Money,
}

/// Compute the adjustments for a donation moving from `before` to `after`.
///
/// Zero deltas are never emitted.
pub fn plan(before: Option<FundingLink>, after: Option<FundingLink>) -> Vec<FundingAdjustment> {
    let mut adjustments = Vec::with_capacity(2);
    match (before, after) {
        (None, None) => {}
        (None, Some(new)) => adjustments.push(FundingAdjustment {
            campaign_id: new.campaign_id,
            delta: new.amount,
        }),
        (Some(old), None) => adjustments.push(FundingAdjustment {
            campaign_id: old.campaign_id,
            delta: -old.amount,
        }),
        (Some(old), Some(new)) if old.campaign_id == new.campaign_id => {
            adjustments.push(FundingAdjustment {
                campaign_id: new.campaign_id,
                delta: new.amount - old.amount,
            });
        }
        (Some(old), Some(new)) => {
            adjustments.push(FundingAdjustment {
                campaign_id: old.campaign_id,
                delta: -old.amount,
            });
            adjustments.push(FundingAdjustment {
                campaign_id: new.campaign_id,
                delta: new.amount,
            });
        }
    }
    adjustments.retain(|adj| !adj.delta.is_zero());
    adjustments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(campaign_id: Uuid, minor: i64) -> Option<FundingLink> {
        Some(FundingLink {
            campaign_id,
            amount: Money::new(minor),
        })
    }

    fn adj(campaign_id: Uuid, minor: i64) -> FundingAdjustment {
        FundingAdjustment {
            campaign_id,
            delta: Money::new(minor),
        }
    }

    #[test]
    fn only_linked_cash_funds_a_campaign() {
        let c = Uuid::new_v4();
        assert!(FundingLink::of(DonationType::Cash, Money::new(100), Some(c)).is_some());
        assert!(FundingLink::of(DonationType::Cash, Money::new(100), None).is_none());
        assert!(FundingLink::of(DonationType::Goods, Money::ZERO, Some(c)).is_none());
    }

    #[test]
    fn unlinked_to_unlinked_is_noop() {
        assert!(plan(None, None).is_empty());
    }

    #[test]
    fn linking_increments_target() {
        let c = Uuid::new_v4();
        assert_eq!(plan(None, link(c, 5_000)), vec![adj(c, 5_000)]);
    }

    #[test]
    fn unlinking_decrements_source() {
        let c = Uuid::new_v4();
        assert_eq!(plan(link(c, 5_000), None), vec![adj(c, -5_000)]);
    }

    #[test]
    fn same_campaign_same_amount_is_noop() {
        let c = Uuid::new_v4();
        assert!(plan(link(c, 5_000), link(c, 5_000)).is_empty());
    }

    #[test]
    fn same_campaign_amount_change_applies_difference() {
        let c = Uuid::new_v4();
        assert_eq!(plan(link(c, 10_000), link(c, 15_000)), vec![adj(c, 5_000)]);
        assert_eq!(plan(link(c, 15_000), link(c, 10_000)), vec![adj(c, -5_000)]);
    }

    #[test]
    fn moving_between_campaigns_decrements_then_increments() {
        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        assert_eq!(
            plan(link(c1, 10_000), link(c2, 12_000)),
            vec![adj(c1, -10_000), adj(c2, 12_000)]
        );
    }

    #[test]
    fn cash_to_goods_behaves_as_unlink() {
        let c = Uuid::new_v4();
        let before = FundingLink::of(DonationType::Cash, Money::new(7_500), Some(c));
        let after = FundingLink::of(DonationType::Goods, Money::ZERO, Some(c));
        assert_eq!(plan(before, after), vec![adj(c, -7_500)]);
    }

    #[test]
    fn goods_to_cash_behaves_as_link() {
        let c = Uuid::new_v4();
        let before = FundingLink::of(DonationType::Goods, Money::ZERO, None);
        let after = FundingLink::of(DonationType::Cash, Money::new(2_000), Some(c));
        assert_eq!(plan(before, after), vec![adj(c, 2_000)]);
    }
}
