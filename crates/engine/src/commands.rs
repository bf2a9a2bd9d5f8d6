//! Command structs for engine operations.
//!
//! These types group parameters for write operations (donation and campaign
//! create/update), keeping call sites readable and avoiding long argument
//! lists. Required fields are `Option` so the engine can report the missing
//! field by name.

use chrono::NaiveDate;

use crate::{AttachmentUpload, CampaignStatus, DonationType, Money};

/// Create a donation.
#[derive(Clone, Debug, Default)]
pub struct NewDonationCmd {
    pub donor_name: Option<String>,
    pub donation_type: Option<DonationType>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub date_received: Option<NaiveDate>,
    pub campaign_id: Option<String>,
    pub idempotency_key: Option<String>,
}

impl NewDonationCmd {
    /// A cash donation of `amount`.
    #[must_use]
    pub fn cash(donor_name: impl Into<String>, amount: Money, date_received: NaiveDate) -> Self {
        Self {
            donor_name: Some(donor_name.into()),
            donation_type: Some(DonationType::Cash),
            amount: Some(amount),
            date_received: Some(date_received),
            ..Self::default()
        }
    }

    /// A goods donation described by `description`.
    #[must_use]
    pub fn goods(
        donor_name: impl Into<String>,
        description: impl Into<String>,
        date_received: NaiveDate,
    ) -> Self {
        Self {
            donor_name: Some(donor_name.into()),
            donation_type: Some(DonationType::Goods),
            description: Some(description.into()),
            date_received: Some(date_received),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Replace the editable fields of a donation.
///
/// `donor_name`, `donation_type` and `date_received` keep their stored values
/// when omitted. `amount`, `description` and `campaign_id` are always
/// replaced: an omitted `campaign_id` unlinks the donation.
#[derive(Clone, Debug, Default)]
pub struct UpdateDonationCmd {
    pub donor_name: Option<String>,
    pub donation_type: Option<DonationType>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub date_received: Option<NaiveDate>,
    pub campaign_id: Option<String>,
}

impl UpdateDonationCmd {
    /// Cash with `amount`, linked to nothing until [`Self::campaign`] is called.
    #[must_use]
    pub fn cash(amount: Money) -> Self {
        Self {
            donation_type: Some(DonationType::Cash),
            amount: Some(amount),
            ..Self::default()
        }
    }

    /// Goods described by `description`.
    #[must_use]
    pub fn goods(description: impl Into<String>) -> Self {
        Self {
            donation_type: Some(DonationType::Goods),
            description: Some(description.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }
}

/// Create a campaign.
#[derive(Clone, Debug, Default)]
pub struct NewCampaignCmd {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub goal_amount: Option<Money>,
    pub status: Option<CampaignStatus>,
    pub attachments: Vec<AttachmentUpload>,
}

impl NewCampaignCmd {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        start_date: NaiveDate,
        goal_amount: Money,
    ) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            start_date: Some(start_date),
            goal_amount: Some(goal_amount),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn attachment(mut self, upload: AttachmentUpload) -> Self {
        self.attachments.push(upload);
        self
    }
}

/// Partially update a campaign. Omitted fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct UpdateCampaignCmd {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub goal_amount: Option<Money>,
    pub status: Option<CampaignStatus>,
    /// Ids of attachments to delete. Ids that do not belong to the campaign
    /// are ignored.
    pub remove_attachments: Vec<String>,
    /// New files, appended after the existing ones.
    pub attachments: Vec<AttachmentUpload>,
}
