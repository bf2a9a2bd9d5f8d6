//! Fundraising campaigns.
//!
//! `current_amount` is a denormalized counter owned by funding
//! reconciliation: it always equals the sum of the cash donations that
//! reference the campaign. No write path accepts it as input.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, attachments::Attachment, util::parse_uuid};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    #[default]
    Active,
    Completed,
}

impl CampaignStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl TryFrom<&str> for CampaignStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(EngineError::validation(
                "status",
                format!("invalid campaign status: {other}"),
            )),
        }
    }
}

/// Whether a campaign with these amounts has reached its goal.
///
/// A zero goal is never "achieved".
pub fn check_goal_achieved(current_amount: Money, goal_amount: Money) -> bool {
    goal_amount.is_positive() && current_amount >= goal_amount
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Campaign {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub goal_amount: Money,
    pub current_amount: Money,
    pub status: CampaignStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn goal_achieved(&self) -> bool {
        check_goal_achieved(self.current_amount, self.goal_amount)
    }

    /// Percentage of the goal raised so far, rounded (0 when there is no goal).
    pub fn progress_percentage(&self) -> i64 {
        if !self.goal_amount.is_positive() {
            return 0;
        }
        (self.current_amount.minor() as f64 * 100.0 / self.goal_amount.minor() as f64).round()
            as i64
    }
}

/// A campaign as shown in listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignSummary {
    pub campaign: Campaign,
    pub attachments: Vec<Attachment>,
    pub donation_count: u64,
}

/// A campaign with its full donation history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignDetail {
    pub campaign: Campaign,
    pub attachments: Vec<Attachment>,
    pub donations: Vec<crate::Donation>,
    pub donation_count: u64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "campaigns")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub title: String,
    pub description: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub goal_amount_minor: i64,
    pub current_amount_minor: i64,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::donations::Entity")]
    Donations,
    #[sea_orm(has_many = "super::attachments::Entity")]
    Attachments,
}

impl Related<super::donations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Donations.def()
    }
}

impl Related<super::attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Campaign> for ActiveModel {
    fn from(campaign: &Campaign) -> Self {
        Self {
            id: ActiveValue::Set(campaign.id.to_string()),
            title: ActiveValue::Set(campaign.title.clone()),
            description: ActiveValue::Set(campaign.description.clone()),
            start_date: ActiveValue::Set(campaign.start_date),
            end_date: ActiveValue::Set(campaign.end_date),
            goal_amount_minor: ActiveValue::Set(campaign.goal_amount.minor()),
            current_amount_minor: ActiveValue::Set(campaign.current_amount.minor()),
            status: ActiveValue::Set(campaign.status.as_str().to_string()),
            created_by: ActiveValue::Set(campaign.created_by.clone()),
            created_at: ActiveValue::Set(campaign.created_at),
            updated_at: ActiveValue::Set(campaign.updated_at),
        }
    }
}

impl TryFrom<Model> for Campaign {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "campaign")?,
            title: model.title,
            description: model.description,
            start_date: model.start_date,
            end_date: model.end_date,
            goal_amount: Money::new(model.goal_amount_minor),
            current_amount: Money::new(model.current_amount_minor),
            status: CampaignStatus::try_from(model.status.as_str())?,
            created_by: model.created_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
