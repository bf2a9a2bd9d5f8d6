//! Donation ledger primitives.
//!
//! A `Donation` is either cash (counts towards the funding of the campaign it
//! references) or goods (never linked to a campaign, always zero amount).

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, funding::FundingLink, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationType {
    Cash,
    Goods,
}

impl DonationType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Goods => "goods",
        }
    }
}

impl TryFrom<&str> for DonationType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cash" => Ok(Self::Cash),
            "goods" => Ok(Self::Goods),
            other => Err(EngineError::validation(
                "donation_type",
                format!("invalid donation type: {other}"),
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Donation {
    pub id: Uuid,
    pub donor_name: String,
    pub donation_type: DonationType,
    pub amount: Money,
    pub description: Option<String>,
    pub received_by: String,
    /// Username of the recorder at the time the donation was received.
    pub received_by_name: Option<String>,
    pub date_received: NaiveDate,
    pub campaign_id: Option<Uuid>,
    /// Resolved on read; not stored with the donation.
    pub campaign_title: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donation {
    /// The campaign funding this donation contributes to, if any.
    pub fn funding_link(&self) -> Option<FundingLink> {
        FundingLink::of(self.donation_type, self.amount, self.campaign_id)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "donations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub donor_name: String,
    pub donation_type: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub received_by: String,
    pub received_by_name: Option<String>,
    pub date_received: Date,
    pub campaign_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::campaigns::Entity",
        from = "Column::CampaignId",
        to = "super::campaigns::Column::Id"
    )]
    Campaigns,
}

impl Related<super::campaigns::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Campaigns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Donation> for ActiveModel {
    fn from(donation: &Donation) -> Self {
        Self {
            id: ActiveValue::Set(donation.id.to_string()),
            donor_name: ActiveValue::Set(donation.donor_name.clone()),
            donation_type: ActiveValue::Set(donation.donation_type.as_str().to_string()),
            amount_minor: ActiveValue::Set(donation.amount.minor()),
            description: ActiveValue::Set(donation.description.clone()),
            received_by: ActiveValue::Set(donation.received_by.clone()),
            received_by_name: ActiveValue::Set(donation.received_by_name.clone()),
            date_received: ActiveValue::Set(donation.date_received),
            campaign_id: ActiveValue::Set(donation.campaign_id.map(|id| id.to_string())),
            idempotency_key: ActiveValue::Set(donation.idempotency_key.clone()),
            created_at: ActiveValue::Set(donation.created_at),
            updated_at: ActiveValue::Set(donation.updated_at),
        }
    }
}

impl TryFrom<Model> for Donation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "donation")?,
            donor_name: model.donor_name,
            donation_type: DonationType::try_from(model.donation_type.as_str())?,
            amount: Money::new(model.amount_minor),
            description: model.description,
            received_by: model.received_by,
            received_by_name: model.received_by_name,
            date_received: model.date_received,
            campaign_id: model
                .campaign_id
                .as_deref()
                .map(|id| parse_uuid(id, "campaign"))
                .transpose()?,
            campaign_title: None,
            idempotency_key: model.idempotency_key,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl TryFrom<(Model, Option<super::campaigns::Model>)> for Donation {
    type Error = EngineError;

    fn try_from(
        (model, campaign): (Model, Option<super::campaigns::Model>),
    ) -> Result<Self, Self::Error> {
        let mut donation = Donation::try_from(model)?;
        donation.campaign_title = campaign.map(|campaign| campaign.title);
        Ok(donation)
    }
}
