use chrono::{NaiveDate, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    Actor, Donation, DonationType, EngineError, Money, NewDonationCmd, ResultEngine,
    UpdateDonationCmd, campaigns, donations, funding,
    util::{normalize_optional_text, normalize_required_text, require_field},
};

use super::{Engine, access::parse_request_id, with_tx};

/// Filters for [`Engine::list_donations`]. Ranges are inclusive.
#[derive(Clone, Debug, Default)]
pub struct DonationListFilter {
    /// Case-insensitive substring of the donor name.
    pub donor_name: Option<String>,
    pub donation_type: Option<DonationType>,
    pub campaign_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_amount: Option<Money>,
    pub max_amount: Option<Money>,
    pub limit: Option<u64>,
}

/// Donation fields after validation; the campaign reference is not resolved
/// yet.
struct ValidDonation {
    donor_name: String,
    donation_type: DonationType,
    amount: Money,
    description: Option<String>,
    date_received: NaiveDate,
    campaign_ref: Option<Uuid>,
}

impl ValidDonation {
    fn new(
        donor_name: Option<&str>,
        donation_type: Option<DonationType>,
        amount: Option<Money>,
        description: Option<&str>,
        date_received: Option<NaiveDate>,
        campaign_id: Option<&str>,
    ) -> ResultEngine<Self> {
        let donor_name = normalize_required_text(donor_name, "donor_name")?;
        let donation_type = require_field(donation_type, "donation_type")?;
        let date_received = require_field(date_received, "date_received")?;
        let description = normalize_optional_text(description);

        let amount = amount.unwrap_or(Money::ZERO);
        if amount.is_negative() {
            return Err(EngineError::validation("amount", "amount must be >= 0"));
        }
        let amount = match donation_type {
            DonationType::Cash => {
                if !amount.is_positive() {
                    return Err(EngineError::validation(
                        "amount",
                        "cash donations must have an amount greater than 0",
                    ));
                }
                amount
            }
            DonationType::Goods => {
                if description.is_none() {
                    return Err(EngineError::validation(
                        "description",
                        "goods donations must have a description",
                    ));
                }
                Money::ZERO
            }
        };

        let campaign_ref = normalize_optional_text(campaign_id)
            .map(|id| parse_request_id(&id, "campaign"))
            .transpose()?;

        Ok(Self {
            donor_name,
            donation_type,
            amount,
            description,
            date_received,
            campaign_ref,
        })
    }
}

impl Engine {
    /// Record a donation received by `actor`.
    ///
    /// A supplied campaign must exist even though only cash donations keep the
    /// link. Retrying with the same idempotency key returns the donation
    /// created by the first attempt without touching campaign funding.
    pub async fn create_donation(
        &self,
        cmd: NewDonationCmd,
        actor: &Actor,
    ) -> ResultEngine<Donation> {
        let NewDonationCmd {
            donor_name,
            donation_type,
            amount,
            description,
            date_received,
            campaign_id,
            idempotency_key,
        } = cmd;
        let valid = ValidDonation::new(
            donor_name.as_deref(),
            donation_type,
            amount,
            description.as_deref(),
            date_received,
            campaign_id.as_deref(),
        )?;
        let idempotency_key = normalize_optional_text(idempotency_key.as_deref());

        with_tx!(self, |db_tx| {
            if let Some(key) = idempotency_key.as_deref()
                && let Some(existing) = self
                    .find_donation_by_idempotency_key(&db_tx, &actor.user_id, key)
                    .await?
            {
                debug!(donation_id = %existing.id, "idempotent donation replay");
                return self.resolve_donation(&db_tx, existing).await;
            }

            let campaign = match valid.campaign_ref {
                Some(campaign_id) => Some(self.require_campaign(&db_tx, campaign_id).await?),
                None => None,
            };
            let campaign_id = linked_campaign(valid.donation_type, valid.campaign_ref);

            let now = Utc::now();
            let donation = Donation {
                id: Uuid::new_v4(),
                donor_name: valid.donor_name,
                donation_type: valid.donation_type,
                amount: valid.amount,
                description: valid.description,
                received_by: actor.user_id.clone(),
                received_by_name: actor.username.clone(),
                date_received: valid.date_received,
                campaign_id,
                campaign_title: linked_title(campaign_id, campaign),
                idempotency_key,
                created_at: now,
                updated_at: now,
            };

            if let Err(err) = donations::ActiveModel::from(&donation).insert(&db_tx).await {
                if let Some(key) = donation.idempotency_key.as_deref()
                    && let Some(existing) = self
                        .find_donation_by_idempotency_key(&db_tx, &actor.user_id, key)
                        .await?
                {
                    return self.resolve_donation(&db_tx, existing).await;
                }
                return Err(err.into());
            }

            let plan = funding::plan(None, donation.funding_link());
            self.apply_funding_plan(&db_tx, &plan).await?;

            info!(
                donation_id = %donation.id,
                donation_type = donation.donation_type.as_str(),
                amount = %donation.amount,
                "donation recorded"
            );
            Ok(donation)
        })
    }

    /// Replace the editable fields of a donation and move its funding
    /// contribution accordingly.
    pub async fn update_donation(
        &self,
        donation_id: &str,
        cmd: UpdateDonationCmd,
    ) -> ResultEngine<Donation> {
        let id = parse_request_id(donation_id, "donation")?;

        with_tx!(self, |db_tx| {
            let existing = Donation::try_from(self.require_donation(&db_tx, id).await?)?;

            let valid = ValidDonation::new(
                cmd.donor_name.as_deref().or(Some(existing.donor_name.as_str())),
                cmd.donation_type.or(Some(existing.donation_type)),
                cmd.amount,
                cmd.description.as_deref(),
                cmd.date_received.or(Some(existing.date_received)),
                cmd.campaign_id.as_deref(),
            )?;

            let campaign = match valid.campaign_ref {
                Some(campaign_id) => Some(self.require_campaign(&db_tx, campaign_id).await?),
                None => None,
            };
            let campaign_id = linked_campaign(valid.donation_type, valid.campaign_ref);

            let updated = Donation {
                donor_name: valid.donor_name,
                donation_type: valid.donation_type,
                amount: valid.amount,
                description: valid.description,
                date_received: valid.date_received,
                campaign_id,
                campaign_title: linked_title(campaign_id, campaign),
                updated_at: Utc::now(),
                ..existing.clone()
            };

            donations::ActiveModel::from(&updated).update(&db_tx).await?;

            let plan = funding::plan(existing.funding_link(), updated.funding_link());
            self.apply_funding_plan(&db_tx, &plan).await?;

            debug!(donation_id = %id, adjustments = plan.len(), "donation updated");
            Ok(updated)
        })
    }

    /// Delete a donation, withdrawing its contribution from the linked
    /// campaign.
    pub async fn delete_donation(&self, donation_id: &str) -> ResultEngine<()> {
        let id = parse_request_id(donation_id, "donation")?;

        with_tx!(self, |db_tx| {
            let existing = Donation::try_from(self.require_donation(&db_tx, id).await?)?;

            // The row count guards against a concurrent delete of the same id.
            let result = donations::Entity::delete_by_id(id.to_string())
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::KeyNotFound("donation not exists".to_string()));
            }

            let plan = funding::plan(existing.funding_link(), None);
            self.apply_funding_plan(&db_tx, &plan).await?;

            info!(donation_id = %id, "donation deleted");
            Ok(())
        })
    }

    /// Return a single donation.
    pub async fn donation(&self, donation_id: &str) -> ResultEngine<Donation> {
        let id = parse_request_id(donation_id, "donation")?;
        let model = self.require_donation(&self.database, id).await?;
        self.resolve_donation(&self.database, model).await
    }

    /// List donations matching `filter`, most recently received first.
    pub async fn list_donations(&self, filter: &DonationListFilter) -> ResultEngine<Vec<Donation>> {
        self.query_donations(&self.database, filter).await
    }

    pub(super) async fn query_donations<C: ConnectionTrait>(
        &self,
        db: &C,
        filter: &DonationListFilter,
    ) -> ResultEngine<Vec<Donation>> {
        let mut query = donations::Entity::find();

        if let Some(name) = normalize_optional_text(filter.donor_name.as_deref()) {
            query = query.filter(
                Expr::expr(Expr::cust("LOWER(donor_name)"))
                    .like(format!("%{}%", name.to_lowercase())),
            );
        }
        if let Some(donation_type) = filter.donation_type {
            query = query.filter(donations::Column::DonationType.eq(donation_type.as_str()));
        }
        if let Some(campaign_id) = normalize_optional_text(filter.campaign_id.as_deref()) {
            let campaign_id = parse_request_id(&campaign_id, "campaign")?;
            query = query.filter(donations::Column::CampaignId.eq(campaign_id.to_string()));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(donations::Column::DateReceived.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(donations::Column::DateReceived.lte(to));
        }
        if let Some(min) = filter.min_amount {
            query = query.filter(donations::Column::AmountMinor.gte(min.minor()));
        }
        if let Some(max) = filter.max_amount {
            query = query.filter(donations::Column::AmountMinor.lte(max.minor()));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query
            .find_also_related(campaigns::Entity)
            .order_by_desc(donations::Column::DateReceived)
            .order_by_desc(donations::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(Donation::try_from)
            .collect()
    }

    /// Attach the linked campaign's title to a stored donation.
    async fn resolve_donation<C: ConnectionTrait>(
        &self,
        db: &C,
        model: donations::Model,
    ) -> ResultEngine<Donation> {
        let campaign = match model.campaign_id.as_deref() {
            Some(campaign_id) => {
                campaigns::Entity::find_by_id(campaign_id.to_string())
                    .one(db)
                    .await?
            }
            None => None,
        };
        Donation::try_from((model, campaign))
    }

    async fn find_donation_by_idempotency_key(
        &self,
        db_tx: &DatabaseTransaction,
        received_by: &str,
        key: &str,
    ) -> ResultEngine<Option<donations::Model>> {
        donations::Entity::find()
            .filter(donations::Column::ReceivedBy.eq(received_by.to_string()))
            .filter(donations::Column::IdempotencyKey.eq(key.to_string()))
            .one(db_tx)
            .await
            .map_err(Into::into)
    }
}

/// Only cash donations keep their campaign reference.
fn linked_campaign(donation_type: DonationType, campaign_id: Option<Uuid>) -> Option<Uuid> {
    match donation_type {
        DonationType::Cash => campaign_id,
        DonationType::Goods => None,
    }
}

fn linked_title(campaign_id: Option<Uuid>, campaign: Option<campaigns::Model>) -> Option<String> {
    campaign_id.and(campaign).map(|campaign| campaign.title)
}
