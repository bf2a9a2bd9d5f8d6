use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, Statement, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    Actor, Campaign, CampaignDetail, CampaignStatus, CampaignSummary, EngineError, Money,
    NewCampaignCmd, ResultEngine, UpdateCampaignCmd, attachments::validate_uploads, campaigns,
    util::{normalize_optional_text, normalize_required_text, require_field},
};

use super::{Engine, access::parse_request_id, donations::DonationListFilter, with_tx};

/// Filters for [`Engine::list_campaigns`].
#[derive(Clone, Debug, Default)]
pub struct CampaignListFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    pub status: Option<CampaignStatus>,
    /// Campaigns starting on or after this date.
    pub start_date_from: Option<NaiveDate>,
    /// Campaigns ending on or before this date.
    pub end_date_to: Option<NaiveDate>,
    pub created_by: Option<String>,
}

fn validate_goal(goal_amount: Money) -> ResultEngine<Money> {
    if goal_amount.is_negative() {
        return Err(EngineError::validation("goal_amount", "goal amount must be >= 0"));
    }
    Ok(goal_amount)
}

fn validate_dates(start_date: NaiveDate, end_date: Option<NaiveDate>) -> ResultEngine<()> {
    if let Some(end_date) = end_date
        && end_date < start_date
    {
        return Err(EngineError::validation(
            "end_date",
            "end date must not be before the start date",
        ));
    }
    Ok(())
}

impl Engine {
    /// Create a campaign owned by `actor`, storing its attachments in the
    /// same transaction.
    pub async fn create_campaign(
        &self,
        cmd: NewCampaignCmd,
        actor: &Actor,
    ) -> ResultEngine<CampaignSummary> {
        let NewCampaignCmd {
            title,
            description,
            start_date,
            end_date,
            goal_amount,
            status,
            attachments,
        } = cmd;

        let title = normalize_required_text(title.as_deref(), "title")?;
        let description = normalize_required_text(description.as_deref(), "description")?;
        let start_date = require_field(start_date, "start_date")?;
        let goal_amount = validate_goal(require_field(goal_amount, "goal_amount")?)?;
        validate_dates(start_date, end_date)?;
        validate_uploads(&attachments)?;

        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            title,
            description,
            start_date,
            end_date,
            goal_amount,
            current_amount: Money::ZERO,
            status: status.unwrap_or_default(),
            created_by: actor.user_id.clone(),
            created_at: now,
            updated_at: now,
        };

        with_tx!(self, |db_tx| {
            campaigns::ActiveModel::from(&campaign).insert(&db_tx).await?;
            self.store_attachments(&db_tx, campaign.id, attachments)
                .await?;

            info!(campaign_id = %campaign.id, goal = %campaign.goal_amount, "campaign created");
            self.campaign_summary(&db_tx, campaign.id).await
        })
    }

    /// Partially update a campaign. Admins may update any campaign, editors
    /// only their own.
    ///
    /// `current_amount` cannot be set here. Changing the goal without an
    /// explicit status re-runs the goal check.
    pub async fn update_campaign(
        &self,
        campaign_id: &str,
        cmd: UpdateCampaignCmd,
        actor: &Actor,
    ) -> ResultEngine<CampaignSummary> {
        let id = parse_request_id(campaign_id, "campaign")?;
        let UpdateCampaignCmd {
            title,
            description,
            start_date,
            end_date,
            goal_amount,
            status,
            remove_attachments,
            attachments,
        } = cmd;

        let title = title
            .map(|t| normalize_required_text(Some(&t), "title"))
            .transpose()?;
        let description = description
            .map(|d| normalize_required_text(Some(&d), "description"))
            .transpose()?;
        let goal_amount = goal_amount.map(validate_goal).transpose()?;
        validate_uploads(&attachments)?;

        with_tx!(self, |db_tx| {
            let model = self.require_campaign_write(&db_tx, id, actor).await?;
            validate_dates(
                start_date.unwrap_or(model.start_date),
                end_date.or(model.end_date),
            )?;

            let goal_changed =
                goal_amount.is_some_and(|goal| goal.minor() != model.goal_amount_minor);

            let mut active = campaigns::ActiveModel {
                id: ActiveValue::Unchanged(model.id.clone()),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            if let Some(title) = title {
                active.title = ActiveValue::Set(title);
            }
            if let Some(description) = description {
                active.description = ActiveValue::Set(description);
            }
            if let Some(start_date) = start_date {
                active.start_date = ActiveValue::Set(start_date);
            }
            if let Some(end_date) = end_date {
                active.end_date = ActiveValue::Set(Some(end_date));
            }
            if let Some(goal_amount) = goal_amount {
                active.goal_amount_minor = ActiveValue::Set(goal_amount.minor());
            }
            if let Some(status) = status {
                active.status = ActiveValue::Set(status.as_str().to_string());
            }
            active.update(&db_tx).await?;

            let removed = self
                .remove_attachments(&db_tx, id, &remove_attachments)
                .await?;
            let added = attachments.len();
            self.store_attachments(&db_tx, id, attachments).await?;

            if goal_changed && status.is_none() {
                self.settle_campaign_goal(&db_tx, id).await?;
            }

            info!(
                campaign_id = %id,
                attachments_removed = removed,
                attachments_added = added,
                "campaign updated"
            );
            self.campaign_summary(&db_tx, id).await
        })
    }

    /// Delete a campaign and its attachments. Donations that referenced it
    /// are kept, unlinked.
    pub async fn delete_campaign(&self, campaign_id: &str, actor: &Actor) -> ResultEngine<()> {
        let id = parse_request_id(campaign_id, "campaign")?;

        with_tx!(self, |db_tx| {
            self.require_campaign_write(&db_tx, id, actor).await?;

            let attachments = self.delete_campaign_attachments(&db_tx, id).await?;
            let unlinked = db_tx
                .execute(Statement::from_sql_and_values(
                    db_tx.get_database_backend(),
                    "UPDATE donations SET campaign_id = NULL, updated_at = ? WHERE campaign_id = ?;",
                    vec![Utc::now().into(), id.to_string().into()],
                ))
                .await?
                .rows_affected();
            campaigns::Entity::delete_by_id(id.to_string())
                .exec(&db_tx)
                .await?;

            info!(
                campaign_id = %id,
                attachments_deleted = attachments,
                donations_unlinked = unlinked,
                "campaign deleted"
            );
            Ok(())
        })
    }

    /// Return a campaign with its attachments and full donation history.
    pub async fn campaign(&self, campaign_id: &str) -> ResultEngine<CampaignDetail> {
        let id = parse_request_id(campaign_id, "campaign")?;
        let db = &self.database;

        let campaign = Campaign::try_from(self.require_campaign(db, id).await?)?;
        let donations = self
            .query_donations(
                db,
                &DonationListFilter {
                    campaign_id: Some(id.to_string()),
                    ..DonationListFilter::default()
                },
            )
            .await?;
        let attachments = self
            .attachments_by_campaign(db, vec![id.to_string()])
            .await?
            .remove(&id)
            .unwrap_or_default();

        Ok(CampaignDetail {
            campaign,
            attachments,
            donation_count: donations.len() as u64,
            donations,
        })
    }

    /// List campaigns matching `filter`, latest start date first.
    pub async fn list_campaigns(
        &self,
        filter: &CampaignListFilter,
    ) -> ResultEngine<Vec<CampaignSummary>> {
        let db = &self.database;
        let mut query = campaigns::Entity::find();

        if let Some(title) = normalize_optional_text(filter.title.as_deref()) {
            query = query.filter(
                Expr::expr(Expr::cust("LOWER(title)")).like(format!("%{}%", title.to_lowercase())),
            );
        }
        if let Some(status) = filter.status {
            query = query.filter(campaigns::Column::Status.eq(status.as_str()));
        }
        if let Some(from) = filter.start_date_from {
            query = query.filter(campaigns::Column::StartDate.gte(from));
        }
        if let Some(to) = filter.end_date_to {
            query = query.filter(campaigns::Column::EndDate.lte(to));
        }
        if let Some(created_by) = normalize_optional_text(filter.created_by.as_deref()) {
            query = query.filter(campaigns::Column::CreatedBy.eq(created_by));
        }

        let models = query
            .order_by_desc(campaigns::Column::StartDate)
            .order_by_desc(campaigns::Column::CreatedAt)
            .all(db)
            .await?;

        let counts = self.donation_counts(db, None).await?;
        let mut attachments = self
            .attachments_by_campaign(db, models.iter().map(|m| m.id.clone()).collect())
            .await?;

        models
            .into_iter()
            .map(|model| {
                let donation_count = counts.get(&model.id).copied().unwrap_or(0);
                let campaign = Campaign::try_from(model)?;
                Ok(CampaignSummary {
                    attachments: attachments.remove(&campaign.id).unwrap_or_default(),
                    donation_count,
                    campaign,
                })
            })
            .collect()
    }

    pub(super) async fn campaign_summary<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
    ) -> ResultEngine<CampaignSummary> {
        let campaign = Campaign::try_from(self.require_campaign(db, id).await?)?;
        let donation_count = self
            .donation_counts(db, Some(id))
            .await?
            .get(&id.to_string())
            .copied()
            .unwrap_or(0);
        let attachments = self
            .attachments_by_campaign(db, vec![id.to_string()])
            .await?
            .remove(&id)
            .unwrap_or_default();
        Ok(CampaignSummary {
            campaign,
            attachments,
            donation_count,
        })
    }

    /// Number of donations referencing each campaign, keyed by stored id.
    async fn donation_counts<C: ConnectionTrait>(
        &self,
        db: &C,
        campaign_id: Option<Uuid>,
    ) -> ResultEngine<HashMap<String, u64>> {
        let backend = db.get_database_backend();
        let stmt = match campaign_id {
            Some(id) => Statement::from_sql_and_values(
                backend,
                "SELECT campaign_id, COUNT(*) AS count FROM donations \
                 WHERE campaign_id = ? GROUP BY campaign_id;",
                vec![id.to_string().into()],
            ),
            None => Statement::from_string(
                backend,
                "SELECT campaign_id, COUNT(*) AS count FROM donations \
                 WHERE campaign_id IS NOT NULL GROUP BY campaign_id;",
            ),
        };
        let rows = db.query_all(stmt).await?;
        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let campaign_id: String = row.try_get("", "campaign_id")?;
            let count: i64 = row.try_get("", "count")?;
            counts.insert(campaign_id, count.max(0) as u64);
        }
        Ok(counts)
    }
}
