use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryFilter, Statement, TransactionTrait, prelude::*,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    Actor, CampaignStatus, DonationType, EngineError, FundingAdjustment, Money, ResultEngine,
    campaigns, util::parse_uuid,
};

use super::{
    Engine,
    access::{parse_request_id, require_admin},
    with_tx,
};

/// A campaign whose stored `current_amount` disagreed with its donations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundingCorrection {
    pub campaign_id: Uuid,
    pub stored: Money,
    pub recomputed: Money,
}

impl Engine {
    /// Apply every adjustment of a funding plan inside `db_tx`.
    ///
    /// Each adjustment is one atomic `UPDATE`, followed by the goal check for
    /// the same campaign.
    pub(super) async fn apply_funding_plan(
        &self,
        db_tx: &DatabaseTransaction,
        adjustments: &[FundingAdjustment],
    ) -> ResultEngine<()> {
        for adjustment in adjustments {
            self.apply_funding_adjustment(db_tx, adjustment).await?;
            self.settle_campaign_goal(db_tx, adjustment.campaign_id)
                .await?;
        }
        Ok(())
    }

    async fn apply_funding_adjustment(
        &self,
        db_tx: &DatabaseTransaction,
        adjustment: &FundingAdjustment,
    ) -> ResultEngine<()> {
        let backend = db_tx.get_database_backend();
        let campaign_id = adjustment.campaign_id.to_string();

        let result = db_tx
            .execute(Statement::from_sql_and_values(
                backend,
                "UPDATE campaigns SET current_amount_minor = current_amount_minor + ? WHERE id = ?;",
                vec![adjustment.delta.minor().into(), campaign_id.clone().into()],
            ))
            .await?;
        if result.rows_affected() == 0 {
            error!(
                campaign_id = %campaign_id,
                delta = %adjustment.delta,
                "funding adjustment targets a missing campaign"
            );
            return Err(EngineError::FundingDrift(format!(
                "campaign {campaign_id} missing while applying {}",
                adjustment.delta
            )));
        }

        let current: i64 = {
            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT current_amount_minor AS current FROM campaigns WHERE id = ?;",
                vec![campaign_id.clone().into()],
            );
            match db_tx.query_one(stmt).await? {
                Some(row) => row.try_get("", "current")?,
                None => {
                    return Err(EngineError::FundingDrift(format!(
                        "campaign {campaign_id} vanished after applying {}",
                        adjustment.delta
                    )));
                }
            }
        };
        if current < 0 {
            error!(
                campaign_id = %campaign_id,
                current_amount = %Money::new(current),
                delta = %adjustment.delta,
                "campaign funding went negative"
            );
        }
        Ok(())
    }

    /// Flip an active campaign to completed once its goal is reached.
    ///
    /// The transition is one-way; completed campaigns are never reopened here.
    pub(super) async fn settle_campaign_goal<C: ConnectionTrait>(
        &self,
        db: &C,
        campaign_id: Uuid,
    ) -> ResultEngine<bool> {
        let backend = db.get_database_backend();
        let result = db
            .execute(Statement::from_sql_and_values(
                backend,
                "UPDATE campaigns SET status = ?, updated_at = ? \
                 WHERE id = ? AND status = ? \
                 AND goal_amount_minor > 0 AND current_amount_minor >= goal_amount_minor;",
                vec![
                    CampaignStatus::Completed.as_str().into(),
                    Utc::now().into(),
                    campaign_id.to_string().into(),
                    CampaignStatus::Active.as_str().into(),
                ],
            ))
            .await?;
        let completed = result.rows_affected() > 0;
        if completed {
            info!(campaign_id = %campaign_id, "campaign reached its goal");
        }
        Ok(completed)
    }

    /// Recompute `current_amount` from the donation ledger for one campaign
    /// (or all of them when `campaign_id` is `None`) and rewrite the counters
    /// that drifted.
    ///
    /// Returns the corrected campaigns. Admin only.
    pub async fn reconcile_campaign_funding(
        &self,
        campaign_id: Option<&str>,
        actor: &Actor,
    ) -> ResultEngine<Vec<FundingCorrection>> {
        require_admin(actor, "reconcile campaign funding")?;
        let campaign_uuid = campaign_id
            .map(|id| parse_request_id(id, "campaign"))
            .transpose()?;

        with_tx!(self, |db_tx| {
            let mut query = campaigns::Entity::find();
            if let Some(id) = campaign_uuid {
                self.require_campaign(&db_tx, id).await?;
                query = query.filter(campaigns::Column::Id.eq(id.to_string()));
            }
            let campaign_models = query.all(&db_tx).await?;

            let totals = self.ledger_totals(&db_tx).await?;

            let mut corrections = Vec::new();
            for model in campaign_models {
                let stored = Money::new(model.current_amount_minor);
                let recomputed = totals.get(&model.id).copied().unwrap_or(Money::ZERO);
                if stored == recomputed {
                    continue;
                }
                let id = parse_uuid(&model.id, "campaign")?;
                warn!(
                    campaign_id = %id,
                    stored = %stored,
                    recomputed = %recomputed,
                    "campaign funding drifted, rewriting counter"
                );
                db_tx
                    .execute(Statement::from_sql_and_values(
                        db_tx.get_database_backend(),
                        "UPDATE campaigns SET current_amount_minor = ?, updated_at = ? WHERE id = ?;",
                        vec![recomputed.minor().into(), Utc::now().into(), model.id.clone().into()],
                    ))
                    .await?;
                self.settle_campaign_goal(&db_tx, id).await?;
                corrections.push(FundingCorrection {
                    campaign_id: id,
                    stored,
                    recomputed,
                });
            }
            Ok(corrections)
        })
    }

    /// Sum of cash donations per referenced campaign id.
    async fn ledger_totals(&self, db_tx: &DatabaseTransaction) -> ResultEngine<HashMap<String, Money>> {
        let stmt = Statement::from_sql_and_values(
            db_tx.get_database_backend(),
            "SELECT campaign_id, COALESCE(SUM(amount_minor), 0) AS total \
             FROM donations \
             WHERE donation_type = ? AND campaign_id IS NOT NULL \
             GROUP BY campaign_id;",
            vec![DonationType::Cash.as_str().into()],
        );
        let rows = db_tx.query_all(stmt).await?;
        let mut totals = HashMap::with_capacity(rows.len());
        for row in rows {
            let campaign_id: String = row.try_get("", "campaign_id")?;
            let total: i64 = row.try_get("", "total")?;
            totals.insert(campaign_id, Money::new(total));
        }
        Ok(totals)
    }
}
