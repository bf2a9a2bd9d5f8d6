use chrono::{Months, NaiveDate};
use sea_orm::{
    ConnectionTrait, DatabaseTransaction, QueryOrder, QuerySelect, Statement, TransactionTrait,
    prelude::*,
};

use crate::{
    CampaignStatus, CampaignSummary, Donation, DonationType, Money, ResultEngine, campaigns,
    util::parse_uuid,
};

use super::{Engine, donations::DonationListFilter, with_tx};

const RECENT_DONATIONS: u64 = 5;
const TOP_CAMPAIGNS: u64 = 3;
const TREND_MONTHS: u32 = 6;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DonationTotals {
    pub count: u64,
    pub cash_total: Money,
    pub goods_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CampaignTotals {
    pub count: u64,
    pub active: u64,
    pub completed: u64,
    pub goal_total: Money,
    pub raised_total: Money,
    /// `raised_total / goal_total`, in percent, rounded. 0 without goals.
    pub progress_percentage: i64,
}

/// Cash received in one calendar month (`YYYY-MM`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthlyTotal {
    pub month: String,
    pub total: Money,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardOverview {
    pub donations: DonationTotals,
    pub campaigns: CampaignTotals,
    pub recent_donations: Vec<Donation>,
    pub top_campaigns: Vec<CampaignSummary>,
    pub monthly: Vec<MonthlyTotal>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DonationSummary {
    pub totals: DonationTotals,
    pub recent_donations: Vec<Donation>,
}

async fn scalar_i64(db_tx: &DatabaseTransaction, stmt: Statement) -> ResultEngine<i64> {
    match db_tx.query_one(stmt).await? {
        Some(row) => Ok(row.try_get("", "value")?),
        None => Ok(0),
    }
}

impl Engine {
    /// Aggregated donation and campaign statistics as of `today`.
    pub async fn dashboard_overview(&self, today: NaiveDate) -> ResultEngine<DashboardOverview> {
        with_tx!(self, |db_tx| {
            let donations = self.donation_totals(&db_tx).await?;
            let campaigns = self.campaign_totals(&db_tx).await?;
            let recent_donations = self.recent_donations(&db_tx).await?;

            let top_ids = campaigns::Entity::find()
                .order_by_desc(campaigns::Column::CurrentAmountMinor)
                .order_by_asc(campaigns::Column::Title)
                .limit(TOP_CAMPAIGNS)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|model| parse_uuid(&model.id, "campaign"))
                .collect::<ResultEngine<Vec<_>>>()?;
            let mut top_campaigns = Vec::with_capacity(top_ids.len());
            for id in top_ids {
                top_campaigns.push(self.campaign_summary(&db_tx, id).await?);
            }

            let since = today
                .checked_sub_months(Months::new(TREND_MONTHS))
                .unwrap_or(NaiveDate::MIN);
            let monthly = self.monthly_cash_totals(&db_tx, since).await?;

            Ok(DashboardOverview {
                donations,
                campaigns,
                recent_donations,
                top_campaigns,
                monthly,
            })
        })
    }

    /// Donation totals plus the most recent donations.
    pub async fn donation_summary(&self) -> ResultEngine<DonationSummary> {
        with_tx!(self, |db_tx| {
            Ok(DonationSummary {
                totals: self.donation_totals(&db_tx).await?,
                recent_donations: self.recent_donations(&db_tx).await?,
            })
        })
    }

    async fn recent_donations(&self, db_tx: &DatabaseTransaction) -> ResultEngine<Vec<Donation>> {
        self.query_donations(
            db_tx,
            &DonationListFilter {
                limit: Some(RECENT_DONATIONS),
                ..DonationListFilter::default()
            },
        )
        .await
    }

    async fn donation_totals(&self, db_tx: &DatabaseTransaction) -> ResultEngine<DonationTotals> {
        let backend = db_tx.get_database_backend();

        let count = scalar_i64(
            db_tx,
            Statement::from_string(backend, "SELECT COUNT(*) AS value FROM donations;"),
        )
        .await?;
        let cash_total = scalar_i64(
            db_tx,
            Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(amount_minor), 0) AS value FROM donations WHERE donation_type = ?;",
                vec![DonationType::Cash.as_str().into()],
            ),
        )
        .await?;
        let goods_count = scalar_i64(
            db_tx,
            Statement::from_sql_and_values(
                backend,
                "SELECT COUNT(*) AS value FROM donations WHERE donation_type = ?;",
                vec![DonationType::Goods.as_str().into()],
            ),
        )
        .await?;

        Ok(DonationTotals {
            count: count.max(0) as u64,
            cash_total: Money::new(cash_total),
            goods_count: goods_count.max(0) as u64,
        })
    }

    async fn campaign_totals(&self, db_tx: &DatabaseTransaction) -> ResultEngine<CampaignTotals> {
        let backend = db_tx.get_database_backend();
        let by_status = |status: CampaignStatus| {
            Statement::from_sql_and_values(
                backend,
                "SELECT COUNT(*) AS value FROM campaigns WHERE status = ?;",
                vec![status.as_str().into()],
            )
        };

        let count = scalar_i64(
            db_tx,
            Statement::from_string(backend, "SELECT COUNT(*) AS value FROM campaigns;"),
        )
        .await?;
        let active = scalar_i64(db_tx, by_status(CampaignStatus::Active)).await?;
        let completed = scalar_i64(db_tx, by_status(CampaignStatus::Completed)).await?;
        let goal_total = scalar_i64(
            db_tx,
            Statement::from_string(
                backend,
                "SELECT COALESCE(SUM(goal_amount_minor), 0) AS value FROM campaigns;",
            ),
        )
        .await?;
        let raised_total = scalar_i64(
            db_tx,
            Statement::from_string(
                backend,
                "SELECT COALESCE(SUM(current_amount_minor), 0) AS value FROM campaigns;",
            ),
        )
        .await?;

        let progress_percentage = if goal_total > 0 {
            (raised_total as f64 * 100.0 / goal_total as f64).round() as i64
        } else {
            0
        };

        Ok(CampaignTotals {
            count: count.max(0) as u64,
            active: active.max(0) as u64,
            completed: completed.max(0) as u64,
            goal_total: Money::new(goal_total),
            raised_total: Money::new(raised_total),
            progress_percentage,
        })
    }

    /// Cash totals per month for donations received on or after `since`,
    /// oldest month first.
    async fn monthly_cash_totals(
        &self,
        db_tx: &DatabaseTransaction,
        since: NaiveDate,
    ) -> ResultEngine<Vec<MonthlyTotal>> {
        let stmt = Statement::from_sql_and_values(
            db_tx.get_database_backend(),
            "SELECT strftime('%Y-%m', date_received) AS month, \
             COALESCE(SUM(amount_minor), 0) AS total, COUNT(*) AS count \
             FROM donations \
             WHERE donation_type = ? AND date_received >= ? \
             GROUP BY month ORDER BY month ASC;",
            vec![DonationType::Cash.as_str().into(), since.into()],
        );
        let rows = db_tx.query_all(stmt).await?;
        let mut monthly = Vec::with_capacity(rows.len());
        for row in rows {
            let month: String = row.try_get("", "month")?;
            let total: i64 = row.try_get("", "total")?;
            let count: i64 = row.try_get("", "count")?;
            monthly.push(MonthlyTotal {
                month,
                total: Money::new(total),
                count: count.max(0) as u64,
            });
        }
        Ok(monthly)
    }
}
