//! Dashboard statistics endpoints

use api_types::dashboard::{
    CampaignStats, DashboardOverview, DonationStats, DonationSummary, MonthlyData,
};
use axum::{Json, extract::State};
use chrono::Utc;
use engine::{CampaignTotals, DonationTotals};

use crate::{
    ServerError, campaigns::summary_view, donations::donation_view, server::ServerState,
};

fn donation_stats(totals: &DonationTotals) -> DonationStats {
    DonationStats {
        total_donations: totals.count,
        total_cash_amount: totals.cash_total.to_decimal(),
        goods_donations: totals.goods_count,
    }
}

fn campaign_stats(totals: &CampaignTotals) -> CampaignStats {
    CampaignStats {
        total_campaigns: totals.count,
        active_campaigns: totals.active,
        completed_campaigns: totals.completed,
        total_goal_amount: totals.goal_total.to_decimal(),
        total_raised_amount: totals.raised_total.to_decimal(),
        progress_percentage: totals.progress_percentage,
    }
}

pub async fn overview(
    State(state): State<ServerState>,
) -> Result<Json<DashboardOverview>, ServerError> {
    let today = Utc::now().date_naive();
    let overview = state.engine.dashboard_overview(today).await?;

    Ok(Json(DashboardOverview {
        donation_stats: donation_stats(&overview.donations),
        campaign_stats: campaign_stats(&overview.campaigns),
        recent_donations: overview.recent_donations.iter().map(donation_view).collect(),
        top_campaigns: overview.top_campaigns.iter().map(summary_view).collect(),
        monthly_data: overview
            .monthly
            .iter()
            .map(|month| MonthlyData {
                month: month.month.clone(),
                total: month.total.to_decimal(),
                count: month.count,
            })
            .collect(),
    }))
}

pub async fn donation_summary(
    State(state): State<ServerState>,
) -> Result<Json<DonationSummary>, ServerError> {
    let summary = state.engine.donation_summary().await?;

    Ok(Json(DonationSummary {
        stats: donation_stats(&summary.totals),
        recent_donations: summary.recent_donations.iter().map(donation_view).collect(),
    }))
}
