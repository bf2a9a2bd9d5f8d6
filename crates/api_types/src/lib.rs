use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plain `{"message": ...}` response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

pub mod donation {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum DonationType {
        Cash,
        Goods,
    }

    /// Create payload.
    ///
    /// Type and date are kept as strings so that malformed values come back
    /// as a validation error naming the field instead of a generic decode
    /// failure.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DonationNew {
        pub donor_name: Option<String>,
        pub donation_type: Option<String>,
        /// Decimal amount, at most two fractional digits.
        pub amount: Option<f64>,
        pub description: Option<String>,
        /// `YYYY-MM-DD`
        pub date_received: Option<String>,
        pub campaign_id: Option<String>,
        pub idempotency_key: Option<String>,
    }

    /// Update payload. Omitted `donor_name`, `donation_type` and
    /// `date_received` keep their stored values; the rest is replaced.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DonationUpdate {
        pub donor_name: Option<String>,
        pub donation_type: Option<String>,
        pub amount: Option<f64>,
        pub description: Option<String>,
        pub date_received: Option<String>,
        pub campaign_id: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DonationListQuery {
        pub donor_name: Option<String>,
        pub donation_type: Option<String>,
        pub campaign_id: Option<String>,
        #[serde(alias = "start_date")]
        pub date_from: Option<String>,
        #[serde(alias = "end_date")]
        pub date_to: Option<String>,
        pub min_amount: Option<f64>,
        pub max_amount: Option<f64>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct DonationView {
        pub id: Uuid,
        pub donor_name: String,
        pub donation_type: DonationType,
        pub amount: f64,
        pub description: Option<String>,
        pub received_by: String,
        #[serde(default)]
        pub received_by_username: Option<String>,
        pub date_received: NaiveDate,
        pub campaign_id: Option<Uuid>,
        #[serde(default)]
        pub campaign_title: Option<String>,
        pub created_at: DateTime<FixedOffset>,
        pub updated_at: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DonationList {
        pub donations: Vec<DonationView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DonationEnvelope {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub message: Option<String>,
        pub donation: DonationView,
    }
}

pub mod campaign {
    use super::*;
    use crate::donation::DonationView;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CampaignStatus {
        Active,
        Completed,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CampaignNew {
        pub title: Option<String>,
        pub description: Option<String>,
        pub start_date: Option<String>,
        pub end_date: Option<String>,
        pub goal_amount: Option<f64>,
        pub status: Option<String>,
    }

    /// Partial update. `current_amount` is not accepted.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CampaignUpdate {
        pub title: Option<String>,
        pub description: Option<String>,
        pub start_date: Option<String>,
        pub end_date: Option<String>,
        pub goal_amount: Option<f64>,
        pub status: Option<String>,
        /// Attachment ids to delete.
        #[serde(default)]
        pub remove_attachments: Vec<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CampaignListQuery {
        pub title: Option<String>,
        pub status: Option<String>,
        #[serde(alias = "start_date")]
        pub start_date_from: Option<String>,
        #[serde(alias = "end_date")]
        pub end_date_to: Option<String>,
        pub created_by: Option<String>,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct AttachmentView {
        pub id: Uuid,
        pub file_name: String,
        pub content_type: String,
        pub size: i64,
        /// Relative download path.
        pub url: String,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CampaignView {
        pub id: Uuid,
        pub title: String,
        pub description: String,
        pub start_date: NaiveDate,
        pub end_date: Option<NaiveDate>,
        pub goal_amount: f64,
        pub current_amount: f64,
        pub status: CampaignStatus,
        pub progress_percentage: i64,
        pub created_by: String,
        pub created_at: DateTime<FixedOffset>,
        pub updated_at: DateTime<FixedOffset>,
        pub attachments: Vec<AttachmentView>,
        pub donation_count: u64,
        /// Present on single-campaign reads only.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub donations: Option<Vec<DonationView>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignList {
        pub campaigns: Vec<CampaignView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignEnvelope {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub message: Option<String>,
        pub campaign: CampaignView,
    }
}

pub mod reconcile {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundingCorrectionView {
        pub campaign_id: Uuid,
        pub stored: f64,
        pub recomputed: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReconcileResponse {
        pub message: String,
        pub corrections: Vec<FundingCorrectionView>,
    }
}

pub mod dashboard {
    use super::*;
    use crate::{campaign::CampaignView, donation::DonationView};

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DonationStats {
        pub total_donations: u64,
        pub total_cash_amount: f64,
        pub goods_donations: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CampaignStats {
        pub total_campaigns: u64,
        pub active_campaigns: u64,
        pub completed_campaigns: u64,
        pub total_goal_amount: f64,
        pub total_raised_amount: f64,
        pub progress_percentage: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyData {
        /// `YYYY-MM`
        pub month: String,
        pub total: f64,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DashboardOverview {
        pub donation_stats: DonationStats,
        pub campaign_stats: CampaignStats,
        pub recent_donations: Vec<DonationView>,
        pub top_campaigns: Vec<CampaignView>,
        pub monthly_data: Vec<MonthlyData>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DonationSummary {
        #[serde(flatten)]
        pub stats: DonationStats,
        pub recent_donations: Vec<DonationView>,
    }
}
