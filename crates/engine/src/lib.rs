//! Domain core of the relief desk: the donation ledger, campaigns with their
//! attachments, and the funding reconciliation that keeps each campaign's
//! `current_amount` equal to the cash donations attributed to it.

pub use attachments::{
    ALLOWED_EXTENSIONS, Attachment, AttachmentContent, AttachmentUpload, MAX_FILE_SIZE,
    MAX_FILES_PER_REQUEST,
};
pub use campaigns::{Campaign, CampaignDetail, CampaignStatus, CampaignSummary, check_goal_achieved};
pub use commands::{NewCampaignCmd, NewDonationCmd, UpdateCampaignCmd, UpdateDonationCmd};
pub use donations::{Donation, DonationType};
pub use error::EngineError;
pub use funding::{FundingAdjustment, FundingLink};
pub use money::Money;
pub use ops::{
    CampaignListFilter, DashboardOverview, DonationListFilter, DonationSummary, DonationTotals,
    CampaignTotals, Engine, EngineBuilder, FundingCorrection, MonthlyTotal,
};
pub use users::{Actor, Role};

pub mod attachments;
pub mod campaigns;
mod commands;
pub mod donations;
mod error;
pub mod funding;
mod money;
mod ops;
mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
