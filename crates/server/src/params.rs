//! Conversions from wire values into engine values.
//!
//! Every failure is reported as a validation error on the offending field.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use engine::{CampaignStatus, DonationType, EngineError, Money};

use crate::ServerError;

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, ServerError> {
    non_empty(value)
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ServerError::from(EngineError::validation(
                    field,
                    format!("invalid date {raw:?}, expected YYYY-MM-DD"),
                ))
            })
        })
        .transpose()
}

pub(crate) fn money(value: Option<f64>, field: &str) -> Result<Option<Money>, ServerError> {
    value
        .map(|v| Money::from_decimal(v, field).map_err(ServerError::from))
        .transpose()
}

pub(crate) fn donation_type(value: Option<&str>) -> Result<Option<DonationType>, ServerError> {
    non_empty(value)
        .map(|raw| DonationType::try_from(raw).map_err(ServerError::from))
        .transpose()
}

pub(crate) fn campaign_status(value: Option<&str>) -> Result<Option<CampaignStatus>, ServerError> {
    non_empty(value)
        .map(|raw| CampaignStatus::try_from(raw).map_err(ServerError::from))
        .transpose()
}

pub(crate) fn timestamp(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    value.fixed_offset()
}
