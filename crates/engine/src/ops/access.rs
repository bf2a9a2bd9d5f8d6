use sea_orm::{ConnectionTrait, prelude::*};
use uuid::Uuid;

use crate::{Actor, EngineError, ResultEngine, campaigns, donations};

/// Parse an id supplied by a caller.
pub(super) fn parse_request_id(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| EngineError::InvalidId(format!("invalid {label} id: {value}")))
}

/// Only admins may run `action`.
pub(super) fn require_admin(actor: &Actor, action: &str) -> ResultEngine<()> {
    if !actor.is_admin() {
        return Err(EngineError::Forbidden(format!("admin access required to {action}")));
    }
    Ok(())
}

impl super::Engine {
    pub(super) async fn require_donation<C: ConnectionTrait>(
        &self,
        db: &C,
        donation_id: Uuid,
    ) -> ResultEngine<donations::Model> {
        donations::Entity::find_by_id(donation_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("donation not exists".to_string()))
    }

    pub(super) async fn require_campaign<C: ConnectionTrait>(
        &self,
        db: &C,
        campaign_id: Uuid,
    ) -> ResultEngine<campaigns::Model> {
        campaigns::Entity::find_by_id(campaign_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("campaign not exists".to_string()))
    }

    /// Load a campaign the actor may modify: admins may modify any campaign,
    /// editors only the ones they created.
    pub(super) async fn require_campaign_write<C: ConnectionTrait>(
        &self,
        db: &C,
        campaign_id: Uuid,
        actor: &Actor,
    ) -> ResultEngine<campaigns::Model> {
        let model = self.require_campaign(db, campaign_id).await?;
        if !actor.is_admin() && model.created_by != actor.user_id {
            return Err(EngineError::Forbidden(
                "not authorized to modify this campaign".to_string(),
            ));
        }
        Ok(model)
    }
}
