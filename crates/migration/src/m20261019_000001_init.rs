//! Initial schema migration.
//!
//! - `campaigns`: fundraising campaigns with their denormalized
//!   `current_amount_minor` counter
//! - `attachments`: files owned by a campaign (bytes stored inline)
//! - `donations`: the donation ledger; cash rows may reference a campaign

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Campaigns {
    Table,
    Id,
    Title,
    Description,
    StartDate,
    EndDate,
    GoalAmountMinor,
    CurrentAmountMinor,
    Status,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Attachments {
    Table,
    Id,
    CampaignId,
    FileName,
    ContentType,
    Size,
    Position,
    FileData,
    CreatedAt,
}

#[derive(Iden)]
enum Donations {
    Table,
    Id,
    DonorName,
    DonationType,
    AmountMinor,
    Description,
    ReceivedBy,
    ReceivedByName,
    DateReceived,
    CampaignId,
    IdempotencyKey,
    CreatedAt,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Campaigns
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Campaigns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Campaigns::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Campaigns::Title).string().not_null())
                    .col(ColumnDef::new(Campaigns::Description).text().not_null())
                    .col(ColumnDef::new(Campaigns::StartDate).date().not_null())
                    .col(ColumnDef::new(Campaigns::EndDate).date())
                    .col(
                        ColumnDef::new(Campaigns::GoalAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Campaigns::CurrentAmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Campaigns::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Campaigns::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Campaigns::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Campaigns::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-campaigns-status")
                    .table(Campaigns::Table)
                    .col(Campaigns::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-campaigns-created_by")
                    .table(Campaigns::Table)
                    .col(Campaigns::CreatedBy)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Attachments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Attachments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attachments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attachments::CampaignId).string().not_null())
                    .col(ColumnDef::new(Attachments::FileName).string().not_null())
                    .col(ColumnDef::new(Attachments::ContentType).string().not_null())
                    .col(ColumnDef::new(Attachments::Size).big_integer().not_null())
                    .col(ColumnDef::new(Attachments::Position).integer().not_null())
                    .col(ColumnDef::new(Attachments::FileData).blob().not_null())
                    .col(ColumnDef::new(Attachments::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-attachments-campaign_id")
                            .from(Attachments::Table, Attachments::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-attachments-campaign_id-position")
                    .table(Attachments::Table)
                    .col(Attachments::CampaignId)
                    .col(Attachments::Position)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Donations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Donations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Donations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Donations::DonorName).string().not_null())
                    .col(ColumnDef::new(Donations::DonationType).string().not_null())
                    .col(
                        ColumnDef::new(Donations::AmountMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Donations::Description).text())
                    .col(ColumnDef::new(Donations::ReceivedBy).string().not_null())
                    .col(ColumnDef::new(Donations::ReceivedByName).string())
                    .col(ColumnDef::new(Donations::DateReceived).date().not_null())
                    .col(ColumnDef::new(Donations::CampaignId).string())
                    .col(ColumnDef::new(Donations::IdempotencyKey).string())
                    .col(ColumnDef::new(Donations::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Donations::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-donations-campaign_id")
                            .from(Donations::Table, Donations::CampaignId)
                            .to(Campaigns::Table, Campaigns::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-donations-campaign_id")
                    .table(Donations::Table)
                    .col(Donations::CampaignId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-donations-donation_type")
                    .table(Donations::Table)
                    .col(Donations::DonationType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-donations-date_received")
                    .table(Donations::Table)
                    .col(Donations::DateReceived)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-donations-received_by-idempotency_key")
                    .table(Donations::Table)
                    .col(Donations::ReceivedBy)
                    .col(Donations::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Donations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Attachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Campaigns::Table).to_owned())
            .await?;
        Ok(())
    }
}
