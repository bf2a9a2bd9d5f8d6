use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Actor, AttachmentUpload, CampaignListFilter, CampaignStatus, DonationListFilter, Engine,
    EngineError, Money, NewCampaignCmd, NewDonationCmd, Role, UpdateCampaignCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

fn admin() -> Actor {
    Actor::new("root", Role::Admin)
}

fn alice() -> Actor {
    Actor::new("alice", Role::Editor)
}

fn bob() -> Actor {
    Actor::new("bob", Role::Editor)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn money(units: i64) -> Money {
    Money::new(units * 100)
}

fn pdf(name: &str) -> AttachmentUpload {
    AttachmentUpload::new(name, "application/pdf", b"%PDF-1.4".to_vec())
}

#[tokio::test]
async fn create_campaign_starts_empty_and_stores_attachments() {
    let (engine, _db) = engine_with_db().await;

    let summary = engine
        .create_campaign(
            NewCampaignCmd::new("  Flood relief ", "Sandbags", date(2025, 1, 1), money(1000))
                .attachment(pdf("plan.pdf"))
                .attachment(pdf("budget.pdf")),
            &alice(),
        )
        .await
        .unwrap();

    assert_eq!(summary.campaign.title, "Flood relief");
    assert_eq!(summary.campaign.current_amount, Money::ZERO);
    assert_eq!(summary.campaign.status, CampaignStatus::Active);
    assert_eq!(summary.campaign.created_by, "alice");
    assert_eq!(summary.donation_count, 0);
    let names: Vec<_> = summary.attachments.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(names, vec!["plan.pdf", "budget.pdf"]);

    let content = engine
        .attachment_content(&summary.attachments[0].id.to_string())
        .await
        .unwrap();
    assert_eq!(content.data, b"%PDF-1.4".to_vec());
    assert_eq!(content.attachment.content_type, "application/pdf");
    assert_eq!(content.attachment.size, 8);
}

#[tokio::test]
async fn create_campaign_validates_fields() {
    let (engine, _db) = engine_with_db().await;

    let mut cmd = NewCampaignCmd::new("T", "D", date(2025, 2, 1), money(10));
    cmd.end_date = Some(date(2025, 1, 1));
    let err = engine.create_campaign(cmd, &alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "end_date"));

    let mut cmd = NewCampaignCmd::new("T", "D", date(2025, 2, 1), money(10));
    cmd.goal_amount = None;
    let err = engine.create_campaign(cmd, &alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "goal_amount"));

    let cmd = NewCampaignCmd::new("T", "D", date(2025, 2, 1), money(10))
        .attachment(AttachmentUpload::new("virus.exe", "application/octet-stream", vec![1]));
    let err = engine.create_campaign(cmd, &alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "attachments"));
    assert!(engine.list_campaigns(&Default::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn only_creator_or_admin_may_modify() {
    let (engine, _db) = engine_with_db().await;
    let id = engine
        .create_campaign(
            NewCampaignCmd::new("Mine", "D", date(2025, 1, 1), money(10)),
            &alice(),
        )
        .await
        .unwrap()
        .campaign
        .id
        .to_string();

    let rename = UpdateCampaignCmd {
        title: Some("Theirs".to_string()),
        ..Default::default()
    };
    let err = engine
        .update_campaign(&id, rename.clone(), &bob())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    let err = engine.delete_campaign(&id, &bob()).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let updated = engine.update_campaign(&id, rename, &admin()).await.unwrap();
    assert_eq!(updated.campaign.title, "Theirs");
    engine.delete_campaign(&id, &alice()).await.unwrap();
    assert!(matches!(
        engine.campaign(&id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));
}

#[tokio::test]
async fn update_appends_and_removes_attachments() {
    let (engine, _db) = engine_with_db().await;
    let first = engine
        .create_campaign(
            NewCampaignCmd::new("A", "D", date(2025, 1, 1), money(10)).attachment(pdf("a.pdf")),
            &alice(),
        )
        .await
        .unwrap();
    let other = engine
        .create_campaign(
            NewCampaignCmd::new("B", "D", date(2025, 1, 1), money(10)).attachment(pdf("b.pdf")),
            &alice(),
        )
        .await
        .unwrap();
    let id = first.campaign.id.to_string();

    let updated = engine
        .update_campaign(
            &id,
            UpdateCampaignCmd {
                remove_attachments: vec![
                    first.attachments[0].id.to_string(),
                    other.attachments[0].id.to_string(),
                    "not-an-id".to_string(),
                ],
                attachments: vec![pdf("c.pdf")],
                ..Default::default()
            },
            &alice(),
        )
        .await
        .unwrap();

    let names: Vec<_> = updated.attachments.iter().map(|a| a.file_name.as_str()).collect();
    assert_eq!(names, vec!["c.pdf"]);
    // Attachments of another campaign are left alone.
    assert!(
        engine
            .attachment_content(&other.attachments[0].id.to_string())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn delete_unlinks_donations_and_cascades_attachments() {
    let (engine, _db) = engine_with_db().await;
    let summary = engine
        .create_campaign(
            NewCampaignCmd::new("Gone", "D", date(2025, 1, 1), money(1000)).attachment(pdf("x.pdf")),
            &alice(),
        )
        .await
        .unwrap();
    let id = summary.campaign.id.to_string();
    let attachment_id = summary.attachments[0].id.to_string();

    let donation = engine
        .create_donation(
            NewDonationCmd::cash("Ann", money(50), date(2025, 1, 2)).campaign(&id),
            &alice(),
        )
        .await
        .unwrap();

    engine.delete_campaign(&id, &alice()).await.unwrap();

    let kept = engine.donation(&donation.id.to_string()).await.unwrap();
    assert_eq!(kept.campaign_id, None);
    assert_eq!(kept.amount, money(50));
    assert!(matches!(
        engine.attachment_content(&attachment_id).await.unwrap_err(),
        EngineError::KeyNotFound(_)
    ));

    // The unlinked donation can be deleted without touching any campaign.
    engine
        .delete_donation(&donation.id.to_string())
        .await
        .unwrap();
}

#[tokio::test]
async fn raising_the_goal_keeps_status_and_lowering_it_completes() {
    let (engine, _db) = engine_with_db().await;
    let id = engine
        .create_campaign(
            NewCampaignCmd::new("Goal", "D", date(2025, 1, 1), money(100)),
            &alice(),
        )
        .await
        .unwrap()
        .campaign
        .id
        .to_string();
    engine
        .create_donation(
            NewDonationCmd::cash("Ann", money(60), date(2025, 1, 2)).campaign(&id),
            &alice(),
        )
        .await
        .unwrap();

    let lowered = engine
        .update_campaign(
            &id,
            UpdateCampaignCmd {
                goal_amount: Some(money(50)),
                ..Default::default()
            },
            &alice(),
        )
        .await
        .unwrap();
    assert_eq!(lowered.campaign.status, CampaignStatus::Completed);

    // Completion is one-way: raising the goal again does not reopen it.
    let raised = engine
        .update_campaign(
            &id,
            UpdateCampaignCmd {
                goal_amount: Some(money(500)),
                ..Default::default()
            },
            &alice(),
        )
        .await
        .unwrap();
    assert_eq!(raised.campaign.status, CampaignStatus::Completed);
    assert_eq!(raised.campaign.current_amount, money(60));
}

#[tokio::test]
async fn zero_goal_never_completes() {
    let (engine, _db) = engine_with_db().await;
    let id = engine
        .create_campaign(
            NewCampaignCmd::new("Open", "D", date(2025, 1, 1), Money::ZERO),
            &alice(),
        )
        .await
        .unwrap()
        .campaign
        .id
        .to_string();
    engine
        .create_donation(
            NewDonationCmd::cash("Ann", money(5), date(2025, 1, 2)).campaign(&id),
            &alice(),
        )
        .await
        .unwrap();

    let detail = engine.campaign(&id).await.unwrap();
    assert_eq!(detail.campaign.status, CampaignStatus::Active);
    assert_eq!(detail.campaign.progress_percentage(), 0);
}

#[tokio::test]
async fn reconcile_rewrites_drifted_counters() {
    let (engine, db) = engine_with_db().await;
    let id = engine
        .create_campaign(
            NewCampaignCmd::new("Drift", "D", date(2025, 1, 1), money(100)),
            &alice(),
        )
        .await
        .unwrap()
        .campaign
        .id
        .to_string();
    engine
        .create_donation(
            NewDonationCmd::cash("Ann", money(120), date(2025, 1, 2)).campaign(&id),
            &alice(),
        )
        .await
        .unwrap();

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE campaigns SET current_amount_minor = 1, status = 'active' WHERE id = ?;",
        vec![id.clone().into()],
    ))
    .await
    .unwrap();

    let err = engine
        .reconcile_campaign_funding(None, &alice())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let corrections = engine
        .reconcile_campaign_funding(Some(&id), &admin())
        .await
        .unwrap();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].stored, Money::new(1));
    assert_eq!(corrections[0].recomputed, money(120));

    let detail = engine.campaign(&id).await.unwrap();
    assert_eq!(detail.campaign.current_amount, money(120));
    assert_eq!(detail.campaign.status, CampaignStatus::Completed);

    assert!(
        engine
            .reconcile_campaign_funding(None, &admin())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn list_filters_and_counts_donations() {
    let (engine, _db) = engine_with_db().await;
    let early = engine
        .create_campaign(
            NewCampaignCmd::new("Winter Coats", "D", date(2025, 1, 1), money(100)),
            &alice(),
        )
        .await
        .unwrap()
        .campaign
        .id
        .to_string();
    engine
        .create_campaign(
            NewCampaignCmd::new("Summer Water", "D", date(2025, 6, 1), money(100)),
            &bob(),
        )
        .await
        .unwrap();
    engine
        .create_donation(
            NewDonationCmd::cash("Ann", money(5), date(2025, 1, 2)).campaign(&early),
            &alice(),
        )
        .await
        .unwrap();

    let all = engine.list_campaigns(&CampaignListFilter::default()).await.unwrap();
    let titles: Vec<_> = all.iter().map(|s| s.campaign.title.as_str()).collect();
    assert_eq!(titles, vec!["Summer Water", "Winter Coats"]);
    assert_eq!(all[1].donation_count, 1);
    assert_eq!(all[0].donation_count, 0);

    let coats = engine
        .list_campaigns(&CampaignListFilter {
            title: Some("coat".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(coats.len(), 1);

    let bobs = engine
        .list_campaigns(&CampaignListFilter {
            created_by: Some("bob".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(bobs[0].campaign.title, "Summer Water");
}

#[tokio::test]
async fn donation_list_filters() {
    let (engine, _db) = engine_with_db().await;
    for (name, units, d) in [("Ann Lee", 10, 1), ("Bob", 20, 2), ("annabel", 30, 3)] {
        engine
            .create_donation(
                NewDonationCmd::cash(name, money(units), date(2025, 1, d)),
                &alice(),
            )
            .await
            .unwrap();
    }
    engine
        .create_donation(
            NewDonationCmd::goods("Ann", "soap", date(2025, 1, 4)),
            &alice(),
        )
        .await
        .unwrap();

    let anns = engine
        .list_donations(&DonationListFilter {
            donor_name: Some("ANN".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let names: Vec<_> = anns.iter().map(|d| d.donor_name.as_str()).collect();
    assert_eq!(names, vec!["Ann", "annabel", "Ann Lee"]);

    let mid = engine
        .list_donations(&DonationListFilter {
            min_amount: Some(money(15)),
            max_amount: Some(money(30)),
            date_to: Some(date(2025, 1, 2)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(mid.len(), 1);
    assert_eq!(mid[0].donor_name, "Bob");
}

#[tokio::test]
async fn dashboard_overview_aggregates() {
    let (engine, _db) = engine_with_db().await;
    let id = engine
        .create_campaign(
            NewCampaignCmd::new("Dash", "D", date(2025, 1, 1), money(200)),
            &alice(),
        )
        .await
        .unwrap()
        .campaign
        .id
        .to_string();
    engine
        .create_donation(
            NewDonationCmd::cash("Ann", money(50), date(2025, 5, 10)).campaign(&id),
            &alice(),
        )
        .await
        .unwrap();
    engine
        .create_donation(
            NewDonationCmd::cash("Bob", money(25), date(2025, 6, 1)),
            &alice(),
        )
        .await
        .unwrap();
    engine
        .create_donation(
            NewDonationCmd::cash("Old", money(1), date(2024, 1, 1)),
            &alice(),
        )
        .await
        .unwrap();
    engine
        .create_donation(
            NewDonationCmd::goods("Cy", "tents", date(2025, 6, 2)),
            &alice(),
        )
        .await
        .unwrap();

    let overview = engine.dashboard_overview(date(2025, 6, 15)).await.unwrap();
    assert_eq!(overview.donations.count, 4);
    assert_eq!(overview.donations.cash_total, money(76));
    assert_eq!(overview.donations.goods_count, 1);
    assert_eq!(overview.campaigns.count, 1);
    assert_eq!(overview.campaigns.active, 1);
    assert_eq!(overview.campaigns.raised_total, money(50));
    assert_eq!(overview.campaigns.progress_percentage, 25);
    assert_eq!(overview.recent_donations[0].donor_name, "Cy");
    assert_eq!(overview.top_campaigns.len(), 1);

    let months: Vec<_> = overview
        .monthly
        .iter()
        .map(|m| (m.month.as_str(), m.total, m.count))
        .collect();
    assert_eq!(
        months,
        vec![("2025-05", money(50), 1), ("2025-06", money(25), 1)]
    );

    let summary = engine.donation_summary().await.unwrap();
    assert_eq!(summary.totals, overview.donations);
    assert_eq!(summary.recent_donations.len(), 4);
}
