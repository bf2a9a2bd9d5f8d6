use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Actor, CampaignStatus, DonationListFilter, DonationType, Engine, EngineError, Money,
    NewCampaignCmd, NewDonationCmd, Role, UpdateDonationCmd,
};
use migration::MigratorTrait;
use tokio::task::JoinSet;

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

fn alice() -> Actor {
    Actor::new("alice", Role::Editor)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn money(units: i64) -> Money {
    Money::new(units * 100)
}

async fn new_campaign(engine: &Engine, title: &str, goal: Money) -> String {
    engine
        .create_campaign(
            NewCampaignCmd::new(title, "Relief fund", day(1), goal),
            &alice(),
        )
        .await
        .unwrap()
        .campaign
        .id
        .to_string()
}

async fn current_amount(engine: &Engine, campaign_id: &str) -> Money {
    engine
        .campaign(campaign_id)
        .await
        .unwrap()
        .campaign
        .current_amount
}

/// Every campaign's counter equals the sum of its linked cash donations.
async fn assert_funding_consistent(engine: &Engine) {
    let campaigns = engine.list_campaigns(&Default::default()).await.unwrap();
    let donations = engine
        .list_donations(&DonationListFilter::default())
        .await
        .unwrap();
    for summary in campaigns {
        let expected = donations
            .iter()
            .filter(|d| {
                d.donation_type == DonationType::Cash && d.campaign_id == Some(summary.campaign.id)
            })
            .fold(Money::ZERO, |acc, d| acc + d.amount);
        assert_eq!(
            summary.campaign.current_amount, expected,
            "campaign {} drifted",
            summary.campaign.title
        );
    }
}

#[tokio::test]
async fn cash_donations_accumulate_and_complete_goal() {
    let (engine, _db) = engine_with_db().await;
    let c = new_campaign(&engine, "Flood", money(1000)).await;

    engine
        .create_donation(NewDonationCmd::cash("Ann", money(600), day(2)).campaign(&c), &alice())
        .await
        .unwrap();
    assert_eq!(current_amount(&engine, &c).await, money(600));
    let detail = engine.campaign(&c).await.unwrap();
    assert_eq!(detail.campaign.status, CampaignStatus::Active);

    engine
        .create_donation(NewDonationCmd::cash("Bob", money(500), day(3)).campaign(&c), &alice())
        .await
        .unwrap();
    let detail = engine.campaign(&c).await.unwrap();
    assert_eq!(detail.campaign.current_amount, money(1100));
    assert!(detail.campaign.goal_achieved());
    assert_eq!(detail.campaign.status, CampaignStatus::Completed);
    assert_eq!(detail.donation_count, 2);
    assert_eq!(detail.donations[0].donor_name, "Bob");

    assert_funding_consistent(&engine).await;
}

#[tokio::test]
async fn moving_a_donation_between_campaigns_moves_its_amount() {
    let (engine, _db) = engine_with_db().await;
    let c1 = new_campaign(&engine, "Shelter", money(5000)).await;
    let c2 = new_campaign(&engine, "Water", money(5000)).await;

    let donation = engine
        .create_donation(NewDonationCmd::cash("Ann", money(300), day(2)).campaign(&c1), &alice())
        .await
        .unwrap();
    engine
        .update_donation(
            &donation.id.to_string(),
            UpdateDonationCmd::cash(money(300)).campaign(&c2),
        )
        .await
        .unwrap();

    assert_eq!(current_amount(&engine, &c1).await, Money::ZERO);
    assert_eq!(current_amount(&engine, &c2).await, money(300));
    assert_funding_consistent(&engine).await;
}

#[tokio::test]
async fn changing_the_amount_applies_only_the_difference() {
    let (engine, _db) = engine_with_db().await;
    let c = new_campaign(&engine, "Food", money(5000)).await;

    let donation = engine
        .create_donation(NewDonationCmd::cash("Ann", money(200), day(2)).campaign(&c), &alice())
        .await
        .unwrap();
    let updated = engine
        .update_donation(
            &donation.id.to_string(),
            UpdateDonationCmd::cash(money(150)).campaign(&c),
        )
        .await
        .unwrap();

    assert_eq!(updated.amount, money(150));
    assert_eq!(updated.donor_name, "Ann");
    assert_eq!(updated.date_received, day(2));
    assert_eq!(current_amount(&engine, &c).await, money(150));
}

#[tokio::test]
async fn deleting_a_donation_withdraws_it_once() {
    let (engine, _db) = engine_with_db().await;
    let c = new_campaign(&engine, "Medicine", money(5000)).await;

    let donation = engine
        .create_donation(NewDonationCmd::cash("Ann", money(400), day(2)).campaign(&c), &alice())
        .await
        .unwrap();
    let id = donation.id.to_string();

    engine.delete_donation(&id).await.unwrap();
    assert_eq!(current_amount(&engine, &c).await, Money::ZERO);

    let err = engine.delete_donation(&id).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("donation not exists".to_string()));
    assert_eq!(current_amount(&engine, &c).await, Money::ZERO);
}

#[tokio::test]
async fn goods_donations_never_fund_a_campaign() {
    let (engine, _db) = engine_with_db().await;
    let c = new_campaign(&engine, "Winter", money(100)).await;

    let mut cmd = NewDonationCmd::goods("Ann", "blankets", day(2)).campaign(&c);
    cmd.amount = Some(money(50));
    let donation = engine.create_donation(cmd, &alice()).await.unwrap();

    assert_eq!(donation.donation_type, DonationType::Goods);
    assert_eq!(donation.amount, Money::ZERO);
    assert_eq!(donation.campaign_id, None);
    assert_eq!(current_amount(&engine, &c).await, Money::ZERO);

    let detail = engine.campaign(&c).await.unwrap();
    assert_eq!(detail.donation_count, 0);
}

#[tokio::test]
async fn goods_donation_with_unknown_campaign_is_not_found() {
    let (engine, _db) = engine_with_db().await;

    let cmd = NewDonationCmd::goods("Ann", "rice", day(2))
        .campaign("6d0f4f7e-3c3b-4a0e-9a55-0f6a3b8f2b11");
    let err = engine.create_donation(cmd, &alice()).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("campaign not exists".to_string()));
}

#[tokio::test]
async fn cash_requires_a_positive_amount() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .create_donation(NewDonationCmd::cash("Ann", Money::ZERO, day(2)), &alice())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "amount"));

    let donation = engine
        .create_donation(NewDonationCmd::cash("Ann", Money::new(1), day(2)), &alice())
        .await
        .unwrap();
    assert_eq!(donation.amount, Money::new(1));
}

#[tokio::test]
async fn missing_required_fields_are_named() {
    let (engine, _db) = engine_with_db().await;

    let mut cmd = NewDonationCmd::cash("  ", money(10), day(2));
    let err = engine.create_donation(cmd.clone(), &alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "donor_name"));

    cmd.donor_name = Some("Ann".to_string());
    cmd.date_received = None;
    let err = engine.create_donation(cmd, &alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "date_received"));

    let mut goods = NewDonationCmd::goods("Ann", "", day(2));
    goods.description = None;
    let err = engine.create_donation(goods, &alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation { ref field, .. } if field == "description"));
}

#[tokio::test]
async fn switching_type_moves_funding_in_and_out() {
    let (engine, _db) = engine_with_db().await;
    let c = new_campaign(&engine, "School", money(5000)).await;

    let donation = engine
        .create_donation(NewDonationCmd::cash("Ann", money(700), day(2)).campaign(&c), &alice())
        .await
        .unwrap();
    let id = donation.id.to_string();

    let goods = engine
        .update_donation(&id, UpdateDonationCmd::goods("books").campaign(&c))
        .await
        .unwrap();
    assert_eq!(goods.campaign_id, None);
    assert_eq!(current_amount(&engine, &c).await, Money::ZERO);

    engine
        .update_donation(&id, UpdateDonationCmd::cash(money(250)).campaign(&c))
        .await
        .unwrap();
    assert_eq!(current_amount(&engine, &c).await, money(250));
    assert_funding_consistent(&engine).await;
}

#[tokio::test]
async fn omitted_campaign_on_update_unlinks() {
    let (engine, _db) = engine_with_db().await;
    let c = new_campaign(&engine, "Roads", money(5000)).await;

    let donation = engine
        .create_donation(NewDonationCmd::cash("Ann", money(80), day(2)).campaign(&c), &alice())
        .await
        .unwrap();
    let updated = engine
        .update_donation(&donation.id.to_string(), UpdateDonationCmd::cash(money(80)))
        .await
        .unwrap();

    assert_eq!(updated.campaign_id, None);
    assert_eq!(current_amount(&engine, &c).await, Money::ZERO);
}

#[tokio::test]
async fn retry_with_same_idempotency_key_does_not_double_count() {
    let (engine, _db) = engine_with_db().await;
    let c = new_campaign(&engine, "Bridge", money(5000)).await;

    let cmd = NewDonationCmd::cash("Ann", money(90), day(2))
        .campaign(&c)
        .idempotency_key("req-1");
    let first = engine.create_donation(cmd.clone(), &alice()).await.unwrap();
    let second = engine.create_donation(cmd, &alice()).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(current_amount(&engine, &c).await, money(90));

    let other = Actor::new("bob", Role::Editor);
    let cmd = NewDonationCmd::cash("Ann", money(90), day(2))
        .campaign(&c)
        .idempotency_key("req-1");
    let third = engine.create_donation(cmd, &other).await.unwrap();
    assert_ne!(third.id, first.id);
    assert_eq!(current_amount(&engine, &c).await, money(180));
}

#[tokio::test]
async fn failed_update_leaves_funding_untouched() {
    let (engine, _db) = engine_with_db().await;
    let c = new_campaign(&engine, "Clinic", money(5000)).await;

    let donation = engine
        .create_donation(NewDonationCmd::cash("Ann", money(120), day(2)).campaign(&c), &alice())
        .await
        .unwrap();
    let err = engine
        .update_donation(
            &donation.id.to_string(),
            UpdateDonationCmd::cash(money(60)).campaign("2b0f0a64-5f86-4e9b-8d5c-7c3b1e2a9f10"),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("campaign not exists".to_string()));

    assert_eq!(current_amount(&engine, &c).await, money(120));
    let stored = engine.donation(&donation.id.to_string()).await.unwrap();
    assert_eq!(stored.amount, money(120));
}

#[tokio::test]
async fn adjusting_a_vanished_campaign_is_funding_drift() {
    let (engine, db) = engine_with_db().await;
    let c = new_campaign(&engine, "Ghost", money(5000)).await;

    let donation = engine
        .create_donation(NewDonationCmd::cash("Ann", money(40), day(2)).campaign(&c), &alice())
        .await
        .unwrap();

    let backend = db.get_database_backend();
    db.execute(Statement::from_string(backend, "PRAGMA foreign_keys = OFF;"))
        .await
        .unwrap();
    db.execute(Statement::from_sql_and_values(
        backend,
        "DELETE FROM campaigns WHERE id = ?;",
        vec![c.clone().into()],
    ))
    .await
    .unwrap();

    let err = engine
        .delete_donation(&donation.id.to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::FundingDrift(_)));
    assert!(engine.donation(&donation.id.to_string()).await.is_ok());
}

#[tokio::test]
async fn random_sequence_keeps_counters_consistent() {
    let (engine, _db) = engine_with_db().await;
    let c1 = new_campaign(&engine, "A", money(100_000)).await;
    let c2 = new_campaign(&engine, "B", money(100_000)).await;

    let mut ids = Vec::new();
    for (i, amount) in [15, 40, 5, 77, 23, 60].into_iter().enumerate() {
        let target = if i % 2 == 0 { &c1 } else { &c2 };
        let d = engine
            .create_donation(
                NewDonationCmd::cash(format!("donor {i}"), money(amount), day(2)).campaign(target),
                &alice(),
            )
            .await
            .unwrap();
        ids.push(d.id.to_string());
    }

    engine
        .update_donation(&ids[0], UpdateDonationCmd::cash(money(16)).campaign(&c2))
        .await
        .unwrap();
    engine
        .update_donation(&ids[1], UpdateDonationCmd::goods("tents"))
        .await
        .unwrap();
    engine.delete_donation(&ids[2]).await.unwrap();
    engine
        .update_donation(&ids[3], UpdateDonationCmd::cash(money(1)).campaign(&c1))
        .await
        .unwrap();

    assert_funding_consistent(&engine).await;
    assert_eq!(current_amount(&engine, &c1).await, money(1 + 23));
    assert_eq!(current_amount(&engine, &c2).await, money(16 + 60));
}

#[tokio::test]
async fn unreadable_counter_aborts_the_adjustment() {
    let (engine, db) = engine_with_db().await;
    let c = new_campaign(&engine, "Corrupt", money(5000)).await;

    let donation = engine
        .create_donation(NewDonationCmd::cash("Ann", money(40), day(2)).campaign(&c), &alice())
        .await
        .unwrap();

    // A fractional value survives INTEGER affinity as REAL and no longer decodes as i64.
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "UPDATE campaigns SET current_amount_minor = 0.5 WHERE id = ?;",
        vec![c.clone().into()],
    ))
    .await
    .unwrap();

    assert!(engine.delete_donation(&donation.id.to_string()).await.is_err());
    assert!(engine.donation(&donation.id.to_string()).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_on_one_campaign_keep_the_counter_exact() {
    let path = std::env::temp_dir().join(format!("relief-desk-{}.db", uuid::Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Arc::new(
        Engine::builder()
            .database(db.clone())
            .build()
            .await
            .unwrap(),
    );
    let c = new_campaign(&engine, "Rush", money(1_000_000)).await;

    let mut tasks = JoinSet::new();
    for i in 0..40 {
        let engine = Arc::clone(&engine);
        let campaign = c.clone();
        tasks.spawn(async move {
            engine
                .create_donation(
                    NewDonationCmd::cash(format!("donor {i}"), money(1), day(2)).campaign(&campaign),
                    &alice(),
                )
                .await
        });
    }
    let mut created = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().is_ok() {
            created += 1;
        }
    }

    let rows = engine
        .list_donations(&DonationListFilter {
            campaign_id: Some(c.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(created > 0);
    assert_eq!(rows.len(), created);
    assert_eq!(current_amount(&engine, &c).await, money(created as i64));
    assert_funding_consistent(&engine).await;

    db.close().await.unwrap();
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn donations_carry_recorder_name_and_campaign_title() {
    let (engine, _db) = engine_with_db().await;
    let c = new_campaign(&engine, "Winter coats", money(500)).await;
    let recorder = alice().with_username("alice.m");

    let cash = engine
        .create_donation(NewDonationCmd::cash("Ann", money(20), day(2)).campaign(&c), &recorder)
        .await
        .unwrap();
    assert_eq!(cash.received_by, "alice");
    assert_eq!(cash.received_by_name.as_deref(), Some("alice.m"));
    assert_eq!(cash.campaign_title.as_deref(), Some("Winter coats"));

    let goods = engine
        .create_donation(NewDonationCmd::goods("Bo", "boots", day(3)).campaign(&c), &alice())
        .await
        .unwrap();
    assert_eq!(goods.received_by_name, None);
    assert_eq!(goods.campaign_title, None);

    let stored = engine.donation(&cash.id.to_string()).await.unwrap();
    assert_eq!(stored.received_by_name, cash.received_by_name);
    assert_eq!(stored.campaign_title, cash.campaign_title);

    let listed = engine
        .list_donations(&DonationListFilter::default())
        .await
        .unwrap();
    let titles: Vec<_> = listed.iter().map(|d| d.campaign_title.as_deref()).collect();
    assert_eq!(titles, vec![None, Some("Winter coats")]);
}
