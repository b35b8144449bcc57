//! Integration tests for promo and referral redemption.

mod common;

use chrono::{Duration, Utc};
use kredo_core::RedemptionOutcome;
use kredo_core::redemption::CodeRejection;
use kredo_db::entities::{promo_codes, referral_codes};
use kredo_db::repositories::{LedgerRepository, RedemptionRepository};
use kredo_shared::config::LedgerConfig;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

async fn seed_promo(db: &DatabaseConnection, code: &str, credits: i64) -> Uuid {
    let id = Uuid::new_v4();
    promo_codes::ActiveModel {
        id: Set(id),
        code: Set(code.to_string()),
        credits: Set(credits),
        max_uses: Set(Some(100)),
        uses_count: Set(0),
        expires_at: Set(Some((Utc::now() + Duration::days(30)).into())),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("seed promo code");
    id
}

async fn seed_referral(
    db: &DatabaseConnection,
    code: &str,
    referrer: Uuid,
    referrer_bonus: i64,
    referee_bonus: i64,
    max_uses: Option<i32>,
) -> Uuid {
    let id = Uuid::new_v4();
    referral_codes::ActiveModel {
        id: Set(id),
        code: Set(code.to_string()),
        tenant_id: Set(referrer),
        referrer_bonus: Set(referrer_bonus),
        referee_bonus: Set(referee_bonus),
        max_uses: Set(max_uses),
        uses_count: Set(0),
        expires_at: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("seed referral code");
    id
}

#[tokio::test]
async fn promo_redeems_once_per_tenant() {
    let Some(test) = common::setup().await else {
        return;
    };
    let tenant = common::create_tenant(&test.db, "promo-once", false).await;
    seed_promo(&test.db, "WELCOME100", 100).await;
    let redemptions = RedemptionRepository::new(test.db.clone());

    match redemptions
        .redeem_promo(tenant, "WELCOME100")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::Applied {
            credits_granted,
            referrer_credits,
            new_balance,
        } => {
            assert_eq!(credits_granted, 100);
            assert_eq!(referrer_credits, 0);
            assert_eq!(new_balance, 100);
        }
        other => panic!("redeem rejected: {other:?}"),
    }

    match redemptions
        .redeem_promo(tenant, "WELCOME100")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::AlreadyRedeemed => {}
        other => panic!("expected already-redeemed, got {other:?}"),
    }

    // One redemption and one ledger row
    let promo = promo_codes::Entity::find()
        .one(&test.db)
        .await
        .expect("query")
        .expect("promo");
    assert_eq!(promo.uses_count, 1);
    let ledger = LedgerRepository::new(test.db.clone(), &LedgerConfig::default());
    assert_eq!(ledger.replay_balance(tenant).await.expect("replay"), 100);
}

#[tokio::test]
async fn promo_rejections() {
    let Some(test) = common::setup().await else {
        return;
    };
    let tenant = common::create_tenant(&test.db, "promo-reject", false).await;
    let redemptions = RedemptionRepository::new(test.db.clone());

    match redemptions
        .redeem_promo(tenant, "NO-SUCH-CODE")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::Rejected(CodeRejection::NotFound) => {}
        other => panic!("expected not-found, got {other:?}"),
    }

    let inactive_id = seed_promo(&test.db, "DISABLED", 50).await;
    let promo = promo_codes::Entity::find_by_id(inactive_id)
        .one(&test.db)
        .await
        .expect("query")
        .expect("promo");
    let mut active: promo_codes::ActiveModel = promo.into();
    active.is_active = Set(false);
    active.update(&test.db).await.expect("deactivate");
    match redemptions
        .redeem_promo(tenant, "DISABLED")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::Rejected(CodeRejection::Inactive) => {}
        other => panic!("expected inactive, got {other:?}"),
    }

    let expired_id = seed_promo(&test.db, "EXPIRED", 50).await;
    let promo = promo_codes::Entity::find_by_id(expired_id)
        .one(&test.db)
        .await
        .expect("query")
        .expect("promo");
    let mut active: promo_codes::ActiveModel = promo.into();
    active.expires_at = Set(Some((Utc::now() - Duration::hours(1)).into()));
    active.update(&test.db).await.expect("expire");
    match redemptions
        .redeem_promo(tenant, "EXPIRED")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::Rejected(CodeRejection::Expired) => {}
        other => panic!("expected expired, got {other:?}"),
    }

    // Nothing was credited along the way
    let ledger = LedgerRepository::new(test.db.clone(), &LedgerConfig::default());
    assert_eq!(ledger.replay_balance(tenant).await.expect("replay"), 0);
}

#[tokio::test]
async fn referral_credits_both_sides() {
    let Some(test) = common::setup().await else {
        return;
    };
    let referrer = common::create_tenant(&test.db, "referrer", false).await;
    let referee = common::create_tenant(&test.db, "referee", false).await;
    seed_referral(&test.db, "FRIEND-2500", referrer, 2500, 2500, None).await;
    let redemptions = RedemptionRepository::new(test.db.clone());

    match redemptions
        .redeem_referral(referee, "FRIEND-2500")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::Applied {
            credits_granted,
            referrer_credits,
            new_balance,
        } => {
            assert_eq!(credits_granted, 2500);
            assert_eq!(referrer_credits, 2500);
            assert_eq!(new_balance, 2500);
        }
        other => panic!("redeem rejected: {other:?}"),
    }

    let ledger = LedgerRepository::new(test.db.clone(), &LedgerConfig::default());
    assert_eq!(ledger.replay_balance(referee).await.expect("replay"), 2500);
    assert_eq!(
        ledger.replay_balance(referrer).await.expect("replay"),
        2500
    );

    // Same referee cannot redeem the same code twice
    match redemptions
        .redeem_referral(referee, "FRIEND-2500")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::AlreadyRedeemed => {}
        other => panic!("expected already-redeemed, got {other:?}"),
    }
}

#[tokio::test]
async fn self_referral_is_rejected() {
    let Some(test) = common::setup().await else {
        return;
    };
    let referrer = common::create_tenant(&test.db, "selfie", false).await;
    seed_referral(&test.db, "MY-OWN-CODE", referrer, 2500, 2500, None).await;
    let redemptions = RedemptionRepository::new(test.db.clone());

    match redemptions
        .redeem_referral(referrer, "MY-OWN-CODE")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::Rejected(CodeRejection::SelfReferral) => {}
        other => panic!("expected self-referral rejection, got {other:?}"),
    }

    let ledger = LedgerRepository::new(test.db.clone(), &LedgerConfig::default());
    assert_eq!(ledger.replay_balance(referrer).await.expect("replay"), 0);
}

#[tokio::test]
async fn referral_usage_cap_is_enforced() {
    let Some(test) = common::setup().await else {
        return;
    };
    let referrer = common::create_tenant(&test.db, "capped-referrer", false).await;
    let first = common::create_tenant(&test.db, "capped-first", false).await;
    let second = common::create_tenant(&test.db, "capped-second", false).await;
    seed_referral(&test.db, "ONE-USE", referrer, 100, 100, Some(1)).await;
    let redemptions = RedemptionRepository::new(test.db.clone());

    match redemptions
        .redeem_referral(first, "ONE-USE")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::Applied { .. } => {}
        other => panic!("first redemption rejected: {other:?}"),
    }

    match redemptions
        .redeem_referral(second, "ONE-USE")
        .await
        .expect("redeem")
    {
        RedemptionOutcome::Rejected(CodeRejection::UsageCapReached) => {}
        other => panic!("expected usage-cap rejection, got {other:?}"),
    }
}
