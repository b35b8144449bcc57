//! Integration tests for auto-top-up decisions, recording, and counter
//! resets.

mod common;

use chrono::{Duration, Utc};
use kredo_core::BalanceUpdateOutcome;
use kredo_core::topup::{SkipReason, TopupDecision};
use kredo_db::entities::auto_topup_configs;
use kredo_db::repositories::{
    BalanceUpdateInput, LedgerRepository, TopupConfigInput, TopupRepository,
};
use kredo_shared::config::LedgerConfig;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

fn config_input() -> TopupConfigInput {
    TopupConfigInput {
        enabled: true,
        trigger_threshold: 50,
        topup_amount: 1000,
        max_per_month: 3,
        payment_method_id: Some("pm_test_visa".to_string()),
    }
}

async fn debit(db: &DatabaseConnection, tenant: Uuid, amount: i64) {
    let ledger = LedgerRepository::new(db.clone(), &LedgerConfig::default());
    match ledger
        .update_credit_balance(
            tenant,
            BalanceUpdateInput {
                transaction_type: kredo_core::TransactionType::Usage,
                amount,
                reference_id: None,
                reference_type: None,
                description: None,
                metadata: None,
            },
        )
        .await
        .expect("debit")
    {
        BalanceUpdateOutcome::Applied(_) => {}
        other => panic!("debit rejected: {other:?}"),
    }
}

#[tokio::test]
async fn check_walks_the_skip_ladder() {
    let Some(test) = common::setup().await else {
        return;
    };
    let tenant = common::create_tenant(&test.db, "ladder", false).await;
    let topups = TopupRepository::new(test.db.clone());

    // No config row at all
    assert_eq!(
        topups.check_auto_topup(tenant).await.expect("check"),
        TopupDecision::Skip(SkipReason::NotConfigured)
    );

    // Disabled config
    topups
        .upsert_config(
            tenant,
            TopupConfigInput {
                enabled: false,
                ..config_input()
            },
        )
        .await
        .expect("upsert");
    assert_eq!(
        topups.check_auto_topup(tenant).await.expect("check"),
        TopupDecision::Skip(SkipReason::NotEnabled)
    );

    // Enabled but no payment method
    topups
        .upsert_config(
            tenant,
            TopupConfigInput {
                payment_method_id: None,
                ..config_input()
            },
        )
        .await
        .expect("upsert");
    assert_eq!(
        topups.check_auto_topup(tenant).await.expect("check"),
        TopupDecision::Skip(SkipReason::NoPaymentMethod)
    );

    // Fully configured at zero balance: trigger
    topups
        .upsert_config(tenant, config_input())
        .await
        .expect("upsert");
    assert_eq!(
        topups.check_auto_topup(tenant).await.expect("check"),
        TopupDecision::Trigger { topup_amount: 1000 }
    );
}

#[tokio::test]
async fn recording_is_idempotent_per_payment() {
    let Some(test) = common::setup().await else {
        return;
    };
    let tenant = common::create_tenant(&test.db, "webhook", false).await;
    let topups = TopupRepository::new(test.db.clone());
    topups
        .upsert_config(tenant, config_input())
        .await
        .expect("upsert");

    let first = match topups
        .record_auto_topup(tenant, "pay_abc123", 1000)
        .await
        .expect("record")
    {
        BalanceUpdateOutcome::Applied(applied) => applied,
        other => panic!("record rejected: {other:?}"),
    };
    assert_eq!(first.new_balance, 1000);

    // A replayed webhook credits nothing
    match topups
        .record_auto_topup(tenant, "pay_abc123", 1000)
        .await
        .expect("record")
    {
        BalanceUpdateOutcome::Duplicate {
            transaction_id,
            new_balance,
        } => {
            assert_eq!(transaction_id, first.transaction_id);
            assert_eq!(new_balance, 1000);
        }
        other => panic!("expected duplicate, got {other:?}"),
    }

    let config = topups
        .get_config(tenant)
        .await
        .expect("get config")
        .expect("config");
    assert_eq!(config.topups_this_month, 1);

    let ledger = LedgerRepository::new(test.db.clone(), &LedgerConfig::default());
    assert_eq!(ledger.replay_balance(tenant).await.expect("replay"), 1000);
}

#[tokio::test]
async fn above_threshold_and_monthly_cap_skip() {
    let Some(test) = common::setup().await else {
        return;
    };
    let tenant = common::create_tenant(&test.db, "cap", false).await;
    let topups = TopupRepository::new(test.db.clone());
    topups
        .upsert_config(
            tenant,
            TopupConfigInput {
                max_per_month: 1,
                ..config_input()
            },
        )
        .await
        .expect("upsert");

    topups
        .record_auto_topup(tenant, "pay_first", 1000)
        .await
        .expect("record");

    // Balance 1000 is above the threshold of 50
    assert_eq!(
        topups.check_auto_topup(tenant).await.expect("check"),
        TopupDecision::Skip(SkipReason::AboveThreshold)
    );

    // Drain below the threshold; now the monthly cap of 1 blocks
    debit(&test.db, tenant, 990).await;
    assert_eq!(
        topups.check_auto_topup(tenant).await.expect("check"),
        TopupDecision::Skip(SkipReason::MaxReached)
    );
}

#[tokio::test]
async fn counter_reset_is_driven_by_the_stored_time() {
    let Some(test) = common::setup().await else {
        return;
    };
    let tenant = common::create_tenant(&test.db, "reset", false).await;
    let topups = TopupRepository::new(test.db.clone());
    topups
        .upsert_config(
            tenant,
            TopupConfigInput {
                max_per_month: 1,
                ..config_input()
            },
        )
        .await
        .expect("upsert");
    topups
        .record_auto_topup(tenant, "pay_reset", 1000)
        .await
        .expect("record");
    debit(&test.db, tenant, 990).await;

    // Not yet due: nothing resets
    assert_eq!(topups.reset_monthly_counters().await.expect("reset"), 0);
    assert_eq!(
        topups.check_auto_topup(tenant).await.expect("check"),
        TopupDecision::Skip(SkipReason::MaxReached)
    );

    // Force the reset time into the past
    let config = auto_topup_configs::Entity::find_by_id(tenant)
        .one(&test.db)
        .await
        .expect("query")
        .expect("config");
    let mut active: auto_topup_configs::ActiveModel = config.into();
    active.counters_reset_at = Set((Utc::now() - Duration::days(1)).into());
    active.update(&test.db).await.expect("force reset due");

    assert_eq!(topups.reset_monthly_counters().await.expect("reset"), 1);
    // Re-running is a no-op
    assert_eq!(topups.reset_monthly_counters().await.expect("reset"), 0);

    let config = topups
        .get_config(tenant)
        .await
        .expect("get config")
        .expect("config");
    assert_eq!(config.topups_this_month, 0);
    assert_eq!(
        topups.check_auto_topup(tenant).await.expect("check"),
        TopupDecision::Trigger { topup_amount: 1000 }
    );
}

#[tokio::test]
async fn config_update_preserves_the_monthly_counter() {
    let Some(test) = common::setup().await else {
        return;
    };
    let tenant = common::create_tenant(&test.db, "preserve", false).await;
    let topups = TopupRepository::new(test.db.clone());
    topups
        .upsert_config(tenant, config_input())
        .await
        .expect("upsert");
    topups
        .record_auto_topup(tenant, "pay_keep", 1000)
        .await
        .expect("record");

    let updated = topups
        .upsert_config(
            tenant,
            TopupConfigInput {
                trigger_threshold: 25,
                ..config_input()
            },
        )
        .await
        .expect("upsert");
    assert_eq!(updated.topups_this_month, 1);
    assert_eq!(updated.trigger_threshold, 25);
}
