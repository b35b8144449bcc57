//! Database seeder for Kredo development and testing.
//!
//! Seeds two demo tenants (one free-tier, one paid), a starter credit pack,
//! a promo code, a referral code, and an auto-top-up configuration for
//! local development. The pricing table itself is seeded by the initial
//! migration.
//!
//! Usage: cargo run --bin seeder

use chrono::Utc;
use kredo_core::TransactionType;
use kredo_db::entities::{promo_codes, referral_codes, tenants};
use kredo_db::repositories::{BalanceUpdateInput, LedgerRepository, TopupConfigInput, TopupRepository};
use kredo_shared::config::LedgerConfig;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

/// Free-tier demo tenant ID (consistent for all seeds)
const FREE_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";
/// Paid demo tenant ID (consistent for all seeds)
const PAID_TENANT_ID: &str = "00000000-0000-0000-0000-000000000002";

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = kredo_db::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding demo tenants...");
    seed_tenants(&db).await;

    println!("Seeding starter credits...");
    seed_starter_credits(&db).await;

    println!("Seeding promo code...");
    seed_promo_code(&db).await;

    println!("Seeding referral code...");
    seed_referral_code(&db).await;

    println!("Seeding auto-top-up config...");
    seed_topup_config(&db).await;

    println!("Seeding complete!");
}

fn free_tenant_id() -> Uuid {
    Uuid::parse_str(FREE_TENANT_ID).unwrap()
}

fn paid_tenant_id() -> Uuid {
    Uuid::parse_str(PAID_TENANT_ID).unwrap()
}

/// Seeds one free-tier and one paid demo tenant.
async fn seed_tenants(db: &DatabaseConnection) {
    let demo_tenants = [
        (free_tenant_id(), "Green Leaf Dispensary", "green-leaf", true),
        (paid_tenant_id(), "High Desert Wholesale", "high-desert", false),
    ];

    for (id, name, slug, is_free_tier) in demo_tenants {
        if tenants::Entity::find_by_id(id)
            .one(db)
            .await
            .ok()
            .flatten()
            .is_some()
        {
            println!("  Tenant {slug} already exists, skipping...");
            continue;
        }

        let tenant = tenants::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            is_free_tier: Set(is_free_tier),
            created_at: Set(Utc::now().into()),
            updated_at: Set(Utc::now().into()),
        };

        if let Err(e) = tenant.insert(db).await {
            eprintln!("Failed to insert tenant {slug}: {e}");
        } else {
            println!("  Created tenant: {name} ({slug})");
        }
    }
}

/// Gives the paid demo tenant a starter purchase through the ledger, so the
/// seeded balance has a matching transaction row. The fixed reference makes
/// re-running the seeder a no-op.
async fn seed_starter_credits(db: &DatabaseConnection) {
    let ledger = LedgerRepository::new(db.clone(), &LedgerConfig::default());

    let input = BalanceUpdateInput {
        transaction_type: TransactionType::Purchase,
        amount: 10_000,
        reference_id: Some("seed:starter-pack".to_string()),
        reference_type: Some("seed".to_string()),
        description: Some("Starter credit pack".to_string()),
        metadata: Some(serde_json::json!({ "source": "seeder" })),
    };

    match ledger.update_credit_balance(paid_tenant_id(), input).await {
        Ok(outcome) => println!("  Starter credits: {outcome:?}"),
        Err(e) => eprintln!("Failed to seed starter credits: {e}"),
    }
}

/// Seeds a welcome promo code worth 500 credits.
async fn seed_promo_code(db: &DatabaseConnection) {
    let promo = promo_codes::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set("WELCOME500".to_string()),
        credits: Set(500),
        max_uses: Set(Some(100)),
        uses_count: Set(0),
        expires_at: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    };

    if let Err(e) = promo.insert(db).await {
        if !e.to_string().contains("duplicate key") {
            eprintln!("Failed to insert promo code: {e}");
        } else {
            println!("  Promo code already exists, skipping...");
        }
    } else {
        println!("  Created promo code: WELCOME500 (500 credits)");
    }
}

/// Seeds a referral code owned by the paid demo tenant.
async fn seed_referral_code(db: &DatabaseConnection) {
    let referral = referral_codes::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set("DESERT-FRIENDS".to_string()),
        tenant_id: Set(paid_tenant_id()),
        referrer_bonus: Set(250),
        referee_bonus: Set(500),
        max_uses: Set(Some(50)),
        uses_count: Set(0),
        expires_at: Set(None),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    };

    if let Err(e) = referral.insert(db).await {
        if !e.to_string().contains("duplicate key") {
            eprintln!("Failed to insert referral code: {e}");
        } else {
            println!("  Referral code already exists, skipping...");
        }
    } else {
        println!("  Created referral code: DESERT-FRIENDS (500/250 credits)");
    }
}

/// Seeds an auto-top-up configuration for the paid demo tenant.
async fn seed_topup_config(db: &DatabaseConnection) {
    let topups = TopupRepository::new(db.clone());

    let input = TopupConfigInput {
        enabled: true,
        trigger_threshold: 100,
        topup_amount: 1_000,
        max_per_month: 3,
        payment_method_id: Some("pm_demo_card".to_string()),
    };

    match topups.upsert_config(paid_tenant_id(), input).await {
        Ok(config) => println!(
            "  Auto-top-up configured: threshold {} -> +{} credits",
            config.trigger_threshold, config.topup_amount
        ),
        Err(e) => eprintln!("Failed to seed auto-top-up config: {e}"),
    }
}
