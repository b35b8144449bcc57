//! Locked access to the per-tenant balance row.
//!
//! The account row is the unit of mutual exclusion for every balance
//! mutation. Callers must already be inside a transaction; the returned
//! model is locked with `SELECT ... FOR UPDATE` until that transaction
//! commits or rolls back.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, QuerySelect, Set};
use uuid::Uuid;

use crate::entities::{tenant_credit_accounts, tenants};

/// Locks the tenant's account row, creating a zero-balance row first if the
/// tenant has never had one.
///
/// Creation uses `ON CONFLICT DO NOTHING` so two sessions racing to create
/// the same account both converge on the single row and then serialize on
/// the lock.
///
/// # Errors
///
/// Returns an error on database failure.
pub(crate) async fn lock_or_create<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
) -> Result<tenant_credit_accounts::Model, DbErr> {
    if let Some(account) = tenant_credit_accounts::Entity::find_by_id(tenant_id)
        .lock_exclusive()
        .one(conn)
        .await?
    {
        return Ok(account);
    }

    let now = Utc::now().into();
    let fresh = tenant_credit_accounts::ActiveModel {
        tenant_id: Set(tenant_id),
        balance: Set(0),
        free_credits_balance: Set(0),
        purchased_credits_balance: Set(0),
        lifetime_earned: Set(0),
        lifetime_spent: Set(0),
        credits_used_today: Set(0),
        warning_100_sent: Set(false),
        warning_50_sent: Set(false),
        warning_20_sent: Set(false),
        warning_0_sent: Set(false),
        next_free_grant_at: Set(None),
        last_free_grant_at: Set(None),
        actions_this_minute: Set(0),
        last_action_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    tenant_credit_accounts::Entity::insert(fresh)
        .on_conflict(
            OnConflict::column(tenant_credit_accounts::Column::TenantId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    tenant_credit_accounts::Entity::find_by_id(tenant_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| {
            DbErr::RecordNotFound(format!("credit account for tenant {tenant_id} not found"))
        })
}

/// Checks that the tenant itself exists. Account rows are created lazily,
/// but operations against an unknown tenant must fail loudly instead of
/// minting an orphan account.
pub(crate) async fn tenant_exists<C: ConnectionTrait>(
    conn: &C,
    tenant_id: Uuid,
) -> Result<bool, DbErr> {
    Ok(tenants::Entity::find_by_id(tenant_id)
        .one(conn)
        .await?
        .is_some())
}

/// Persists an updated account model, bumping `updated_at`.
pub(crate) async fn save_account<C: ConnectionTrait>(
    conn: &C,
    mut account: tenant_credit_accounts::ActiveModel,
) -> Result<tenant_credit_accounts::Model, DbErr> {
    account.updated_at = Set(Utc::now().into());
    account.update(conn).await
}
