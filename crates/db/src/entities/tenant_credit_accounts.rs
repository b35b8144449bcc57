//! `SeaORM` Entity for the per-tenant credit balance row.
//!
//! This row is the unit of mutual exclusion: every mutating ledger operation
//! locks it with `SELECT ... FOR UPDATE` before reading the balance.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "tenant_credit_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub tenant_id: Uuid,
    pub balance: i64,
    pub free_credits_balance: i64,
    pub purchased_credits_balance: i64,
    pub lifetime_earned: i64,
    pub lifetime_spent: i64,
    pub credits_used_today: i64,
    pub warning_100_sent: bool,
    pub warning_50_sent: bool,
    pub warning_20_sent: bool,
    pub warning_0_sent: bool,
    pub next_free_grant_at: Option<DateTimeWithTimeZone>,
    pub last_free_grant_at: Option<DateTimeWithTimeZone>,
    pub actions_this_minute: i32,
    pub last_action_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenants::Entity",
        from = "Column::TenantId",
        to = "super::tenants::Column::Id"
    )]
    Tenants,
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
