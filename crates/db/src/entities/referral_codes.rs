//! `SeaORM` Entity for referral codes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    /// The referrer who owns this code.
    pub tenant_id: Uuid,
    pub referrer_bonus: i64,
    pub referee_bonus: i64,
    pub max_uses: Option<i32>,
    pub uses_count: i32,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenants::Entity",
        from = "Column::TenantId",
        to = "super::tenants::Column::Id"
    )]
    Tenants,
    #[sea_orm(has_many = "super::referral_redemptions::Entity")]
    ReferralRedemptions,
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenants.def()
    }
}

impl Related<super::referral_redemptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReferralRedemptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
