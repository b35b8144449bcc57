//! `SeaORM` Entity for referral redemptions.
//!
//! One row per (code, referee); the unique constraint is the source of
//! truth for "already redeemed".

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "referral_redemptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub referral_code_id: Uuid,
    pub referee_tenant_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::referral_codes::Entity",
        from = "Column::ReferralCodeId",
        to = "super::referral_codes::Column::Id"
    )]
    ReferralCodes,
    #[sea_orm(
        belongs_to = "super::tenants::Entity",
        from = "Column::RefereeTenantId",
        to = "super::tenants::Column::Id"
    )]
    Tenants,
}

impl Related<super::referral_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReferralCodes.def()
    }
}

impl Related<super::tenants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
