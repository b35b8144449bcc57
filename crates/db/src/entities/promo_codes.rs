//! `SeaORM` Entity for promo codes.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "promo_codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub credits: i64,
    pub max_uses: Option<i32>,
    pub uses_count: i32,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::promo_redemptions::Entity")]
    PromoRedemptions,
}

impl Related<super::promo_redemptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PromoRedemptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
