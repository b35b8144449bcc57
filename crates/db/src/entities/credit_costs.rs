//! `SeaORM` Entity for the action pricing table.
//!
//! Maintained out of band by administrators; read-only at transaction time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "credit_costs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub action_key: String,
    pub credit_cost: i64,
    pub is_active: bool,
    pub description: Option<String>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
