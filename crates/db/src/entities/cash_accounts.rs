//! `SeaORM` Entity for cash_accounts table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub currency: String,
    pub balance: Decimal,
    pub portfolio_balance: Decimal,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::checks::Entity")]
    Checks,
    #[sea_orm(has_many = "super::cash_closings::Entity")]
    CashClosings,
}

impl Related<super::checks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Checks.def()
    }
}

impl Related<super::cash_closings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashClosings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
