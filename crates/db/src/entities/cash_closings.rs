//! `SeaORM` Entity for cash_closings table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_closings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub cash_account_id: Uuid,
    pub date: Date,
    pub cash_balance: Decimal,
    pub portfolio_balance: Decimal,
    pub system_balance: Decimal,
    pub counted: Decimal,
    pub variance: Decimal,
    pub state: String,
    pub note: Option<String>,
    pub adjustment_movement_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cash_accounts::Entity",
        from = "Column::CashAccountId",
        to = "super::cash_accounts::Column::Id"
    )]
    CashAccounts,
}

impl Related<super::cash_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CashAccounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
