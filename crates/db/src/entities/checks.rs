//! `SeaORM` Entity for checks table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "checks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub number: String,
    pub bank_name: String,
    pub issuer: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: Option<Date>,
    pub state: String,
    pub custody_account_id: Uuid,
    pub deposited_into: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cash_accounts::Entity",
        from = "Column::CustodyAccountId",
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
