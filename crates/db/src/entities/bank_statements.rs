//! `SeaORM` Entity for bank_statements table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_statements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub bank_account_id: Uuid,
    pub period_start: Date,
    pub period_end: Date,
    pub imported_by: Uuid,
    pub imported_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bank_accounts::Entity",
        from = "Column::BankAccountId",
        to = "super::bank_accounts::Column::Id"
    )]
    BankAccounts,
    #[sea_orm(has_many = "super::bank_statement_items::Entity")]
    BankStatementItems,
}

impl Related<super::bank_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccounts.def()
    }
}

impl Related<super::bank_statement_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankStatementItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
