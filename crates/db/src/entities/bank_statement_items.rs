//! `SeaORM` Entity for bank_statement_items table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "bank_statement_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub statement_id: Uuid,
    pub bank_account_id: Uuid,
    pub date: Date,
    pub description: String,
    pub reference: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
    pub status: String,
    pub match_type: Option<String>,
    pub confidence: Option<Decimal>,
    pub movement_id: Option<Uuid>,
    pub suspense_note: Option<String>,
    pub reconciled_at: Option<DateTimeWithTimeZone>,
    pub reconciled_by: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bank_statements::Entity",
        from = "Column::StatementId",
        to = "super::bank_statements::Column::Id"
    )]
    BankStatements,
}

impl Related<super::bank_statements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankStatements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
