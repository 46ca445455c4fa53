//! `SeaORM` Entity for movements table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_id: Uuid,
    pub date: Date,
    pub value_date: Option<Date>,
    pub direction: String,
    pub medium: String,
    pub amount: Decimal,
    pub currency: String,
    pub account_kind: String,
    pub cash_account_id: Option<Uuid>,
    pub bank_account_id: Option<Uuid>,
    pub check_id: Option<Uuid>,
    pub description: String,
    pub reference_type: Option<String>,
    pub reference_id: Option<String>,
    pub state: String,
    pub reversal_of_id: Option<Uuid>,
    pub reversed_by_id: Option<Uuid>,
    pub reconciled_item_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
