use sea_orm::entity::prelude::*;

/// Registration data held between the register and verify steps.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "pending_registrations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub token: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub referral_code: String,
    pub parent_referral_code: Option<String>,
    pub password_hash: String,
    pub created_at: String,
    pub expires_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
