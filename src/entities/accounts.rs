use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Generated handle, `M` followed by six digits.
    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    pub phone: String,

    /// Public code other people register under.
    #[sea_orm(unique)]
    pub referral_code: String,

    /// Account that referred this one. Fixed at creation.
    pub parent_id: Option<i32>,

    pub first_name: String,

    pub last_name: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub is_active: bool,

    pub is_email_verified: bool,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}
