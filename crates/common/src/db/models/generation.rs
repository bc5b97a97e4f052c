//! Generation entity
//!
//! One row per produced artifact: single, viral, url, image, or bulk item.
//! The `content` column holds the artifact JSON; its shape varies by
//! variant, so it stays a plain JSON value.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "generations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub api_key_id: Option<Uuid>,

    pub bulk_job_id: Option<Uuid>,

    #[sea_orm(column_type = "Text")]
    pub product_name: String,

    #[sea_orm(column_type = "Text")]
    pub category: String,

    #[sea_orm(column_type = "Text")]
    pub writing_style: String,

    #[sea_orm(column_type = "Text")]
    pub language: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub content: Json,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
