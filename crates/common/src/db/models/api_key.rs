//! API key (credential) entity
//!
//! Raw tokens are never stored; lookups match on the sha256 hash. The
//! `token_prefix` column keeps the first characters of the raw token for
//! display masking in key listings.

use crate::auth::ScopeSet;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "api_keys")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", unique)]
    pub token_hash: String,

    #[sea_orm(column_type = "Text")]
    pub token_prefix: String,

    #[sea_orm(column_type = "JsonBinary")]
    pub scopes: ScopeSet,

    pub usage_count: i64,

    pub last_used_at: Option<DateTimeWithTimeZone>,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Check a permission scope against this credential
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.allows(scope)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,

    #[sea_orm(has_many = "super::usage_record::Entity")]
    UsageRecords,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::usage_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsageRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
