//! Bulk job item entity
//!
//! One row per processed item, written as part of the per-item checkpoint.
//! The completed job's result list is a projection of these rows ordered by
//! `item_index`, so it stays index-aligned with the input and identical
//! across polls. Unique on `(job_id, item_index)`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of one processed item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Succeeded,
    Failed,
}

impl From<String> for ItemStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "succeeded" => ItemStatus::Succeeded,
            _ => ItemStatus::Failed,
        }
    }
}

impl From<ItemStatus> for String {
    fn from(status: ItemStatus) -> Self {
        match status {
            ItemStatus::Succeeded => "succeeded".to_string(),
            ItemStatus::Failed => "failed".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bulk_job_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub job_id: Uuid,

    pub item_index: i32,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub generation_id: Option<Uuid>,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub output: Option<Json>,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub processed_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the item status as an enum
    pub fn item_status(&self) -> ItemStatus {
        ItemStatus::from(self.status.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bulk_job::Entity",
        from = "Column::JobId",
        to = "super::bulk_job::Column::Id"
    )]
    Job,
}

impl Related<super::bulk_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
