//! Tenant entity
//!
//! The owning team whose plan governs credential quotas and feature gating.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subscription plan tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Pro,
    Business,
    Enterprise,
}

impl From<String> for Plan {
    fn from(s: String) -> Self {
        match s.as_str() {
            "free" => Plan::Free,
            "pro" => Plan::Pro,
            "business" => Plan::Business,
            "enterprise" => Plan::Enterprise,
            _ => Plan::Free,
        }
    }
}

impl From<Plan> for String {
    fn from(plan: Plan) -> Self {
        match plan {
            Plan::Free => "free".to_string(),
            Plan::Pro => "pro".to_string(),
            Plan::Business => "business".to_string(),
            Plan::Enterprise => "enterprise".to_string(),
        }
    }
}

impl Plan {
    /// Plans paid above the free tier unlock URL and image analysis
    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Free)
    }

    /// Bulk processing requires the two upper tiers
    pub fn allows_bulk(&self) -> bool {
        matches!(self, Plan::Business | Plan::Enterprise)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tenants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text", unique)]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub plan: String,

    #[sea_orm(column_type = "Text")]
    pub owner_email: String,

    pub is_active: bool,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Get the plan as an enum
    pub fn plan(&self) -> Plan {
        Plan::from(self.plan.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::api_key::Entity")]
    ApiKeys,

    #[sea_orm(has_many = "super::bulk_job::Entity")]
    BulkJobs,

    #[sea_orm(has_many = "super::generation::Entity")]
    Generations,
}

impl Related<super::api_key::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiKeys.def()
    }
}

impl Related<super::bulk_job::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BulkJobs.def()
    }
}

impl Related<super::generation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Generations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_roundtrip() {
        for plan in [Plan::Free, Plan::Pro, Plan::Business, Plan::Enterprise] {
            assert_eq!(Plan::from(String::from(plan)), plan);
        }
    }

    #[test]
    fn test_unknown_plan_falls_back_to_free() {
        assert_eq!(Plan::from("platinum".to_string()), Plan::Free);
    }

    #[test]
    fn test_bulk_gating() {
        assert!(!Plan::Free.allows_bulk());
        assert!(!Plan::Pro.allows_bulk());
        assert!(Plan::Business.allows_bulk());
        assert!(Plan::Enterprise.allows_bulk());
    }

    #[test]
    fn test_paid_gating() {
        assert!(!Plan::Free.is_paid());
        assert!(Plan::Pro.is_paid());
    }
}
